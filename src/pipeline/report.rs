use crate::core::NoiseType;
use crate::types::NoiseResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_JSON: &str = "noise_processing_report.json";
pub const REPORT_TEXT: &str = "noise_processing_report.txt";

/// Outcome counters for one noise type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub processed: usize,
    pub failed: usize,
}

/// Counters accumulated over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_processed: usize,
    pub total_failed: usize,
    pub original_images: usize,
    pub noise_types: BTreeMap<NoiseType, TypeStats>,
}

impl ProcessingStats {
    pub fn new(original_images: usize, noise_types: &[NoiseType]) -> Self {
        Self {
            original_images,
            noise_types: noise_types.iter().map(|&t| (t, TypeStats::default())).collect(),
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, noise_type: NoiseType) {
        self.total_processed += 1;
        self.noise_types.entry(noise_type).or_default().processed += 1;
    }

    pub fn record_failure(&mut self, noise_type: NoiseType) {
        self.total_failed += 1;
        self.noise_types.entry(noise_type).or_default().failed += 1;
    }

    /// A file that could not be loaded counts once, against no noise type
    pub fn record_load_failure(&mut self) {
        self.total_failed += 1;
    }

    pub fn attempted(&self) -> usize {
        self.total_processed + self.total_failed
    }

    /// Percentage of successful outputs, e.g. `"91.7%"`; `"0%"` when nothing ran
    pub fn success_rate(&self) -> String {
        let attempted = self.attempted();
        if attempted == 0 {
            "0%".to_string()
        } else {
            format!("{:.1}%", self.total_processed as f64 / attempted as f64 * 100.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub total_images_processed: usize,
    pub total_failures: usize,
    pub original_images: usize,
    pub success_rate: String,
}

/// Final run report, written as JSON and as plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub processing_summary: ProcessingSummary,
    pub noise_types_details: BTreeMap<NoiseType, TypeStats>,
    pub noise_parameters: BTreeMap<NoiseType, String>,
}

/// Where a report was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub text: PathBuf,
}

impl ProcessingReport {
    pub fn from_stats(stats: &ProcessingStats) -> Self {
        Self {
            processing_summary: ProcessingSummary {
                total_images_processed: stats.total_processed,
                total_failures: stats.total_failed,
                original_images: stats.original_images,
                success_rate: stats.success_rate(),
            },
            noise_types_details: stats.noise_types.clone(),
            noise_parameters: NoiseType::ALL
                .iter()
                .map(|&t| (t, t.parameter_range().to_string()))
                .collect(),
        }
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Write both report files into `output_dir`
    pub fn write<P: AsRef<Path>>(&self, output_dir: P) -> NoiseResult<ReportPaths> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let json = output_dir.join(REPORT_JSON);
        fs::write(&json, serde_json::to_string_pretty(self)?)?;

        let text = output_dir.join(REPORT_TEXT);
        fs::write(&text, self.to_text())?;

        log::info!("Report saved to {}", json.display());
        log::info!("Text report saved to {}", text.display());
        Ok(ReportPaths { json, text })
    }
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.processing_summary;
        writeln!(f, "NOISE PROCESSING REPORT - MULTISPECTRAL UAV IMAGERY")?;
        writeln!(f, "{}\n", "=".repeat(50))?;

        writeln!(f, "SUMMARY:")?;
        writeln!(f, "  Original images: {}", summary.original_images)?;
        writeln!(f, "  Images processed: {}", summary.total_images_processed)?;
        writeln!(f, "  Failures: {}", summary.total_failures)?;
        writeln!(f, "  Success rate: {}\n", summary.success_rate)?;

        writeln!(f, "DETAILS BY NOISE TYPE:")?;
        for (noise_type, details) in &self.noise_types_details {
            writeln!(f, "  {}:", noise_type)?;
            writeln!(f, "    Processed: {}", details.processed)?;
            writeln!(f, "    Failed: {}", details.failed)?;
        }

        writeln!(f, "\nNOISE PARAMETERS:")?;
        for (noise_type, range) in &self.noise_parameters {
            writeln!(f, "  {}: {}", noise_type, range)?;
        }
        Ok(())
    }
}
