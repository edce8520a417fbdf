//! Project folder layout and processing-history bookkeeping

use crate::core::NoiseType;
use crate::pipeline::ProcessingStats;
use crate::types::{NoiseError, NoiseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "project_metadata.json";
pub const INPUT_FOLDER: &str = "input";
pub const NOISY_FOLDER: &str = "noisy_images";

/// Operation name recorded for a noise generation run
pub const NOISE_GENERATION: &str = "noise_generation";

/// A named project under a projects root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Resolve `name` under `projects_dir`; the project folder must exist
    pub fn resolve<P: AsRef<Path>>(projects_dir: P, name: &str) -> NoiseResult<Self> {
        if name.trim().is_empty() {
            return Err(NoiseError::Configuration("project name is empty".to_string()));
        }
        let root = projects_dir.as_ref().join(name);
        if !root.is_dir() {
            return Err(NoiseError::Configuration(format!(
                "project not found: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join(INPUT_FOLDER)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(NOISY_FOLDER)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Append `record` to the project's `processing_history`.
    ///
    /// Returns `Ok(false)` when the project has no metadata file. Fields the
    /// record does not know about are preserved.
    pub fn append_record(&self, record: &ProcessingRecord) -> NoiseResult<bool> {
        let path = self.metadata_file();
        if !path.exists() {
            log::debug!("No {} in {}, history not updated", METADATA_FILE, self.root.display());
            return Ok(false);
        }

        let mut metadata: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let object = metadata.as_object_mut().ok_or_else(|| {
            NoiseError::Configuration(format!("{} is not a JSON object", path.display()))
        })?;

        let history = object
            .entry("processing_history")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !history.is_array() {
            *history = Value::Array(Vec::new());
        }
        if let Value::Array(entries) = history {
            entries.push(serde_json::to_value(record)?);
        }
        object.insert(
            "last_modified".to_string(),
            Value::String(record.timestamp.to_rfc3339()),
        );

        fs::write(&path, serde_json::to_string_pretty(&metadata)?)?;
        log::info!("Processing history updated in {}", path.display());
        Ok(true)
    }
}

/// Counts describing one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingDetails {
    pub input_images: usize,
    pub noise_levels: u32,
    pub total_generated: usize,
    pub errors: usize,
    pub noise_types: Vec<NoiseType>,
}

/// Entry of a project's processing history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub details: ProcessingDetails,
}

impl ProcessingRecord {
    pub fn noise_generation(stats: &ProcessingStats, levels: u32, noise_types: &[NoiseType]) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: NOISE_GENERATION.to_string(),
            details: ProcessingDetails {
                input_images: stats.original_images,
                noise_levels: levels,
                total_generated: stats.total_processed,
                errors: stats.total_failed,
                noise_types: noise_types.to_vec(),
            },
        }
    }
}
