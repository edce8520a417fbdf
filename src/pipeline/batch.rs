use crate::core::NoiseType;
use crate::io::raster::{extension_of, has_extension};
use crate::io::ImageCodec;
use crate::pipeline::report::{ProcessingReport, ProcessingStats, ReportPaths};
use crate::types::{NoiseError, NoiseResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Input extensions picked up from an input folder
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// Batch generation parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the per-type output folders and the report
    pub output_dir: PathBuf,
    /// Noise types to generate, in order
    pub noise_types: Vec<NoiseType>,
    /// Severity levels 1..=levels per type
    pub levels: u32,
    /// Seed for the run's random generator; entropy when unset
    pub seed: Option<u64>,
    /// Quality of JPEG outputs
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/noisy/noisy_images"),
            noise_types: NoiseType::ALL.to_vec(),
            levels: 10,
            seed: None,
            jpeg_quality: 95,
        }
    }
}

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Cooperative cancellation flag, checked between units of work
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Completion snapshot handed to progress observers
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub units_done: usize,
    pub total_units: usize,
    pub status: String,
}

impl Progress {
    /// Fraction of (file, type, level) units finished, in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            1.0
        } else {
            self.units_done as f64 / self.total_units as f64
        }
    }
}

/// Result of a finished (or cancelled) run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub stats: ProcessingStats,
    pub report: ProcessingReport,
    pub report_paths: ReportPaths,
}

/// Recognized images directly inside `input_dir`, sorted by path
pub fn discover_images<P: AsRef<Path>>(input_dir: P) -> NoiseResult<Vec<PathBuf>> {
    let input_dir = input_dir.as_ref();
    if !input_dir.is_dir() {
        return Err(NoiseError::Configuration(format!(
            "input folder not found: {}",
            input_dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_extension(path, IMAGE_EXTENSIONS))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(NoiseError::Configuration(format!(
            "no images found in {}",
            input_dir.display()
        )));
    }
    Ok(files)
}

/// `{stem}_{type}_level_{NN}.{tif|jpg}` for one unit of work
pub fn output_file_name(input: &Path, noise_type: NoiseType, level: u32) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{}_{}_level_{:02}.{}", stem, noise_type, level, output_extension(input))
}

/// Applies every selected noise type at every level to every input file
pub struct NoisePipeline {
    files: Vec<PathBuf>,
    config: PipelineConfig,
    codec: ImageCodec,
    cancel: CancelToken,
    state: PipelineState,
}

impl NoisePipeline {
    /// Validate the run up front; any problem here is a configuration error
    pub fn new(files: Vec<PathBuf>, config: PipelineConfig) -> NoiseResult<Self> {
        if files.is_empty() {
            return Err(NoiseError::Configuration("no input images given".to_string()));
        }
        if config.noise_types.is_empty() {
            return Err(NoiseError::Configuration("no noise types selected".to_string()));
        }
        if config.levels == 0 {
            return Err(NoiseError::Configuration("levels must be at least 1".to_string()));
        }

        let mut config = config;
        let mut seen = Vec::with_capacity(config.noise_types.len());
        config.noise_types.retain(|t| {
            let first = !seen.contains(t);
            seen.push(*t);
            first
        });

        let codec = ImageCodec::with_jpeg_quality(config.jpeg_quality);
        Ok(Self {
            files,
            config,
            codec,
            cancel: CancelToken::new(),
            state: PipelineState::Idle,
        })
    }

    /// Pipeline over every recognized image in `input_dir`
    pub fn from_input_dir<P: AsRef<Path>>(input_dir: P, config: PipelineConfig) -> NoiseResult<Self> {
        Self::new(discover_images(input_dir)?, config)
    }

    pub fn with_codec(mut self, codec: ImageCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// files x types x levels
    pub fn total_units(&self) -> usize {
        self.files.len() * self.units_per_file()
    }

    fn units_per_file(&self) -> usize {
        self.config.noise_types.len() * self.config.levels as usize
    }

    pub fn run(&mut self) -> NoiseResult<PipelineOutcome> {
        self.run_with_progress(|_| {})
    }

    /// Run to completion or cancellation, reporting progress after every unit.
    ///
    /// Per-file and per-unit failures are logged and counted; only a
    /// configuration problem or a failure to write the report ends the run
    /// with an error.
    pub fn run_with_progress<F>(&mut self, mut on_progress: F) -> NoiseResult<PipelineOutcome>
    where
        F: FnMut(&Progress),
    {
        if self.state != PipelineState::Idle {
            return Err(NoiseError::Configuration(format!(
                "pipeline already used (state {:?})",
                self.state
            )));
        }
        self.state = PipelineState::Running;

        let output_dir = self.config.output_dir.clone();
        fs::create_dir_all(&output_dir)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut stats = ProcessingStats::new(self.files.len(), &self.config.noise_types);
        let mut progress = Progress {
            units_done: 0,
            total_units: self.total_units(),
            status: "Starting".to_string(),
        };

        log::info!(
            "Processing {} images x {} noise types x {} levels = {} outputs",
            self.files.len(),
            self.config.noise_types.len(),
            self.config.levels,
            progress.total_units
        );
        on_progress(&progress);

        'files: for file in &self.files {
            if self.cancel.is_cancelled() {
                break 'files;
            }
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            progress.status = format!("Loading {}", file_name);
            on_progress(&progress);

            let original = match self.codec.load(file) {
                Ok(image) => {
                    log::info!(
                        "Loaded {}: shape {:?}, range [{}, {}]",
                        file_name,
                        image.shape(),
                        image.value_min,
                        image.value_max
                    );
                    image
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", file.display(), e);
                    stats.record_load_failure();
                    progress.units_done += self.units_per_file();
                    progress.status = format!("Skipped {}", file_name);
                    on_progress(&progress);
                    continue;
                }
            };

            for &noise_type in &self.config.noise_types {
                let type_dir = output_dir.join(noise_type.name());
                if let Err(e) = fs::create_dir_all(&type_dir) {
                    log::warn!("Cannot create {}: {}", type_dir.display(), e);
                    for _ in 1..=self.config.levels {
                        stats.record_failure(noise_type);
                    }
                    progress.units_done += self.config.levels as usize;
                    on_progress(&progress);
                    continue;
                }

                for level in 1..=self.config.levels {
                    if self.cancel.is_cancelled() {
                        break 'files;
                    }

                    let output_path = type_dir.join(output_file_name(file, noise_type, level));
                    let unit = noise_type
                        .apply(&original, level, &mut rng)
                        .and_then(|noisy| self.codec.save(&noisy, &output_path, Some(file.as_path())));

                    match unit {
                        Ok(()) => stats.record_success(noise_type),
                        Err(e) => {
                            log::warn!(
                                "Failed {} with {} level {}: {}",
                                file_name,
                                noise_type,
                                level,
                                e
                            );
                            stats.record_failure(noise_type);
                        }
                    }

                    progress.units_done += 1;
                    progress.status = format!("Generating {} level {} for {}", noise_type, level, file_name);
                    on_progress(&progress);
                }
            }
        }

        self.state = if self.cancel.is_cancelled() {
            log::warn!(
                "Run cancelled after {} of {} units",
                progress.units_done,
                progress.total_units
            );
            PipelineState::Cancelled
        } else {
            PipelineState::Completed
        };

        let report = ProcessingReport::from_stats(&stats);
        let report_paths = report.write(&output_dir)?;

        log::info!(
            "Processing finished: {} generated, {} failed",
            stats.total_processed,
            stats.total_failed
        );
        progress.status = match self.state {
            PipelineState::Cancelled => "Cancelled".to_string(),
            _ => "Completed".to_string(),
        };
        on_progress(&progress);

        Ok(PipelineOutcome {
            state: self.state,
            stats,
            report,
            report_paths,
        })
    }
}

/// TIFF inputs keep a multiband container; everything else becomes JPEG
pub fn output_extension(input: &Path) -> &'static str {
    match extension_of(input).as_deref() {
        Some("tif") | Some("tiff") => "tif",
        _ => "jpg",
    }
}
