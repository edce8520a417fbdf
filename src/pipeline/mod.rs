//! Batch generation of noisy variants and run reporting

pub mod batch;
pub mod report;
pub mod runner;

pub use batch::{
    discover_images, output_file_name, CancelToken, NoisePipeline, PipelineConfig, PipelineOutcome,
    PipelineState, Progress, IMAGE_EXTENSIONS,
};
pub use report::{ProcessingReport, ProcessingStats, ProcessingSummary, ReportPaths, TypeStats};
pub use runner::{spawn_pipeline, PipelineEvent, PipelineHandle};
