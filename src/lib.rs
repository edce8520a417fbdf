//! bandnoise: Synthetic Noise Generation for Multispectral UAV Imagery
//!
//! This library degrades single- and multi-band rasters with eight parametric
//! noise models at graded severity levels, producing paired clean/noisy data
//! for denoising and robustness studies.

pub mod types;
pub mod io;
pub mod core;
pub mod pipeline;
pub mod project;

// Re-export main types and functions for easier access
pub use types::{
    BandCube, BandPlane, CanonicalImage, GeoTransform, NoiseError, NoiseResult, Sample,
    SourceMetadata,
};

pub use io::ImageCodec;
pub use core::{NoiseSpec, NoiseType};
pub use pipeline::{
    discover_images, spawn_pipeline, CancelToken, NoisePipeline, PipelineConfig, PipelineOutcome,
    PipelineState, ProcessingReport, ProcessingStats, Progress,
};
