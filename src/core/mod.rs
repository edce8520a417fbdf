//! Noise models for multispectral imagery

pub mod noise_model;
pub mod sensor_noise;
pub mod impulse;
pub mod motion_blur;
pub mod atmospheric;
pub mod compression;

// Re-export main types
pub use noise_model::{iso_sigmas, ModelFault, NoiseSpec, NoiseType, ParseNoiseTypeError};
