use crate::core::{atmospheric, compression, impulse, motion_blur, sensor_noise};
use crate::types::{CanonicalImage, NoiseError, NoiseResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eight supported degradations, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// Additive sensor read/thermal noise
    Gaussian,
    /// Dead and hot pixels
    SaltPepper,
    /// Photon shot noise
    Poisson,
    /// Multiplicative noise
    Speckle,
    /// Horizontal platform motion during exposure
    MotionBlur,
    /// Haze and water vapour
    Atmospheric,
    /// Lossy JPEG round trip
    Compression,
    /// High-gain luma/chroma noise
    IsoNoise,
}

impl NoiseType {
    pub const ALL: [NoiseType; 8] = [
        NoiseType::Gaussian,
        NoiseType::SaltPepper,
        NoiseType::Poisson,
        NoiseType::Speckle,
        NoiseType::MotionBlur,
        NoiseType::Atmospheric,
        NoiseType::Compression,
        NoiseType::IsoNoise,
    ];

    /// Degradations seen on real UAV captures
    pub const REALISTIC: [NoiseType; 5] = [
        NoiseType::Gaussian,
        NoiseType::Poisson,
        NoiseType::MotionBlur,
        NoiseType::Atmospheric,
        NoiseType::Compression,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NoiseType::Gaussian => "gaussian",
            NoiseType::SaltPepper => "salt_pepper",
            NoiseType::Poisson => "poisson",
            NoiseType::Speckle => "speckle",
            NoiseType::MotionBlur => "motion_blur",
            NoiseType::Atmospheric => "atmospheric",
            NoiseType::Compression => "compression",
            NoiseType::IsoNoise => "iso_noise",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            NoiseType::Gaussian => "Gaussian noise (sensor thermal noise)",
            NoiseType::SaltPepper => "Salt and pepper noise (defective pixels)",
            NoiseType::Poisson => "Poisson noise (shot noise)",
            NoiseType::Speckle => "Speckle noise (multiplicative)",
            NoiseType::MotionBlur => "Motion blur (platform movement)",
            NoiseType::Atmospheric => "Atmospheric effects (haze, vapour)",
            NoiseType::Compression => "JPEG compression artifacts",
            NoiseType::IsoNoise => "High ISO noise",
        }
    }

    /// Human-readable range of the physical parameter over levels 1..=10
    pub fn parameter_range(self) -> &'static str {
        match self {
            NoiseType::Gaussian => "Sigma: 5-50 (standard deviation)",
            NoiseType::SaltPepper => "Probability: 0.001-0.01",
            NoiseType::Poisson => "Scale: 0.1-1.0",
            NoiseType::Speckle => "Variance: 0.05-0.5",
            NoiseType::MotionBlur => "Kernel size: 3-21",
            NoiseType::Atmospheric => "Haze intensity: 0.1-1.0",
            NoiseType::Compression => "JPEG quality: 95-50",
            NoiseType::IsoNoise => "Sigma luma: 5-95, chroma: 2-29",
        }
    }

    /// Linear level law. Gaussian sigma is in 8-bit units before range
    /// scaling; iso_noise reports the luma sigma.
    pub fn parameter(self, level: u32) -> f64 {
        let step = level.saturating_sub(1) as f64;
        match self {
            NoiseType::Gaussian => 5.0 + 5.0 * step,
            NoiseType::SaltPepper => (0.001 + 0.001 * step).min(1.0),
            NoiseType::Poisson => 0.1 + 0.1 * step,
            NoiseType::Speckle => 0.05 + 0.05 * step,
            NoiseType::MotionBlur => 3.0 + 2.0 * step,
            NoiseType::Atmospheric => 0.1 + 0.1 * step,
            NoiseType::Compression => (95.0 - 5.0 * step).clamp(1.0, 100.0),
            NoiseType::IsoNoise => iso_sigmas(level).0,
        }
    }

    /// Degrade `image` at severity `level`, drawing randomness from `rng`
    pub fn apply<R: Rng + ?Sized>(
        self,
        image: &CanonicalImage,
        level: u32,
        rng: &mut R,
    ) -> NoiseResult<CanonicalImage> {
        let fail = |reason: String| NoiseError::ModelApplication {
            model: self.name().to_string(),
            level,
            reason,
        };

        if level == 0 {
            return Err(fail("levels start at 1".to_string()));
        }
        if image.data.is_empty() {
            return Err(fail(format!("empty image of shape {:?}", image.shape())));
        }

        let parameter = self.parameter(level);
        log::debug!("Applying {} level {} (parameter {:.4})", self, level, parameter);

        let result = match self {
            NoiseType::Gaussian => {
                let sigma = parameter as f32 * (image.range() / 255.0);
                sensor_noise::gaussian(image, sigma, rng)
            }
            NoiseType::SaltPepper => impulse::salt_pepper(image, parameter, rng),
            NoiseType::Poisson => sensor_noise::poisson(image, parameter, rng),
            NoiseType::Speckle => sensor_noise::speckle(image, parameter as f32, rng),
            NoiseType::MotionBlur => Ok(motion_blur::motion_blur(image, parameter as usize)),
            NoiseType::Atmospheric => atmospheric::haze(image, parameter as f32, rng),
            NoiseType::Compression => compression::jpeg_round_trip(image, parameter as u8),
            NoiseType::IsoNoise => {
                let (luma, chroma) = iso_sigmas(level);
                sensor_noise::iso_noise(image, luma as f32, chroma as f32, rng)
            }
        };

        let noisy = result.map_err(|fault| fail(fault.to_string()))?;
        if noisy.shape() != image.shape() {
            return Err(fail(format!(
                "shape changed from {:?} to {:?}",
                image.shape(),
                noisy.shape()
            )));
        }
        Ok(noisy)
    }
}

/// (luma sigma, chroma sigma) of the iso_noise law
pub fn iso_sigmas(level: u32) -> (f64, f64) {
    let step = level.saturating_sub(1) as f64;
    (5.0 + 10.0 * step, 2.0 + 3.0 * step)
}

impl fmt::Display for NoiseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown noise type '{0}' (expected one of: gaussian, salt_pepper, poisson, speckle, motion_blur, atmospheric, compression, iso_noise)")]
pub struct ParseNoiseTypeError(pub String);

impl FromStr for NoiseType {
    type Err = ParseNoiseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        NoiseType::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| ParseNoiseTypeError(wanted.to_string()))
    }
}

/// A noise type paired with a severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoiseSpec {
    pub noise_type: NoiseType,
    pub level: u32,
}

impl NoiseSpec {
    pub fn new(noise_type: NoiseType, level: u32) -> Self {
        Self { noise_type, level }
    }

    pub fn parameter(&self) -> f64 {
        self.noise_type.parameter(self.level)
    }

    pub fn apply<R: Rng + ?Sized>(&self, image: &CanonicalImage, rng: &mut R) -> NoiseResult<CanonicalImage> {
        self.noise_type.apply(image, self.level, rng)
    }
}

/// Failure inside a single model, before it is tagged with model and level
#[derive(Debug, thiserror::Error)]
pub enum ModelFault {
    #[error("invalid normal distribution: {0}")]
    Normal(#[from] rand_distr::NormalError),

    #[error("invalid poisson distribution: {0}")]
    Poisson(#[from] rand_distr::PoissonError),

    #[error("codec round trip failed: {0}")]
    Codec(#[from] image::ImageError),

    #[error("{0}")]
    Shape(#[from] ndarray::ShapeError),
}
