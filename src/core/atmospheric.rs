use crate::core::noise_model::ModelFault;
use crate::types::{CanonicalImage, Sample};
use ndarray::{Array2, Axis, Zip};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Mean and spread of the per-pixel transmission mask
const HAZE_MEAN: Sample = 0.8;
const HAZE_STD: Sample = 0.1;
const HAZE_MIN: Sample = 0.5;
const HAZE_MAX: Sample = 1.0;

/// Haze: attenuate each pixel by a random transmission `t` and add airlight.
///
/// `out = pixel * t + value_max * (1 - t) * haze_intensity`, with
/// `t ~ N(0.8, 0.1)` clipped to [0.5, 1.0]. The same mask is used for every
/// band.
pub fn haze<R: Rng + ?Sized>(
    image: &CanonicalImage,
    haze_intensity: Sample,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let (_, height, width) = image.shape();
    let normal = Normal::new(HAZE_MEAN, HAZE_STD)?;
    let transmission = Array2::from_shape_fn((height, width), |_| {
        normal.sample(rng).clamp(HAZE_MIN, HAZE_MAX)
    });

    let airlight = image.value_max * haze_intensity;
    let mut hazy = image.derive(image.data.clone());
    for mut band in hazy.data.axis_iter_mut(Axis(0)) {
        Zip::from(&mut band)
            .and(&transmission)
            .for_each(|v, &t| *v = *v * t + airlight * (1.0 - t));
    }

    hazy.clip_to_range();
    Ok(hazy)
}
