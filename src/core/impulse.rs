use crate::core::noise_model::ModelFault;
use crate::types::CanonicalImage;
use ndarray::{Array2, Axis, Zip};
use rand::Rng;

/// Salt-and-pepper noise with probability `probability`.
///
/// One salt mask and one pepper mask, each hitting about `probability / 2`
/// of the pixels, are drawn over (height, width) and applied to every band,
/// so a defective pixel is defective in all bands. Pepper wins where both
/// masks hit.
pub fn salt_pepper<R: Rng + ?Sized>(
    image: &CanonicalImage,
    probability: f64,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let (_, height, width) = image.shape();
    let threshold = probability.clamp(0.0, 1.0) / 2.0;

    let salt = Array2::from_shape_fn((height, width), |_| rng.gen::<f64>() < threshold);
    let pepper = Array2::from_shape_fn((height, width), |_| rng.gen::<f64>() < threshold);

    let mut noisy = image.derive(image.data.clone());
    let (low, high) = (image.value_min, image.value_max);
    for mut band in noisy.data.axis_iter_mut(Axis(0)) {
        Zip::from(&mut band)
            .and(&salt)
            .and(&pepper)
            .for_each(|v, &is_salt, &is_pepper| {
                if is_pepper {
                    *v = low;
                } else if is_salt {
                    *v = high;
                }
            });
    }

    log::debug!(
        "Salt-and-pepper: {} salt, {} pepper pixels per band",
        salt.iter().filter(|&&hit| hit).count(),
        pepper.iter().filter(|&&hit| hit).count()
    );
    Ok(noisy)
}
