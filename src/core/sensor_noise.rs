//! Per-pixel sensor noise: read noise, shot noise, multiplicative noise and
//! high-gain luma/chroma noise.
//!
//! Every function returns a fresh image clipped to the source range; samples
//! are drawn band by band, row by row from the injected generator so a fixed
//! seed reproduces the output exactly.

use crate::core::noise_model::ModelFault;
use crate::types::{BandPlane, CanonicalImage, Sample};
use ndarray::{s, Array2, Zip};
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

/// BT.601 luma weights (red, green, blue)
const LUMA_R: Sample = 0.299;
const LUMA_G: Sample = 0.587;
const LUMA_B: Sample = 0.114;
/// Analog YUV chroma scale factors
const U_SCALE: Sample = 0.492;
const V_SCALE: Sample = 0.877;

/// Additive zero-mean normal noise, independent per pixel and band
pub fn gaussian<R: Rng + ?Sized>(
    image: &CanonicalImage,
    sigma: Sample,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let normal = Normal::new(0.0, sigma)?;
    let mut noisy = image.derive(image.data.clone());
    noisy.data.mapv_inplace(|v| v + normal.sample(rng));
    noisy.clip_to_range();
    Ok(noisy)
}

/// Shot noise: normalize to [0, 1], sample Poisson(value / scale), rescale.
///
/// A flat image (zero range) has nothing to normalize against and comes back
/// unchanged.
pub fn poisson<R: Rng + ?Sized>(
    image: &CanonicalImage,
    scale: f64,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let range = image.range() as f64;
    if range <= 0.0 {
        log::debug!("Poisson noise skipped: image has zero dynamic range");
        return Ok(image.clone());
    }

    let min = image.value_min as f64;
    let mut noisy = image.derive(image.data.clone());
    for v in noisy.data.iter_mut() {
        let normalized = ((*v as f64 - min) / range).max(0.0);
        let lambda = normalized / scale;
        let counts = if lambda > 0.0 {
            Poisson::new(lambda)?.sample(rng)
        } else {
            0.0
        };
        *v = (counts * scale * range + min) as Sample;
    }
    noisy.clip_to_range();
    Ok(noisy)
}

/// Multiplicative noise: pixel * (1 + N(0, sqrt(variance)))
pub fn speckle<R: Rng + ?Sized>(
    image: &CanonicalImage,
    variance: Sample,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let normal = Normal::new(0.0, variance.max(0.0).sqrt())?;
    let mut noisy = image.derive(image.data.clone());
    noisy.data.mapv_inplace(|v| v * (1.0 + normal.sample(rng)));
    noisy.clip_to_range();
    Ok(noisy)
}

/// High-ISO noise.
///
/// With at least three bands the first three (blue, green, red) go through
/// YUV, receive luma and chroma noise separately and come back; remaining
/// bands get luma-strength noise directly. Fewer bands get luma-strength
/// noise on every band.
pub fn iso_noise<R: Rng + ?Sized>(
    image: &CanonicalImage,
    sigma_luma: Sample,
    sigma_chroma: Sample,
    rng: &mut R,
) -> Result<CanonicalImage, ModelFault> {
    let luma_noise = Normal::new(0.0, sigma_luma)?;
    let chroma_noise = Normal::new(0.0, sigma_chroma)?;
    let mut noisy = image.derive(image.data.clone());
    let bands = image.bands();

    let direct_from = if bands >= 3 {
        let (mut y, mut u, mut v) = bgr_to_yuv(&noisy.data.slice(s![0..3, .., ..]).to_owned());
        y.mapv_inplace(|x| x + luma_noise.sample(rng));
        u.mapv_inplace(|x| x + chroma_noise.sample(rng));
        v.mapv_inplace(|x| x + chroma_noise.sample(rng));
        let (blue, green, red) = yuv_to_bgr(&y, &u, &v);
        noisy.data.slice_mut(s![0, .., ..]).assign(&blue);
        noisy.data.slice_mut(s![1, .., ..]).assign(&green);
        noisy.data.slice_mut(s![2, .., ..]).assign(&red);
        3
    } else {
        0
    };

    for band in direct_from..bands {
        noisy
            .data
            .slice_mut(s![band, .., ..])
            .mapv_inplace(|x| x + luma_noise.sample(rng));
    }

    noisy.clip_to_range();
    Ok(noisy)
}

/// Split a (3, H, W) blue/green/red cube into Y, U, V planes
fn bgr_to_yuv(bgr: &ndarray::Array3<Sample>) -> (BandPlane, BandPlane, BandPlane) {
    let (_, height, width) = bgr.dim();
    let mut y = Array2::zeros((height, width));
    let mut u = Array2::zeros((height, width));
    let mut v = Array2::zeros((height, width));

    Zip::from(&mut y)
        .and(&mut u)
        .and(&mut v)
        .and(bgr.slice(s![0, .., ..]))
        .and(bgr.slice(s![1, .., ..]))
        .and(bgr.slice(s![2, .., ..]))
        .for_each(|y, u, v, &b, &g, &r| {
            let luma = LUMA_R * r + LUMA_G * g + LUMA_B * b;
            *y = luma;
            *u = U_SCALE * (b - luma);
            *v = V_SCALE * (r - luma);
        });

    (y, u, v)
}

/// Exact inverse of `bgr_to_yuv`, returning (blue, green, red)
fn yuv_to_bgr(y: &BandPlane, u: &BandPlane, v: &BandPlane) -> (BandPlane, BandPlane, BandPlane) {
    let mut blue = Array2::zeros(y.dim());
    let mut green = Array2::zeros(y.dim());
    let mut red = Array2::zeros(y.dim());

    Zip::from(&mut blue)
        .and(&mut green)
        .and(&mut red)
        .and(y)
        .and(u)
        .and(v)
        .for_each(|b, g, r, &luma, &cu, &cv| {
            *b = luma + cu / U_SCALE;
            *r = luma + cv / V_SCALE;
            *g = (luma - LUMA_R * *r - LUMA_B * *b) / LUMA_G;
        });

    (blue, green, red)
}
