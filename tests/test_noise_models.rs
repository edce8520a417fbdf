use approx::assert_abs_diff_eq;
use bandnoise::core::NoiseType;
use bandnoise::types::{CanonicalImage, NoiseError, Sample};
use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 5-band 16-bit field: flat 2000 with one dark and one bright pixel pinning the range to [0, 4000]
fn multispectral_field(size: usize) -> CanonicalImage {
    let mut data = Array3::from_elem((5, size, size), 2000.0 as Sample);
    data[[0, 0, 0]] = 0.0;
    data[[4, size - 1, size - 1]] = 4000.0;
    CanonicalImage::new(data)
}

fn textured(bands: usize, size: usize) -> CanonicalImage {
    CanonicalImage::new(Array3::from_shape_fn((bands, size, size), |(b, i, j)| {
        ((i * 29 + j * 13 + b * 71) % 250 + 3) as Sample
    }))
}

fn mse(a: &CanonicalImage, b: &CanonicalImage) -> f64 {
    let diff = &a.data - &b.data;
    diff.iter().map(|&d| (d as f64) * (d as f64)).sum::<f64>() / diff.len() as f64
}

#[test]
fn test_every_model_preserves_shape() {
    let image = textured(5, 24);
    let mut rng = StdRng::seed_from_u64(1);

    for noise_type in NoiseType::ALL {
        for level in [1, 5, 10] {
            let noisy = noise_type
                .apply(&image, level, &mut rng)
                .unwrap_or_else(|e| panic!("{} level {} failed: {}", noise_type, level, e));
            assert_eq!(noisy.shape(), image.shape(), "{} level {}", noise_type, level);
        }
    }
}

#[test]
fn test_models_stay_in_original_range() {
    let image = textured(5, 24);
    let mut rng = StdRng::seed_from_u64(2);

    for noise_type in NoiseType::ALL
        .into_iter()
        .filter(|&t| t != NoiseType::Compression)
    {
        let noisy = noise_type.apply(&image, 10, &mut rng).unwrap();
        for &v in noisy.data.iter() {
            assert!(
                v >= image.value_min && v <= image.value_max,
                "{} produced {} outside [{}, {}]",
                noise_type,
                v,
                image.value_min,
                image.value_max
            );
        }
    }
}

#[test]
fn test_constant_image_gaussian_is_unchanged() {
    // zero dynamic range means zero sigma
    let image = CanonicalImage::new(Array3::from_elem((5, 64, 64), 1000.0));
    let mut rng = StdRng::seed_from_u64(3);

    let noisy = NoiseType::Gaussian.apply(&image, 1, &mut rng).unwrap();
    assert_eq!(noisy.shape(), (5, 64, 64));
    assert!(noisy.data.iter().all(|&v| v == 1000.0));
}

#[test]
fn test_gaussian_sigma_scales_with_range() {
    let image = multispectral_field(64);
    let mut rng = StdRng::seed_from_u64(4);
    let noisy = NoiseType::Gaussian.apply(&image, 1, &mut rng).unwrap();

    let expected_sigma = 5.0 * 4000.0 / 255.0;
    for band in noisy.data.axis_iter(Axis(0)) {
        // leave out the two range-pinning pixels
        let values: Vec<f64> = band
            .iter()
            .map(|&v| v as f64)
            .filter(|v| (1000.0..3000.0).contains(v))
            .collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert_abs_diff_eq!(mean, 2000.0, epsilon = 10.0);
        assert_abs_diff_eq!(variance.sqrt(), expected_sigma, epsilon = expected_sigma * 0.1);
    }
}

#[test]
fn test_salt_pepper_level_ten_hits_every_band() {
    let image = multispectral_field(256);
    let mut rng = StdRng::seed_from_u64(5);
    let noisy = NoiseType::SaltPepper.apply(&image, 10, &mut rng).unwrap();

    let pixels = (256 * 256) as f64;
    let band = |b: usize| noisy.data.index_axis(Axis(0), b).to_owned();
    let first = band(1);

    let salt = first.iter().filter(|&&v| v == 4000.0).count() as f64;
    let pepper = first.iter().filter(|&&v| v == 0.0).count() as f64;
    assert!((0.003..0.007).contains(&(salt / pixels)), "salt fraction {}", salt / pixels);
    assert!((0.003..0.007).contains(&(pepper / pixels)), "pepper fraction {}", pepper / pixels);

    // defective pixels sit at the same coordinates in every band
    for b in [2, 3] {
        let other = band(b);
        for (a, o) in first.iter().zip(other.iter()) {
            assert_eq!(*a == 4000.0, *o == 4000.0);
            assert_eq!(*a == 0.0, *o == 0.0);
        }
    }
}

#[test]
fn test_severity_grows_with_level() {
    let image = textured(3, 48);
    for noise_type in [NoiseType::Gaussian, NoiseType::SaltPepper, NoiseType::Speckle] {
        let low = noise_type
            .apply(&image, 1, &mut StdRng::seed_from_u64(6))
            .unwrap();
        let high = noise_type
            .apply(&image, 10, &mut StdRng::seed_from_u64(6))
            .unwrap();
        assert!(
            mse(&high, &image) > mse(&low, &image),
            "{} is not more severe at level 10",
            noise_type
        );
    }
}

#[test]
fn test_compression_level_ten_loses_more_than_level_one() {
    let image = textured(3, 64);
    let mut rng = StdRng::seed_from_u64(7);

    let mild = NoiseType::Compression.apply(&image, 1, &mut rng).unwrap();
    let harsh = NoiseType::Compression.apply(&image, 10, &mut rng).unwrap();
    assert!(mse(&harsh, &image) > mse(&mild, &image));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let image = textured(5, 16);
    for noise_type in [NoiseType::Poisson, NoiseType::IsoNoise, NoiseType::Atmospheric] {
        let a = noise_type.apply(&image, 4, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = noise_type.apply(&image, 4, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.data, b.data, "{}", noise_type);
    }
}

#[test]
fn test_level_zero_is_rejected() {
    let image = textured(1, 8);
    let err = NoiseType::Speckle
        .apply(&image, 0, &mut StdRng::seed_from_u64(9))
        .unwrap_err();
    assert!(matches!(err, NoiseError::ModelApplication { level: 0, .. }));
}
