use crate::core::noise_model::ModelFault;
use crate::io::raster::interleave;
use crate::types::{value_range, BandPlane, CanonicalImage, Sample};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};
use ndarray::{s, Array2, Array3, Axis};

/// JPEG compression artifacts at the given quality (1-100).
///
/// With three or more bands the first three are packed as one colour image
/// and round-tripped together; later bands pass through. With fewer bands
/// each band is round-tripped as a grayscale image. Samples are saturated to
/// the codec's 8-bit range first, and the result's range becomes the new
/// clip bound.
pub fn jpeg_round_trip(image: &CanonicalImage, quality: u8) -> Result<CanonicalImage, ModelFault> {
    let quality = quality.clamp(1, 100);
    let mut compressed = image.data.clone();

    if image.bands() >= 3 {
        let colour = to_u8(&image.data.slice(s![0..3, .., ..]).to_owned());
        let restored = round_trip_colour(&colour, quality)?;
        compressed.slice_mut(s![0..3, .., ..]).assign(&restored);
    } else {
        for (band, mut target) in compressed.axis_iter_mut(Axis(0)).enumerate() {
            let gray = to_u8(&image.data.slice(s![band..band + 1, .., ..]).to_owned());
            let restored = round_trip_gray(&gray, quality)?;
            target.assign(&restored);
        }
    }

    let (value_min, value_max) = value_range(&compressed);
    Ok(CanonicalImage {
        data: compressed,
        value_min,
        value_max,
        source_metadata: image.source_metadata.clone(),
    })
}

fn to_u8(cube: &Array3<Sample>) -> Array3<u8> {
    cube.mapv(|v| v.clamp(0.0, 255.0).round() as u8)
}

fn round_trip_colour(rgb: &Array3<u8>, quality: u8) -> Result<Array3<Sample>, ModelFault> {
    let (_, height, width) = rgb.dim();
    let bytes = encode(&interleave(rgb), width, height, ExtendedColorType::Rgb8, quality)?;
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?.to_rgb8();
    let samples: Vec<Sample> = decoded.into_raw().into_iter().map(Sample::from).collect();
    let interleaved = Array3::from_shape_vec((height, width, 3), samples)?;
    Ok(interleaved.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
}

fn round_trip_gray(gray: &Array3<u8>, quality: u8) -> Result<BandPlane, ModelFault> {
    let (_, height, width) = gray.dim();
    let plane: Vec<u8> = gray.iter().copied().collect();
    let bytes = encode(&plane, width, height, ExtendedColorType::L8, quality)?;
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?.to_luma8();
    let samples: Vec<Sample> = decoded.into_raw().into_iter().map(Sample::from).collect();
    Ok(Array2::from_shape_vec((height, width), samples)?)
}

fn encode(
    pixels: &[u8],
    width: usize,
    height: usize,
    color: ExtendedColorType,
    quality: u8,
) -> Result<Vec<u8>, ModelFault> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode(
        pixels,
        width as u32,
        height as u32,
        color,
    )?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(bands: usize) -> CanonicalImage {
        CanonicalImage::new(Array3::from_shape_fn((bands, 32, 32), |(b, i, j)| {
            ((i * 37 + j * 91 + b * 53) % 256) as Sample
        }))
    }

    #[test]
    fn test_extra_bands_pass_through() {
        let mut data = textured(5).data;
        data.slice_mut(s![3..5, .., ..]).fill(1234.0);
        let image = CanonicalImage::new(data);

        let compressed = jpeg_round_trip(&image, 60).unwrap();
        assert!(compressed.data.slice(s![3..5, .., ..]).iter().all(|&v| v == 1234.0));
        assert_eq!(compressed.value_max, 1234.0);
    }

    #[test]
    fn test_output_is_in_codec_range_for_few_bands() {
        let mut data = textured(2).data;
        data[[0, 0, 0]] = 4000.0;
        let compressed = jpeg_round_trip(&CanonicalImage::new(data), 80).unwrap();

        assert_eq!(compressed.shape(), (2, 32, 32));
        assert!(compressed.data.iter().all(|&v| (0.0..=255.0).contains(&v)));
        assert!(compressed.value_max <= 255.0);
    }

    #[test]
    fn test_lower_quality_loses_more() {
        let image = textured(3);
        let mse = |quality| {
            let out = jpeg_round_trip(&image, quality).unwrap();
            (&out.data - &image.data).mapv(|d| d * d).mean().unwrap()
        };
        assert!(mse(20) > mse(95));
    }
}
