use crate::io::codec::CodecAdapter;
use crate::io::raster::{extension_of, has_extension, interleave, interleaved_to_cube, QuantizedRaster};
use crate::types::{CanonicalImage, NoiseError, NoiseResult, Sample, SourceMetadata};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const LOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];
const SAVE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Common raster formats through the `image` crate (1-4 channels, 8/16 bit)
#[derive(Debug, Clone, Copy)]
pub struct RasterImageAdapter {
    jpeg_quality: u8,
}

impl RasterImageAdapter {
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn to_dynamic(raster: &QuantizedRaster) -> Result<DynamicImage, String> {
        let (bands, height, width) = raster.dim();
        let (w, h) = (width as u32, height as u32);
        let layout_error = || format!("{} bands cannot be stored in a raster image", bands);

        let image = match raster {
            QuantizedRaster::Eight(cube) => {
                let pixels = interleave(cube);
                match bands {
                    1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
                    2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageLumaA8),
                    3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
                    4 => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
                    _ => return Err(layout_error()),
                }
            }
            QuantizedRaster::Sixteen(cube) => {
                let pixels = interleave(cube);
                match bands {
                    1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageLuma16),
                    2 => ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageLumaA16),
                    3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgb16),
                    4 => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgba16),
                    _ => return Err(layout_error()),
                }
            }
        };
        image.ok_or_else(|| "pixel buffer does not match image dimensions".to_string())
    }

    /// Narrow to what baseline JPEG holds: 8-bit gray or 8-bit RGB.
    ///
    /// Alpha is dropped and 16-bit samples are rescaled to 8 bit.
    fn jpeg_compatible(image: DynamicImage) -> DynamicImage {
        match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            other => {
                log::debug!("Narrowing {:?} to 8-bit for JPEG output", other.color());
                if other.color().has_color() {
                    DynamicImage::ImageRgb8(other.to_rgb8())
                } else {
                    DynamicImage::ImageLuma8(other.to_luma8())
                }
            }
        }
    }
}

impl Default for RasterImageAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_JPEG_QUALITY)
    }
}

/// Split a decoded image into interleaved samples and a channel count
fn decoded_samples(image: DynamicImage) -> (Vec<Sample>, usize) {
    fn widen<T: Copy + Into<Sample>>(raw: Vec<T>) -> Vec<Sample> {
        raw.into_iter().map(Into::into).collect()
    }

    match image {
        DynamicImage::ImageLuma8(b) => (widen(b.into_raw()), 1),
        DynamicImage::ImageLumaA8(b) => (widen(b.into_raw()), 2),
        DynamicImage::ImageRgb8(b) => (widen(b.into_raw()), 3),
        DynamicImage::ImageRgba8(b) => (widen(b.into_raw()), 4),
        DynamicImage::ImageLuma16(b) => (widen(b.into_raw()), 1),
        DynamicImage::ImageLumaA16(b) => (widen(b.into_raw()), 2),
        DynamicImage::ImageRgb16(b) => (widen(b.into_raw()), 3),
        DynamicImage::ImageRgba16(b) => (widen(b.into_raw()), 4),
        DynamicImage::ImageRgb32F(b) => (b.into_raw(), 3),
        other => (other.to_rgba32f().into_raw(), 4),
    }
}

impl CodecAdapter for RasterImageAdapter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn can_load(&self, path: &Path) -> bool {
        has_extension(path, LOAD_EXTENSIONS)
    }

    fn can_save(&self, path: &Path) -> bool {
        has_extension(path, SAVE_EXTENSIONS)
    }

    fn load(&self, path: &Path) -> NoiseResult<CanonicalImage> {
        let unreadable = |reason: String| NoiseError::UnreadableImage {
            path: path.to_path_buf(),
            reason,
        };

        let decoded = image::open(path).map_err(|e| unreadable(e.to_string()))?;
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);
        let (samples, channels) = decoded_samples(decoded);
        let cube = interleaved_to_cube(samples, height, width, channels)
            .map_err(|e| unreadable(e.to_string()))?;
        Ok(CanonicalImage::new(cube))
    }

    fn save(
        &self,
        raster: &QuantizedRaster,
        path: &Path,
        _metadata: Option<&SourceMetadata>,
    ) -> NoiseResult<()> {
        let write_failure = |reason: String| NoiseError::WriteFailure {
            path: path.to_path_buf(),
            reason,
        };

        let image = Self::to_dynamic(raster).map_err(write_failure)?;

        match extension_of(path).as_deref() {
            Some("jpg") | Some("jpeg") => {
                let output = File::create(path)?;
                let encoder = JpegEncoder::new_with_quality(BufWriter::new(output), self.jpeg_quality);
                Self::jpeg_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| write_failure(e.to_string()))?;
            }
            _ => {
                image.save(path).map_err(|e| write_failure(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_rgb_png_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let cube = Array3::from_shape_fn((3, 5, 4), |(b, i, j)| (b * 60 + i * 8 + j) as f32);
        let adapter = RasterImageAdapter::default();

        adapter.save(&QuantizedRaster::from_cube(&cube), &path, None).unwrap();
        let loaded = adapter.load(&path).unwrap();

        assert_eq!(loaded.data, cube);
    }

    #[test]
    fn test_sixteen_bit_gray_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray16.png");
        let cube = Array3::from_shape_fn((1, 4, 4), |(_, i, j)| (i * 4000 + j * 3) as f32);
        let adapter = RasterImageAdapter::default();

        adapter.save(&QuantizedRaster::from_cube(&cube), &path, None).unwrap();
        let loaded = adapter.load(&path).unwrap();

        assert_eq!(loaded.data, cube);
    }

    #[test]
    fn test_jpeg_round_trip_within_quantization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smooth.jpg");
        let cube = Array3::from_shape_fn((3, 16, 16), |(b, i, j)| (60 + b * 40 + i * 2 + j) as f32);
        let adapter = RasterImageAdapter::new(100);

        adapter.save(&QuantizedRaster::from_cube(&cube), &path, None).unwrap();
        let loaded = adapter.load(&path).unwrap();

        assert_eq!(loaded.shape(), (3, 16, 16));
        let worst = (&loaded.data - &cube).iter().fold(0.0f32, |m, d| m.max(d.abs()));
        assert!(worst <= 8.0, "max abs error {}", worst);
    }

    #[test]
    fn test_jpeg_accepts_sixteen_bit_and_alpha_rasters() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = RasterImageAdapter::default();
        let cases = [
            ("gray16.jpg", Array3::from_elem((1, 8, 8), 257.0 * 200.0), 1),
            ("rgb16.jpg", Array3::from_elem((3, 8, 8), 257.0 * 120.0), 3),
            ("rgba8.jpg", Array3::from_elem((4, 8, 8), 90.0), 3),
            ("graya8.jpg", Array3::from_elem((2, 8, 8), 40.0), 1),
        ];

        for (name, cube, bands) in cases {
            let path = dir.path().join(name);
            adapter
                .save(&QuantizedRaster::from_cube(&cube), &path, None)
                .unwrap_or_else(|e| panic!("{}: {}", name, e));
            let loaded = adapter.load(&path).unwrap();
            assert_eq!(loaded.bands(), bands, "{}", name);
        }

        // 16-bit samples are rescaled, not saturated
        let loaded = adapter.load(&dir.path().join("gray16.jpg")).unwrap();
        assert!(loaded.data.iter().all(|&v| (v - 200.0).abs() <= 2.0));
    }

    #[test]
    fn test_five_bands_do_not_fit_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("five.png");
        let cube = Array3::<f32>::zeros((5, 2, 2));
        let result = RasterImageAdapter::default().save(&QuantizedRaster::from_cube(&cube), &path, None);
        assert!(matches!(result, Err(NoiseError::WriteFailure { .. })));
    }
}
