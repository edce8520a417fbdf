use crate::io::codec::CodecAdapter;
use crate::io::raster::{has_extension, interleave, interleaved_to_cube, QuantizedRaster};
use crate::types::{BandCube, CanonicalImage, NoiseError, NoiseResult, Sample, SourceMetadata};
use ndarray::{s, Array2, Array3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder, TiffValue};
use tiff::tags::{PhotometricInterpretation, SampleFormat, Tag};
use tiff::ColorType;

const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// PlanarConfiguration value for band-sequential sample planes
const PLANAR_SEPARATE: u16 = 2;

/// Pure-Rust TIFF backend.
///
/// Reads chunky and planar multi-sample images as well as stacks of
/// same-sized single-band pages. Writes a single image with one sample per
/// band. No georeferencing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffAdapter;

/// One decoded page: interleaved samples plus geometry
struct Page {
    samples: Vec<Sample>,
    width: usize,
    height: usize,
    channels: usize,
}

/// Unsigned BlackIsZero colour types with `N` samples per pixel
macro_rules! multiband_color_types {
    ($($eight:ident, $sixteen:ident, $count:literal;)*) => {
        $(
            struct $eight;

            impl colortype::ColorType for $eight {
                type Inner = u8;
                const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
                const BITS_PER_SAMPLE: &'static [u16] = &[8; $count];
                const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint; $count];

                // only called when a predictor is enabled, which this backend never does
                fn horizontal_predict(_: &[Self::Inner], _: &mut Vec<Self::Inner>) {
                    unreachable!()
                }
            }

            struct $sixteen;

            impl colortype::ColorType for $sixteen {
                type Inner = u16;
                const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
                const BITS_PER_SAMPLE: &'static [u16] = &[16; $count];
                const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint; $count];

                // only called when a predictor is enabled, which this backend never does
                fn horizontal_predict(_: &[Self::Inner], _: &mut Vec<Self::Inner>) {
                    unreachable!()
                }
            }
        )*

        fn write_eight<W: Write + Seek>(
            encoder: &mut TiffEncoder<W>,
            width: u32,
            height: u32,
            bands: usize,
            data: &[u8],
        ) -> Result<(), String> {
            match bands {
                $($count => write_chunky::<W, $eight>(encoder, width, height, bands, data),)*
                _ => Err(format!("{} bands exceed the TIFF backend's sample limit", bands)),
            }
        }

        fn write_sixteen<W: Write + Seek>(
            encoder: &mut TiffEncoder<W>,
            width: u32,
            height: u32,
            bands: usize,
            data: &[u16],
        ) -> Result<(), String> {
            match bands {
                $($count => write_chunky::<W, $sixteen>(encoder, width, height, bands, data),)*
                _ => Err(format!("{} bands exceed the TIFF backend's sample limit", bands)),
            }
        }
    };
}

multiband_color_types! {
    Bands1x8, Bands1x16, 1;
    Bands2x8, Bands2x16, 2;
    Bands3x8, Bands3x16, 3;
    Bands4x8, Bands4x16, 4;
    Bands5x8, Bands5x16, 5;
    Bands6x8, Bands6x16, 6;
    Bands7x8, Bands7x16, 7;
    Bands8x8, Bands8x16, 8;
    Bands9x8, Bands9x16, 9;
    Bands10x8, Bands10x16, 10;
}

/// One image directory holding every band as a pixel-interleaved sample
fn write_chunky<W: Write + Seek, C: colortype::ColorType>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    bands: usize,
    data: &[C::Inner],
) -> Result<(), String>
where
    [C::Inner]: TiffValue,
{
    let mut image = encoder
        .new_image::<C>(width, height)
        .map_err(|e| e.to_string())?;
    if bands > 1 {
        // every sample past the first is an unspecified extra band, not alpha
        let extra = vec![0u16; bands - 1];
        image
            .encoder()
            .write_tag(Tag::ExtraSamples, &extra[..])
            .map_err(|e| e.to_string())?;
    }
    image.write_data(data).map_err(|e| e.to_string())
}

fn decoded_samples(result: DecodingResult) -> Result<Vec<Sample>, String> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(Sample::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(Sample::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as Sample).collect(),
        DecodingResult::I8(v) => v.into_iter().map(Sample::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(Sample::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as Sample).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as Sample).collect(),
        _ => return Err("unsupported TIFF sample format".to_string()),
    })
}

impl TiffAdapter {
    fn read_pages(path: &Path) -> Result<BandCube, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| e.to_string())?
            .with_limits(Limits::unlimited());

        let channels = Self::channels(&mut decoder)?;
        if channels > 1 && Self::planar_config(&mut decoder)? == PLANAR_SEPARATE {
            return Self::read_planar(&mut decoder, channels);
        }

        let first = Self::read_page(&mut decoder)?;
        if first.channels > 1 || !decoder.more_images() {
            return interleaved_to_cube(first.samples, first.height, first.width, first.channels)
                .map_err(|e| e.to_string());
        }

        // Page stack: every further page is one more band
        let mut planes = vec![first];
        while decoder.more_images() {
            decoder.next_image().map_err(|e| e.to_string())?;
            let page = Self::read_page(&mut decoder)?;
            if page.channels != 1 || page.width != planes[0].width || page.height != planes[0].height {
                log::debug!(
                    "Stopping at page {} of {}: not a matching single-band plane",
                    planes.len() + 1,
                    path.display()
                );
                break;
            }
            planes.push(page);
        }

        let (height, width) = (planes[0].height, planes[0].width);
        let mut cube = Array3::<Sample>::zeros((planes.len(), height, width));
        for (band, page) in planes.into_iter().enumerate() {
            let plane = Array2::from_shape_vec((height, width), page.samples)
                .map_err(|e| e.to_string())?;
            cube.slice_mut(s![band, .., ..]).assign(&plane);
        }
        Ok(cube)
    }

    fn channels<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize, String> {
        Ok(match decoder.colortype().map_err(|e| e.to_string())? {
            ColorType::Gray(_) => 1,
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) | ColorType::YCbCr(_) => 3,
            ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
            ColorType::Multiband { num_samples, .. } => num_samples as usize,
            other => return Err(format!("unsupported TIFF color type {:?}", other)),
        })
    }

    fn planar_config<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<u16, String> {
        let value = decoder
            .find_tag(Tag::PlanarConfiguration)
            .map_err(|e| e.to_string())?;
        match value {
            Some(value) => value.into_u16().map_err(|e| e.to_string()),
            None => Ok(1),
        }
    }

    fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Page, String> {
        let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
        let channels = Self::channels(decoder)?;
        let samples = decoded_samples(decoder.read_image().map_err(|e| e.to_string())?)?;

        Ok(Page {
            samples,
            width: width as usize,
            height: height as usize,
            channels,
        })
    }

    /// Band-sequential layout: strips of the first band, then of the second, and so on
    fn read_planar<R: Read + Seek>(decoder: &mut Decoder<R>, bands: usize) -> Result<BandCube, String> {
        let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
        if decoder
            .find_tag(Tag::TileWidth)
            .map_err(|e| e.to_string())?
            .is_some()
        {
            return Err("tiled planar TIFF is not supported".to_string());
        }

        let rows_per_strip = match decoder.find_tag(Tag::RowsPerStrip).map_err(|e| e.to_string())? {
            Some(value) => value.into_u32().map_err(|e| e.to_string())?.clamp(1, height.max(1)),
            None => height.max(1),
        };
        let strips_per_band = (height + rows_per_strip - 1) / rows_per_strip;

        let (width, height) = (width as usize, height as usize);
        let mut samples = Vec::with_capacity(bands * height * width);
        for chunk in 0..strips_per_band * bands as u32 {
            let strip = decoder.read_chunk(chunk).map_err(|e| e.to_string())?;
            samples.extend(decoded_samples(strip)?);
        }
        if samples.len() != bands * height * width {
            return Err(format!(
                "planar TIFF holds {} samples, expected {} bands of {}x{}",
                samples.len(),
                bands,
                width,
                height
            ));
        }

        log::debug!("Read planar TIFF: {} bands of {}x{}", bands, width, height);
        Array3::from_shape_vec((bands, height, width), samples).map_err(|e| e.to_string())
    }

    fn write_image(raster: &QuantizedRaster, path: &Path) -> Result<(), String> {
        let (bands, height, width) = raster.dim();
        let file = File::create(path).map_err(|e| e.to_string())?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(|e| e.to_string())?;

        match raster {
            QuantizedRaster::Eight(cube) => {
                write_eight(&mut encoder, width as u32, height as u32, bands, &interleave(cube))
            }
            QuantizedRaster::Sixteen(cube) => {
                write_sixteen(&mut encoder, width as u32, height as u32, bands, &interleave(cube))
            }
        }
    }
}

impl CodecAdapter for TiffAdapter {
    fn name(&self) -> &'static str {
        "tiff"
    }

    fn can_load(&self, path: &Path) -> bool {
        has_extension(path, TIFF_EXTENSIONS)
    }

    fn can_save(&self, path: &Path) -> bool {
        has_extension(path, TIFF_EXTENSIONS)
    }

    fn load(&self, path: &Path) -> NoiseResult<CanonicalImage> {
        let cube = Self::read_pages(path).map_err(|reason| NoiseError::UnreadableImage {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(CanonicalImage::new(cube))
    }

    fn save(
        &self,
        raster: &QuantizedRaster,
        path: &Path,
        metadata: Option<&SourceMetadata>,
    ) -> NoiseResult<()> {
        if metadata.is_some() {
            log::debug!("TIFF backend drops georeferencing for {}", path.display());
        }
        Self::write_image(raster, path).map_err(|reason| NoiseError::WriteFailure {
            path: path.to_path_buf(),
            reason,
        })
    }
}
