use crate::types::{value_range, BandCube, Sample, MAX_BAND_AXIS};
use ndarray::{Array3, ArrayD, Axis, ErrorKind, Ix2, Ix3, ShapeError};
use std::path::Path;

/// Normalize a freshly decoded raster to (band, height, width).
///
/// A trailing axis of size <= `MAX_BAND_AXIS` is a band axis and is moved to
/// the front; a 2D raster gains an implicit single band. Larger trailing axes
/// are taken to be band-major already.
pub fn normalize_band_axis(raw: ArrayD<Sample>) -> Result<BandCube, ShapeError> {
    match raw.ndim() {
        2 => Ok(raw.into_dimensionality::<Ix2>()?.insert_axis(Axis(0))),
        3 => {
            let cube = raw.into_dimensionality::<Ix3>()?;
            if cube.len_of(Axis(2)) <= MAX_BAND_AXIS {
                Ok(cube.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
            } else {
                Ok(cube)
            }
        }
        _ => Err(ShapeError::from_kind(ErrorKind::IncompatibleShape)),
    }
}

/// Build a canonical cube from pixel-interleaved samples (height x width x channels)
pub fn interleaved_to_cube(
    samples: Vec<Sample>,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<BandCube, ShapeError> {
    let raw = if channels == 1 {
        ArrayD::from_shape_vec(vec![height, width], samples)?
    } else {
        ArrayD::from_shape_vec(vec![height, width, channels], samples)?
    };
    normalize_band_axis(raw)
}

/// Pixel-interleave a band-major cube (height x width x band order)
pub fn interleave<T: Copy>(cube: &Array3<T>) -> Vec<T> {
    cube.view().permuted_axes([1, 2, 0]).iter().copied().collect()
}

/// Output sample depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    /// 8-bit when every sample fits in 0..=255, 16-bit otherwise
    pub fn infer(data: &BandCube) -> Self {
        let (_, max) = value_range(data);
        if max <= 255.0 {
            BitDepth::Eight
        } else {
            BitDepth::Sixteen
        }
    }

    pub fn max_value(self) -> Sample {
        match self {
            BitDepth::Eight => u8::MAX as Sample,
            BitDepth::Sixteen => u16::MAX as Sample,
        }
    }
}

/// Integer raster ready for serialization, still band-major
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizedRaster {
    Eight(Array3<u8>),
    Sixteen(Array3<u16>),
}

impl QuantizedRaster {
    /// Clip, round and narrow to the inferred bit depth
    pub fn from_cube(data: &BandCube) -> Self {
        let depth = BitDepth::infer(data);
        let max = depth.max_value();
        match depth {
            BitDepth::Eight => {
                QuantizedRaster::Eight(data.mapv(|v| v.clamp(0.0, max).round() as u8))
            }
            BitDepth::Sixteen => {
                QuantizedRaster::Sixteen(data.mapv(|v| v.clamp(0.0, max).round() as u16))
            }
        }
    }

    pub fn bit_depth(&self) -> BitDepth {
        match self {
            QuantizedRaster::Eight(_) => BitDepth::Eight,
            QuantizedRaster::Sixteen(_) => BitDepth::Sixteen,
        }
    }

    /// (bands, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            QuantizedRaster::Eight(cube) => cube.dim(),
            QuantizedRaster::Sixteen(cube) => cube.dim(),
        }
    }
}

/// Lower-cased file extension
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn has_extension(path: &Path, accepted: &[&str]) -> bool {
    extension_of(path).map_or(false, |ext| accepted.contains(&ext.as_str()))
}
