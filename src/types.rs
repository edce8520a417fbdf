use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Working sample type for all processing
pub type Sample = f32;

/// 3D band-major pixel data (band x height x width)
pub type BandCube = Array3<Sample>;

/// 2D single-band plane (height x width)
pub type BandPlane = Array2<Sample>;

/// Largest trailing axis still treated as a band axis when normalizing rasters
pub const MAX_BAND_AXIS: usize = 10;

/// Geospatial transformation parameters (GDAL affine order)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            top_left_x: coeffs[0],
            pixel_width: coeffs[1],
            rotation_x: coeffs[2],
            top_left_y: coeffs[3],
            rotation_y: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Georeferencing carried from a source raster to its noisy outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub crs: Option<String>,                 // WKT
    pub geo_transform: Option<GeoTransform>,
    pub nodata: Option<f64>,
}

impl SourceMetadata {
    pub fn is_empty(&self) -> bool {
        self.crs.is_none() && self.geo_transform.is_none() && self.nodata.is_none()
    }
}

/// Canonical in-memory image: band-major cube plus its dynamic range.
///
/// `value_min`/`value_max` are the bounds noise models clip to and scale
/// their parameters against.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    pub data: BandCube,
    pub value_min: Sample,
    pub value_max: Sample,
    pub source_metadata: Option<SourceMetadata>,
}

impl CanonicalImage {
    /// Wrap a cube, recording its current min/max as the dynamic range
    pub fn new(data: BandCube) -> Self {
        let (value_min, value_max) = value_range(&data);
        Self {
            data,
            value_min,
            value_max,
            source_metadata: None,
        }
    }

    /// Single-band image from a 2D plane
    pub fn from_plane(plane: BandPlane) -> Self {
        Self::new(plane.insert_axis(Axis(0)))
    }

    pub fn with_metadata(mut self, metadata: Option<SourceMetadata>) -> Self {
        self.source_metadata = metadata.filter(|m| !m.is_empty());
        self
    }

    /// Same range and metadata, new pixel data
    pub fn derive(&self, data: BandCube) -> Self {
        Self {
            data,
            value_min: self.value_min,
            value_max: self.value_max,
            source_metadata: self.source_metadata.clone(),
        }
    }

    /// (bands, height, width)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn range(&self) -> Sample {
        self.value_max - self.value_min
    }

    /// Clip every sample to `[value_min, value_max]`
    pub fn clip_to_range(&mut self) {
        let (lo, hi) = (self.value_min, self.value_max);
        self.data.mapv_inplace(|v| v.clamp(lo, hi));
    }
}

/// Min and max over all finite samples; (0, 0) for an empty or all-NaN cube
pub fn value_range(data: &BandCube) -> (Sample, Sample) {
    let mut lo = Sample::INFINITY;
    let mut hi = Sample::NEG_INFINITY;
    for &v in data.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

/// Error types for noise synthesis
#[derive(Debug, thiserror::Error)]
pub enum NoiseError {
    #[error("unreadable image {}: {reason}", path.display())]
    UnreadableImage { path: PathBuf, reason: String },

    #[error("{model} level {level} failed: {reason}")]
    ModelApplication {
        model: String,
        level: u32,
        reason: String,
    },

    #[error("failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pipeline worker stopped: {0}")]
    Worker(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for noise synthesis operations
pub type NoiseResult<T> = Result<T, NoiseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_value_range_ignores_nan() {
        let cube = array![[[1.0, f32::NAN], [-3.0, 7.5]]];
        assert_eq!(value_range(&cube), (-3.0, 7.5));
    }

    #[test]
    fn test_clip_to_range() {
        let mut image = CanonicalImage::new(array![[[0.0, 10.0]]]);
        image.data[[0, 0, 0]] = -5.0;
        image.data[[0, 0, 1]] = 50.0;
        image.clip_to_range();
        assert_eq!(image.data, array![[[0.0, 10.0]]]);
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        let image = CanonicalImage::new(Array3::zeros((1, 2, 2)))
            .with_metadata(Some(SourceMetadata::default()));
        assert!(image.source_metadata.is_none());
    }

    #[test]
    fn test_geo_transform_gdal_order() {
        let coeffs = [500000.0, 0.05, 0.0, 4649776.0, 0.0, -0.05];
        assert_eq!(GeoTransform::from_gdal(coeffs).to_gdal(), coeffs);
    }
}
