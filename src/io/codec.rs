use crate::io::image_adapter::RasterImageAdapter;
use crate::io::raster::QuantizedRaster;
use crate::io::tiff_adapter::TiffAdapter;
use crate::types::{CanonicalImage, NoiseError, NoiseResult, SourceMetadata};
use std::path::Path;

/// One raster backend.
///
/// Capability checks are cheap, extension-based and decided without touching
/// the file; `load`/`save` may still fail on content.
pub trait CodecAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_load(&self, path: &Path) -> bool;

    fn can_save(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> NoiseResult<CanonicalImage>;

    fn save(
        &self,
        raster: &QuantizedRaster,
        path: &Path,
        metadata: Option<&SourceMetadata>,
    ) -> NoiseResult<()>;

    /// Georeferencing of `path`; `Ok(None)` when the backend finds none or
    /// cannot represent it
    fn read_metadata(&self, _path: &Path) -> NoiseResult<Option<SourceMetadata>> {
        Ok(None)
    }
}

/// Ordered list of raster backends, richest metadata first
pub struct ImageCodec {
    adapters: Vec<Box<dyn CodecAdapter>>,
}

impl ImageCodec {
    /// Every backend compiled into this build, in preference order
    pub fn new() -> Self {
        Self::with_jpeg_quality(RasterImageAdapter::DEFAULT_JPEG_QUALITY)
    }

    pub fn with_jpeg_quality(quality: u8) -> Self {
        let mut adapters: Vec<Box<dyn CodecAdapter>> = Vec::new();
        #[cfg(feature = "gdal")]
        adapters.push(Box::new(crate::io::gdal_adapter::GdalAdapter));
        adapters.push(Box::new(TiffAdapter));
        adapters.push(Box::new(RasterImageAdapter::new(quality)));
        Self::with_adapters(adapters)
    }

    pub fn with_adapters(adapters: Vec<Box<dyn CodecAdapter>>) -> Self {
        log::debug!(
            "Codec adapters: {:?}",
            adapters.iter().map(|a| a.name()).collect::<Vec<_>>()
        );
        Self { adapters }
    }

    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// True when some adapter claims the file
    pub fn recognizes<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        self.adapters.iter().any(|a| a.can_load(path))
    }

    /// Load `path` with the first adapter that succeeds
    pub fn load<P: AsRef<Path>>(&self, path: P) -> NoiseResult<CanonicalImage> {
        let path = path.as_ref();
        let mut failures = Vec::new();

        for adapter in self.adapters.iter().filter(|a| a.can_load(path)) {
            match adapter.load(path) {
                Ok(image) => {
                    log::debug!(
                        "Loaded {} with {}: shape {:?}, range [{}, {}]",
                        path.display(),
                        adapter.name(),
                        image.shape(),
                        image.value_min,
                        image.value_max
                    );
                    return Ok(image);
                }
                Err(e) => {
                    log::debug!("{} could not load {}: {}", adapter.name(), path.display(), e);
                    failures.push(format!("{}: {}", adapter.name(), e));
                }
            }
        }

        let reason = if failures.is_empty() {
            "no codec adapter accepts this file type".to_string()
        } else {
            failures.join("; ")
        };
        Err(NoiseError::UnreadableImage {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Georeferencing of `path` from the first adapter that has any.
    ///
    /// `Ok(None)` means no adapter found metadata; an error means at least
    /// one adapter failed and none succeeded.
    pub fn read_metadata<P: AsRef<Path>>(&self, path: P) -> NoiseResult<Option<SourceMetadata>> {
        let path = path.as_ref();
        let mut first_error = None;

        for adapter in self.adapters.iter().filter(|a| a.can_load(path)) {
            match adapter.read_metadata(path) {
                Ok(Some(metadata)) => return Ok(Some(metadata)),
                Ok(None) => {}
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Serialize `image` to `path`.
    ///
    /// Bit depth follows the pixel range. Georeferencing is copied from
    /// `reference` when it has any, else taken from the image itself.
    pub fn save<P: AsRef<Path>>(
        &self,
        image: &CanonicalImage,
        path: P,
        reference: Option<&Path>,
    ) -> NoiseResult<()> {
        let path = path.as_ref();
        let raster = QuantizedRaster::from_cube(&image.data);
        let metadata = self.output_metadata(image, reference);

        let mut failures = Vec::new();
        for adapter in self.adapters.iter().filter(|a| a.can_save(path)) {
            match adapter.save(&raster, path, metadata.as_ref()) {
                Ok(()) => {
                    if !path.exists() {
                        return Err(NoiseError::WriteFailure {
                            path: path.to_path_buf(),
                            reason: format!("{} reported success but no file exists", adapter.name()),
                        });
                    }
                    log::debug!(
                        "Saved {} with {} ({:?}, {} bands)",
                        path.display(),
                        adapter.name(),
                        raster.bit_depth(),
                        raster.dim().0
                    );
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("{} could not save {}: {}", adapter.name(), path.display(), e);
                    failures.push(format!("{}: {}", adapter.name(), e));
                }
            }
        }

        let reason = if failures.is_empty() {
            "no codec adapter can write this file type".to_string()
        } else {
            failures.join("; ")
        };
        Err(NoiseError::WriteFailure {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn output_metadata(
        &self,
        image: &CanonicalImage,
        reference: Option<&Path>,
    ) -> Option<SourceMetadata> {
        if let Some(reference) = reference {
            match self.read_metadata(reference) {
                Ok(Some(metadata)) => return Some(metadata),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Could not copy georeferencing from {}: {}",
                    reference.display(),
                    e
                ),
            }
        }
        image.source_metadata.clone()
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}
