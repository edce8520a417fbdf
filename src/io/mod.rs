//! I/O modules for reading and writing multiband rasters

pub mod raster;
pub mod codec;
pub mod tiff_adapter;
pub mod image_adapter;
#[cfg(feature = "gdal")]
pub mod gdal_adapter;

pub use raster::{normalize_band_axis, BitDepth, QuantizedRaster};
pub use codec::{CodecAdapter, ImageCodec};
pub use tiff_adapter::TiffAdapter;
pub use image_adapter::RasterImageAdapter;
#[cfg(feature = "gdal")]
pub use gdal_adapter::GdalAdapter;
