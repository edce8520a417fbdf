use crate::io::codec::CodecAdapter;
use crate::io::raster::{has_extension, QuantizedRaster};
use crate::types::{CanonicalImage, GeoTransform, NoiseResult, Sample, SourceMetadata};
use gdal::raster::{Buffer, GdalType, RasterCreationOption};
use gdal::{Dataset, DriverManager};
use ndarray::{s, Array2, Array3};
use std::path::Path;

const GEOTIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// GeoTIFF backend through GDAL; the only one that carries georeferencing
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalAdapter;

impl GdalAdapter {
    fn dataset_metadata(dataset: &Dataset) -> NoiseResult<SourceMetadata> {
        let projection = dataset.projection();
        let crs = if projection.trim().is_empty() {
            None
        } else {
            Some(projection)
        };
        let geo_transform = dataset.geo_transform().ok().map(GeoTransform::from_gdal);
        let nodata = if dataset.raster_count() > 0 {
            dataset.rasterband(1)?.no_data_value()
        } else {
            None
        };

        Ok(SourceMetadata {
            crs,
            geo_transform,
            nodata,
        })
    }

    fn write_bands<T: GdalType + Copy>(
        cube: &Array3<T>,
        path: &Path,
        metadata: Option<&SourceMetadata>,
    ) -> NoiseResult<()> {
        let (bands, height, width) = cube.dim();
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let options = [
            RasterCreationOption { key: "COMPRESS", value: "LZW" },
            RasterCreationOption { key: "INTERLEAVE", value: "BAND" },
        ];

        let mut dataset = driver.create_with_band_type_with_options::<T, _>(
            path,
            width as isize,
            height as isize,
            bands as isize,
            &options,
        )?;

        if let Some(metadata) = metadata {
            if let Some(transform) = &metadata.geo_transform {
                dataset.set_geo_transform(&transform.to_gdal())?;
            }
            if let Some(crs) = &metadata.crs {
                dataset.set_projection(crs)?;
            }
        }

        for (index, band) in cube.outer_iter().enumerate() {
            let mut rasterband = dataset.rasterband(index as isize + 1)?;
            let flat_data: Vec<T> = band.iter().copied().collect();
            let buffer = Buffer::new((width, height), flat_data);
            rasterband.write((0, 0), (width, height), &buffer)?;

            if let Some(nodata) = metadata.and_then(|m| m.nodata) {
                rasterband.set_no_data_value(Some(nodata))?;
            }
        }

        Ok(())
    }
}

impl CodecAdapter for GdalAdapter {
    fn name(&self) -> &'static str {
        "gdal"
    }

    fn can_load(&self, path: &Path) -> bool {
        has_extension(path, GEOTIFF_EXTENSIONS)
    }

    fn can_save(&self, path: &Path) -> bool {
        has_extension(path, GEOTIFF_EXTENSIONS)
    }

    fn load(&self, path: &Path) -> NoiseResult<CanonicalImage> {
        let dataset = Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let count = dataset.raster_count();
        log::debug!("GDAL raster {}: {}x{}, {} bands", path.display(), width, height, count);

        let mut cube = Array3::<Sample>::zeros((count as usize, height, width));
        for index in 1..=count {
            let rasterband = dataset.rasterband(index)?;
            let band_data =
                rasterband.read_as::<Sample>((0, 0), (width, height), (width, height), None)?;
            let plane = Array2::from_shape_vec((height, width), band_data.data).map_err(|e| {
                crate::types::NoiseError::UnreadableImage {
                    path: path.to_path_buf(),
                    reason: format!("band {} has unexpected size: {}", index, e),
                }
            })?;
            cube.slice_mut(s![index as usize - 1, .., ..]).assign(&plane);
        }

        let metadata = Self::dataset_metadata(&dataset)?;
        Ok(CanonicalImage::new(cube).with_metadata(Some(metadata)))
    }

    fn save(
        &self,
        raster: &QuantizedRaster,
        path: &Path,
        metadata: Option<&SourceMetadata>,
    ) -> NoiseResult<()> {
        match raster {
            QuantizedRaster::Eight(cube) => Self::write_bands(cube, path, metadata),
            QuantizedRaster::Sixteen(cube) => Self::write_bands(cube, path, metadata),
        }
    }

    fn read_metadata(&self, path: &Path) -> NoiseResult<Option<SourceMetadata>> {
        let dataset = Dataset::open(path)?;
        let metadata = Self::dataset_metadata(&dataset)?;
        Ok(if metadata.is_empty() { None } else { Some(metadata) })
    }
}
