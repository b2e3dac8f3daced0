//! Loading fixed branding images.

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::AssetError;
use crate::raster::RasterImage;

/// Resolves an image path to a bitmap. A missing or unreadable asset is `None`, never an error.
pub trait AssetLoader {
    /// Loads the image at `path`.
    fn load(&self, path: &Path) -> Option<RasterImage>;
}

/// Reads images from the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileAssetLoader;

impl FileAssetLoader {
    fn try_load(path: &Path) -> Result<RasterImage, AssetError> {
        let bytes = fs::read(path)?;
        let decoded = image::load_from_memory(&bytes)?;
        Ok(RasterImage::from_rgba(&decoded.to_rgba8())?)
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&self, path: &Path) -> Option<RasterImage> {
        match Self::try_load(path) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("Skipping asset {}: {}", path.display(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn missing_file_is_none() {
        assert!(FileAssetLoader
            .load(Path::new("/__report_composer_missing__/logo.png"))
            .is_none());
    }

    #[test]
    fn png_with_alpha_is_flattened() {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 3, Rgba([0, 0, 0, 0])))
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        let path = std::env::temp_dir().join("report_composer_asset_test.png");
        fs::write(&path, &bytes).unwrap();

        let image = FileAssetLoader.load(&path).expect("asset loads");
        assert_eq!((image.pixel_width(), image.pixel_height()), (6, 3));
        let decoded = image.decode_rgb().unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn garbage_bytes_are_none() {
        let path = std::env::temp_dir().join("report_composer_garbage_asset.png");
        fs::write(&path, b"not an image").unwrap();
        assert!(FileAssetLoader.load(&path).is_none());
        let _ = fs::remove_file(&path);
    }
}
