// THEORY:
// Image I/O shared by every stage.
//
// 1.  **Loading**: the file content decides the format; the extension is only a
//     hint. Greyscale callers get an 8-bit single-channel buffer.
// 2.  **Saving**: output masks are 8-bit greyscale. Missing parent directories are
//     created first, and an existing file is replaced.

use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageError, ImageReader};
use tracing::debug;

use crate::errors::VisionError;

/// Load an image from disk. The extension is only a hint; the content decides.
pub fn load_image(path: &Path) -> Result<DynamicImage, VisionError> {
    let read_err = |source: ImageError| VisionError::ImageRead {
        path: path.to_path_buf(),
        source,
    };
    let image = ImageReader::open(path)
        .map_err(|e| read_err(ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| read_err(ImageError::IoError(e)))?
        .decode()
        .map_err(read_err)?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "loaded image");
    Ok(image)
}

/// Load an image from disk and convert to 8-bit greyscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, VisionError> {
    Ok(load_image(path)?.into_luma8())
}

/// Save an 8-bit greyscale buffer; the format follows the path's extension.
pub fn save_gray(image: &GrayImage, path: &Path) -> Result<(), VisionError> {
    ensure_parent_dir(path)?;
    image.save(path).map_err(|source| VisionError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "saved greyscale image");
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), VisionError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| VisionError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
