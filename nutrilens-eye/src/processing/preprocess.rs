//! Photo to detector input

use crate::error::VisionError;
use crate::tensor::InputTensor;
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Decode `path` and turn it into a `[1, S, S, 3]` tensor on the blocking pool.
#[instrument(skip_all, fields(path = %path.display(), size = input_size))]
pub async fn preprocess(path: &Path, input_size: usize) -> Result<InputTensor, VisionError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || preprocess_blocking(&path, input_size))
        .await
        .map_err(|e| VisionError::ImageAccess(format!("Preprocess task failed: {}", e)))?
}

/// Synchronous body of [`preprocess`].
pub fn preprocess_blocking(path: &Path, input_size: usize) -> Result<InputTensor, VisionError> {
    if input_size == 0 {
        return Err(VisionError::Config("Input size must be non-zero".to_string()));
    }

    // Read and close the file before decoding
    let bytes = std::fs::read(path)
        .map_err(|e| VisionError::ImageAccess(format!("{}: {}", path.display(), e)))?;
    let image = decode(&bytes)?;
    debug!("Decoded {}x{} image", image.width(), image.height());

    to_tensor(&image, input_size)
}

/// Decode with the format guessed from content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, VisionError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::Format(e.to_string()))?;
    if reader.format().is_none() {
        return Err(VisionError::Format("Unrecognized image format".to_string()));
    }
    reader
        .decode()
        .map_err(|e| VisionError::Format(e.to_string()))
}

/// Hard-resize to `size x size` RGB and scale to `[0, 1]`, NHWC.
pub fn to_tensor(image: &DynamicImage, size: usize) -> Result<InputTensor, VisionError> {
    let side = u32::try_from(size)
        .map_err(|_| VisionError::Config(format!("Input size {} too large", size)))?;
    let rgb = image
        .resize_exact(side, side, FilterType::Triangle)
        .to_rgb8();
    let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32 / 255.0).collect();
    InputTensor::new(data, size)
}
