//! Error types for nutrilens-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Image access error: {0}")]
    ImageAccess(String),

    #[error("Unsupported image format: {0}")]
    Format(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),
}

impl VisionError {
    /// Stage that produced the error, for logging at the analysis boundary.
    pub fn stage(&self) -> &'static str {
        match self {
            VisionError::ImageAccess(_) | VisionError::Format(_) => "preprocess",
            VisionError::Inference(_) | VisionError::Ort(_) => "inference",
            VisionError::Model(_) => "model",
            VisionError::Table(_) => "tables",
            VisionError::Config(_) => "config",
            VisionError::Io(_) => "io",
        }
    }
}

impl From<ort::Error> for VisionError {
    fn from(err: ort::Error) -> Self {
        VisionError::Ort(err.to_string())
    }
}

impl From<image::ImageError> for VisionError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => VisionError::ImageAccess(e.to_string()),
            other => VisionError::Format(other.to_string()),
        }
    }
}
