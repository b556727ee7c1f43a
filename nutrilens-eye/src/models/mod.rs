//! Detector models and their lifecycle

pub mod detector;
pub mod manager;
pub mod placeholder;
pub mod yolo;

pub use detector::{Detector, DetectorLoader, FixedDetector, StaticLoader};
pub use manager::{ModelHandle, ModelKind, ModelManager};
pub use placeholder::PlaceholderDetector;
pub use yolo::{InputLayout, OnnxDetector, OnnxLoader};
