//! nutrilens-eye: on-device food recognition
//!
//! Turns a meal photo into recognised food items with portion and
//! nutrition estimates. A YOLOv8 detector trained on the Open Images V7
//! label set runs through ONNX Runtime; when it is unavailable a seeded
//! placeholder keeps the pipeline answering.
//!
//! Stages: load model, preprocess, infer, decode, weigh, resolve,
//! aggregate. [`FoodAnalyzer`] runs them end to end.

pub mod config;
pub mod error;
pub mod labels;
pub mod models;
pub mod nutrition;
pub mod pipeline;
pub mod processing;
pub mod tensor;

pub use config::DetectionConfig;
pub use error::VisionError;
pub use labels::{ClassTable, FoodAllowList};
pub use models::{Detector, DetectorLoader, ModelHandle, ModelKind, ModelManager};
pub use nutrition::{normalize_key, NameTranslations, NutritionTable};
pub use pipeline::{fallback_result, FoodAnalyzer};
pub use tensor::{InputTensor, RawPredictions};
