//! Pipeline stages, in execution order

pub mod preprocess;
pub mod inference;
pub mod postprocess;
pub mod portion;
pub mod resolver;
pub mod aggregate;

pub use aggregate::aggregate;
pub use inference::infer;
pub use portion::{estimate_grams, weigh, WeightedDetection};
pub use postprocess::{decode, BoundingBox, Detection};
pub use preprocess::preprocess;
pub use resolver::{resolve, resolve_name};
