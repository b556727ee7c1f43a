//! nutrilens-core: shared data contract for food analysis.
//!
//! Both the on-device pipeline (`nutrilens-eye`) and the remote client
//! (`nutrilens-cloud`) hand their results to callers in these types.

pub mod types;

pub use types::{round_to_tenth, AnalysisResult, FoodItem, NutritionTotals, Per100g};
