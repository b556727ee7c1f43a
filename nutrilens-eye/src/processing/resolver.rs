//! Weighted detection to food item

use crate::nutrition::{NameTranslations, NutritionTable};
use crate::processing::portion::WeightedDetection;
use nutrilens_core::FoodItem;
use tracing::debug;

/// Look up, scale and localize one weighted detection.
pub fn resolve(
    weighted: &WeightedDetection,
    nutrition: &NutritionTable,
    translations: &NameTranslations,
) -> FoodItem {
    let name = &weighted.detection.class_name;
    resolve_name(
        name,
        weighted.detection.confidence,
        weighted.estimated_grams,
        nutrition,
        translations,
    )
}

/// Resolve a bare class name at a given portion.
pub fn resolve_name(
    name: &str,
    confidence: f32,
    grams: u32,
    nutrition: &NutritionTable,
    translations: &NameTranslations,
) -> FoodItem {
    let (key, per100g) = nutrition.lookup(name);
    if nutrition.get(&key).is_none() {
        debug!(key = %key, "No nutrition entry, using unknown");
    }
    let portion = per100g.for_portion(grams);

    FoodItem {
        name: name.to_string(),
        localized_name: translations.localize(&key, name),
        confidence,
        grams,
        calories: portion.calories,
        protein: portion.protein,
        fat: portion.fat,
        carbs: portion.carbs,
    }
}
