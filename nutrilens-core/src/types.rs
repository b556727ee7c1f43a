use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rounds to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Nutrition values for a 100 g reference portion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Per100g {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl Per100g {
    pub const fn new(calories: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        Self { calories, protein, fat, carbs }
    }

    /// Scales to a portion of `grams`. Calories round to an integer, the
    /// other fields to one decimal place.
    pub fn for_portion(&self, grams: u32) -> NutritionTotals {
        let multiplier = grams as f64 / 100.0;
        NutritionTotals {
            calories: (self.calories * multiplier).round().max(0.0) as u32,
            protein: round_to_tenth(self.protein * multiplier),
            fat: round_to_tenth(self.fat * multiplier),
            carbs: round_to_tenth(self.carbs * multiplier),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.fat, self.carbs]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Summed (or per-item) nutrition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: u32,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// One recognised food, as shown to (and edited by) the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(rename = "ru_name")]
    pub localized_name: String,
    pub confidence: f32,
    pub grams: u32,
    pub calories: u32,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl FoodItem {
    pub fn nutrition(&self) -> NutritionTotals {
        NutritionTotals {
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
        }
    }
}

/// Outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub items: Vec<FoodItem>,
    pub total: NutritionTotals,
    /// Set only when the pipeline fell back to a placeholder result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AnalysisResult {
    pub fn new(items: Vec<FoodItem>, total: NutritionTotals) -> Self {
        Self {
            items,
            total,
            error: None,
            timestamp: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}
