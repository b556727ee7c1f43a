use nutrilens_core::{round_to_tenth, FoodItem, NutritionTotals};

/// Sum per-item nutrition. Calories add as integers; the other fields are
/// rounded once, on the sum.
pub fn aggregate(items: &[FoodItem]) -> NutritionTotals {
    let (calories, protein, fat, carbs) = items.iter().fold(
        (0u32, 0.0f64, 0.0f64, 0.0f64),
        |(c, p, f, cb), item| {
            (
                c.saturating_add(item.calories),
                p + item.protein,
                f + item.fat,
                cb + item.carbs,
            )
        },
    );

    NutritionTotals {
        calories,
        protein: round_to_tenth(protein),
        fat: round_to_tenth(fat),
        carbs: round_to_tenth(carbs),
    }
}
