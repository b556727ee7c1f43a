use nutrilens_core::{FoodItem, NutritionTotals, Per100g};
use nutrilens_eye::labels::{ClassTable, FoodAllowList};
use nutrilens_eye::processing::{aggregate, decode, estimate_grams, resolve, weigh, BoundingBox, Detection};
use nutrilens_eye::{DetectionConfig, NameTranslations, NutritionTable, RawPredictions};
use proptest::prelude::*;

const WIDTH: usize = 605;

fn tables() -> (ClassTable, FoodAllowList) {
    let classes = ClassTable::embedded(601).unwrap();
    let allow = FoodAllowList::builtin(classes.len()).unwrap();
    (classes, allow)
}

fn detection(w: f32, h: f32) -> Detection {
    Detection {
        bbox: BoundingBox {
            x_min: 0.0,
            y_min: 0.0,
            width: w,
            height: h,
        },
        confidence: 0.9,
        class_id: 10,
        class_name: "Apple".to_string(),
    }
}

/// Rows of (box, class, score) spread over a full-width prediction buffer.
fn predictions_strategy() -> impl Strategy<Value = RawPredictions> {
    prop::collection::vec(
        (
            prop::array::uniform4(0.0f32..1.0),
            0usize..601,
            0.0f32..1.0,
            0.0f32..0.5,
        ),
        0..40,
    )
    .prop_map(|rows| {
        let mut data = Vec::with_capacity(rows.len() * WIDTH);
        for (bbox, class_id, score, noise) in &rows {
            let mut row = vec![*noise; WIDTH];
            row[..4].copy_from_slice(bbox);
            row[4 + class_id] = score.max(*noise);
            data.extend(row);
        }
        RawPredictions::new(data, rows.len(), WIDTH).unwrap()
    })
}

fn item_strategy() -> impl Strategy<Value = FoodItem> {
    (0u32..2000, 0.0f64..100.0, 0.0f64..100.0, 0.0f64..100.0).prop_map(
        |(calories, protein, fat, carbs)| FoodItem {
            name: "x".to_string(),
            localized_name: "x".to_string(),
            confidence: 0.5,
            grams: 100,
            calories,
            protein: (protein * 10.0).round() / 10.0,
            fat: (fat * 10.0).round() / 10.0,
            carbs: (carbs * 10.0).round() / 10.0,
        },
    )
}

proptest! {
    #[test]
    fn test_surviving_detections_are_confident_food(preds in predictions_strategy()) {
        let (classes, allow) = tables();
        let config = DetectionConfig::default();
        for det in decode(&preds, &classes, &allow, &config) {
            prop_assert!(det.confidence >= 0.4);
            prop_assert!(allow.contains(det.class_id));
            prop_assert_eq!(Some(det.class_name.as_str()), classes.name(det.class_id));
            prop_assert!((0.0..=1.0).contains(&det.bbox.x_min));
            prop_assert!((0.0..=1.0).contains(&det.bbox.width));
        }
    }

    #[test]
    fn test_at_most_three_detections(preds in predictions_strategy(), iou in prop::option::of(0.1f32..1.0)) {
        let (classes, allow) = tables();
        let config = DetectionConfig { nms_iou_threshold: iou, ..Default::default() };
        prop_assert!(decode(&preds, &classes, &allow, &config).len() <= 3);
    }

    #[test]
    fn test_grams_bounded_and_monotonic(
        w1 in 0.0f32..=1.0, h1 in 0.0f32..=1.0,
        w2 in 0.0f32..=1.0, h2 in 0.0f32..=1.0,
    ) {
        let a = estimate_grams(&detection(w1, h1), 50, 600);
        let b = estimate_grams(&detection(w2, h2), 50, 600);
        prop_assert!((50..=600).contains(&a));
        prop_assert!((50..=600).contains(&b));
        if w1 * h1 <= w2 * h2 {
            prop_assert!(a <= b);
        }
    }

    #[test]
    fn test_scaling_and_rounding(
        calories in 0.0f64..900.0, protein in 0.0f64..100.0,
        fat in 0.0f64..100.0, carbs in 0.0f64..100.0,
        grams in 50u32..=600,
    ) {
        let per100g = Per100g::new(calories, protein, fat, carbs);
        let portion = per100g.for_portion(grams);
        let m = grams as f64 / 100.0;

        prop_assert_eq!(portion.calories, (calories * m).round() as u32);
        for (got, raw) in [(portion.protein, protein), (portion.fat, fat), (portion.carbs, carbs)] {
            prop_assert!((got - raw * m).abs() <= 0.05 + 1e-9);
            prop_assert!(((got * 10.0).round() - got * 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resolver_matches_table(
        name in prop::sample::select(vec!["Apple", "Banana", "Hot dog", "Bell pepper", "Pizza"]),
        w in 0.1f32..=1.0, h in 0.1f32..=1.0,
    ) {
        let nutrition = NutritionTable::embedded().unwrap();
        let names = NameTranslations::builtin().unwrap();
        let mut det = detection(w, h);
        det.class_name = name.to_string();
        let weighted = weigh(det, 50, 600);

        let item = resolve(&weighted, &nutrition, &names);
        let (_, per100g) = nutrition.lookup(name);
        prop_assert_eq!(item.nutrition(), per100g.for_portion(weighted.estimated_grams));
        prop_assert_ne!(item.localized_name, name.to_string());
    }

    #[test]
    fn test_unknown_names_use_unknown_entry(suffix in "[a-z]{6,12}") {
        let nutrition = NutritionTable::embedded().unwrap();
        let (_, per100g) = nutrition.lookup(&format!("zz {}", suffix));
        prop_assert_eq!(per100g, nutrition.unknown());
        prop_assert_eq!(per100g, Per100g::new(150.0, 10.0, 7.0, 15.0));
    }

    #[test]
    fn test_aggregate_single_is_identity(item in item_strategy()) {
        prop_assert_eq!(aggregate(std::slice::from_ref(&item)), item.nutrition());
    }

    #[test]
    fn test_aggregate_calories_add_up(items in prop::collection::vec(item_strategy(), 0..6)) {
        let totals = aggregate(&items);
        prop_assert_eq!(totals.calories, items.iter().map(|i| i.calories).sum::<u32>());
    }
}

#[test]
fn test_aggregate_empty_is_zero() {
    assert_eq!(aggregate(&[]), NutritionTotals::default());
}
