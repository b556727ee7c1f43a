//! Raw predictions to food detections

use crate::config::DetectionConfig;
use crate::labels::{ClassTable, FoodAllowList};
use crate::tensor::RawPredictions;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Box in normalized image fractions, top-left corner form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// From center form, every component clamped to `[0, 1]`.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x_min: (cx - w / 2.0).clamp(0.0, 1.0),
            y_min: (cy - h / 2.0).clamp(0.0, 1.0),
            width: w.clamp(0.0, 1.0),
            height: h.clamp(0.0, 1.0),
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter_x_min = self.x_min.max(other.x_min);
        let inter_y_min = self.y_min.max(other.y_min);
        let inter_x_max = (self.x_min + self.width).min(other.x_min + other.width);
        let inter_y_max = (self.y_min + self.height).min(other.y_min + other.height);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        (inter_area / union_area).clamp(0.0, 1.0)
    }
}

/// Detected food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
}

/// Decode, filter and cap the raw predictions.
///
/// Survivors have `confidence >= confidence_threshold` and an allow-listed
/// class; at most `max_detections` are returned, in anchor order.
pub fn decode(
    predictions: &RawPredictions,
    classes: &ClassTable,
    allow_list: &FoodAllowList,
    config: &DetectionConfig,
) -> Vec<Detection> {
    let mut candidates: Vec<(usize, Detection)> = Vec::new();

    for (anchor, row) in predictions.rows().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let Some((class_id, confidence)) = argmax(&row[4..]) else {
            continue;
        };

        if confidence < config.confidence_threshold || !allow_list.contains(class_id) {
            continue;
        }

        let Some(class_name) = classes.name(class_id) else {
            continue;
        };

        candidates.push((
            anchor,
            Detection {
                bbox: BoundingBox::from_center(cx, cy, w, h),
                confidence,
                class_id,
                class_name: class_name.to_string(),
            },
        ));
    }

    let before_nms = candidates.len();
    if let Some(iou_threshold) = config.nms_iou_threshold {
        candidates = apply_nms(candidates, iou_threshold);
    }

    debug!(
        candidates = before_nms,
        kept = candidates.len().min(config.max_detections),
        "Decoded predictions"
    );

    candidates
        .into_iter()
        .take(config.max_detections)
        .map(|(_, detection)| detection)
        .collect()
}

/// Index and value of the largest score; the first one wins ties.
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
}

/// Greedy per-class non-maximum suppression; survivors keep anchor order.
fn apply_nms(mut candidates: Vec<(usize, Detection)>, iou_threshold: f32) -> Vec<(usize, Detection)> {
    if candidates.is_empty() {
        return candidates;
    }

    // Sort by confidence (descending), anchor order for ties
    candidates.sort_by(|a, b| {
        b.1.confidence
            .total_cmp(&a.1.confidence)
            .then(a.0.cmp(&b.0))
    });

    let mut keep = Vec::with_capacity(candidates.len());
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i].clone());

        for j in (i + 1)..candidates.len() {
            if suppressed[j] || candidates[j].1.class_id != candidates[i].1.class_id {
                continue;
            }
            if candidates[i].1.bbox.iou(&candidates[j].1.bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep.sort_by_key(|(anchor, _)| *anchor);
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPLE: usize = 10;
    const BANANA: usize = 21;
    const ACCORDION: usize = 0;

    fn row(cx: f32, cy: f32, w: f32, h: f32, class_id: usize, score: f32) -> Vec<f32> {
        let mut row = vec![0.0; 605];
        row[..4].copy_from_slice(&[cx, cy, w, h]);
        row[4 + class_id] = score;
        row
    }

    fn predictions(rows: &[Vec<f32>]) -> RawPredictions {
        let data = rows.iter().flatten().copied().collect();
        RawPredictions::new(data, rows.len(), 605).unwrap()
    }

    fn tables() -> (ClassTable, FoodAllowList) {
        let classes = ClassTable::embedded(601).unwrap();
        let allow = FoodAllowList::builtin(classes.len()).unwrap();
        (classes, allow)
    }

    #[test]
    fn test_decode_single_apple() {
        let (classes, allow) = tables();
        let preds = predictions(&[row(0.5, 0.5, 0.4, 0.4, APPLE, 0.9)]);
        let dets = decode(&preds, &classes, &allow, &DetectionConfig::default());

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name, "Apple");
        assert_eq!(dets[0].confidence, 0.9);
        let b = dets[0].bbox;
        assert!((b.x_min - 0.3).abs() < 1e-6);
        assert!((b.y_min - 0.3).abs() < 1e-6);
        assert!((b.width - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (classes, allow) = tables();
        let preds = predictions(&[
            row(0.5, 0.5, 0.2, 0.2, APPLE, 0.4),
            row(0.5, 0.5, 0.2, 0.2, APPLE, 0.39),
        ]);
        let dets = decode(&preds, &classes, &allow, &DetectionConfig::default());
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.4);
    }

    #[test]
    fn test_non_food_filtered() {
        let (classes, allow) = tables();
        let preds = predictions(&[row(0.5, 0.5, 0.2, 0.2, ACCORDION, 0.99)]);
        assert!(decode(&preds, &classes, &allow, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_capped_in_anchor_order() {
        let (classes, allow) = tables();
        let preds = predictions(&[
            row(0.1, 0.1, 0.1, 0.1, APPLE, 0.5),
            row(0.2, 0.2, 0.1, 0.1, BANANA, 0.6),
            row(0.3, 0.3, 0.1, 0.1, APPLE, 0.7),
            row(0.4, 0.4, 0.1, 0.1, BANANA, 0.99),
        ]);
        let dets = decode(&preds, &classes, &allow, &DetectionConfig::default());
        let confs: Vec<f32> = dets.iter().map(|d| d.confidence).collect();
        assert_eq!(confs, vec![0.5, 0.6, 0.7]);
    }

    #[test]
    fn test_non_finite_rows_skipped() {
        let (classes, allow) = tables();
        let mut bad = row(0.5, 0.5, 0.2, 0.2, APPLE, 0.9);
        bad[2] = f32::NAN;
        let preds = predictions(&[bad]);
        assert!(decode(&preds, &classes, &allow, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_bbox_clamped() {
        let b = BoundingBox::from_center(0.05, 0.95, 0.3, 1.4);
        assert_eq!(b.x_min, 0.0);
        assert_eq!(b.height, 1.0);
        assert!(b.y_min >= 0.0 && b.y_min <= 1.0);
    }

    #[test]
    fn test_nms_off_by_default_keeps_overlaps() {
        let (classes, allow) = tables();
        let preds = predictions(&[
            row(0.5, 0.5, 0.4, 0.4, APPLE, 0.8),
            row(0.51, 0.5, 0.4, 0.4, APPLE, 0.9),
        ]);
        assert_eq!(decode(&preds, &classes, &allow, &DetectionConfig::default()).len(), 2);
    }

    #[test]
    fn test_nms_suppresses_same_class_only() {
        let (classes, allow) = tables();
        let preds = predictions(&[
            row(0.5, 0.5, 0.4, 0.4, APPLE, 0.8),
            row(0.51, 0.5, 0.4, 0.4, APPLE, 0.9),
            row(0.5, 0.5, 0.4, 0.4, BANANA, 0.7),
        ]);
        let config = DetectionConfig {
            nms_iou_threshold: Some(0.5),
            ..Default::default()
        };
        let dets = decode(&preds, &classes, &allow, &config);
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[1].class_id, BANANA);
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::from_center(0.5, 0.5, 0.2, 0.2);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        let far = BoundingBox::from_center(0.1, 0.1, 0.1, 0.1);
        assert_eq!(a.iou(&far), 0.0);
    }
}
