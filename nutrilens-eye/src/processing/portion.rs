//! Portion mass from box area

use crate::processing::postprocess::Detection;
use serde::{Deserialize, Serialize};

/// A detection with its estimated portion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedDetection {
    pub detection: Detection,
    pub estimated_grams: u32,
}

/// `round(area * max_grams)` clamped to `[min_grams, max_grams]`.
pub fn estimate_grams(detection: &Detection, min_grams: u32, max_grams: u32) -> u32 {
    let area = detection.bbox.area().clamp(0.0, 1.0) as f64;
    let grams = (area * max_grams as f64).round() as u32;
    grams.clamp(min_grams, max_grams)
}

pub fn weigh(detection: Detection, min_grams: u32, max_grams: u32) -> WeightedDetection {
    let estimated_grams = estimate_grams(&detection, min_grams, max_grams);
    WeightedDetection {
        detection,
        estimated_grams,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::postprocess::BoundingBox;

    fn detection(w: f32, h: f32) -> Detection {
        Detection {
            bbox: BoundingBox::from_center(0.5, 0.5, w, h),
            confidence: 0.9,
            class_id: 10,
            class_name: "Apple".to_string(),
        }
    }

    #[test]
    fn test_apple_box() {
        assert_eq!(estimate_grams(&detection(0.4, 0.4), 50, 600), 96);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(estimate_grams(&detection(0.01, 0.01), 50, 600), 50);
        assert_eq!(estimate_grams(&detection(1.0, 1.0), 50, 600), 600);
        assert_eq!(estimate_grams(&detection(0.0, 0.0), 50, 600), 50);
    }

    #[test]
    fn test_weigh() {
        let weighted = weigh(detection(0.5, 0.5), 50, 600);
        assert_eq!(weighted.estimated_grams, 150);
        assert_eq!(weighted.detection.class_name, "Apple");
    }
}
