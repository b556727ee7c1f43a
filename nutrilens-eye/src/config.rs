//! Configuration for nutrilens-eye

use crate::labels::FOOD_CLASS_IDS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input side length of the detector, in pixels.
pub const MODEL_INPUT_SIZE: usize = 640;
/// Size of the Open Images V7 label set the detector was trained on.
pub const NUM_CLASSES: usize = 601;
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const MAX_DETECTIONS: usize = 3;
pub const MAX_WEIGHT_GRAMS: u32 = 600;
pub const MIN_WEIGHT_GRAMS: u32 = 50;
/// Anchor count of a 640x640 YOLOv8 head (80² + 40² + 20²).
pub const DEFAULT_ANCHORS: usize = 8400;

/// On-device detection pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// ONNX detector file
    pub model_path: PathBuf,
    /// Optional class-name list (one name per line) overriding the embedded one
    pub class_names_path: Option<PathBuf>,
    /// Optional full nutrition table (JSON) overriding the embedded one
    pub nutrition_table_path: Option<PathBuf>,
    /// Square input side length of the detector
    pub input_size: usize,
    /// Number of class scores per anchor
    pub num_classes: usize,
    /// Minimum class score for a detection to survive
    pub confidence_threshold: f32,
    /// Maximum number of detections per image
    pub max_detections: usize,
    /// Upper bound (and area scale) of the portion estimate
    pub max_weight_grams: u32,
    /// Lower bound of the portion estimate
    pub min_weight_grams: u32,
    /// Greedy per-class NMS; `None` keeps every overlapping box
    pub nms_iou_threshold: Option<f32>,
    /// Seed of the placeholder detector used when the real one is unavailable
    pub placeholder_seed: u64,
    /// Anchor count the placeholder detector emits
    pub placeholder_anchors: usize,
    /// ONNX Runtime intra-op threads (0 = runtime default)
    pub intra_threads: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".nutrilens");
                p.push("models");
                p.push("yolov8l-oiv7-food.onnx");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models/yolov8l-oiv7-food.onnx"));

        Self {
            model_path,
            class_names_path: None,
            nutrition_table_path: None,
            input_size: MODEL_INPUT_SIZE,
            num_classes: NUM_CLASSES,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            max_detections: MAX_DETECTIONS,
            max_weight_grams: MAX_WEIGHT_GRAMS,
            min_weight_grams: MIN_WEIGHT_GRAMS,
            nms_iou_threshold: None,
            placeholder_seed: 0x6b627a75,
            placeholder_anchors: DEFAULT_ANCHORS,
            intra_threads: 0,
        }
    }
}

impl DetectionConfig {
    /// Width of one raw prediction row: 4 box values plus the class scores.
    pub fn prediction_width(&self) -> usize {
        4 + self.num_classes
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.input_size > 4096 {
            return Err("Input size must be between 1 and 4096".to_string());
        }

        if self.num_classes == 0 {
            return Err("Number of classes must be non-zero".to_string());
        }

        if self.class_names_path.is_none() && self.num_classes != NUM_CLASSES {
            return Err(format!(
                "The embedded class list has {} names; set class_names_path for {} classes",
                NUM_CLASSES, self.num_classes
            ));
        }

        // Every food id must index into the class table
        let highest_food_id = FOOD_CLASS_IDS.iter().copied().max().unwrap_or(0);
        if self.num_classes <= highest_food_id {
            return Err(format!(
                "Number of classes must exceed the highest food class id {}",
                highest_food_id
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be within [0, 1]".to_string());
        }

        if self.max_detections == 0 {
            return Err("Max detections must be at least 1".to_string());
        }

        if self.min_weight_grams == 0 || self.min_weight_grams > self.max_weight_grams {
            return Err("Weight bounds must satisfy 0 < min <= max".to_string());
        }

        if let Some(iou) = self.nms_iou_threshold {
            if !(iou > 0.0 && iou <= 1.0) {
                return Err("NMS IoU threshold must be within (0, 1]".to_string());
            }
        }

        if self.placeholder_anchors == 0 {
            return Err("Placeholder anchors must be non-zero".to_string());
        }

        // Placeholder output is held in memory as one buffer
        self.placeholder_anchors
            .checked_mul(self.prediction_width())
            .filter(|n| *n <= 100_000_000)
            .ok_or_else(|| "Placeholder output too large (max 100M values)".to_string())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DetectionConfig::default();
        assert_eq!(config.input_size, 640);
        assert_eq!(config.num_classes, 601);
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.max_detections, 3);
        assert_eq!(config.max_weight_grams, 600);
        assert_eq!(config.min_weight_grams, 50);
        assert!(config.nms_iou_threshold.is_none());
        assert_eq!(config.prediction_width(), 605);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_threshold_out_of_range() {
        let mut config = DetectionConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.confidence_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_weight_bounds() {
        let mut config = DetectionConfig::default();
        config.min_weight_grams = 700;
        assert!(config.validate().is_err());

        config.min_weight_grams = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_nms() {
        let mut config = DetectionConfig::default();
        config.nms_iou_threshold = Some(0.5);
        assert!(config.validate().is_ok());

        config.nms_iou_threshold = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_class_count() {
        let mut config = DetectionConfig::default();
        config.num_classes = 80;
        assert!(config.validate().is_err());

        // A custom label list may change the count but must still cover the food ids
        config.class_names_path = Some("/models/labels.txt".into());
        assert!(config.validate().is_err());

        config.num_classes = 700;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_placeholder_overflow() {
        let mut config = DetectionConfig::default();
        config.placeholder_anchors = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_deserialization() {
        let config: DetectionConfig =
            serde_json::from_str(r#"{"confidence_threshold": 0.6}"#).unwrap();
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.max_detections, MAX_DETECTIONS);
    }
}
