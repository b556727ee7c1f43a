//! Stand-in detector used when the real model cannot be loaded

use crate::config::DetectionConfig;
use crate::error::VisionError;
use crate::models::detector::Detector;
use crate::tensor::{InputTensor, RawPredictions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Emits seeded pseudo-random predictions of the real output shape.
///
/// Every call restarts from the same seed, so a given configuration always
/// yields the same predictions regardless of the image.
#[derive(Debug, Clone)]
pub struct PlaceholderDetector {
    seed: u64,
    anchors: usize,
    width: usize,
    input_size: usize,
}

impl PlaceholderDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            seed: config.placeholder_seed,
            anchors: config.placeholder_anchors,
            width: config.prediction_width(),
            input_size: config.input_size,
        }
    }
}

impl Detector for PlaceholderDetector {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn predict(&self, _input: &InputTensor) -> Result<RawPredictions, VisionError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let data: Vec<f32> = (0..self.anchors * self.width)
            .map(|_| rng.gen::<f32>())
            .collect();
        RawPredictions::new(data, self.anchors, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> DetectionConfig {
        DetectionConfig {
            num_classes: 6,
            placeholder_anchors: 16,
            input_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_placeholder_shape() {
        let detector = PlaceholderDetector::new(&DetectionConfig::default());
        let preds = detector.predict(&InputTensor::zeros(640)).unwrap();
        assert_eq!(preds.shape(), [1, 8400, 605]);
    }

    #[test]
    fn test_placeholder_deterministic() {
        let detector = PlaceholderDetector::new(&small_config());
        let a = detector.predict(&InputTensor::zeros(4)).unwrap();
        let b = detector.predict(&InputTensor::zeros(4)).unwrap();
        assert_eq!(a, b);
        assert!(a.rows().flatten().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_placeholder_seed_changes_output() {
        let mut config = small_config();
        let a = PlaceholderDetector::new(&config)
            .predict(&InputTensor::zeros(4))
            .unwrap();
        config.placeholder_seed += 1;
        let b = PlaceholderDetector::new(&config)
            .predict(&InputTensor::zeros(4))
            .unwrap();
        assert_ne!(a, b);
    }
}
