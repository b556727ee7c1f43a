//! Detector abstraction shared by the real model, the placeholder and tests

use crate::config::DetectionConfig;
use crate::error::VisionError;
use crate::tensor::{InputTensor, RawPredictions};
use std::sync::Arc;

/// One forward pass from an input tensor to raw per-anchor predictions.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    /// Square input side length the detector expects.
    fn input_size(&self) -> usize;

    fn predict(&self, input: &InputTensor) -> Result<RawPredictions, VisionError>;
}

/// Produces the real detector. Runs on the blocking pool.
pub trait DetectorLoader: Send + Sync {
    fn load(&self, config: &DetectionConfig) -> Result<Arc<dyn Detector>, VisionError>;
}

/// Returns the same predictions for every input.
#[derive(Debug, Clone)]
pub struct FixedDetector {
    predictions: RawPredictions,
    input_size: usize,
}

impl FixedDetector {
    pub fn new(predictions: RawPredictions, input_size: usize) -> Self {
        Self {
            predictions,
            input_size,
        }
    }

    /// Build from whole rows of `cx, cy, w, h, scores...`.
    pub fn from_rows(rows: &[Vec<f32>], input_size: usize) -> Result<Self, VisionError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(VisionError::Inference("Ragged prediction rows".to_string()));
        }
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        let predictions = RawPredictions::new(data, rows.len(), width)?;
        Ok(Self::new(predictions, input_size))
    }

    /// A single anchor with `score` for `class_id` and zero elsewhere.
    pub fn single(
        bbox_center: (f32, f32),
        bbox_size: (f32, f32),
        class_id: usize,
        score: f32,
        num_classes: usize,
        input_size: usize,
    ) -> Result<Self, VisionError> {
        let mut row = vec![0.0f32; 4 + num_classes];
        row[0] = bbox_center.0;
        row[1] = bbox_center.1;
        row[2] = bbox_size.0;
        row[3] = bbox_size.1;
        let slot = row.get_mut(4 + class_id).ok_or_else(|| {
            VisionError::Inference(format!("Class {} outside {} classes", class_id, num_classes))
        })?;
        *slot = score;
        Self::from_rows(&[row], input_size)
    }
}

impl Detector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn predict(&self, input: &InputTensor) -> Result<RawPredictions, VisionError> {
        if input.size() != self.input_size {
            return Err(VisionError::Inference(format!(
                "Expected {}x{} input, got {}x{}",
                self.input_size,
                self.input_size,
                input.size(),
                input.size()
            )));
        }
        Ok(self.predictions.clone())
    }
}

/// Loader handing out an already-built detector.
pub struct StaticLoader {
    detector: Arc<dyn Detector>,
}

impl StaticLoader {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }
}

impl DetectorLoader for StaticLoader {
    fn load(&self, _config: &DetectionConfig) -> Result<Arc<dyn Detector>, VisionError> {
        Ok(Arc::clone(&self.detector))
    }
}
