//! YOLOv8 food detector backed by ONNX Runtime

use crate::config::DetectionConfig;
use crate::error::VisionError;
use crate::models::detector::{Detector, DetectorLoader};
use crate::tensor::{InputTensor, RawPredictions};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Output names tried in order.
const OUTPUT_NAMES: &[&str] = &["output0", "output"];

/// Pixel order the model's first input expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, 3, S, S]`, the Ultralytics export
    Nchw,
    /// `[1, S, S, 3]`
    Nhwc,
}

impl InputLayout {
    /// Channels-last only when the last dimension is 3 and the second is not.
    pub fn from_dims(dims: &[i64]) -> Self {
        match dims {
            [_, c, _, _] if *c == 3 => InputLayout::Nchw,
            [_, _, _, c] if *c == 3 => InputLayout::Nhwc,
            _ => InputLayout::Nchw,
        }
    }
}

/// YOLOv8 model trained on the Open Images V7 label set
pub struct OnnxDetector {
    // `Session::run` needs `&mut self`
    session: Mutex<Session>,
    input_size: usize,
    width: usize,
    layout: InputLayout,
}

impl OnnxDetector {
    /// Create a new detector from an `.onnx` file
    pub fn new(model_path: &Path, config: &DetectionConfig) -> Result<Self, VisionError> {
        if !model_path.exists() {
            return Err(VisionError::Model(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let mut builder = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?;
        if config.intra_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_threads)
                .map_err(|e| VisionError::Ort(format!("Failed to set intra threads: {}", e)))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        let input_dims: Vec<i64> = session
            .inputs
            .first()
            .and_then(|input| match &input.input_type {
                ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
                _ => None,
            })
            .ok_or_else(|| VisionError::Model("Model has no tensor input".to_string()))?;
        let layout = InputLayout::from_dims(&input_dims);

        info!(
            "YOLO model loaded from {:?} (input {:?}, {:?})",
            model_path, input_dims, layout
        );

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
            width: config.prediction_width(),
            layout,
        })
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }
}

/// Bring raw model output into row-major, normalized predictions.
///
/// Accepts `[1, N, 4+C]` as is and transposes the YOLOv8 export layout
/// `[1, 4+C, N]`. Box fields arrive in input pixels and are divided by the
/// input side.
pub fn normalize_output(
    shape: &[i64],
    data: Vec<f32>,
    width: usize,
    input_size: usize,
) -> Result<RawPredictions, VisionError> {
    let dims: Vec<usize> = shape.iter().map(|d| (*d).max(0) as usize).collect();
    let mut predictions = match dims.as_slice() {
        [1, anchors, w] if *w == width => RawPredictions::new(data, *anchors, *w)?,
        [1, w, anchors] if *w == width => RawPredictions::from_transposed(data, *w, *anchors)?,
        _ => {
            return Err(VisionError::Inference(format!(
                "Unexpected output shape {:?}, expected rows of width {}",
                shape, width
            )))
        }
    };
    predictions.scale_boxes(1.0 / input_size as f32);
    Ok(predictions)
}

impl Detector for OnnxDetector {
    fn name(&self) -> &str {
        "yolov8-oiv7"
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn predict(&self, input: &InputTensor) -> Result<RawPredictions, VisionError> {
        let value = match self.layout {
            InputLayout::Nchw => Tensor::from_array((input.nchw_shape(), input.to_nchw())),
            InputLayout::Nhwc => Tensor::from_array((input.shape(), input.as_slice().to_vec())),
        }
        .map_err(|e| VisionError::Inference(format!("Failed to create input value: {}", e)))?;

        let (shape, data) = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![value])
                .map_err(|e| VisionError::Inference(format!("YOLO inference failed: {}", e)))?;

            let output = OUTPUT_NAMES
                .iter()
                .find_map(|name| outputs.get(*name))
                .ok_or_else(|| VisionError::Inference("Model produced no output0".to_string()))?;

            let (shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                VisionError::Inference(format!("Failed to extract output tensor: {}", e))
            })?;
            // Copy out so runtime buffers are released with `outputs`
            (shape.to_vec(), data.to_vec())
        };

        debug!("YOLO output shape: {:?}", shape);
        normalize_output(&shape, data, self.width, self.input_size)
    }
}

/// Default loader: ONNX session from `DetectionConfig::model_path`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl DetectorLoader for OnnxLoader {
    fn load(&self, config: &DetectionConfig) -> Result<Arc<dyn Detector>, VisionError> {
        let detector = OnnxDetector::new(&config.model_path, config)?;
        Ok(Arc::new(detector))
    }
}
