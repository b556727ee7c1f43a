//! Owned buffers passed between pipeline stages

use crate::error::VisionError;

/// `[1, S, S, 3]` RGB image, NHWC, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
    size: usize,
}

impl InputTensor {
    pub fn new(data: Vec<f32>, size: usize) -> Result<Self, VisionError> {
        let expected = size
            .checked_mul(size)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| VisionError::Inference("Input shape would overflow".to_string()))?;
        if data.len() != expected {
            return Err(VisionError::Inference(format!(
                "Input tensor has {} values, expected {} for {}x{}x3",
                data.len(),
                expected,
                size,
                size
            )));
        }
        Ok(Self { data, size })
    }

    /// All-zero tensor, used for warm-up.
    pub fn zeros(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size * 3],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.size, self.size, 3]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Same pixels in planar `[1, 3, S, S]` order.
    pub fn to_nchw(&self) -> Vec<f32> {
        let plane = self.size * self.size;
        let mut planar = vec![0.0f32; plane * 3];
        for (pixel, rgb) in self.data.chunks_exact(3).enumerate() {
            for (channel, value) in rgb.iter().enumerate() {
                planar[channel * plane + pixel] = *value;
            }
        }
        planar
    }

    pub fn nchw_shape(&self) -> [usize; 4] {
        [1, 3, self.size, self.size]
    }
}

/// `[1, N, 4 + C]` detector output; each row is `cx, cy, w, h` then C scores.
///
/// Box fields are fractions of the input side.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPredictions {
    data: Vec<f32>,
    anchors: usize,
    width: usize,
}

impl RawPredictions {
    pub fn new(data: Vec<f32>, anchors: usize, width: usize) -> Result<Self, VisionError> {
        if width < 5 {
            return Err(VisionError::Inference(format!(
                "Prediction rows of width {} carry no class scores",
                width
            )));
        }
        if anchors.checked_mul(width) != Some(data.len()) {
            return Err(VisionError::Inference(format!(
                "Prediction buffer of {} values does not match [1, {}, {}]",
                data.len(),
                anchors,
                width
            )));
        }
        Ok(Self {
            data,
            anchors,
            width,
        })
    }

    /// Build from the channel-major `[1, 4 + C, N]` layout.
    pub fn from_transposed(data: Vec<f32>, width: usize, anchors: usize) -> Result<Self, VisionError> {
        if width.checked_mul(anchors) != Some(data.len()) {
            return Err(VisionError::Inference(format!(
                "Prediction buffer of {} values does not match [1, {}, {}]",
                data.len(),
                width,
                anchors
            )));
        }
        let mut rows = vec![0.0f32; data.len()];
        for channel in 0..width {
            let src = &data[channel * anchors..(channel + 1) * anchors];
            for (anchor, value) in src.iter().enumerate() {
                rows[anchor * width + channel] = *value;
            }
        }
        Self::new(rows, anchors, width)
    }

    pub fn anchors(&self) -> usize {
        self.anchors
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_classes(&self) -> usize {
        self.width - 4
    }

    pub fn shape(&self) -> [usize; 3] {
        [1, self.anchors, self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.width)
    }

    /// Multiply `cx, cy, w, h` of every row by `factor`.
    pub fn scale_boxes(&mut self, factor: f32) {
        for row in self.data.chunks_exact_mut(self.width) {
            for value in &mut row[..4] {
                *value *= factor;
            }
        }
    }
}
