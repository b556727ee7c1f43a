//! Single forward pass

use crate::error::VisionError;
use crate::models::ModelHandle;
use crate::tensor::{InputTensor, RawPredictions};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Run the handle's detector on `input`, consuming it.
///
/// The tensor is dropped when the blocking task returns, whether or not the
/// pass succeeded.
#[instrument(skip_all, fields(detector = handle.detector().name()))]
pub async fn infer(input: InputTensor, handle: &ModelHandle) -> Result<RawPredictions, VisionError> {
    let detector = Arc::clone(handle.detector());
    let predictions = tokio::task::spawn_blocking(move || {
        let result = detector.predict(&input);
        drop(input);
        result
    })
    .await
    .map_err(|e| VisionError::Inference(format!("Inference task failed: {}", e)))?
    .map_err(|e| match e {
        VisionError::Ort(msg) => VisionError::Inference(msg),
        other => other,
    })?;

    debug!("Predictions shape {:?}", predictions.shape());
    Ok(predictions)
}
