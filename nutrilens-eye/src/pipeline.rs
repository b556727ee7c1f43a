//! End-to-end food analysis

use crate::config::DetectionConfig;
use crate::error::VisionError;
use crate::models::{DetectorLoader, ModelManager};
use crate::processing::{aggregate, decode, infer, preprocess, resolve, weigh};
use chrono::Utc;
use nutrilens_core::{AnalysisResult, FoodItem};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub const FALLBACK_NAME: &str = "Mixed dish";
pub const FALLBACK_LOCALIZED_NAME: &str = "Смешанное блюдо";

/// Placeholder result returned when analysis fails.
pub fn fallback_result(message: impl Into<String>) -> AnalysisResult {
    let item = FoodItem {
        name: FALLBACK_NAME.to_string(),
        localized_name: FALLBACK_LOCALIZED_NAME.to_string(),
        confidence: 0.5,
        grams: 250,
        calories: 375,
        protein: 25.0,
        fat: 17.5,
        carbs: 37.5,
    };
    let total = item.nutrition();
    AnalysisResult {
        items: vec![item],
        total,
        error: Some(message.into()),
        timestamp: None,
    }
}

/// On-device analyzer owning the model manager.
pub struct FoodAnalyzer {
    manager: Arc<ModelManager>,
}

impl FoodAnalyzer {
    pub fn new(config: DetectionConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self {
            manager: Arc::new(ModelManager::new(Arc::new(config))),
        })
    }

    pub fn with_loader(
        config: DetectionConfig,
        loader: Arc<dyn DetectorLoader>,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self {
            manager: Arc::new(ModelManager::with_loader(Arc::new(config), loader)),
        })
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    pub fn is_model_loaded(&self) -> bool {
        self.manager.is_loaded()
    }

    pub fn unload(&self) {
        self.manager.unload();
    }

    /// Analyze a photo. Never fails: any stage error yields the fallback
    /// result carrying the error message.
    pub async fn analyze_food(&self, path: &Path) -> AnalysisResult {
        match self.try_analyze_food(path).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    VisionError::ImageAccess(_) | VisionError::Format(_) => {
                        warn!(stage = e.stage(), "Image rejected: {}", e)
                    }
                    VisionError::Inference(_) | VisionError::Ort(_) => {
                        error!(stage = e.stage(), "Inference failed: {}", e)
                    }
                    _ => error!(stage = e.stage(), "Analysis failed: {}", e),
                }
                warn!("Returning fallback result");
                fallback_result(e.to_string())
            }
        }
    }

    /// Same pipeline as [`analyze_food`](Self::analyze_food), errors propagated.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn try_analyze_food(&self, path: &Path) -> Result<AnalysisResult, VisionError> {
        let started = Instant::now();
        let config = self.manager.config();

        let handle = self.manager.ensure_loaded().await?;
        let classes = self.manager.class_table().await?;
        let allow_list = self.manager.allow_list().await?;
        let nutrition = self.manager.nutrition_table().await?;
        let translations = self.manager.translations().await?;

        let input = preprocess(path, handle.input_size()).await?;
        let predictions = infer(input, &handle).await?;
        let detections = decode(&predictions, &classes, &allow_list, config);
        drop(predictions);

        let items: Vec<FoodItem> = detections
            .into_iter()
            .map(|d| weigh(d, config.min_weight_grams, config.max_weight_grams))
            .map(|w| resolve(&w, &nutrition, &translations))
            .collect();
        let total = aggregate(&items);

        info!(
            items = items.len(),
            calories = total.calories,
            placeholder = handle.is_placeholder(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            items,
            total,
            error: None,
            timestamp: Some(Utc::now()),
        })
    }
}
