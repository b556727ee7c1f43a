//! HTTP client for the hosted food-analysis service

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ColorType;
use nutrilens_core::{AnalysisResult, FoodItem, NutritionTotals};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const UNKNOWN_DISH: &str = "Неизвестное блюдо";
const DEFAULT_GRAMS: f64 = 100.0;
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Remote analyzer. Errors are always returned, never replaced by a
/// placeholder result.
pub struct CloudAnalyzer {
    client: Client,
    config: CloudConfig,
}

impl CloudAnalyzer {
    pub fn new(config: CloudConfig) -> Result<Self> {
        config.validate().map_err(CloudError::Config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Upload the photo and return the service's normalized answer.
    pub async fn analyze_food_image(&self, path: &Path) -> Result<AnalysisResult> {
        if !path.exists() {
            return Err(CloudError::ImageNotFound(path.display().to_string()));
        }

        let encoded = self.encode_image(path.to_path_buf()).await?;
        debug!("Encoded image, base64 length {}", encoded.len());

        let started = Instant::now();
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&json!({ "image": encoded }))
            .send()
            .await?;
        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Service responded"
        );

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(status_error(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CloudError::InvalidResponse(format!("body is not JSON: {}", e)))?;
        let result = normalize_response(&body)?;

        info!(
            items = result.items.len(),
            calories = result.total.calories,
            "Remote analysis complete"
        );
        Ok(result)
    }

    /// `OPTIONS` the endpoint; any failure means unavailable.
    pub async fn check_service_availability(&self) -> bool {
        match self
            .client
            .request(Method::OPTIONS, &self.config.endpoint)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Service unavailable: {}", e);
                false
            }
        }
    }

    async fn encode_image(&self, path: PathBuf) -> Result<String> {
        let side = self.config.max_image_dimension;
        let quality = self.config.jpeg_quality;
        tokio::task::spawn_blocking(move || encode_jpeg_base64(&path, side, quality))
            .await
            .map_err(|e| CloudError::Image(format!("Encoder task failed: {}", e)))?
    }
}

/// Decode, hard-resize to `side x side`, JPEG-encode and base64 the photo.
pub fn encode_jpeg_base64(path: &Path, side: u32, quality: u8) -> Result<String> {
    let image = image::open(path).map_err(|e| CloudError::Image(e.to_string()))?;
    let rgb = image.resize_exact(side, side, FilterType::Triangle).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| CloudError::Image(e.to_string()))?;

    Ok(STANDARD.encode(jpeg))
}

fn status_error(status: StatusCode, body: &Value) -> CloudError {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    error!(status = status.as_u16(), "Service error: {}", message);

    match status {
        StatusCode::TOO_MANY_REQUESTS => CloudError::RateLimited,
        StatusCode::BAD_REQUEST => CloudError::BadImage,
        _ => CloudError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// Validate the service body and fill in missing item fields.
pub fn normalize_response(body: &Value) -> Result<AnalysisResult> {
    if let Some(message) = body.get("error").filter(|e| !e.is_null()) {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(CloudError::Service(message));
    }

    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| CloudError::InvalidResponse("missing items array".to_string()))?;
    let total = body
        .get("total")
        .filter(|t| t.is_object())
        .ok_or_else(|| CloudError::InvalidResponse("missing total object".to_string()))?;

    let items: Vec<FoodItem> = items.iter().map(normalize_item).collect();
    let total = NutritionTotals {
        calories: to_calories(number_or(total.get("calories"), 0.0)),
        protein: number_or(total.get("protein"), 0.0),
        fat: number_or(total.get("fat"), 0.0),
        carbs: number_or(total.get("carbs"), 0.0),
    };

    Ok(AnalysisResult::new(items, total))
}

fn normalize_item(item: &Value) -> FoodItem {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let name = text("name").unwrap_or_else(|| UNKNOWN_DISH.to_string());
    let localized_name = text("ru_name").unwrap_or_else(|| name.clone());

    FoodItem {
        name,
        localized_name,
        confidence: number_or(item.get("confidence"), DEFAULT_CONFIDENCE) as f32,
        grams: number_or(item.get("grams"), DEFAULT_GRAMS).round().max(0.0) as u32,
        calories: to_calories(number_or(item.get("calories"), 0.0)),
        protein: number_or(item.get("protein"), 0.0),
        fat: number_or(item.get("fat"), 0.0),
        carbs: number_or(item.get("carbs"), 0.0),
    }
}

/// Number or numeric string; missing, zero and non-numeric give `default`.
fn number_or(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite() && *v != 0.0)
        .unwrap_or(default)
}

fn to_calories(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
