use serde::{Deserialize, Serialize};

/// Remote analysis service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Analysis endpoint; receives `POST {"image": "<base64 jpeg>"}`
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Photos are resized to this square side before upload
    pub max_image_dimension: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/".to_string(),
            timeout_secs: 60,
            max_image_dimension: 1024,
            jpeg_quality: 80,
        }
    }
}

impl CloudConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() || self.endpoint.len() > 2048 {
            return Err("Endpoint must be a non-empty URL".to_string());
        }

        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err("Endpoint must use http or https".to_string());
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err("Timeout must be between 1 and 600 seconds".to_string());
        }

        if self.max_image_dimension == 0 || self.max_image_dimension > 4096 {
            return Err("Max image dimension must be between 1 and 4096".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        Ok(())
    }
}
