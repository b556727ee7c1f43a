use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Слишком много запросов. Попробуйте через минуту.")]
    RateLimited,

    #[error("Некорректное изображение. Попробуйте другое фото.")]
    BadImage,

    #[error("Ошибка анализа: {message}")]
    Http { status: u16, message: String },

    /// The service answered with an `error` field.
    #[error("{0}")]
    Service(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Image file not found: {0}")]
    ImageNotFound(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            CloudError::RateLimited.to_string(),
            "Слишком много запросов. Попробуйте через минуту."
        );
        assert_eq!(
            CloudError::BadImage.to_string(),
            "Некорректное изображение. Попробуйте другое фото."
        );
        let err = CloudError::Http {
            status: 502,
            message: "HTTP 502".to_string(),
        };
        assert_eq!(err.to_string(), "Ошибка анализа: HTTP 502");
    }
}
