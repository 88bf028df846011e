mod client;
mod extract;

pub use client::{DishIdentifier, VisionClient};
pub use extract::extract_nutrition;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fully-populated nutrition estimate for one identified dish.
/// Extraction guarantees every field is present and in range; there is
/// no partially-populated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub dish_name: String,
    pub confidence: f64,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Failure classification for the identification pipeline. None of these
/// are retried here; retry policy belongs to the caller, steered by
/// [`IdentifyError::is_retryable`].
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("AI service rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("AI service credits exhausted. Please add credits to continue.")]
    QuotaExhausted,
    #[error("dish identification failed: {0}")]
    Upstream(String),
    #[error("no response from AI")]
    EmptyResponse,
    #[error("invalid AI response format")]
    MalformedResponse,
    #[error("invalid image: {0}")]
    InvalidImage(&'static str),
}

impl IdentifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdentifyError::RateLimited | IdentifyError::Upstream(_) | IdentifyError::EmptyResponse
        )
    }
}

/// Upfront payload check shared by the coordinator and the client, so a
/// bad request never reaches the object store or the upstream model.
pub fn validate_image(image: &[u8], media_type: &str) -> Result<(), IdentifyError> {
    if image.is_empty() {
        return Err(IdentifyError::InvalidImage("image payload is empty"));
    }
    if !media_type.starts_with("image/") {
        return Err(IdentifyError::InvalidImage("media type is not an image"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(IdentifyError::RateLimited.is_retryable());
        assert!(IdentifyError::Upstream("boom".into()).is_retryable());
        assert!(IdentifyError::EmptyResponse.is_retryable());
        assert!(!IdentifyError::QuotaExhausted.is_retryable());
        assert!(!IdentifyError::MalformedResponse.is_retryable());
        assert!(!IdentifyError::InvalidImage("x").is_retryable());
    }

    #[test]
    fn validate_image_rejects_empty_payload() {
        let err = validate_image(&[], "image/jpeg").unwrap_err();
        assert!(matches!(err, IdentifyError::InvalidImage(_)));
    }

    #[test]
    fn validate_image_rejects_non_image_media_type() {
        let err = validate_image(b"fake", "application/pdf").unwrap_err();
        assert!(matches!(err, IdentifyError::InvalidImage(_)));
    }

    #[test]
    fn validate_image_accepts_image_types() {
        assert!(validate_image(b"fake", "image/jpeg").is_ok());
        assert!(validate_image(b"fake", "image/png").is_ok());
        assert!(validate_image(b"fake", "image/webp").is_ok());
    }
}
