//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.render.scale.is_finite() || self.render.scale <= 0.0 {
            return Err(ConfigError::ValidationError(
                "render.scale must be a positive number".into(),
            ));
        }
        if self.recognition.languages.is_empty() {
            return Err(ConfigError::ValidationError(
                "recognition.languages must not be empty".into(),
            ));
        }
        if let Some(psm) = self.recognition.page_segmentation_mode {
            if psm > 13 {
                return Err(ConfigError::ValidationError(
                    "recognition.page_segmentation_mode must be between 0 and 13".into(),
                ));
            }
        }
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.page_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.page_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.max_page_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_page_dimension must be > 0".into(),
            ));
        }
        Ok(())
    }
}
