// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that `low <= high`
    pub fn ordered<T: PartialOrd + std::fmt::Display>(
        low: T,
        high: T,
        low_field: &str,
        high_field: &str,
    ) -> Result<()> {
        if low > high {
            return Err(ConfigError::ValidationError(format!(
                "{} ({}) must not exceed {} ({})",
                low_field, low, high_field, high
            )));
        }
        Ok(())
    }

    /// Validate that a number is non-zero
    pub fn positive(value: u32, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }
}
