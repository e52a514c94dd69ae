//! Optional field validation
//!
//! The schema accepts any name, comment or price short of NaN, which both
//! stores reject as a missing value. Strict mode adds the checks an
//! application usually wants on top.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Permissive,
    Strict,
}

impl FromStr for ValidationMode {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(ValidationMode::Permissive),
            "strict" => Ok(ValidationMode::Strict),
            other => Err(RatingError::Config(format!(
                "unknown validation mode: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    mode: ValidationMode,
}

impl Validator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn name(&self, field: &str, value: &str) -> Result<()> {
        if self.mode == ValidationMode::Strict && value.trim().is_empty() {
            return Err(RatingError::Validation(format!("{} must not be blank", field)));
        }
        Ok(())
    }

    pub fn price(&self, price: f64) -> Result<()> {
        if self.mode == ValidationMode::Strict && !(price.is_finite() && price >= 0.0) {
            return Err(RatingError::Validation(format!(
                "price must be a non-negative number, got {}",
                price
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_accepts_anything() {
        let v = Validator::default();
        assert!(v.name("name", "").is_ok());
        assert!(v.price(-3.0).is_ok());
        assert!(v.price(f64::NAN).is_ok());
    }

    #[test]
    fn test_strict_rejects_blank_and_negative() {
        let v = Validator::new(ValidationMode::Strict);
        assert!(v.name("name", "Ana").is_ok());
        assert!(matches!(v.name("name", "  "), Err(RatingError::Validation(_))));
        assert!(v.price(0.0).is_ok());
        assert!(matches!(v.price(-0.01), Err(RatingError::Validation(_))));
        assert!(matches!(v.price(f64::INFINITY), Err(RatingError::Validation(_))));
    }
}
