use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A latitude or longitude exactly as it was entered.
///
/// Stored as text so no digits are lost to binary floating point. Numbers are
/// only produced on read, through [`Coordinate::to_degrees`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "-2.578183")]
pub struct Coordinate(String);

impl Coordinate {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Parse the stored text as decimal degrees.
    ///
    /// Empty or unparsable text yields `None` instead of an error.
    #[must_use]
    pub fn to_degrees(&self) -> Option<f64> {
        parse_degrees(&self.0)
    }
}

/// Parse a stored coordinate column into decimal degrees.
pub(crate) fn parse_degrees(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Coordinate {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Coordinate {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        // Display for f64 prints the shortest text that round-trips.
        Self(value.to_string())
    }
}
