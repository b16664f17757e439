//! Analysis types.
//!
//! Each analysis type selects one agent persona and one task template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BtaError;

/// Query used when the caller doesn't supply one.
pub const DEFAULT_QUERY: &str = "Summarise my Blood Test Report";

/// The fixed set of analyses the service offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Summary,
    Nutrition,
    Exercise,
    Verification,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        Self::Summary,
        Self::Nutrition,
        Self::Exercise,
        Self::Verification,
    ];

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Nutrition => "nutrition",
            Self::Exercise => "exercise",
            Self::Verification => "verification",
        }
    }

    /// Parse an optional form value; missing or blank means [`AnalysisType::Summary`].
    pub fn parse_optional(value: Option<&str>) -> Result<Self, BtaError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for AnalysisType {
    type Err = BtaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "nutrition" => Ok(Self::Nutrition),
            "exercise" => Ok(Self::Exercise),
            "verification" => Ok(Self::Verification),
            _ => Err(BtaError::UnknownAnalysisType(s.to_string())),
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim a caller's query, falling back to [`DEFAULT_QUERY`] when blank.
pub fn normalize_query(query: Option<&str>) -> String {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => DEFAULT_QUERY.to_string(),
    }
}
