use thiserror::Error;

/// Reasons a raw card configuration is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` range is empty: min {min} must be below max {max}")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("expected exactly 2 gauges, got {0}")]
    GaugeCount(usize),

    #[error("unknown card type `{0}`")]
    UnknownCardType(String),

    #[error("malformed configuration: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
