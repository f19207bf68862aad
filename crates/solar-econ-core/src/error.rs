use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarEconError {
    #[error("Unknown rate code: '{0}' (expected one of D, G, M, L)")]
    UnknownRateCode(String),

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid rate schedule {code}: {reason}")]
    InvalidRateSchedule { code: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// Must track the `UnknownRateCode` message above.
const UNKNOWN_RATE_CODE_PREFIX: &str = "Unknown rate code: '";
const UNKNOWN_RATE_CODE_SUFFIX: &str = "' (expected one of D, G, M, L)";

/// serde reports a failed `RateCode` conversion through its own error type;
/// recover the code so JSON callers see `UnknownRateCode` like `FromStr` does.
impl From<serde_json::Error> for SolarEconError {
    fn from(e: serde_json::Error) -> Self {
        let message = e.to_string();
        let unknown_code = message
            .strip_prefix(UNKNOWN_RATE_CODE_PREFIX)
            .and_then(|rest| rest.find(UNKNOWN_RATE_CODE_SUFFIX).map(|end| &rest[..end]));
        match unknown_code {
            Some(code) => SolarEconError::UnknownRateCode(code.to_string()),
            None => SolarEconError::SerializationError(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rate_code_survives_json_error() {
        let e = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(SolarEconError::from(e), SolarEconError::SerializationError(_)));

        let e: serde_json::Error = serde::de::Error::custom(SolarEconError::UnknownRateCode("X".into()));
        assert!(matches!(SolarEconError::from(e), SolarEconError::UnknownRateCode(ref c) if c == "X"));
    }
}
