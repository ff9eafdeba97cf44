use thiserror::Error;

/// Errors that can occur in the node tracker service.
#[derive(Error, Debug)]
pub enum NtsError {
    /// A register/heartbeat request failed an admission check.
    #[error("admission rejected: {0}")]
    Admission(String),

    /// The requesting node is unknown to the registry.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(String),

    /// Event bus publish or connect failure.
    #[error("event bus error: {0}")]
    EventBus(String),

    /// Key store access failure.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// Label or attribute propagation failure. Callers of the handlers
    /// catch this and fold it into `diagnosticsMessage` rather than
    /// aborting the request - see `handlers::heartbeat`.
    #[error("label/attribute propagation error: {0}")]
    Propagation(String),

    /// I/O failure (config file, secrets, etc).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Anything else - transport, registry panics surfaced as errors, etc.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, NtsError>;

impl From<serde_json::Error> for NtsError {
    fn from(err: serde_json::Error) -> Self {
        NtsError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for NtsError {
    fn from(err: config::ConfigError) -> Self {
        NtsError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for NtsError {
    fn from(err: anyhow::Error) -> Self {
        NtsError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NtsError::Admission("version too old".to_string());
        assert_eq!(err.to_string(), "admission rejected: version too old");
    }

    #[test]
    fn test_error_from_json() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: NtsError = bad.unwrap_err().into();
        assert!(matches!(err, NtsError::Serialization(_)));
    }
}
