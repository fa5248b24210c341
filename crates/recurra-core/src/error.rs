use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecurraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown {kind}: {value}")]
    UnknownDiscriminator { kind: &'static str, value: String },
}

impl RecurraError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            RecurraError::Config(_) => "CONFIG_ERROR",
            RecurraError::UnknownDiscriminator { .. } => "UNKNOWN_DISCRIMINATOR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RecurraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RecurraError::Config("bad".into()).code(), "CONFIG_ERROR");
        let err = RecurraError::UnknownDiscriminator {
            kind: "startup type",
            value: "Weekly".into(),
        };
        assert_eq!(err.code(), "UNKNOWN_DISCRIMINATOR");
        assert_eq!(err.to_string(), "Unknown startup type: Weekly");
    }
}
