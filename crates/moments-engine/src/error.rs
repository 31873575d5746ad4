use thiserror::Error;

use crate::http::error_chain_text;

const ERROR_TEXT_MAX_CHARS: usize = 600;

/// Failure kinds a provider or the session can report. The retry wrapper
/// passes these through unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Image pipeline failed: remote error, empty payload or non-normal stop.
    #[error("{0}")]
    Generation(String),
    /// Vision analysis produced no usable text.
    #[error("{0}")]
    Description(String),
    /// Text endpoint produced no usable text.
    #[error("{0}")]
    TextGeneration(String),
    /// Missing or malformed credential; no request was attempted.
    #[error("{0}")]
    Auth(String),
    /// The user asked for something the current state cannot do.
    #[error("{0}")]
    Validation(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generation",
            Self::Description(_) => "description",
            Self::TextGeneration(_) => "text_generation",
            Self::Auth(_) => "auth",
            Self::Validation(_) => "validation",
        }
    }

    pub fn generation(err: anyhow::Error) -> Self {
        Self::Generation(error_chain_text(&err, ERROR_TEXT_MAX_CHARS))
    }

    pub fn description(err: anyhow::Error) -> Self {
        Self::Description(error_chain_text(&err, ERROR_TEXT_MAX_CHARS))
    }

    pub fn text_generation(err: anyhow::Error) -> Self {
        Self::TextGeneration(error_chain_text(&err, ERROR_TEXT_MAX_CHARS))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::EngineError;

    #[test]
    fn conversions_keep_the_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("connection reset"))
            .context("Zhipu request failed")
            .err()
            .map(EngineError::generation);
        assert_eq!(
            err,
            Some(EngineError::Generation(
                "Zhipu request failed | caused by: connection reset".to_string()
            ))
        );
    }

    #[test]
    fn display_is_the_bare_message() {
        let err = EngineError::Auth("Invalid Zhipu API Key format".to_string());
        assert_eq!(err.to_string(), "Invalid Zhipu API Key format");
        assert_eq!(err.kind(), "auth");
    }
}
