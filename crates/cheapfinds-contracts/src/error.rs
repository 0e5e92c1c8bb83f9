use thiserror::Error;

/// Failure reported by the remote provider or the HTTP layer in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither images nor description were supplied, or the request does not
    /// fit the mode it was sent through.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not encode image '{name}': {reason}")]
    Encoding { name: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed share token: {0}")]
    MalformedShareToken(String),
}

impl PipelineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn encoding(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable short label used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration",
            Self::Encoding { .. } => "encoding",
            Self::Transport(_) => "transport",
            Self::MalformedShareToken(_) => "malformed_share_token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineError, TransportError};

    #[test]
    fn transport_error_displays_provider_message_verbatim() {
        let err = PipelineError::from(TransportError::with_status(
            503,
            "UNAVAILABLE: model overloaded",
        ));
        assert_eq!(err.to_string(), "UNAVAILABLE: model overloaded");
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn encoding_error_names_the_blob() {
        let err = PipelineError::encoding("shoe.heic", "unrecognised image data");
        assert_eq!(
            err.to_string(),
            "could not encode image 'shoe.heic': unrecognised image data"
        );
    }
}
