use thiserror::Error;

use crate::nova::ApiError;
use crate::state_machine::RunState;

#[derive(Debug, Error)]
pub enum NovaFetchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Environment variable '{0}' not found. Set it to your nova.astrometry.net API key.")]
    MissingToken(&'static str),

    #[error("Nova API error: {0}")]
    Api(#[from] ApiError),

    #[error("Submission {0} reported calibrated but listed no job id")]
    MissingJobId(String),

    #[error("Invalid run transition: {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid novafetch.toml: {0}")]
    Toml(#[from] toml::de::Error),
}

impl NovaFetchError {
    /// Configuration problems are detected before any network activity.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NovaFetchError::Config(_) | NovaFetchError::MissingToken(_) | NovaFetchError::Toml(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_display_names_variable() {
        let err = NovaFetchError::MissingToken("novatoken");
        assert!(err.to_string().contains("'novatoken'"));
        assert!(err.is_configuration());
    }

    #[test]
    fn api_error_converts() {
        let err: NovaFetchError = ApiError::Upload {
            status: "error".into(),
            message: "denied".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Nova API error: upload failed (status error): denied"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn invalid_transition_display() {
        let err = NovaFetchError::InvalidTransition {
            from: RunState::Idle,
            to: RunState::Done,
        };
        assert_eq!(err.to_string(), "Invalid run transition: IDLE -> DONE");
    }
}
