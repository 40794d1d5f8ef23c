use thiserror::Error;

use crate::{
    config::LoadError, infra::error::InfraError, pipeline::LookupError,
    preferences::PreferenceLoadError, remote::FetchError, store::StoreError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Preferences(#[from] PreferenceLoadError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Client(#[from] FetchError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short message suitable for showing to an end user.
    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Lookup(_) | AppError::Client(_) => {
                "No examples found. The dictionary API may be down."
            }
            AppError::Store(StoreError::Unavailable(_)) => {
                "The local example cache is unavailable. Close other sessions and retry."
            }
            AppError::Store(_) => "The local example cache failed.",
            AppError::Config(_) | AppError::Preferences(_) => "Invalid configuration.",
            AppError::Infra(_) | AppError::Unexpected(_) => "Unexpected error.",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::validation::ValidationFailure;

    use super::*;

    #[test]
    fn lookup_failures_present_as_api_down() {
        let exhausted = AppError::from(LookupError::Exhausted {
            attempts: 5,
            reason: ValidationFailure::BlankApi,
        });
        assert_eq!(
            exhausted.presentation_message(),
            "No examples found. The dictionary API may be down."
        );
        assert_eq!(
            exhausted.to_string(),
            "no valid response after 5 attempts: blank api"
        );

        let http = AppError::from(LookupError::from(FetchError::Status(502)));
        assert_eq!(
            http.presentation_message(),
            "No examples found. The dictionary API may be down."
        );
    }

    #[test]
    fn blocked_store_presents_retry_hint() {
        let err = AppError::from(StoreError::unavailable("destroy blocked by 1 open handle(s)"));
        assert!(err.presentation_message().contains("retry"));
    }
}
