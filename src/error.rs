use thiserror::Error;

/// Failures surfaced to the user, one variant per boundary that can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormGenieError {
    /// The input was rejected before any network call was made.
    #[error("{0}")]
    Validation(String),

    /// A required credential or setting is missing.
    #[error("{0}")]
    Configuration(String),

    /// The model call failed or returned something that is not a form.
    #[error("{0}")]
    Generation(String),

    /// The OAuth flow was denied or returned no token.
    #[error("{0}")]
    Auth(String),

    /// A Forms API call failed. Carries the service message when there is one.
    #[error("{0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, FormGenieError>;
