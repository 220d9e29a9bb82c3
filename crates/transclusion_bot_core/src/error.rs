use thiserror::Error;

/// Failures that end a run. Per-page edit failures are not errors; they are
/// reported as [`crate::submit::EditOutcome`] values.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("failed to query transclusions: {0}")]
    Discovery(String),
    #[error(
        "failed to get any pages transcluding Template:{template}. Is the template transcluded anywhere?"
    )]
    NoTranscludingPages { template: String },
}

impl BotError {
    pub(crate) fn discovery(error: &anyhow::Error) -> Self {
        Self::Discovery(format!("{error:#}"))
    }

    pub(crate) fn authentication(error: &anyhow::Error) -> Self {
        Self::Authentication(format!("{error:#}"))
    }
}

pub type BotResult<T> = Result<T, BotError>;
