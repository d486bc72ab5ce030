use thiserror::Error;

/// Failure kinds surfaced by the pipeline stages.
///
/// Every variant is terminal for the current run; only individual search
/// queries inside track matching recover locally (skip and continue).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no catalog entry matched the given title and author")]
    NotFound,

    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("could not parse mood profile: {0}")]
    Parse(String),

    #[error("no tracks matched the profile")]
    NoResults,

    #[error("authorization failed: {0}")]
    Auth(String),
}

impl PipelineError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }
}
