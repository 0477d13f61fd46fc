use thiserror::Error;

/// Errors surfaced by the analyzer and its capability clients.
///
/// Generation failures are not listed here: a model that fails to answer is
/// reported through [`crate::generator::GenerationOutcome::Failed`] and the
/// pipeline keeps going.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to initialize {capability}: {message}")]
    Initialization {
        capability: &'static str,
        message: String,
    },

    #[error("{capability} is not ready, run initialization first")]
    NotReady { capability: &'static str },

    #[error("{capability} session is closed")]
    SessionClosed { capability: &'static str },

    #[error(
        "grammar checker returned invalid span {offset}+{length} for a {text_len} character text"
    )]
    ContractViolation {
        offset: usize,
        length: usize,
        text_len: usize,
    },

    #[error("grammar check failed: {0}")]
    Checker(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
