use thiserror::Error;

/// Errors produced by the studykit libraries.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for StudyError {
    fn from(e: serde_json::Error) -> Self {
        StudyError::Codec(e.to_string())
    }
}

pub type StudyResult<T> = Result<T, StudyError>;
