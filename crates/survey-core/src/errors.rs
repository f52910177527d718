/// Core error type for the survey client.
///
/// Adapter crates map their specific errors into this type so the page
/// controller can turn every failure into a user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    #[error("could not identify the user")]
    UnresolvedIdentity,

    /// Existence check failed (transport fault or non-success status).
    #[error("{0}")]
    CheckFailed(String),

    /// Submission was rejected or never reached the server.
    #[error("{0}")]
    SubmitFailed(String),

    #[error("resume file is {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("resume file is required")]
    MissingResume,

    #[error("field is required: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, Error>;
