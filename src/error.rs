use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudySyncError {
    #[error("Not in a studysync project. Run 'studysync init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .studysync/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("No note at position {index} (collection has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network sync failed: {0}")]
    NetworkSync(String),

    #[error("Wireless not supported on this platform")]
    WirelessUnsupported,

    #[error("Wireless connection failed: {0}")]
    WirelessConnect(String),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StudySyncError>;
