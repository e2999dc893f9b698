use thiserror::Error;

/// Rejected caption store mutation. Indicates a caller bug; nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("caption slot {index} out of range (template has {box_count} boxes)")]
    IndexOutOfRange { index: usize, box_count: usize },
}

/// Failure of a single render attempt.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendering service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rendering service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rendering service rejected the request: {message}")]
    Rejected { message: String },
    #[error("malformed rendering response: {0}")]
    Malformed(String),
}

/// Failure of a caption generation attempt.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to build generation prompt: {0}")]
    Prompt(#[from] handlebars::RenderError),
    #[error("text generation service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("text generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed text generation response: {0}")]
    Malformed(String),
}

/// Errors surfaced to callers of the editor handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("no template is being edited")]
    NoSession,
    #[error("caption generation already in progress")]
    GenerationInProgress,
    #[error(transparent)]
    Caption(#[from] CaptionError),
    #[error("editor has shut down")]
    Closed,
}
