use thiserror::Error;

/// Errors surfaced by the editor core.
///
/// Validation errors are returned before anything is mutated, so a caller can
/// report them and carry on with the current document.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("the flowchart is empty, there is nothing to export")]
    EmptyGraph,

    #[error("invalid simplified flow: {0}")]
    InvalidFormat(String),

    #[error("root node '{0}' is not declared in `nodes`")]
    RootNotFound(String),

    #[error("not a flowchart project file: {0}")]
    NotAProject(String),

    #[error("engine import needs both a `.json` logic file and its `.uistate.json` companion")]
    MissingCompanion,

    #[error("history step {index} is out of range (tape holds {len} entries)")]
    HistoryStep { index: usize, len: usize },

    #[error("invalid editor configuration: {0}")]
    Config(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
