use thiserror::Error;

#[derive(Error, Debug)]
pub enum CondenseError {
    #[error("Invalid timecode: {0}")]
    Format(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Clip extraction failed: {0}")]
    Extraction(String),

    #[error("Concatenation failed: {0}")]
    Concatenation(String),

    #[error("No dialogue found in {0}")]
    NoDialogue(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Conversion cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CondenseError>;
