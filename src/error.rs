use std::path::PathBuf;

/// Message shown to the user for every generation failure. The underlying
/// cause is only ever logged.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate specification. Please check your API key and network connection.";

/// Why a generation request failed. Logged for diagnostics, never displayed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no text")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("{var} environment variable not set.")]
    MissingApiKey { var: String },

    #[error("Form file not found: {path}")]
    FormFileNotFound { path: PathBuf },

    #[error("Invalid form file {path}: {detail}")]
    InvalidFormFile { path: PathBuf, detail: String },

    #[error("Section id {id} appears more than once")]
    DuplicateSectionId { id: u32 },

    /// Display text is deliberately generic; `cause` carries the detail.
    #[error("{GENERATION_FAILED_MESSAGE}")]
    GenerationFailed { cause: GenerationFailure },

    #[error("A generation request is already in progress.")]
    GenerationInFlight,

    #[error("Failed to parse environment variable '{var}': {detail}")]
    ConfigEnvParseError { var: String, detail: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to write {path}: {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },
}
