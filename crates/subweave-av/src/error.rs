//! Error types for subweave-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning tools or probing media.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings supplied by the caller are malformed or missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A toolset failed hash verification, or an archive tried to write
    /// outside its destination.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// A toolset could not be made available (archive missing, extraction
    /// I/O failure, extraction lock unavailable).
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    /// A tool succeeded but its output did not match the expected schema.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an integrity error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    /// Create a provisioning error.
    pub fn provisioning(message: impl Into<String>) -> Self {
        Self::Provisioning(message.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Whether resolution may fall through to the next tier after this
    /// error. Integrity and configuration failures never degrade.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Provisioning(_) | Self::Io(_))
    }
}

impl From<subweave_common::Error> for Error {
    fn from(err: subweave_common::Error) -> Self {
        match err {
            subweave_common::Error::Io(e) => Error::Io(e),
            other => Error::Configuration(other.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Provisioning(format!("archive error: {err}"))
    }
}
