//! Common error types used throughout subweave.
//!
//! These cover failures that happen before any tool is touched: the
//! environment does not let us work out where caches or state belong.

/// Common error type for subweave.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directory or setting could not be determined.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The platform is not one we ship toolsets for.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new UnsupportedPlatform error.
    pub fn unsupported_platform<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedPlatform(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
