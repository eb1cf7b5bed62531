//! Subweave-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across subweave:
//!
//! - **Platform identifiers**: Detecting the runtime identifier (RID) used to
//!   select a toolset, e.g. `linux-x64` or `osx-arm64`
//! - **Path Utilities**: Per-user cache and state directories, and the
//!   executable-adjacent bundle directory
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use subweave_common::platform::Platform;
//! use subweave_common::paths::default_tool_file_name;
//!
//! let platform = Platform::parse("win-x64").unwrap();
//! assert_eq!(platform.rid(), "win-x64");
//! assert_eq!(default_tool_file_name("ffmpeg", "win-x64"), "ffmpeg.exe");
//! ```

pub mod error;
pub mod paths;
pub mod platform;

pub use error::{Error, Result};
pub use platform::{Arch, Os, Platform};
