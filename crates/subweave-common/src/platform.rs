//! Runtime identifiers (RIDs) for the platforms toolsets are built for.
//!
//! A RID is `<os>-<arch>`, using the names toolset archives are published
//! under: `linux-x64`, `linux-arm64`, `osx-x64`, `osx-arm64`, `win-x64`,
//! `win-arm64`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Get the platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns an error when the OS or architecture has no published toolset.
    pub fn current() -> Result<Self> {
        let os = Os::parse(std::env::consts::OS)
            .ok_or_else(|| Error::unsupported_platform(std::env::consts::OS))?;
        let arch = Arch::parse(std::env::consts::ARCH)
            .ok_or_else(|| Error::unsupported_platform(std::env::consts::ARCH))?;
        Ok(Self { os, arch })
    }

    /// Parse from a RID like "osx-arm64". Matching is case-insensitive.
    pub fn parse(rid: &str) -> Option<Self> {
        let (os, arch) = rid.split_once('-')?;
        Some(Self {
            os: Os::parse(os)?,
            arch: Arch::parse(arch)?,
        })
    }

    /// The RID string for this platform.
    #[must_use]
    pub fn rid(&self) -> String {
        self.to_string()
    }

    /// Whether executables on this platform need an `.exe` suffix and
    /// no POSIX permission bits.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Parse from a RID component or `std::env::consts::OS`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "osx" | "macos" | "darwin" => Some(Self::MacOs),
            "win" | "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "osx"),
            Self::Windows => write!(f, "win"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    /// Parse from a RID component or `std::env::consts::ARCH`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Some(Self::X64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X64 => write!(f, "x64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Whether a RID names a Windows platform.
///
/// Unknown RIDs are treated as non-Windows.
#[must_use]
pub fn is_windows_rid(rid: &str) -> bool {
    Platform::parse(rid).is_some_and(|p| p.is_windows())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rids() {
        assert_eq!(
            Platform::parse("linux-x64"),
            Some(Platform::new(Os::Linux, Arch::X64))
        );
        assert_eq!(
            Platform::parse("OSX-ARM64"),
            Some(Platform::new(Os::MacOs, Arch::Arm64))
        );
        assert_eq!(
            Platform::parse("win-x64"),
            Some(Platform::new(Os::Windows, Arch::X64))
        );
        assert_eq!(Platform::parse("linux"), None);
        assert_eq!(Platform::parse("haiku-x64"), None);
        assert_eq!(Platform::parse("linux-mips"), None);
    }

    #[test]
    fn test_rid_roundtrip() {
        for rid in ["linux-x64", "linux-arm64", "osx-x64", "osx-arm64", "win-x64", "win-arm64"] {
            assert_eq!(Platform::parse(rid).unwrap().rid(), rid);
        }
    }

    #[test]
    fn test_is_windows_rid() {
        assert!(is_windows_rid("win-x64"));
        assert!(is_windows_rid("WIN-arm64"));
        assert!(!is_windows_rid("linux-x64"));
        assert!(!is_windows_rid("not-a-rid"));
    }

    #[test]
    fn test_current_matches_host() {
        // Only the supported hosts are expected to succeed.
        if let Ok(platform) = Platform::current() {
            assert_eq!(platform.is_windows(), cfg!(windows));
        }
    }
}
