mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use subweave_av::tools::ToolKind;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    expand_paths(&mut config.tools);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./subweave.toml", "~/.config/subweave/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let tools = &config.tools;

    for kind in ToolKind::ALL {
        if let Some(path) = tools.override_for(kind) {
            if path.as_os_str().to_string_lossy().trim().is_empty() {
                return Err(subweave_av::Error::configuration(format!(
                    "tools.{} is set but empty",
                    kind
                ))
                .into());
            }
        }
    }

    if tools.lock_timeout_secs > MAX_LOCK_TIMEOUT_SECS {
        return Err(subweave_av::Error::configuration(format!(
            "tools.lock_timeout_secs must be at most {} (got {})",
            MAX_LOCK_TIMEOUT_SECS, tools.lock_timeout_secs
        ))
        .into());
    }

    if config.startup.check_interval_hours > MAX_CHECK_INTERVAL_HOURS {
        return Err(subweave_av::Error::configuration(format!(
            "startup.check_interval_hours must be at most {}",
            MAX_CHECK_INTERVAL_HOURS
        ))
        .into());
    }

    if let Some(dir) = &tools.package_dir {
        if !dir.exists() {
            tracing::warn!("Package directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}

/// Expand `~` in every configured path.
fn expand_paths(tools: &mut ToolsConfig) {
    for kind in ToolKind::ALL {
        let slot = tools.override_slot(kind);
        *slot = slot.take().map(expand_tilde);
    }
    tools.cache_dir = tools.cache_dir.take().map(expand_tilde);
    tools.package_dir = tools.package_dir.take().map(expand_tilde);
}

fn expand_tilde(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use subweave_av::ProbeBackend;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.tools.prefer_bundled);
        assert!(!config.tools.prefer_path);
        assert_eq!(config.tools.lock_timeout_secs, 10);
        assert_eq!(config.probe.backend, ProbeBackend::Ffprobe);
        assert_eq!(config.startup.check_interval_hours, 24);
    }

    #[test]
    fn test_load_tools_section() {
        let file = write_config(
            r#"
[tools]
ffprobe = "/opt/ffmpeg/bin/ffprobe"
prefer_path = true
lock_timeout_secs = 30

[probe]
backend = "mkvmerge"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.tools.ffprobe.as_deref(),
            Some(Path::new("/opt/ffmpeg/bin/ffprobe"))
        );
        assert!(config.tools.prefer_path);
        assert!(config.tools.prefer_bundled);
        assert_eq!(config.tools.lock_timeout().as_secs(), 30);
        assert_eq!(config.probe.backend, ProbeBackend::Mkvmerge);

        let overrides = config.tools.overrides();
        assert_eq!(
            overrides.get(ToolKind::Ffprobe),
            Some(Path::new("/opt/ffmpeg/bin/ffprobe"))
        );
        assert_eq!(overrides.get(ToolKind::Ffmpeg), None);
    }

    #[test]
    fn test_empty_override_rejected() {
        let file = write_config("[tools]\nmkvmerge = \"\"\n");
        let err = load_config(file.path()).unwrap_err();
        let av = err.downcast_ref::<subweave_av::Error>().unwrap();
        assert!(matches!(av, subweave_av::Error::Configuration(_)));
    }

    #[test]
    fn test_lock_timeout_bounded() {
        let file = write_config("[tools]\nlock_timeout_secs = 301\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let file = write_config("[probe]\nbackend = \"mediainfo\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_tilde_expanded() {
        let file = write_config("[tools]\ncache_dir = \"~/subweave-cache\"\n");
        let config = load_config(file.path()).unwrap();
        let cache_dir = config.tools.cache_dir.unwrap();
        assert!(!cache_dir.starts_with("~"));
        assert!(cache_dir.ends_with("subweave-cache"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/subweave.toml"))).is_err());
    }
}
