use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use subweave::config::ToolsConfig;
use subweave_av::ProbeBackend;

#[derive(Parser)]
#[command(name = "subweave")]
#[command(author, version, about = "Provision and drive ffmpeg and mkvtoolnix")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Tool settings that override the config file.
#[derive(Args, Debug, Default)]
pub struct ToolArgs {
    /// Path to ffmpeg
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe
    #[arg(long, global = true, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    /// Path to mkvmerge
    #[arg(long, global = true, value_name = "PATH")]
    pub mkvmerge: Option<PathBuf>,

    /// Path to mkvpropedit
    #[arg(long, global = true, value_name = "PATH")]
    pub mkvpropedit: Option<PathBuf>,

    /// Look on PATH before bundled or cached toolsets
    #[arg(long, global = true)]
    pub prefer_path: bool,

    /// Never use bundled or cached toolsets
    #[arg(long, global = true)]
    pub no_bundled: bool,

    /// Root directory for extracted toolsets
    #[arg(long, global = true, value_name = "DIR")]
    pub tools_cache_dir: Option<PathBuf>,
}

impl ToolArgs {
    /// Apply command-line values on top of file settings.
    pub fn apply(&self, tools: &mut ToolsConfig) {
        let overrides = [
            (&self.ffmpeg, &mut tools.ffmpeg),
            (&self.ffprobe, &mut tools.ffprobe),
            (&self.mkvmerge, &mut tools.mkvmerge),
            (&self.mkvpropedit, &mut tools.mkvpropedit),
        ];
        for (arg, slot) in overrides {
            if let Some(path) = arg {
                *slot = Some(path.clone());
            }
        }

        if self.prefer_path {
            tools.prefer_path = true;
        }
        if self.no_bundled {
            tools.prefer_bundled = false;
        }
        if let Some(dir) = &self.tools_cache_dir {
            tools.cache_dir = Some(dir.clone());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how each external tool resolves
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Probe tool to use (defaults to the config file's choice)
        #[arg(long, value_parser = parse_backend)]
        backend: Option<ProbeBackend>,
    },

    /// Extract and verify the toolset for a platform now
    Provision {
        /// Platform identifier (defaults to the running platform)
        #[arg(long)]
        rid: Option<String>,
    },

    /// Delete every extracted toolset
    CleanCache,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        #[arg(value_name = "CONFIG")]
        file: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn parse_backend(s: &str) -> Result<ProbeBackend, String> {
    ProbeBackend::from_tool_name(s)
        .ok_or_else(|| format!("unknown backend '{}' (expected ffprobe or mkvmerge)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_args_apply() {
        let cli = Cli::parse_from([
            "subweave",
            "--ffprobe",
            "/opt/bin/ffprobe",
            "--no-bundled",
            "status",
        ]);
        let mut tools = ToolsConfig {
            mkvmerge: Some(PathBuf::from("/usr/bin/mkvmerge")),
            ..Default::default()
        };
        cli.tools.apply(&mut tools);

        assert_eq!(tools.ffprobe, Some(PathBuf::from("/opt/bin/ffprobe")));
        assert_eq!(tools.mkvmerge, Some(PathBuf::from("/usr/bin/mkvmerge")));
        assert!(!tools.prefer_bundled);
        assert!(!tools.prefer_path);
    }

    #[test]
    fn test_backend_flag() {
        let cli = Cli::parse_from(["subweave", "probe", "a.mkv", "--backend", "mkvmerge"]);
        match cli.command {
            Commands::Probe { backend, .. } => assert_eq!(backend, Some(ProbeBackend::Mkvmerge)),
            _ => panic!("expected probe"),
        }
        assert!(Cli::try_parse_from(["subweave", "probe", "a.mkv", "--backend", "x"]).is_err());
    }
}
