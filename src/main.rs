mod cli;

use subweave::{config, probe, state};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use subweave_av::tools::{CacheStatus, ToolPathsResolved};
use subweave_av::{MediaInfo, ProbeBackend, TrackType};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "subweave=trace,subweave_av=trace,subweave_common=debug".to_string()
        } else {
            "subweave=info,subweave_av=info".to_string()
        }
    });

    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Status { json } => {
            let config = load_config(&cli)?;
            show_status(&config, json)
        }
        Commands::Probe {
            ref file,
            json,
            backend,
        } => {
            let config = load_config(&cli)?;
            let backend = backend.unwrap_or(config.probe.backend);
            probe_file(&config, file, backend, json)
        }
        Commands::Provision { ref rid } => {
            let config = load_config(&cli)?;
            provision(&config, rid.as_deref())
        }
        Commands::CleanCache => {
            let config = load_config(&cli)?;
            clean_cache(&config)
        }
        Commands::Validate { ref file } => {
            let path = file.as_deref().or(cli.config.as_deref());
            validate_config(path)
        }
        Commands::Version => {
            println!("subweave {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config file, then apply command-line tool settings.
fn load_config(cli: &Cli) -> Result<config::Config> {
    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    cli.tools.apply(&mut config.tools);
    config::validate_config(&config)?;
    Ok(config)
}

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    tools: ToolPathsResolved,
    cache: CacheStatus,
    toolset_changed: bool,
}

fn show_status(config: &config::Config, json: bool) -> Result<()> {
    let resolver = probe::build_resolver(&config.tools)?;
    let resolved = resolver.resolve_all(&config.tools.overrides())?;
    let cache = resolver.bundles().status(resolver.rid());

    let (previous, toolset_changed) = match state::StartupState::default_path() {
        Ok(path) => record_startup(config, &path, &resolved),
        Err(e) => {
            tracing::warn!("No state directory: {:#}", e);
            (state::StartupState::default(), false)
        }
    };

    if json {
        let report = StatusReport {
            tools: resolved,
            cache,
            toolset_changed,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Platform: {}", resolved.runtime_rid);
    if resolved.toolset_version.is_empty() {
        println!("Toolset: (none packaged)");
    } else {
        println!("Toolset: {}", resolved.toolset_version);
    }
    if let (true, Some(was)) = (toolset_changed, &previous.toolset_version) {
        println!("  changed since last run (was {})", was);
    }

    println!("\nTools:");
    for (kind, resolution) in resolved.iter() {
        println!(
            "  {:<12} {:<10} {}",
            kind.name(),
            resolution.source.to_string(),
            resolution.path.display()
        );
    }

    println!("\nCache: {}", cache.cache_root.display());
    match &cache.version_dir {
        Some(dir) => {
            let label = match (cache.present, cache.verified) {
                (true, true) => "verified",
                (true, false) => "present, failed verification",
                _ => "not extracted",
            };
            println!("  {} ({})", dir.display(), label);
        }
        None => println!("  no toolset for this platform"),
    }

    Ok(())
}

/// Compare with the previous run and record this one if due.
fn record_startup(
    config: &config::Config,
    path: &Path,
    resolved: &ToolPathsResolved,
) -> (state::StartupState, bool) {
    let tracker = state::StartupTracker::new(path);
    let previous = tracker.load();
    let changed = previous.toolset_changed(&resolved.toolset_version);

    let now = chrono::Utc::now();
    if changed || previous.should_check(now, config.startup.check_interval()) {
        if let Err(e) = tracker.record(now, &resolved.runtime_rid, &resolved.toolset_version) {
            tracing::warn!("Failed to record startup state: {:#}", e);
        }
    }
    (previous, changed)
}

fn probe_file(config: &config::Config, file: &Path, backend: ProbeBackend, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = probe::resolve_tools(&config.tools)?;
    let media_info = probe::probe_file(&tools, file, backend)?;

    if json {
        let json_str = serde_json::to_string_pretty(&media_info)?;
        println!("{}", json_str);
    } else {
        print_media_info(&media_info);
    }

    Ok(())
}

fn print_media_info(media_info: &MediaInfo) {
    println!("File: {}", media_info.file_path.display());
    if let Some(ref container) = media_info.container {
        println!("Container: {}", container);
    }
    if let Some(size) = media_info.size_bytes {
        println!("Size: {} bytes", size);
    }
    if let Some(ref duration) = media_info.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }

    for track_type in [TrackType::Video, TrackType::Audio, TrackType::Subtitle] {
        let tracks: Vec<_> = media_info.tracks_of(track_type).collect();
        println!("\n{} tracks: {}", track_type, tracks.len());
        for track in tracks {
            print!("  [{}] {}", track.index, track.codec);
            for value in track.extra.values() {
                print!(" {}", value);
            }
            if let Some(ref lang) = track.language {
                print!(" ({})", lang);
            }
            if let Some(ref title) = track.title {
                print!(" \"{}\"", title);
            }
            if track.is_forced {
                print!(" [forced]");
            }
            if track.is_default {
                print!(" [default]");
            }
            println!();
        }
    }

    if !media_info.attachments.is_empty() {
        println!("\nAttachments: {}", media_info.attachments.len());
        for attachment in &media_info.attachments {
            print!("  {}", attachment.file_name);
            if let Some(ref mime) = attachment.mime_type {
                print!(" ({})", mime);
            }
            println!();
        }
    }
}

fn provision(config: &config::Config, rid: Option<&str>) -> Result<()> {
    let resolver = probe::build_resolver(&config.tools)?;
    let rid = rid.unwrap_or(resolver.rid());

    let toolset = resolver.bundles().provision(rid)?;
    println!(
        "Toolset {} for {} ready in {}",
        resolver.bundles().toolset_version(),
        rid,
        toolset.base_directory.display()
    );
    for (kind, path) in toolset.paths.iter() {
        println!("  {:<12} {}", kind.name(), path.display());
    }
    Ok(())
}

fn clean_cache(config: &config::Config) -> Result<()> {
    let resolver = probe::build_resolver(&config.tools)?;
    let root = resolver.bundles().cache_root().to_path_buf();

    if resolver.bundles().clean_cache()? {
        println!("Removed {}", root.display());
    } else {
        println!("Nothing to remove at {}", root.display());
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_tools_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_tools_config(&config);
        }
    }

    Ok(())
}

fn print_tools_config(config: &config::Config) {
    let tools = &config.tools;
    println!("  Prefer bundled: {}", tools.prefer_bundled);
    println!("  Prefer PATH: {}", tools.prefer_path);
    println!("  Lock timeout: {}s", tools.lock_timeout_secs);
    println!("  Probe backend: {}", config.probe.backend);
    for kind in subweave_av::ToolKind::ALL {
        if let Some(path) = tools.override_for(kind) {
            println!("  Override {}: {}", kind, path.display());
        }
    }
}
