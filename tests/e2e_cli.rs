//! CLI end-to-end tests
//!
//! Tests for the subweave command-line interface. Every command runs with
//! its cache and state directories redirected into a temp dir.

mod common;

use assert_cmd::prelude::*;
use common::{Package, VERSION};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use subweave_common::Platform;
use tempfile::{tempdir, TempDir};

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            root: tempdir().unwrap(),
        }
    }

    fn cache_dir(&self) -> std::path::PathBuf {
        self.root.path().join("cache")
    }

    /// A subweave command isolated from the user's directories and config.
    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("subweave").unwrap();
        cmd.current_dir(self.root.path())
            .env("SUBWEAVE_TOOLS_CACHE_DIR", self.cache_dir())
            .env("SUBWEAVE_STATE_DIR", self.root.path().join("state"))
            .env("HOME", self.root.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_config(&self, content: &str) -> std::path::PathBuf {
        let path = self.root.path().join("subweave.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn config_with_package(&self, package: &Path) -> std::path::PathBuf {
        self.write_config(&format!(
            "[tools]\npackage_dir = {:?}\nlock_timeout_secs = 30\n",
            package.to_str().unwrap()
        ))
    }
}

fn current_rid() -> String {
    Platform::current().unwrap().rid()
}

#[test]
fn test_cli_no_args_shows_help() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("subweave"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("subweave "));
}

#[test]
fn test_cli_status_with_override() {
    let sandbox = Sandbox::new();
    let ffprobe = sandbox.root.path().join("custom-ffprobe");

    sandbox
        .cmd()
        .args(["--no-bundled", "--ffprobe", ffprobe.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("override"))
        .stdout(predicate::str::contains("custom-ffprobe"))
        .stdout(predicate::str::contains("mkvpropedit"));
}

#[test]
fn test_cli_status_json_extracts_packaged_toolset() {
    let sandbox = Sandbox::new();
    let package = Package::new(&current_rid());
    let config = sandbox.config_with_package(package.path());

    let output = sandbox
        .cmd()
        .args(["--config", config.to_str().unwrap(), "status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["runtime_rid"], current_rid().as_str());
    assert_eq!(report["toolset_version"], VERSION);
    assert_eq!(report["mkvmerge"]["source"], "extracted");
    assert_eq!(report["cache"]["verified"], true);
    assert_eq!(report["toolset_changed"], false);

    assert!(sandbox.root.path().join("state/startup.json").is_file());
}

#[test]
fn test_cli_provision_and_clean_cache() {
    let sandbox = Sandbox::new();
    let package = Package::new(&current_rid());
    let config = sandbox.config_with_package(package.path());
    let config = config.to_str().unwrap();

    sandbox
        .cmd()
        .args(["--config", config, "provision"])
        .assert()
        .success()
        .stdout(predicate::str::contains(VERSION))
        .stdout(predicate::str::contains("ffprobe"));
    assert!(sandbox.cache_dir().join(current_rid()).join(VERSION).is_dir());

    sandbox
        .cmd()
        .args(["--config", config, "clean-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!sandbox.cache_dir().exists());

    sandbox
        .cmd()
        .args(["--config", config, "clean-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to remove"));
}

#[test]
fn test_cli_provision_unknown_rid_fails() {
    let sandbox = Sandbox::new();
    let package = Package::new(&current_rid());
    let config = sandbox.config_with_package(package.path());

    sandbox
        .cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "provision",
            "--rid",
            "plan9-mips",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plan9-mips"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["probe", "/nonexistent/file.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(unix)]
fn fake_tool(dir: &Path, name: &str, script: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn test_cli_probe_with_overridden_ffprobe() {
    let sandbox = Sandbox::new();
    let media = sandbox.root.path().join("movie.mkv");
    fs::write(&media, b"not really matroska").unwrap();
    let ffprobe = fake_tool(
        sandbox.root.path(),
        "ffprobe",
        r#"#!/bin/sh
cat <<'EOF'
{"streams": [
  {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 1920, "height": 1080,
   "disposition": {"default": 1, "forced": 0}},
  {"index": 1, "codec_type": "subtitle", "codec_name": "subrip",
   "disposition": {"default": 0, "forced": 1}, "tags": {"language": "eng"}}
 ],
 "format": {"format_name": "matroska,webm", "duration": "60.0", "size": "19"}}
EOF
"#,
    );

    sandbox
        .cmd()
        .args([
            "--ffprobe",
            ffprobe.to_str().unwrap(),
            "probe",
            "--json",
            media.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"resolution\": \"1920x1080\""))
        .stdout(predicate::str::contains("\"is_forced\": true"));
}

#[cfg(unix)]
#[test]
fn test_cli_probe_with_mkvmerge_backend() {
    let sandbox = Sandbox::new();
    let media = sandbox.root.path().join("movie.mkv");
    fs::write(&media, b"").unwrap();
    let mkvmerge = fake_tool(
        sandbox.root.path(),
        "mkvmerge",
        r#"#!/bin/sh
[ "$1" = "-J" ] || exit 3
echo '{"container": {"type": "Matroska"}, "tracks": [{"id": 0, "type": "subtitles", "codec": "SubStationAlpha", "properties": {"language": "jpn"}}]}'
"#,
    );

    sandbox
        .cmd()
        .args([
            "--mkvmerge",
            mkvmerge.to_str().unwrap(),
            "probe",
            "--backend",
            "mkvmerge",
            media.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Container: Matroska"))
        .stdout(predicate::str::contains("SubStationAlpha (jpn)"));
}

#[cfg(unix)]
#[test]
fn test_cli_probe_reports_tool_failure() {
    let sandbox = Sandbox::new();
    let media = sandbox.root.path().join("broken.mkv");
    fs::write(&media, b"").unwrap();
    let ffprobe = fake_tool(
        sandbox.root.path(),
        "ffprobe",
        "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n",
    );

    sandbox
        .cmd()
        .args([
            "--ffprobe",
            ffprobe.to_str().unwrap(),
            "probe",
            media.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ffprobe failed"))
        .stderr(predicate::str::contains("Invalid data found"));
}

#[test]
fn test_cli_validate_valid_config() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[tools]\nprefer_path = true\n\n[probe]\nbackend = \"mkvmerge\"\n");

    sandbox
        .cmd()
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Probe backend: mkvmerge"));
}

#[test]
fn test_cli_validate_rejects_empty_override() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[tools]\nffmpeg = \"\"\n");

    sandbox
        .cmd()
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tools.ffmpeg"));
}

#[test]
fn test_cli_invalid_toml_fails() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[tools\nffmpeg = ");

    sandbox
        .cmd()
        .args(["--config", config.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}
