use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::HideWindow;

/// Base WSL executable.
pub const WSL_EXE: &str = "wsl.exe";

#[derive(Error, Debug)]
pub enum WslError {
    #[error("command exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One row of the `wsl.exe -l -v` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroRecord {
    pub name: String,
    pub version: u32,
}

pub fn wsl_available() -> bool {
    which::which(WSL_EXE).is_ok()
}

/// Argument vector for running `command` through `sh` inside a distribution.
///
/// This is the only place where a caller supplied command string joins the
/// wsl.exe invocation. The command travels as a single argv element, so
/// nothing here is shell expanded on the host side; values that callers
/// interpolate into the command string itself (sudo passwords, export
/// values) are passed to `sh` unescaped and are a documented injection
/// hazard of this tool.
pub fn shell_invocation(distro: &str, command: &str, load_profile: bool) -> Vec<String> {
    let flags = if load_profile { "-cl" } else { "-c" };
    ["~", "-d", distro, "--", "sh", flags, command]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn distro_command(distro: &str, command: &str, load_profile: bool) -> Command {
    let mut cmd = Command::new(WSL_EXE);
    cmd.args(shell_invocation(distro, command, load_profile));
    cmd.hide_window();
    cmd
}

/// Run `command` inside the distribution and wait for it.
///
/// A non-zero exit is logged but not an error; use
/// [`distro_command_output`] when failures must surface.
pub fn run_distro_command(
    distro: &str,
    command: &str,
    load_profile: bool,
) -> Result<ExitStatus, WslError> {
    debug!("running in {distro}: {command}");
    let status = distro_command(distro, command, load_profile).status()?;
    if !status.success() {
        warn!("command in {distro} exited with {status}: {command}");
    }
    Ok(status)
}

/// Launch `command` inside the distribution without waiting.
///
/// Fire and forget: the returned child is process identity only, there is no
/// way to collect its output later.
pub fn spawn_distro_command(
    distro: &str,
    command: &str,
    load_profile: bool,
) -> Result<Child, WslError> {
    debug!("spawning in {distro}: {command}");
    Ok(distro_command(distro, command, load_profile)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?)
}

/// Run `command` inside the distribution and capture its stdout as text,
/// leading and trailing whitespace preserved.
pub fn distro_command_output(
    distro: &str,
    command: &str,
    load_profile: bool,
) -> Result<String, WslError> {
    debug!("capturing in {distro}: {command}");
    let output = distro_command(distro, command, load_profile).output()?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(WslError::CommandFailed {
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Installed distributions according to `wsl.exe -l -v`.
///
/// Returns an empty list when the listing itself fails, matching the best
/// effort nature of the tool.
pub fn list_distros() -> Result<Vec<DistroRecord>, WslError> {
    let output = Command::new(WSL_EXE)
        .args(["-l", "-v"])
        .hide_window()
        .output()?;
    if !output.status.success() {
        warn!("wsl.exe -l -v exited with {}", output.status);
        return Ok(Vec::new());
    }
    Ok(parse_distro_list(&decode_utf16le(&output.stdout)))
}

/// Parse the `wsl.exe -l -v` listing: a two character marker per line ("* "
/// on the default distribution), then a whitespace delimited table with a
/// header row naming at least a NAME column. Version defaults to 1 when the
/// column is absent or unparseable.
pub fn parse_distro_list(output: &str) -> Vec<DistroRecord> {
    let mut lines = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(strip_marker);

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split_whitespace().collect();
    let Some(name_col) = columns.iter().position(|c| *c == "NAME") else {
        warn!("distribution listing has no NAME column: {header:?}");
        return Vec::new();
    };
    let version_col = columns.iter().position(|c| *c == "VERSION");

    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = fields.get(name_col)?;
            let version = version_col
                .and_then(|col| fields.get(col))
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            Some(DistroRecord {
                name: (*name).to_string(),
                version,
            })
        })
        .collect()
}

fn strip_marker(line: &str) -> &str {
    match line.char_indices().map(|(i, _)| i).nth(2) {
        Some(idx) => &line[idx..],
        None => "",
    }
}

/// wsl.exe emits UTF-16LE text.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Stop the distribution.
pub fn terminate(name: &str) -> Result<ExitStatus, WslError> {
    debug!("terminating {name}");
    let status = Command::new(WSL_EXE)
        .args(["-t", name])
        .hide_window()
        .status()?;
    if !status.success() {
        warn!("terminating {name} exited with {status}");
    }
    Ok(status)
}

/// Start the distribution in the background.
pub fn launch(name: &str) -> Result<Child, WslError> {
    debug!("launching {name}");
    Ok(Command::new(WSL_EXE)
        .args(["~", "-d", name])
        .hide_window()
        .spawn()?)
}

/// Unregister the distribution. Destroys its filesystem, handle with care.
pub fn unregister(name: &str) -> Result<ExitStatus, WslError> {
    debug!("unregistering {name}");
    let status = Command::new(WSL_EXE)
        .args(["--unregister", name])
        .hide_window()
        .status()?;
    if !status.success() {
        warn!("unregistering {name} exited with {status}");
    }
    Ok(status)
}

/// Import a distribution from a tarball into `workdir`.
pub fn import_distro(
    name: &str,
    workdir: &Path,
    tarball: &Path,
    version: u32,
) -> Result<ExitStatus, WslError> {
    debug!("importing {name} from {}", tarball.display());
    let status = Command::new(WSL_EXE)
        .arg("--import")
        .arg(name)
        .arg(workdir)
        .arg(tarball)
        .args(["--version", &version.to_string()])
        .hide_window()
        .status()?;
    if !status.success() {
        warn!("importing {name} exited with {status}");
    }
    Ok(status)
}

/// Open a Windows Terminal tab with the given profile name.
pub fn open_windows_terminal(profile: &str) -> Result<Child, WslError> {
    Ok(Command::new("wt").args(["-p", profile]).hide_window().spawn()?)
}
