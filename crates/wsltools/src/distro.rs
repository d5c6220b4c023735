use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::Duration;

use wsltools_platform as platform;
use wsltools_shell as shell;

use crate::apps::{self, Application};
use crate::error::{Error, Result};
use crate::themes;

/// Handle for one installed distribution.
///
/// Identity (name and WSL version) is fixed at construction. Derived
/// properties are computed on first access through the command runner and
/// cached for the lifetime of the handle; reconfiguring the distribution out
/// of band leaves them stale until [`Distro::invalidate`] is called or the
/// handle is recreated. Handles are not synchronized with each other:
/// profile edits through two handles of the same distribution are whole file
/// read-modify-write cycles, and the last writer wins.
#[derive(Debug)]
pub struct Distro {
    name: String,
    version: u32,
    root_unc: OnceCell<PathBuf>,
    home_unc: OnceCell<PathBuf>,
    home_posix: OnceCell<String>,
    profile_unc: OnceCell<PathBuf>,
    ip: OnceCell<String>,
    shell: OnceCell<String>,
    themes: OnceCell<Vec<String>>,
    apps: OnceCell<BTreeMap<String, Application>>,
}

impl Distro {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            root_unc: OnceCell::new(),
            home_unc: OnceCell::new(),
            home_posix: OnceCell::new(),
            profile_unc: OnceCell::new(),
            ip: OnceCell::new(),
            shell: OnceCell::new(),
            themes: OnceCell::new(),
            apps: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Drop every cached derived property so the next access recomputes it.
    pub fn invalidate(&mut self) {
        self.root_unc.take();
        self.home_unc.take();
        self.home_posix.take();
        self.profile_unc.take();
        self.ip.take();
        self.shell.take();
        self.themes.take();
        self.apps.take();
    }

    // --- command runner ---

    /// Run a shell command inside the distribution and wait for it.
    ///
    /// A non-zero exit is not an error here; use [`Distro::command_output`]
    /// when failures must surface.
    pub fn run_command(&self, command: &str, load_profile: bool) -> Result<ExitStatus> {
        Ok(platform::run_distro_command(&self.name, command, load_profile)?)
    }

    /// Launch a shell command inside the distribution without waiting.
    /// Fire and forget: no output or exit status is retrievable later.
    pub fn spawn_command(&self, command: &str, load_profile: bool) -> Result<Child> {
        Ok(platform::spawn_distro_command(&self.name, command, load_profile)?)
    }

    /// Captured stdout of a shell command, leading and trailing whitespace
    /// preserved. Fails with the exit code and stderr on non-zero exit.
    pub fn command_output(&self, command: &str, load_profile: bool) -> Result<String> {
        Ok(platform::distro_command_output(&self.name, command, load_profile)?)
    }

    /// Run a command through sudo, feeding it the given password.
    ///
    /// The password is interpolated into the shell command with nothing more
    /// than the surrounding single quotes, a known injection hazard.
    pub fn run_sudo(&self, command: &str, sudo_password: &str) -> Result<ExitStatus> {
        self.run_command(
            &format!("echo '{sudo_password}' | sudo -H -S {command}"),
            false,
        )
    }

    // --- path translator ---

    /// Resolve a POSIX path inside the distribution to a canonical UNC path
    /// reachable from the host.
    pub fn unc_path_of(&self, posix_path: &str) -> Result<PathBuf> {
        let output = platform::distro_command_output(
            &self.name,
            &format!("wslpath -w `realpath {posix_path}`"),
            false,
        )
        .map_err(|source| Error::PathResolutionFailed {
            path: posix_path.to_string(),
            source,
        })?;
        Ok(PathBuf::from(output.trim()))
    }

    /// UNC path of the distribution root.
    pub fn root_unc_path(&self) -> Result<&Path> {
        if let Some(path) = self.root_unc.get() {
            return Ok(path.as_path());
        }
        let path = self.unc_path_of("/")?;
        Ok(self.root_unc.get_or_init(|| path).as_path())
    }

    /// UNC path of the user home.
    pub fn home_unc_path(&self) -> Result<&Path> {
        if let Some(path) = self.home_unc.get() {
            return Ok(path.as_path());
        }
        let path = self.unc_path_of("~")?;
        Ok(self.home_unc.get_or_init(|| path).as_path())
    }

    /// POSIX path of the user home.
    pub fn home_posix_path(&self) -> Result<&str> {
        if let Some(path) = self.home_posix.get() {
            return Ok(path.as_str());
        }
        let path = self.command_output("echo ~", false)?.trim().to_string();
        Ok(self.home_posix.get_or_init(|| path).as_str())
    }

    /// UNC path of the user profile. The profile may not exist yet, in which
    /// case resolution fails and the path is computed from the home path
    /// instead.
    pub fn profile_unc_path(&self) -> Result<&Path> {
        if let Some(path) = self.profile_unc.get() {
            return Ok(path.as_path());
        }
        let path = match self.unc_path_of("~/.profile") {
            Ok(path) => path,
            Err(Error::PathResolutionFailed { .. }) => self.home_unc_path()?.join(".profile"),
            Err(err) => return Err(err),
        };
        Ok(self.profile_unc.get_or_init(|| path).as_path())
    }

    /// Read a file that lives inside the distribution filesystem, through
    /// the UNC bridge.
    pub fn read_file(&self, posix_path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.unc_path_of(posix_path)?)?)
    }

    // --- profile editor ---

    /// Current profile content, empty when the file does not exist yet.
    pub fn read_profile(&self) -> Result<String> {
        match fs::read_to_string(self.profile_unc_path()?) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrite the profile with the given content.
    pub fn write_profile(&self, content: &str) -> Result<()> {
        Ok(fs::write(self.profile_unc_path()?, content)?)
    }

    /// Idempotent `export VARIABLE=value` upsert in the profile.
    pub fn set_export_var(&self, variable: &str, value: &str) -> Result<()> {
        let profile = self.read_profile()?;
        self.write_profile(&shell::set_export(&profile, variable, value))
    }

    /// GTK theme configured in the profile, `"Default"` when unset.
    pub fn theme(&self) -> Result<String> {
        let profile = self.read_profile()?;
        Ok(shell::get_export(&profile, "GTK_THEME").unwrap_or_else(|| "Default".to_string()))
    }

    /// Select the GTK theme. `"Default"` drops the export instead of
    /// writing the literal value.
    pub fn set_theme(&self, value: &str) -> Result<()> {
        let profile = self.read_profile()?;
        let updated = if value == "Default" {
            shell::remove_export(&profile, "GTK_THEME")
        } else {
            shell::set_export(&profile, "GTK_THEME", &format!("\"{value}\""))
        };
        self.write_profile(&updated)
    }

    /// Theme value for launch commands: the profile variable when the
    /// profile sets one, the stock theme otherwise.
    pub fn theme_env(&self) -> Result<String> {
        let profile = self.read_profile()?;
        Ok(if profile.contains("GTK_THEME") {
            "$GTK_THEME".to_string()
        } else {
            "Adwaita".to_string()
        })
    }

    /// GTK application scale factor.
    pub fn gtk_scale(&self) -> Result<u32> {
        Ok(if self.read_profile()?.contains("GDK_SCALE=2") {
            2
        } else {
            1
        })
    }

    /// Set the GTK scale factor. Only 1 and 2 are supported; anything else
    /// fails without touching the profile.
    pub fn set_gtk_scale(&self, scale: u32) -> Result<()> {
        if !matches!(scale, 1 | 2) {
            return Err(Error::InvalidScale(scale));
        }
        self.set_export_var("GDK_SCALE", &scale.to_string())
    }

    /// Qt application scale factor.
    pub fn qt_scale(&self) -> Result<u32> {
        Ok(if self.read_profile()?.contains("QT_SCALE_FACTOR=2") {
            2
        } else {
            1
        })
    }

    /// Set the Qt scale factor. Only 1 and 2 are supported.
    pub fn set_qt_scale(&self, scale: u32) -> Result<()> {
        if !matches!(scale, 1 | 2) {
            return Err(Error::InvalidScale(scale));
        }
        self.set_export_var("QT_SCALE_FACTOR", &scale.to_string())
    }

    /// Point GUI applications at the host X server. WSL 2 distributions
    /// reach the host through their assigned IP, WSL 1 through an empty
    /// host.
    pub fn set_display(&self) -> Result<()> {
        let host = if self.version == 2 {
            self.ip()?.to_string()
        } else {
            String::new()
        };
        self.set_export_var("DISPLAY", &format!("{host}:0"))
    }

    /// Make login shells start the system dbus daemon.
    pub fn ensure_dbus_startup(&self) -> Result<()> {
        let profile = self.read_profile()?;
        self.write_profile(&shell::append_stanza(
            &profile,
            "/etc/init.d/dbus",
            "sudo /etc/init.d/dbus start",
        ))
    }

    // --- derived discovery ---

    /// IP assigned to the distribution, from the nameserver entry of its
    /// resolver configuration.
    pub fn ip(&self) -> Result<&str> {
        if let Some(ip) = self.ip.get() {
            return Ok(ip.as_str());
        }
        let resolv = self.read_file("/etc/resolv.conf")?;
        let ip = parse_nameserver(&resolv).ok_or(Error::IpNotFound)?;
        Ok(self.ip.get_or_init(|| ip).as_str())
    }

    /// Login shell of the default user, from the passwd database row whose
    /// home directory matches the resolved home path.
    pub fn default_shell(&self) -> Result<&str> {
        if let Some(sh) = self.shell.get() {
            return Ok(sh.as_str());
        }
        let home = self.home_posix_path()?.to_string();
        let passwd = self.read_file("/etc/passwd")?;
        let sh = parse_login_shell(&passwd, &home).ok_or(Error::ShellNotFound(home))?;
        Ok(self.shell.get_or_init(|| sh).as_str())
    }

    /// Installed GTK theme names across the system and user theme
    /// locations.
    pub fn installed_themes(&self) -> Result<&[String]> {
        if let Some(found) = self.themes.get() {
            return Ok(found.as_slice());
        }
        let root = self.root_unc_path()?.to_path_buf();
        let home = self.home_unc_path()?.to_path_buf();
        let candidates = [
            root.join("usr").join("share").join("themes"),
            root.join("usr").join("local").join("share").join("themes"),
            home.join(".local").join("share").join("themes"),
            home.join(".themes"),
        ];
        let found = themes::installed_themes(&candidates);
        Ok(self.themes.get_or_init(|| found).as_slice())
    }

    /// Applications with a desktop entry, keyed by name.
    pub fn applications(&self) -> Result<&BTreeMap<String, Application>> {
        if let Some(found) = self.apps.get() {
            return Ok(found);
        }
        let app_dir = self
            .root_unc_path()?
            .join("usr")
            .join("share")
            .join("applications");
        let found = apps::discover_applications(&app_dir)?;
        Ok(self.apps.get_or_init(|| found))
    }

    /// Subset of [`Distro::applications`] that run outside a terminal.
    pub fn gui_applications(&self) -> Result<BTreeMap<String, Application>> {
        Ok(self
            .applications()?
            .iter()
            .filter(|(_, app)| app.is_gui)
            .map(|(name, app)| (name.clone(), app.clone()))
            .collect())
    }

    // --- lifecycle ---

    /// Terminate the distribution and start it again in the background.
    pub fn reboot(&self) -> Result<()> {
        platform::terminate(&self.name)?;
        thread::sleep(Duration::from_secs(1));
        platform::launch(&self.name)?;
        Ok(())
    }

    /// Unregister the distribution. Destroys its filesystem, handle with
    /// care.
    pub fn unregister(&self) -> Result<()> {
        platform::unregister(&self.name)?;
        Ok(())
    }

    /// Open an interactive shell, either in a Windows Terminal tab or a
    /// plain wsl.exe console window.
    pub fn open_in_shell(&self, windows_terminal: bool) -> Result<Child> {
        if windows_terminal {
            Ok(platform::open_windows_terminal(&self.name)?)
        } else {
            Ok(platform::launch(&self.name)?)
        }
    }

    /// Start dbus if it is not already running.
    // TODO: init.d is Debian flavored, openrc/systemd distributions need
    // their own start command
    pub fn start_dbus(&self, sudo_password: &str) -> Result<()> {
        let status = self.run_command("/etc/init.d/dbus status", false)?;
        if status.success() {
            return Ok(());
        }
        self.run_sudo("/etc/init.d/dbus start", sudo_password)?;
        Ok(())
    }

    /// Install and start dbus (Debian style distributions).
    pub fn install_dbus(&self, sudo_password: &str) -> Result<()> {
        self.run_sudo("apt -y install dbus dbus-x11", sudo_password)?;
        self.run_sudo("systemd-machine-id-setup", sudo_password)?;
        self.run_sudo("/etc/init.d/dbus start", sudo_password)?;
        Ok(())
    }
}

impl fmt::Display for Distro {
    /// Friendlier name: dashes become spaces, first letter capitalized.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let friendly = self.name.replace('-', " ");
        let mut chars = friendly.chars();
        match chars.next() {
            Some(first) => write!(
                f,
                "{}{}",
                first.to_uppercase(),
                chars.as_str().to_lowercase()
            ),
            None => Ok(()),
        }
    }
}

fn parse_nameserver(resolv: &str) -> Option<String> {
    resolv
        .lines()
        .find(|line| line.contains("nameserver"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_owned)
}

fn parse_login_shell(passwd: &str, home: &str) -> Option<String> {
    passwd.lines().find_map(|line| {
        let fields: Vec<&str> = line.split(':').collect();
        (fields.len() >= 7 && fields[5] == home).then(|| fields[6].trim().to_string())
    })
}
