use std::collections::BTreeMap;
use std::path::Path;

use freedesktop_entry_parser::parse_entry;
use glob::glob;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Launchable application described by one desktop entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub generic_name: String,
    pub cmd: String,
    pub is_gui: bool,
    pub icon: Option<String>,
}

impl Application {
    /// Build an application from a desktop entry file.
    ///
    /// A file without a `Name` attribute describes nothing launchable and
    /// yields `None`. Parse failures are propagated, never suppressed.
    pub fn from_desktop_file(path: &Path) -> Result<Option<Self>> {
        let entry = parse_entry(path).map_err(|err| Error::DesktopEntry {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let section = entry.section("Desktop Entry");
        let Some(name) = section.attr("Name") else {
            return Ok(None);
        };
        let terminal = section
            .attr("Terminal")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        Ok(Some(Self {
            name: name.to_string(),
            generic_name: section.attr("GenericName").unwrap_or_default().to_string(),
            cmd: section.attr("Exec").unwrap_or_default().to_string(),
            is_gui: !terminal,
            icon: section.attr("Icon").map(str::to_owned),
        }))
    }
}

/// Applications from every desktop entry below `app_dir`, keyed by name.
/// Later entries overwrite earlier ones with the same name.
pub(crate) fn discover_applications(app_dir: &Path) -> Result<BTreeMap<String, Application>> {
    let mut apps = BTreeMap::new();
    let pattern = format!("{}/**/*.desktop", app_dir.display());
    for path in glob(&pattern)?.flatten() {
        debug!("parsing desktop entry {}", path.display());
        if let Some(app) = Application::from_desktop_file(&path)? {
            apps.insert(app.name.clone(), app);
        }
    }
    Ok(apps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ENTRY: &str = "[Desktop Entry]\n\
        Name=Test app\n\
        GenericName=Generic test\n\
        Exec=/bin/test\n\
        Icon=awesome\n\
        Terminal=true\n\
        Type=Application\n\
        Categories=GTK;GNOME;Utility;\n";

    #[test]
    fn test_application_from_desktop_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.desktop");
        fs::write(&path, ENTRY).unwrap();

        let app = Application::from_desktop_file(&path).unwrap().unwrap();
        assert_eq!(
            app,
            Application {
                name: "Test app".to_string(),
                generic_name: "Generic test".to_string(),
                cmd: "/bin/test".to_string(),
                is_gui: false,
                icon: Some("awesome".to_string()),
            }
        );
    }

    #[test]
    fn test_application_without_name_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nameless.desktop");
        fs::write(&path, "[Desktop Entry]\nExec=/bin/test\n").unwrap();

        assert!(Application::from_desktop_file(&path).unwrap().is_none());
    }

    #[test]
    fn test_application_defaults_to_gui() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gui.desktop");
        fs::write(&path, "[Desktop Entry]\nName=App\nExec=/bin/app\n").unwrap();

        let app = Application::from_desktop_file(&path).unwrap().unwrap();
        assert!(app.is_gui);
        assert_eq!(app.icon, None);
    }

    #[test]
    fn test_discover_applications_recursive_and_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("extra");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join("a.desktop"),
            "[Desktop Entry]\nName=Alpha\nExec=/bin/a\n",
        )
        .unwrap();
        fs::write(
            nested.join("b.desktop"),
            "[Desktop Entry]\nName=Beta\nExec=/bin/b\nTerminal=true\n",
        )
        .unwrap();
        fs::write(nested.join("ignored.txt"), "not a desktop entry").unwrap();

        let apps = discover_applications(dir.path()).unwrap();
        assert_eq!(apps.len(), 2);
        assert!(apps["Alpha"].is_gui);
        assert!(!apps["Beta"].is_gui);
    }

    #[test]
    fn test_discover_applications_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_applications(dir.path()).unwrap().is_empty());
    }
}
