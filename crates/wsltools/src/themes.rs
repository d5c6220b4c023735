use std::fs;
use std::path::{Path, PathBuf};

/// Names of theme directories that ship at least one `gtk-*` variant.
///
/// A top level directory qualifies when any of its immediate subdirectories
/// contains a nested directory whose name includes `gtk-`. Names from all
/// candidate locations are collected without deduplication and sorted case
/// insensitively. Missing candidate directories are skipped.
pub(crate) fn installed_themes(candidates: &[PathBuf]) -> Vec<String> {
    let mut themes: Vec<String> = candidates
        .iter()
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| theme_names(dir))
        .collect();
    themes.sort_by_key(|name| name.to_lowercase());
    themes
}

fn theme_names(themes_dir: &Path) -> Vec<String> {
    subdirs(themes_dir)
        .into_iter()
        .filter(|path| {
            subdirs(path).iter().any(|sub| {
                sub.file_name()
                    .is_some_and(|name| name.to_string_lossy().contains("gtk-"))
            })
        })
        .filter_map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .collect()
}

fn subdirs(base: &Path) -> Vec<PathBuf> {
    fs::read_dir(base)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_theme(base: &Path, name: &str, variant: &str) {
        fs::create_dir_all(base.join(name).join(variant)).unwrap();
    }

    #[test]
    fn test_installed_themes_requires_gtk_variant() {
        let dir = tempfile::tempdir().unwrap();
        add_theme(dir.path(), "Breeze", "gtk-3.0");
        add_theme(dir.path(), "NotATheme", "sounds");

        let themes = installed_themes(&[dir.path().to_path_buf()]);
        assert_eq!(themes, vec!["Breeze".to_string()]);
    }

    #[test]
    fn test_installed_themes_sorted_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        add_theme(dir.path(), "breeze-dark", "gtk-3.0");
        add_theme(dir.path(), "Adwaita", "gtk-4.0");
        add_theme(dir.path(), "Zukitre", "gtk-2.0");

        let themes = installed_themes(&[dir.path().to_path_buf()]);
        assert_eq!(themes, vec!["Adwaita", "breeze-dark", "Zukitre"]);
    }

    #[test]
    fn test_installed_themes_collects_all_locations() {
        let system = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        add_theme(system.path(), "Breeze", "gtk-3.0");
        add_theme(user.path(), "Breeze", "gtk-3.0");

        let themes = installed_themes(&[
            system.path().to_path_buf(),
            user.path().to_path_buf(),
            PathBuf::from("/does/not/exist"),
        ]);
        // no deduplication across locations
        assert_eq!(themes, vec!["Breeze".to_string(), "Breeze".to_string()]);
    }

    #[test]
    fn test_installed_themes_ignores_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        add_theme(dir.path(), "Breeze", "gtk-3.0");
        fs::write(dir.path().join("index.theme"), "").unwrap();

        let themes = installed_themes(&[dir.path().to_path_buf()]);
        assert_eq!(themes, vec!["Breeze".to_string()]);
    }
}
