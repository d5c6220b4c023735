use std::collections::HashMap;
use std::path::Path;

use log::debug;
use wsltools_platform as platform;

use crate::distro::Distro;
use crate::error::{Error, Result};

/// Name keyed collection of the installed distributions.
///
/// Names matching a blacklist substring are dropped at enumeration time; by
/// default that hides the docker internals.
pub struct Registry {
    distros: HashMap<String, Distro>,
    blacklist: Vec<String>,
}

impl Registry {
    /// Enumerate the installed distributions with the default blacklist.
    pub fn new() -> Result<Self> {
        Self::with_blacklist(vec!["docker".to_string()])
    }

    /// Enumerate with a custom blacklist of name substrings. Fails when
    /// wsl.exe is not on the search path.
    pub fn with_blacklist(blacklist: Vec<String>) -> Result<Self> {
        if !platform::wsl_available() {
            return Err(Error::EnvironmentUnavailable);
        }
        let mut registry = Self {
            distros: HashMap::new(),
            blacklist,
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Build a registry from already decoded `wsl.exe -l -v` output, without
    /// touching the platform tool.
    pub fn from_list_output(output: &str, blacklist: Vec<String>) -> Self {
        let mut registry = Self {
            distros: HashMap::new(),
            blacklist,
        };
        registry.insert_records(platform::parse_distro_list(output));
        registry
    }

    /// Discard every handle and enumerate again. Cached derived properties
    /// of the old handles do not survive.
    pub fn refresh(&mut self) -> Result<()> {
        self.distros.clear();
        self.insert_records(platform::list_distros()?);
        Ok(())
    }

    fn insert_records(&mut self, records: Vec<platform::DistroRecord>) {
        for record in records {
            if self.blacklist.iter().any(|b| record.name.contains(b)) {
                debug!("skipping blacklisted distribution {}", record.name);
                continue;
            }
            self.distros
                .insert(record.name.clone(), Distro::new(record.name, record.version));
        }
    }

    /// All distribution names, order not significant.
    pub fn names(&self) -> Vec<&str> {
        self.distros.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.distros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.distros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distros.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Distro> {
        self.distros.get(name)
    }

    /// Distribution with the given name.
    pub fn lookup(&self, name: &str) -> Result<&Distro> {
        self.distros
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Mutable handle, needed to invalidate cached derived properties.
    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Distro> {
        self.distros
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Distro> {
        self.distros.values()
    }

    /// Import a distribution from a tarball and register a handle for it.
    ///
    /// Only the subprocess exit status guards the import; a failing import
    /// is logged by the platform layer and still yields a handle, matching
    /// the best effort nature of the tool.
    pub fn import_distro(
        &mut self,
        name: &str,
        tarball: &Path,
        workdir: &Path,
        version: u32,
    ) -> Result<&Distro> {
        platform::import_distro(name, workdir, tarball, version)?;
        self.distros
            .insert(name.to_string(), Distro::new(name, version));
        self.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const LISTING: &str =
        "XX NAME  STATE  VERSION\nXX docker-desktop  Running  2\nXX Ubuntu-20.04  Running  2\n";

    fn default_blacklist() -> Vec<String> {
        vec!["docker".to_string()]
    }

    #[test]
    fn test_blacklist_filters_enumeration() {
        let registry = Registry::from_list_output(LISTING, default_blacklist());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Ubuntu-20.04"));
        assert!(!registry.contains("docker-desktop"));
        assert_eq!(registry.lookup("Ubuntu-20.04").unwrap().version(), 2);
    }

    #[test]
    fn test_empty_blacklist_keeps_everything() {
        let registry = Registry::from_list_output(LISTING, Vec::new());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("docker-desktop"));
    }

    #[test]
    fn test_reenumeration_is_idempotent() {
        let before = Registry::from_list_output(LISTING, default_blacklist());
        let after = Registry::from_list_output(LISTING, default_blacklist());
        let before: HashSet<&str> = before.names().into_iter().collect();
        let after: HashSet<&str> = after.names().into_iter().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_lookup_unknown_name() {
        let registry = Registry::from_list_output(LISTING, default_blacklist());
        assert!(matches!(
            registry.lookup("arch"),
            Err(Error::NotFound(name)) if name == "arch"
        ));
    }

    #[test]
    fn test_duplicate_names_overwrite() {
        let listing = "  NAME  VERSION\n  Ubuntu  1\n  Ubuntu  2\n";
        let registry = Registry::from_list_output(listing, Vec::new());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Ubuntu").unwrap().version(), 2);
    }

    #[test]
    fn test_iter_and_names_agree() {
        let registry = Registry::from_list_output(LISTING, Vec::new());
        let from_iter: HashSet<&str> = registry.iter().map(Distro::name).collect();
        let from_names: HashSet<&str> = registry.names().into_iter().collect();
        assert_eq!(from_iter, from_names);
        assert!(!registry.is_empty());
    }
}
