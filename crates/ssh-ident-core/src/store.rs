//! On-disk identity directory.
//!
//! Each identity is a subdirectory of `dir_identities`:
//! - `<name>/`: keys and per-identity SSH settings
//! - `<name>/config`: per-identity SSH client config, created empty

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{IdentError, IdentResult};

/// Listing and creation of identities.
pub trait IdentityDirectory {
    /// Identity names, sorted.
    fn list(&self) -> IdentResult<Vec<String>>;

    /// Create a new identity and return its directory.
    fn create(&self, name: &str) -> IdentResult<PathBuf>;
}

/// Whether `name` can be used as a single path component.
pub(crate) fn is_valid_identity_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

/// File-based identity directory.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    base_dir: PathBuf,
}

impl IdentityStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl IdentityDirectory for IdentityStore {
    fn list(&self) -> IdentResult<Vec<String>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.base_dir.display(), "identity directory missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("skipping non-UTF-8 identity {:?}", raw),
            }
        }

        names.sort();
        Ok(names)
    }

    fn create(&self, name: &str) -> IdentResult<PathBuf> {
        if !is_valid_identity_name(name) {
            return Err(IdentError::InvalidIdentityName(name.to_string()));
        }

        fs::create_dir_all(&self.base_dir)?;

        let path = self.base_dir.join(name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IdentError::IdentityExists(path));
            }
            Err(e) => return Err(e.into()),
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.join("config"))?;

        info!(name, path = %path.display(), "identity created");
        Ok(path)
    }
}
