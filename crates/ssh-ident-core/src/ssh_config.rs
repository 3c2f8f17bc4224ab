//! Per-identity SSH client config fragments.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::error::{IdentError, IdentResult};
use crate::store::is_valid_identity_name;

/// Looks up the SSH client config fragment for an identity.
pub trait SshConfigLookup {
    fn find_ssh_config(&self, identity: &str) -> IdentResult<Option<String>>;
}

/// Reads config files from `dir_identities/<identity>/` whose full path
/// matches `pattern_config`.
#[derive(Debug)]
pub struct SshConfigFinder {
    base_dir: PathBuf,
    pattern: Regex,
}

impl SshConfigFinder {
    pub fn new(config: &Config) -> IdentResult<Self> {
        let pattern = Regex::new(&config.pattern_config).map_err(|source| IdentError::Pattern {
            pattern: config.pattern_config.clone(),
            source,
        })?;
        Ok(Self {
            base_dir: config.dir_identities.clone(),
            pattern,
        })
    }
}

impl SshConfigLookup for SshConfigFinder {
    fn find_ssh_config(&self, identity: &str) -> IdentResult<Option<String>> {
        if !is_valid_identity_name(identity) {
            return Ok(None);
        }

        let dir = self.base_dir.join(identity);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && self.pattern.is_match(&path.to_string_lossy()) {
                files.push(path);
            }
        }
        files.sort();

        let mut fragments = Vec::new();
        for path in &files {
            let content = fs::read_to_string(path)?;
            let content = content.trim();
            if !content.is_empty() {
                debug!(path = %path.display(), "ssh config fragment");
                fragments.push(content.to_string());
            }
        }

        if fragments.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fragments.join("\n")))
        }
    }
}
