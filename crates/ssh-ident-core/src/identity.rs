//! Which identity applies to the current invocation.
//!
//! Rules from the config are tried in a fixed order: every invocation
//! argument against the `match_argv` rules, then the working directory
//! against the `match_path` rules, then the configured default identity.

use std::fmt;
use std::path::PathBuf;

use regex::Regex;
use tracing::debug;

use crate::config::{Config, MatchRule};
use crate::error::{IdentError, IdentResult};

/// How an identity was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Nothing matched and no default is configured.
    None,
    /// An invocation argument matched a `match_argv` rule.
    Argv,
    /// The working directory matched a `match_path` rule.
    Path,
    /// Fell back to `default_identity`.
    Default,
}

impl IdentitySource {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentitySource::None => "none",
            IdentitySource::Argv => "argv",
            IdentitySource::Path => "path",
            IdentitySource::Default => "default",
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an identity lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundIdentity {
    pub name: String,
    pub source: IdentitySource,
    /// The rule pattern that matched, for diagnostics.
    pub pattern: Option<String>,
}

impl FoundIdentity {
    pub fn new(name: impl Into<String>, source: IdentitySource) -> Self {
        Self {
            name: name.into(),
            source,
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// Resolves the identity for an invocation.
pub trait IdentityLookup {
    fn find_identity(&self, args: &[String]) -> FoundIdentity;
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    identity: String,
}

impl CompiledRule {
    fn compile(rule: &MatchRule) -> IdentResult<Self> {
        let regex = Regex::new(&rule.pattern).map_err(|source| IdentError::Pattern {
            pattern: rule.pattern.clone(),
            source,
        })?;
        Ok(Self {
            regex,
            identity: rule.identity.clone(),
        })
    }
}

/// Config-driven [`IdentityLookup`].
#[derive(Debug)]
pub struct RuleMatcher {
    argv_rules: Vec<CompiledRule>,
    path_rules: Vec<CompiledRule>,
    default_identity: String,
    cwd: Option<PathBuf>,
}

impl RuleMatcher {
    /// Compile the config's match rules. The working directory is taken
    /// from the process; override it with [`RuleMatcher::with_cwd`].
    pub fn new(config: &Config) -> IdentResult<Self> {
        let compile = |rules: &[MatchRule]| {
            rules
                .iter()
                .map(CompiledRule::compile)
                .collect::<IdentResult<Vec<_>>>()
        };

        Ok(Self {
            argv_rules: compile(&config.match_argv)?,
            path_rules: compile(&config.match_path)?,
            default_identity: config.default_identity.clone(),
            cwd: std::env::current_dir().ok(),
        })
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// First rule matching any element; elements are the outer loop.
fn first_match<'r, 'e>(
    elements: impl IntoIterator<Item = &'e str>,
    rules: &'r [CompiledRule],
) -> Option<&'r CompiledRule> {
    elements
        .into_iter()
        .find_map(|element| rules.iter().find(|rule| rule.regex.is_match(element)))
}

impl IdentityLookup for RuleMatcher {
    fn find_identity(&self, args: &[String]) -> FoundIdentity {
        if let Some(rule) = first_match(args.iter().map(String::as_str), &self.argv_rules) {
            debug!(identity = %rule.identity, pattern = %rule.regex, "identity from arguments");
            return FoundIdentity::new(&rule.identity, IdentitySource::Argv)
                .with_pattern(rule.regex.as_str());
        }

        let cwd = self.cwd.as_ref().map(|p| p.to_string_lossy().into_owned());
        if let Some(rule) = first_match(cwd.as_deref(), &self.path_rules) {
            debug!(identity = %rule.identity, pattern = %rule.regex, "identity from working directory");
            return FoundIdentity::new(&rule.identity, IdentitySource::Path)
                .with_pattern(rule.regex.as_str());
        }

        if self.default_identity.is_empty() {
            debug!("no identity matched and no default configured");
            FoundIdentity::new("", IdentitySource::None)
        } else {
            FoundIdentity::new(&self.default_identity, IdentitySource::Default)
        }
    }
}
