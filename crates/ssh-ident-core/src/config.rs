//! ssh-ident configuration at `~/.ssh-ident.toml`.
//!
//! The file is optional. Selected keys can be overridden from the
//! environment, which is how the wrapper shell and tests steer a single
//! invocation without touching the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IdentError, IdentResult};

/// Environment variable holding an alternative config file path.
pub const CONFIG_PATH_ENV: &str = "SSH_IDENT_CONFIG";

/// One `pattern -> identity` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    /// Regular expression, matched anywhere in the input.
    pub pattern: String,
    pub identity: String,
}

/// Top-level config file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per identity.
    #[serde(default = "default_dir_identities")]
    pub dir_identities: PathBuf,

    /// Identity used when no rule matches.
    #[serde(default = "default_identity")]
    pub default_identity: String,

    /// Show the prompt indicator on activate/deactivate.
    #[serde(default)]
    pub ssh_ident_prompt: bool,

    /// Define the helper shell functions on activate/deactivate.
    #[serde(default)]
    pub ssh_ident_bash_functions: bool,

    /// Selects SSH config files inside an identity directory.
    #[serde(default = "default_pattern_config")]
    pub pattern_config: String,

    /// Rules checked against the invocation arguments.
    #[serde(default)]
    pub match_argv: Vec<MatchRule>,

    /// Rules checked against the working directory.
    #[serde(default)]
    pub match_path: Vec<MatchRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir_identities: default_dir_identities(),
            default_identity: default_identity(),
            ssh_ident_prompt: false,
            ssh_ident_bash_functions: false,
            pattern_config: default_pattern_config(),
            match_argv: Vec::new(),
            match_path: Vec::new(),
        }
    }
}

fn default_dir_identities() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".ssh")
        .join("identities")
}

fn default_identity() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

fn default_pattern_config() -> String {
    "/config$".to_string()
}

/// Keys that can be overridden from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DirIdentities,
    DefaultIdentity,
    Prompt,
    BashFunctions,
    PatternConfig,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::DirIdentities,
        ConfigKey::DefaultIdentity,
        ConfigKey::Prompt,
        ConfigKey::BashFunctions,
        ConfigKey::PatternConfig,
    ];

    /// Environment variable name for this key.
    pub fn env_var(self) -> &'static str {
        match self {
            ConfigKey::DirIdentities => "DIR_IDENTITIES",
            ConfigKey::DefaultIdentity => "DEFAULT_IDENTITY",
            ConfigKey::Prompt => "SSH_IDENT_PROMPT",
            ConfigKey::BashFunctions => "SSH_IDENT_BASH_FUNCTIONS",
            ConfigKey::PatternConfig => "PATTERN_CONFIG",
        }
    }
}

impl Config {
    /// Default config path: `$SSH_IDENT_CONFIG`, else `~/.ssh-ident.toml`.
    pub fn default_path() -> PathBuf {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => dirs::home_dir().unwrap_or_default().join(".ssh-ident.toml"),
        }
    }

    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> IdentResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| IdentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| IdentError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.dir_identities = expand_home(&config.dir_identities);

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> IdentResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps an environment variable
    /// name to its value.
    pub fn with_overrides<F>(mut self, lookup: F) -> IdentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ConfigKey::ALL {
            let Some(value) = lookup(key.env_var()) else {
                continue;
            };
            debug!(key = key.env_var(), value = %value, "config override from environment");
            match key {
                ConfigKey::DirIdentities => {
                    self.dir_identities = expand_home(Path::new(&value));
                }
                ConfigKey::DefaultIdentity => self.default_identity = value,
                ConfigKey::Prompt => self.ssh_ident_prompt = parse_bool(key, &value)?,
                ConfigKey::BashFunctions => {
                    self.ssh_ident_bash_functions = parse_bool(key, &value)?;
                }
                ConfigKey::PatternConfig => self.pattern_config = value,
            }
        }
        Ok(self)
    }
}

fn parse_bool(key: ConfigKey, value: &str) -> IdentResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(IdentError::ConfigValue {
            key: key.env_var(),
            value: value.to_string(),
        }),
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
