//! ssh-ident-core: decides which SSH identity applies to a shell and what
//! the wrapper shell has to do about it.
//!
//! Provides the flag registry, action codes, the action resolver, config
//! loading, identity lookup rules, the identity directory and SSH config
//! fragment lookup.

pub mod action;
pub mod config;
pub mod error;
pub mod flags;
pub mod identity;
pub mod resolver;
pub mod ssh_config;
pub mod store;

// Re-export commonly used items at crate root.
pub use action::{
    action_flags, ActionFlag, ActionMask, ActionRequest, Modifiers, PrimaryAction, ShellTarget,
};
pub use config::{Config, ConfigKey, MatchRule};
pub use error::{IdentError, IdentResult};
pub use flags::{Allocation, FlagError, FlagKey, FlagSet};
pub use identity::{FoundIdentity, IdentityLookup, IdentitySource, RuleMatcher};
pub use resolver::{Resolution, Resolver};
pub use ssh_config::{SshConfigFinder, SshConfigLookup};
pub use store::{IdentityDirectory, IdentityStore};
