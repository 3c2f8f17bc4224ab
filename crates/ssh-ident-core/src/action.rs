//! Action codes and the parsed request the resolver works on.
//!
//! The wrapper shell reads the action code as a decimal bitmask. Each bit
//! asks it to perform one side effect in the live shell.

use std::fmt;
use std::sync::OnceLock;

use crate::flags::{Allocation, FlagSet};

/// A single shell-level side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFlag {
    SetShellEnv,
    UnsetShellEnv,
    SshIdentity,
    SshConfig,
    EnablePrompt,
    DisablePrompt,
    DefineBashFunctions,
    UndefineBashFunctions,
    PrintOutput,
    Verbose,
}

impl ActionFlag {
    /// In bit order, lowest first.
    pub const ALL: [ActionFlag; 10] = [
        ActionFlag::SetShellEnv,
        ActionFlag::UnsetShellEnv,
        ActionFlag::SshIdentity,
        ActionFlag::SshConfig,
        ActionFlag::EnablePrompt,
        ActionFlag::DisablePrompt,
        ActionFlag::DefineBashFunctions,
        ActionFlag::UndefineBashFunctions,
        ActionFlag::PrintOutput,
        ActionFlag::Verbose,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionFlag::SetShellEnv => "SET_SHELL_ENV",
            ActionFlag::UnsetShellEnv => "UNSET_SHELL_ENV",
            ActionFlag::SshIdentity => "SSH_IDENTITY",
            ActionFlag::SshConfig => "SSH_CONFIG",
            ActionFlag::EnablePrompt => "ENABLE_PROMPT",
            ActionFlag::DisablePrompt => "DISABLE_PROMPT",
            ActionFlag::DefineBashFunctions => "DEFINE_BASH_FUNCTIONS",
            ActionFlag::UndefineBashFunctions => "UNDEFINE_BASH_FUNCTIONS",
            ActionFlag::PrintOutput => "PRINT_OUTPUT",
            ActionFlag::Verbose => "VERBOSE",
        }
    }

    /// Value of this flag in [`action_flags`].
    pub fn bits(self) -> u32 {
        action_flags()
            .resolve(self.name())
            .expect("every ActionFlag is declared in action_flags()")
    }
}

/// Name of the zero entry in [`action_flags`].
pub const NO_ACTION: &str = "NONE";

/// The registry shared with the wrapper shell: `NONE = 0`, then one bit
/// per [`ActionFlag`] in declaration order (`SET_SHELL_ENV = 1` up to
/// `VERBOSE = 512`).
pub fn action_flags() -> &'static FlagSet {
    static FLAGS: OnceLock<FlagSet> = OnceLock::new();
    FLAGS.get_or_init(|| {
        let mut names = vec![NO_ACTION];
        names.extend(ActionFlag::ALL.iter().map(|flag| flag.name()));
        FlagSet::new(&names, &[], Allocation::PowerOfTwo)
            .expect("action flag names are distinct and fit in u32")
    })
}

/// OR-combination of [`ActionFlag`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionMask(u32);

impl ActionMask {
    pub fn insert(&mut self, flag: ActionFlag) {
        self.0 |= flag.bits();
    }

    pub fn contains(self, flag: ActionFlag) -> bool {
        self.0 & flag.bits() != 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `SET_SHELL_ENV|SSH_IDENTITY` style rendering.
    pub fn symbolic(self) -> String {
        action_flags().render(self.0)
    }
}

impl FromIterator<ActionFlag> for ActionMask {
    fn from_iter<I: IntoIterator<Item = ActionFlag>>(iter: I) -> Self {
        let mut mask = ActionMask::default();
        for flag in iter {
            mask.insert(flag);
        }
        mask
    }
}

impl fmt::Display for ActionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target of `--shell`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellTarget {
    /// `--shell` without a value: use `default_identity`.
    Default,
    Named(String),
}

/// The single command requested on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PrimaryAction {
    ListIdentities,
    ShowCurrentIdentity,
    Activate,
    Deactivate,
    CreateIdentity(String),
    SetShellIdentity(ShellTarget),
    UnsetShellIdentity,
    EnablePrompt,
    DisablePrompt,
    ShowConfigFor(String),
    #[default]
    ShowHelp,
}

/// Flags that adjust any action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub quiet: bool,
    pub verbose: bool,
    /// Prefix the output with the decimal action code.
    pub action_code: bool,
}

/// A parsed invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: PrimaryAction,
    pub modifiers: Modifiers,
    /// Raw invocation arguments, matched against `match_argv` rules.
    pub argv: Vec<String>,
}

impl ActionRequest {
    pub fn new(action: PrimaryAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }
}
