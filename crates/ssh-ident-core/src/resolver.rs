//! Turns an [`ActionRequest`] into output text plus an action code.
//!
//! The resolver never touches the live shell. It decides what the wrapper
//! must do and hands that back as a [`Resolution`]. Bad identity names are
//! reported as text with only `PRINT_OUTPUT` set, so the wrapper can tell
//! nothing happened from the code alone. Filesystem and config errors are
//! returned as [`IdentError`](crate::IdentError).

use tracing::debug;

use crate::action::{ActionFlag, ActionMask, ActionRequest, PrimaryAction, ShellTarget};
use crate::config::Config;
use crate::error::IdentResult;
use crate::identity::{FoundIdentity, IdentityLookup};
use crate::ssh_config::SshConfigLookup;
use crate::store::IdentityDirectory;

/// Output of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    mask: ActionMask,
    lines: Vec<String>,
}

impl Resolution {
    pub fn mask(&self) -> ActionMask {
        self.mask
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Output lines joined, with surrounding whitespace trimmed.
    pub fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }

    /// The payload printed for the wrapper: `"<code> <text>"` when
    /// `action_code` is set, otherwise just the text.
    pub fn render(&self, action_code: bool) -> String {
        if action_code {
            format!("{} {}", self.mask, self.text())
        } else {
            self.text()
        }
    }

    fn set(&mut self, flag: ActionFlag) {
        self.mask.insert(flag);
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Resolves requests against the config and its collaborators.
pub struct Resolver<'a> {
    config: &'a Config,
    identities: &'a dyn IdentityDirectory,
    lookup: &'a dyn IdentityLookup,
    ssh_configs: &'a dyn SshConfigLookup,
    usage: String,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a Config,
        identities: &'a dyn IdentityDirectory,
        lookup: &'a dyn IdentityLookup,
        ssh_configs: &'a dyn SshConfigLookup,
    ) -> Self {
        Self {
            config,
            identities,
            lookup,
            ssh_configs,
            usage: String::new(),
        }
    }

    /// Usage text printed for the help action.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn resolve(&self, request: &ActionRequest) -> IdentResult<Resolution> {
        let mut out = Resolution::default();

        match &request.action {
            PrimaryAction::ListIdentities => {
                out.set(ActionFlag::PrintOutput);
                let mut identities = self.identities.list()?;
                identities.sort();
                out.line("Identities:");
                for name in identities {
                    out.line(format!("- {name}"));
                }
            }
            PrimaryAction::ShowCurrentIdentity => {
                out.set(ActionFlag::PrintOutput);
                let identities = self.identities.list()?;
                let found = self.lookup.find_identity(&request.argv);
                if !identities.contains(&found.name) {
                    out.line(bad_identity(&found, &identities));
                } else if request.modifiers.quiet {
                    out.line(found.name);
                } else {
                    let pattern = found
                        .pattern
                        .as_ref()
                        .map(|p| format!(" [{p}]"))
                        .unwrap_or_default();
                    out.line(format!("{} (set by {}{pattern})", found.name, found.source));
                }
            }
            PrimaryAction::CreateIdentity(name) => {
                let path = self.identities.create(name)?;
                out.line(format!("Created identity '{name}': {}", path.display()));
                out.set(ActionFlag::PrintOutput);
            }
            PrimaryAction::SetShellIdentity(target) => {
                // The default is substituted without checking the listing.
                let (name, known) = match target {
                    ShellTarget::Default => (self.config.default_identity.clone(), true),
                    ShellTarget::Named(name) => {
                        (name.clone(), self.identities.list()?.contains(name))
                    }
                };
                if known {
                    out.set(ActionFlag::SetShellEnv);
                    out.set(ActionFlag::SshIdentity);
                    out.line(name);
                } else {
                    out.line(format!("Bad identity '{name}'"));
                    out.set(ActionFlag::PrintOutput);
                }
            }
            PrimaryAction::UnsetShellIdentity => out.set(ActionFlag::UnsetShellEnv),
            PrimaryAction::EnablePrompt => out.set(ActionFlag::EnablePrompt),
            PrimaryAction::DisablePrompt => out.set(ActionFlag::DisablePrompt),
            PrimaryAction::Activate => {
                let identities = self.identities.list()?;
                let found = self.lookup.find_identity(&request.argv);
                if identities.contains(&found.name) {
                    out.set(ActionFlag::SshIdentity);
                    out.line(found.name);
                    if self.config.ssh_ident_prompt {
                        out.set(ActionFlag::EnablePrompt);
                    }
                    if self.config.ssh_ident_bash_functions {
                        out.set(ActionFlag::DefineBashFunctions);
                    }
                } else {
                    // Nothing to activate: only the error text.
                    out.set(ActionFlag::PrintOutput);
                    out.line(bad_identity(&found, &identities));
                }
            }
            PrimaryAction::Deactivate => {
                out.set(ActionFlag::UnsetShellEnv);
                if self.config.ssh_ident_prompt {
                    out.set(ActionFlag::DisablePrompt);
                }
                if self.config.ssh_ident_bash_functions {
                    out.set(ActionFlag::UndefineBashFunctions);
                }
            }
            PrimaryAction::ShowConfigFor(name) => {
                if let Some(fragment) = self.ssh_configs.find_ssh_config(name)? {
                    if request.modifiers.action_code {
                        out.set(ActionFlag::SshConfig);
                    }
                    out.line(fragment);
                    out.set(ActionFlag::PrintOutput);
                }
            }
            PrimaryAction::ShowHelp => {
                out.set(ActionFlag::PrintOutput);
                out.line(self.usage.clone());
            }
        }

        if request.modifiers.verbose {
            out.set(ActionFlag::Verbose);
        }

        debug!(
            action = ?request.action,
            code = out.mask.bits(),
            flags = %out.mask.symbolic(),
            "resolved"
        );
        Ok(out)
    }
}

fn bad_identity(found: &FoundIdentity, identities: &[String]) -> String {
    format!(
        "Bad identity set by {} ({}). Should be one of '{}'",
        found.source,
        found.name,
        identities.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Modifiers;
    use crate::error::IdentError;
    use crate::identity::IdentitySource;
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// In-memory identity directory.
    #[derive(Default)]
    struct FakeDir {
        names: RefCell<Vec<String>>,
    }

    impl FakeDir {
        fn with(names: &[&str]) -> Self {
            Self {
                names: RefCell::new(names.iter().map(|n| n.to_string()).collect()),
            }
        }
    }

    impl IdentityDirectory for FakeDir {
        fn list(&self) -> IdentResult<Vec<String>> {
            let mut names = self.names.borrow().clone();
            names.sort();
            Ok(names)
        }

        fn create(&self, name: &str) -> IdentResult<PathBuf> {
            let path = PathBuf::from("/ids").join(name);
            if self.names.borrow().iter().any(|n| n == name) {
                return Err(IdentError::IdentityExists(path));
            }
            self.names.borrow_mut().push(name.to_string());
            Ok(path)
        }
    }

    struct FixedLookup(FoundIdentity);

    impl IdentityLookup for FixedLookup {
        fn find_identity(&self, _args: &[String]) -> FoundIdentity {
            self.0.clone()
        }
    }

    struct FixedSshConfig(Option<&'static str>);

    impl SshConfigLookup for FixedSshConfig {
        fn find_ssh_config(&self, _identity: &str) -> IdentResult<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct Fixture {
        config: Config,
        dir: FakeDir,
        lookup: FixedLookup,
        ssh: FixedSshConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: Config {
                    default_identity: "home".into(),
                    ..Config::default()
                },
                dir: FakeDir::with(&["work", "home"]),
                lookup: FixedLookup(FoundIdentity::new("work", IdentitySource::Default)),
                ssh: FixedSshConfig(None),
            }
        }

        fn run(&self, action: PrimaryAction, modifiers: Modifiers) -> Resolution {
            Resolver::new(&self.config, &self.dir, &self.lookup, &self.ssh)
                .with_usage("usage: ssh-ident-cli [OPTIONS]\n")
                .resolve(&ActionRequest::new(action).with_modifiers(modifiers))
                .unwrap()
        }
    }

    fn plain() -> Modifiers {
        Modifiers::default()
    }

    fn flags(list: &[ActionFlag]) -> ActionMask {
        list.iter().copied().collect()
    }

    #[test]
    fn list_identities_sorted() {
        let res = Fixture::new().run(PrimaryAction::ListIdentities, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(res.text(), "Identities:\n- home\n- work");
    }

    #[test]
    fn list_with_action_code() {
        let modifiers = Modifiers {
            action_code: true,
            ..plain()
        };
        let res = Fixture::new().run(PrimaryAction::ListIdentities, modifiers);
        assert_eq!(res.render(true), "256 Identities:\n- home\n- work");
    }

    #[test]
    fn show_current_identity() {
        let mut fx = Fixture::new();
        fx.lookup = FixedLookup(
            FoundIdentity::new("work", IdentitySource::Path).with_pattern("/src/work/"),
        );
        let res = fx.run(PrimaryAction::ShowCurrentIdentity, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(res.text(), "work (set by path [/src/work/])");
    }

    #[test]
    fn show_current_identity_without_pattern() {
        let res = Fixture::new().run(PrimaryAction::ShowCurrentIdentity, plain());
        assert_eq!(res.text(), "work (set by default)");
    }

    #[test]
    fn show_current_identity_quiet() {
        let modifiers = Modifiers {
            quiet: true,
            ..plain()
        };
        let res = Fixture::new().run(PrimaryAction::ShowCurrentIdentity, modifiers);
        assert_eq!(res.text(), "work");
    }

    #[test]
    fn show_current_identity_unknown() {
        let mut fx = Fixture::new();
        fx.lookup = FixedLookup(FoundIdentity::new("ghost", IdentitySource::Argv));
        let res = fx.run(PrimaryAction::ShowCurrentIdentity, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(
            res.text(),
            "Bad identity set by argv (ghost). Should be one of 'home, work'"
        );
    }

    #[test]
    fn create_identity() {
        let fx = Fixture::new();
        let res = fx.run(PrimaryAction::CreateIdentity("newid".into()), plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(res.text(), "Created identity 'newid': /ids/newid");
    }

    #[test]
    fn create_existing_identity_is_fatal() {
        let fx = Fixture::new();
        let err = Resolver::new(&fx.config, &fx.dir, &fx.lookup, &fx.ssh)
            .resolve(&ActionRequest::new(PrimaryAction::CreateIdentity("work".into())))
            .unwrap_err();
        assert!(matches!(err, IdentError::IdentityExists(_)));
    }

    #[test]
    fn set_shell_known_identity() {
        let res = Fixture::new().run(
            PrimaryAction::SetShellIdentity(ShellTarget::Named("work".into())),
            plain(),
        );
        assert_eq!(
            res.mask(),
            flags(&[ActionFlag::SetShellEnv, ActionFlag::SshIdentity])
        );
        assert_eq!(res.render(false), "work");
    }

    #[test]
    fn set_shell_default_substitutes_config() {
        let res = Fixture::new().run(PrimaryAction::SetShellIdentity(ShellTarget::Default), plain());
        assert_eq!(
            res.mask(),
            flags(&[ActionFlag::SetShellEnv, ActionFlag::SshIdentity])
        );
        assert_eq!(res.text(), "home");
    }

    #[test]
    fn set_shell_unknown_identity() {
        let res = Fixture::new().run(
            PrimaryAction::SetShellIdentity(ShellTarget::Named("bogus".into())),
            plain(),
        );
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert!(!res.mask().contains(ActionFlag::SetShellEnv));
        assert!(!res.mask().contains(ActionFlag::SshIdentity));
        assert_eq!(res.text(), "Bad identity 'bogus'");
    }

    #[test]
    fn marker_name_is_not_special() {
        let res = Fixture::new().run(
            PrimaryAction::SetShellIdentity(ShellTarget::Named("default-ssh-id".into())),
            plain(),
        );
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
    }

    #[test]
    fn flag_only_actions() {
        let fx = Fixture::new();
        let cases = [
            (PrimaryAction::UnsetShellIdentity, ActionFlag::UnsetShellEnv),
            (PrimaryAction::EnablePrompt, ActionFlag::EnablePrompt),
            (PrimaryAction::DisablePrompt, ActionFlag::DisablePrompt),
        ];
        for (action, flag) in cases {
            let res = fx.run(action, plain());
            assert_eq!(res.mask(), flags(&[flag]));
            assert_eq!(res.text(), "");
            assert_eq!(res.render(true), format!("{} ", flag.bits()));
        }
    }

    #[test]
    fn activate_with_config_flags() {
        let mut fx = Fixture::new();
        fx.config.ssh_ident_prompt = true;
        fx.config.ssh_ident_bash_functions = true;
        let res = fx.run(PrimaryAction::Activate, plain());
        assert_eq!(
            res.mask(),
            flags(&[
                ActionFlag::SshIdentity,
                ActionFlag::EnablePrompt,
                ActionFlag::DefineBashFunctions
            ])
        );
        assert_eq!(res.text(), "work");
    }

    #[test]
    fn activate_minimal() {
        let res = Fixture::new().run(PrimaryAction::Activate, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::SshIdentity]));
    }

    #[test]
    fn activate_unknown_identity() {
        let mut fx = Fixture::new();
        fx.config.ssh_ident_prompt = true;
        fx.config.ssh_ident_bash_functions = true;
        fx.lookup = FixedLookup(FoundIdentity::new("", IdentitySource::None));
        let res = fx.run(PrimaryAction::Activate, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert!(!res.mask().contains(ActionFlag::EnablePrompt));
        assert!(!res.mask().contains(ActionFlag::DefineBashFunctions));
        assert!(res.text().starts_with("Bad identity set by none ()"));
    }

    #[test]
    fn deactivate() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.run(PrimaryAction::Deactivate, plain()).mask(),
            flags(&[ActionFlag::UnsetShellEnv])
        );

        fx.config.ssh_ident_prompt = true;
        fx.config.ssh_ident_bash_functions = true;
        let res = fx.run(PrimaryAction::Deactivate, plain());
        assert_eq!(
            res.mask(),
            flags(&[
                ActionFlag::UnsetShellEnv,
                ActionFlag::DisablePrompt,
                ActionFlag::UndefineBashFunctions
            ])
        );
        assert_eq!(res.text(), "");
    }

    #[test]
    fn show_config_found() {
        let mut fx = Fixture::new();
        fx.ssh = FixedSshConfig(Some("Host *\n  User alice\n"));

        let res = fx.run(PrimaryAction::ShowConfigFor("work".into()), plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(res.text(), "Host *\n  User alice");

        let modifiers = Modifiers {
            action_code: true,
            ..plain()
        };
        let res = fx.run(PrimaryAction::ShowConfigFor("work".into()), modifiers);
        assert_eq!(
            res.mask(),
            flags(&[ActionFlag::SshConfig, ActionFlag::PrintOutput])
        );
        assert_eq!(res.render(true), "264 Host *\n  User alice");
    }

    #[test]
    fn show_config_missing() {
        let modifiers = Modifiers {
            action_code: true,
            ..plain()
        };
        let res = Fixture::new().run(PrimaryAction::ShowConfigFor("work".into()), modifiers);
        assert!(res.mask().is_empty());
        assert_eq!(res.render(true), "0 ");
    }

    #[test]
    fn help() {
        let res = Fixture::new().run(PrimaryAction::ShowHelp, plain());
        assert_eq!(res.mask(), flags(&[ActionFlag::PrintOutput]));
        assert_eq!(res.text(), "usage: ssh-ident-cli [OPTIONS]");
    }

    #[test]
    fn verbose_always_added() {
        let verbose = Modifiers {
            verbose: true,
            ..plain()
        };
        let fx = Fixture::new();
        for action in [
            PrimaryAction::UnsetShellIdentity,
            PrimaryAction::ShowHelp,
            PrimaryAction::ShowConfigFor("work".into()),
        ] {
            let res = fx.run(action, verbose);
            assert!(res.mask().contains(ActionFlag::Verbose));
        }
    }

    #[test]
    fn render_trims_only_the_edges() {
        let res = Resolution {
            mask: flags(&[ActionFlag::PrintOutput]),
            lines: vec!["".into(), "  a".into(), "".into(), "b  ".into(), "\n".into()],
        };
        assert_eq!(res.render(false), "a\n\nb");
        assert_eq!(res.lines().len(), 5);
    }
}
