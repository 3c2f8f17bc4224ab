//! ssh-ident-cli — identity helper for the ssh-ident shell wrapper.
//!
//! Decides which SSH identity applies and prints it, optionally prefixed
//! with a decimal action code telling the wrapper which shell-level side
//! effects to perform. This process never changes the calling shell.

use anyhow::{Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use ssh_ident_core::{
    ActionRequest, Config, IdentityStore, Modifiers, PrimaryAction, Resolver, RuleMatcher,
    ShellTarget, SshConfigFinder,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// ssh-ident-cli — pick an SSH identity for the current shell
#[derive(Debug, Parser)]
#[command(
    name = "ssh-ident-cli",
    version,
    about = "Pick an SSH identity for the current shell",
    disable_help_flag = true
)]
#[command(group(ArgGroup::new("action").multiple(false)))]
struct Cli {
    /// Be quieter
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print this help
    #[arg(short, long)]
    help: bool,

    /// Prefix output with an int containing the action flags
    #[arg(long)]
    action_code: bool,

    /// List identities
    #[arg(short, long, group = "action")]
    list: bool,

    /// Show current identity
    #[arg(short, long, group = "action")]
    identity: bool,

    /// Activate ssh-ident with default config settings
    #[arg(short, long, group = "action")]
    activate: bool,

    /// Deactivate ssh-ident
    #[arg(short, long, group = "action")]
    deactivate: bool,

    /// Create a new identity
    #[arg(short, long, value_name = "IDENTITY", group = "action")]
    create: Option<String>,

    /// Set identity for the shell (default identity when omitted)
    #[arg(short, long, value_name = "IDENTITY", num_args = 0..=1, group = "action")]
    shell: Option<Option<String>>,

    /// Unset identity for the shell
    #[arg(short, long, group = "action")]
    unset_shell: bool,

    /// Enable prompt indicator
    #[arg(short, long, group = "action")]
    prompt: bool,

    /// Remove prompt indicator
    #[arg(short, long, group = "action")]
    remove_prompt: bool,

    /// Get SSH config for the given identity
    #[arg(long, value_name = "IDENTITY", group = "action")]
    config: Option<String>,
}

impl Cli {
    fn primary_action(&self) -> PrimaryAction {
        if self.help {
            return PrimaryAction::ShowHelp;
        }
        if self.list {
            PrimaryAction::ListIdentities
        } else if self.identity {
            PrimaryAction::ShowCurrentIdentity
        } else if let Some(name) = &self.create {
            PrimaryAction::CreateIdentity(name.clone())
        } else if let Some(target) = &self.shell {
            PrimaryAction::SetShellIdentity(match target {
                Some(name) => ShellTarget::Named(name.clone()),
                None => ShellTarget::Default,
            })
        } else if self.unset_shell {
            PrimaryAction::UnsetShellIdentity
        } else if self.prompt {
            PrimaryAction::EnablePrompt
        } else if self.remove_prompt {
            PrimaryAction::DisablePrompt
        } else if self.activate {
            PrimaryAction::Activate
        } else if self.deactivate {
            PrimaryAction::Deactivate
        } else if let Some(name) = &self.config {
            PrimaryAction::ShowConfigFor(name.clone())
        } else {
            PrimaryAction::ShowHelp
        }
    }

    fn request(&self, argv: Vec<String>) -> ActionRequest {
        ActionRequest::new(self.primary_action())
            .with_modifiers(Modifiers {
                quiet: self.quiet,
                verbose: self.verbose,
                action_code: self.action_code,
            })
            .with_argv(argv)
    }
}

fn init_tracing(verbose: bool) {
    // stdout belongs to the wrapper shell; logs go to stderr.
    let default_filter = if verbose {
        "ssh_ident_cli=debug,ssh_ident_core=debug"
    } else {
        "ssh_ident_cli=warn,ssh_ident_core=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load(&config_path)
        .and_then(Config::with_env)
        .context("failed to load config")?;
    debug!(path = %config_path.display(), identities = %config.dir_identities.display(), "config ready");

    let store = IdentityStore::new(&config.dir_identities);
    let lookup = RuleMatcher::new(&config).context("invalid identity match rules")?;
    let ssh_configs = SshConfigFinder::new(&config).context("invalid pattern_config")?;

    let request = cli.request(std::env::args().collect());
    let usage = Cli::command().render_help().to_string();

    let resolution = Resolver::new(&config, &store, &lookup, &ssh_configs)
        .with_usage(usage)
        .resolve(&request)?;

    println!("{}", resolution.render(request.modifiers.action_code));
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("ssh-ident-cli: {e:#}");
        std::process::exit(1);
    }
}
