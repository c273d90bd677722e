use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use zorpctl_algorithms::{
    AuthorizeAlgorithm, CommandHandler, DeadlockCheckAlgorithm, DetailedStatusAlgorithm,
    GuiStatusAlgorithm, LogLevelAlgorithm, LogLevelMode, PidAlgorithm, ProcInfoAlgorithm,
    ProcessContext, ReloadAlgorithm, StartAlgorithm, StatusAlgorithm, StopAlgorithm,
    StopSessionAlgorithm, SzigWalkAlgorithm, ZorpctlConfig,
};
use zorpctl_common::{CommandResult, Instance};
use zorpctl_szig::NoTransportFactory;

/// Control tool for Zorp proxy-firewall instances
#[derive(Parser, Debug)]
#[command(name = "zorpctl", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE", default_value = "/etc/zorp/zorpctl.yaml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start instance processes
    Start {
        /// Instance names ('name' or 'name#N'); empty means all
        instances: Vec<String>,

        /// Start even when no-auto-start is set
        #[arg(long)]
        force: bool,
    },

    /// Stop instance processes
    Stop {
        instances: Vec<String>,

        /// SIGKILL instead of SIGTERM, and drop the pid file immediately
        #[arg(long)]
        force: bool,
    },

    /// Trigger a policy reload
    Reload { instances: Vec<String> },

    /// One-line status per instance process
    Status { instances: Vec<String> },

    /// Machine-readable flattened status records
    GuiStatus { instances: Vec<String> },

    /// Status with process-accounting details
    DetailedStatus { instances: Vec<String> },

    /// Raw procfs accounting record
    ProcInfo { instances: Vec<String> },

    /// Recorded pid, without requiring liveness
    Pid { instances: Vec<String> },

    /// Read or adjust log verbosity
    LogLevel {
        instances: Vec<String>,

        /// Set the level to this value
        #[arg(long, conflicts_with_all = ["increment", "decrement"])]
        set: Option<i64>,

        /// Raise the level by one
        #[arg(long, conflicts_with = "decrement")]
        increment: bool,

        /// Lower the level by one
        #[arg(long)]
        decrement: bool,
    },

    /// Read or toggle deadlock detection
    DeadlockCheck {
        instances: Vec<String>,

        /// Enable or disable before reporting
        #[arg(long)]
        set: Option<bool>,
    },

    /// Materialize the stats tree
    SzigWalk {
        instances: Vec<String>,

        /// Subtree to walk; empty walks everything
        #[arg(long, default_value = "")]
        root: String,
    },

    /// Accept or reject a pending session
    Authorize {
        instances: Vec<String>,

        #[arg(long)]
        session_id: String,

        /// Accept instead of reject
        #[arg(long)]
        accept: bool,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Terminate a session
    StopSession {
        instances: Vec<String>,

        #[arg(long)]
        session_id: String,
    },
}

impl Command {
    fn instances(&self) -> &[String] {
        match self {
            Command::Start { instances, .. }
            | Command::Stop { instances, .. }
            | Command::Reload { instances }
            | Command::Status { instances }
            | Command::GuiStatus { instances }
            | Command::DetailedStatus { instances }
            | Command::ProcInfo { instances }
            | Command::Pid { instances }
            | Command::LogLevel { instances, .. }
            | Command::DeadlockCheck { instances, .. }
            | Command::SzigWalk { instances, .. }
            | Command::Authorize { instances, .. }
            | Command::StopSession { instances, .. } => instances,
        }
    }

    /// Whether the JSON payload is the interesting part of the output.
    fn shows_value(&self) -> bool {
        matches!(
            self,
            Command::ProcInfo { .. } | Command::Pid { .. } | Command::SzigWalk { .. }
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.debug)?;

    debug!("Config file: {}", cli.config);
    let config = ZorpctlConfig::load_from_file(&cli.config)?;
    info!("Loaded configuration for {} instances", config.instances.len());

    let targets = resolve_targets(&config, cli.command.instances())?;

    let szig = NoTransportFactory;
    let ctx = ProcessContext::new(&config, &szig);

    let mut failures = 0usize;
    for instance in &targets {
        let result = dispatch(&cli.command, &ctx, instance);
        render(&instance.process_name(), &result, cli.command.shows_value());
        if !result.is_success() {
            failures += 1;
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(command: &Command, ctx: &ProcessContext, instance: &Instance) -> CommandResult {
    match command {
        Command::Start { force, .. } => {
            StartAlgorithm::new(ctx).with_force(*force).execute(instance)
        }
        Command::Stop { force, .. } => StopAlgorithm::new(ctx).with_force(*force).execute(instance),
        Command::Reload { .. } => ReloadAlgorithm::new(ctx).execute(instance),
        Command::Status { .. } => StatusAlgorithm::new(ctx).execute(instance),
        Command::GuiStatus { .. } => GuiStatusAlgorithm::new(ctx).execute(instance),
        Command::DetailedStatus { .. } => DetailedStatusAlgorithm::new(ctx).execute(instance),
        Command::ProcInfo { .. } => ProcInfoAlgorithm::new(ctx).execute(instance),
        Command::Pid { .. } => PidAlgorithm::new(ctx).execute(instance),
        Command::LogLevel {
            set,
            increment,
            decrement,
            ..
        } => {
            let mode = match (*set, *increment, *decrement) {
                (Some(level), _, _) => LogLevelMode::Set(level),
                (None, true, _) => LogLevelMode::Increment,
                (None, _, true) => LogLevelMode::Decrement,
                (None, false, false) => LogLevelMode::Get,
            };
            LogLevelAlgorithm::new(ctx, mode).execute(instance)
        }
        Command::DeadlockCheck { set, .. } => {
            DeadlockCheckAlgorithm::new(ctx, *set).execute(instance)
        }
        Command::SzigWalk { root, .. } => {
            SzigWalkAlgorithm::new(ctx, root.clone()).execute(instance)
        }
        Command::Authorize {
            session_id,
            accept,
            description,
            ..
        } => AuthorizeAlgorithm::new(ctx, *accept, session_id.clone(), description.clone())
            .execute(instance),
        Command::StopSession { session_id, .. } => {
            StopSessionAlgorithm::new(ctx, session_id.clone()).execute(instance)
        }
    }
}

/// Expand instance arguments into per-process targets.
///
/// A bare name targets every declared process of the instance; 'name#N'
/// targets exactly one. No arguments means every declared instance.
fn resolve_targets(config: &ZorpctlConfig, names: &[String]) -> Result<Vec<Instance>> {
    let mut targets = Vec::new();

    if names.is_empty() {
        for instance in &config.instances {
            expand(instance, &mut targets);
        }
        return Ok(targets);
    }

    for name in names {
        match name.split_once('#') {
            Some((base, num)) => {
                let instance = config
                    .find_instance(base)
                    .ok_or_else(|| anyhow::anyhow!("No such instance: {}", base))?;
                let process_num = num
                    .parse::<u32>()
                    .map_err(|_| anyhow::anyhow!("Invalid process number: {}", name))?;
                targets.push(instance.with_process_num(process_num));
            }
            None => {
                let instance = config
                    .find_instance(name)
                    .ok_or_else(|| anyhow::anyhow!("No such instance: {}", name))?;
                expand(instance, &mut targets);
            }
        }
    }

    if targets.is_empty() {
        bail!("No instances configured");
    }
    Ok(targets)
}

fn expand(instance: &Instance, targets: &mut Vec<Instance>) {
    for process_num in 0..instance.number_of_processes {
        targets.push(instance.with_process_num(process_num));
    }
}

fn render(process_name: &str, result: &CommandResult, shows_value: bool) {
    if !result.message().is_empty() {
        println!("{}: {}", process_name, result.message());
    }
    if shows_value {
        if let Some(value) = result.value() {
            match serde_json::to_string_pretty(value) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => eprintln!("{}: unrenderable payload: {}", process_name, e),
            }
        }
    }
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
