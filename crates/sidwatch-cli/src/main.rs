mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{checkpoint::CheckpointSubcommand, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sidwatch",
    about = "Watch service configuration tables and restart the dependent job when they change",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest sidwatch.yaml upward from the current directory)
    #[arg(long, global = true, env = "SIDWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overriding database.url from the config file
    #[arg(long, global = true, env = "SIDWATCH_DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug detail
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Establish a baseline, restart the job, then poll until signalled
    Run,

    /// Fetch the current fingerprint once and print it
    Fingerprint,

    /// Run one reconciliation cycle against the stored checkpoint
    Step,

    /// Inspect or clear the stored checkpoint
    Checkpoint {
        #[command(subcommand)]
        subcommand: CheckpointSubcommand,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Report whether a watchdog is running for this config
    Status,

    /// Send SIGTERM to the running watchdog
    Stop,

    /// Stop the running watchdog, wait for it to exit, then `run`
    Restart,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => tracing::Level::DEBUG,
        (Commands::Run | Commands::Restart | Commands::Step, false) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());
    let ctx = cmd::Context {
        config_path,
        database_url: cli.database_url,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Run => cmd::run::run(&ctx),
        Commands::Fingerprint => cmd::fingerprint::run(&ctx),
        Commands::Step => cmd::step::run(&ctx),
        Commands::Checkpoint { subcommand } => cmd::checkpoint::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
        Commands::Status => cmd::status::status(&ctx),
        Commands::Stop => cmd::status::stop(&ctx),
        Commands::Restart => cmd::status::restart(&ctx),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
