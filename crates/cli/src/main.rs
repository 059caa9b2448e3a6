// txnmis - transaction MIS reconciler, command-line front end

mod exit_codes;
mod run;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::EXIT_SUCCESS;
use run::RunArgs;

#[derive(Parser)]
#[command(name = "txnmis")]
#[command(about = "Reconcile client and scheme masters and build the transaction MIS report")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Only log warnings and errors (RUST_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the master and write the Raw Dump / Working / Final report
    #[command(after_help = "\
Examples:
  txnmis run -t extract.xlsx -c clients.xlsx -s schemes.xlsx -m master.xlsx
  txnmis run -t extract.csv -c clients.xlsx -s schemes.xlsx -m master.xlsx --out-dir out --json
  txnmis run -t extract.xlsx -c clients.xlsx -s schemes.xlsx -m master.xlsx --config mis.toml")]
    Run(RunArgs),

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  txnmis validate --config mis.toml")]
    Validate {
        /// Path to the TOML config file
        #[arg(long)]
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  txnmis-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Logs go to stderr so `--json` output on stdout stays clean. Colour only on a terminal.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "txnmis=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// A failed command: exit code, message, optional hint.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
