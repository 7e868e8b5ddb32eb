mod commands;

use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use vendus_core::{ConfigError, ConfigStore, ExportError};

pub use commands::config::{config_command, ConfigArgs};
pub use commands::export::{ConsoleReporter, ExportArgs};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Export(#[from] ExportError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Export(err) => err.kind(),
            AppError::Config(ConfigError::MissingKey(_)) => "MissingConfigurationKey",
            AppError::Config(_) => "Configuration",
            AppError::Io(_) => "Io",
            AppError::Serialize(_) => "Serialization",
        }
    }

    /// `Kind: message` followed by one `caused by:` line per underlying source.
    pub fn report(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.kind(), self)];
        let mut source = self.source();
        // Transparent wrappers repeat their inner message; skip the first hop.
        if matches!(self, AppError::Export(_) | AppError::Config(_)) {
            source = source.and_then(|inner| inner.source());
        }
        while let Some(cause) = source {
            lines.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        lines.join("\n")
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Monthly invoice export from the Vendus back-office", long_about = None)]
pub struct Cli {
    /// Path of the persisted settings file (defaults to $VENDUS_EXPORT_CONFIG or ~/.config/vendus-export/.config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exports one month of invoices
    Export(ExportArgs),
    /// Reads or writes a persisted setting
    Config(ConfigArgs),
    /// Prints shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vendus_core=debug,vendusctl=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Export(args) => {
            let store = ConfigStore::open(cli.config)?;
            commands::export::run(store, args).await
        }
        Commands::Config(args) => {
            let store = ConfigStore::open(cli.config)?;
            if let Some(value) = config_command(&store, &args)? {
                println!("{value}");
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            Ok(())
        }
    }
}
