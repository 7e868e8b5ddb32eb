use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use console::style;
use tracing::info;
use vendus_core::{
    load_browser_config, BrowserConfig, BrowserLauncher, ChromiumEngine, ConfigStore,
    ExportError, ExportOptions, ExportOutcome, HttpDownloader, Orchestrator, StatusReporter,
    TaskBridge,
};

use crate::Result;

/// Exports one month of invoices into a single file.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Month to export, 1-12 (defaults to the stored month, then the current one)
    #[arg(short, long)]
    pub month: Option<String>,
    /// Destination file, e.g. ~/invoices/2024-02.zip
    #[arg(short, long)]
    pub output: PathBuf,
    /// Optional TOML file with chromium, viewport, timing and selector settings
    #[arg(long, value_name = "PATH")]
    pub browser_config: Option<PathBuf>,
    /// Show the browser window
    #[arg(long, conflicts_with = "headless")]
    pub headed: bool,
    /// Hide the browser window even if the settings file says otherwise
    #[arg(long)]
    pub headless: bool,
}

impl ExportArgs {
    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut config = match &self.browser_config {
            Some(path) => load_browser_config(path)?,
            None => BrowserConfig::default(),
        };
        if self.headed {
            config.chromium.headless = false;
        } else if self.headless {
            config.chromium.headless = true;
        }
        Ok(config)
    }
}

/// Prints workflow status lines on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn report(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", style(message).green());
        let _ = stdout.flush();
    }
}

pub async fn run(store: ConfigStore, args: ExportArgs) -> Result<()> {
    println!(
        "{}",
        style(format!(
            "{} v{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .underlined()
    );

    let browser = args.browser_config()?;
    let downloader = HttpDownloader::new().map_err(ExportError::from)?;
    let bridge = TaskBridge::standard(Arc::new(ConsoleReporter), downloader);
    let engine = ChromiumEngine::new(BrowserLauncher::new(browser.clone()));
    let orchestrator = Orchestrator::new(store, browser, engine, bridge);

    let options = ExportOptions {
        month: args.month,
        output: Some(args.output),
        overrides: Default::default(),
    };
    let prepared = orchestrator.prepare(&options, Utc::now())?;
    info!(
        store = %orchestrator.store().path().display(),
        month = prepared.month,
        "export prepared"
    );
    println!("{}", style(&prepared.window).dim());
    ConsoleReporter.report("Loading Vendus page...");

    let report = orchestrator.execute(prepared).await?;
    match report.outcome {
        ExportOutcome::Completed { path } => {
            info!(path = %path.display(), "export saved");
            println!("{}", style("Done, enjoy your saved time!").green().bold());
        }
        ExportOutcome::Skipped { reason } => {
            println!(
                "{}",
                style(format!(
                    "Nothing to export for month {}: {reason}.",
                    report.month
                ))
                .yellow()
            );
        }
    }
    Ok(())
}
