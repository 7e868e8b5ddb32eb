use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use crate::bridge::TaskBridge;
use crate::browser::AutomationEngine;
use crate::config::{BrowserConfig, ConfigOverrides, ConfigStore, Configuration, MONTH, OUTPUT};
use crate::error::{ExportError, ExportResult};
use crate::window::DateWindow;
use crate::workflow::{EngineConfig, ExportOutcome, RunEnvironment};

/// What the operator asked for on one invocation.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// 1-based month; the current month when neither this nor the store sets one.
    pub month: Option<String>,
    pub output: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

/// Everything a run needs, computed before the browser starts.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub configuration: Configuration,
    pub month: i32,
    pub window: DateWindow,
    pub engine: EngineConfig,
    pub environment: RunEnvironment,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub month: i32,
    pub window: DateWindow,
    pub outcome: ExportOutcome,
}

/// Strict integer parse; anything else is `InvalidMonth`.
pub fn parse_month(value: &str) -> ExportResult<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| ExportError::InvalidMonth(value.to_string()))
}

#[derive(Debug)]
pub struct Orchestrator<E> {
    store: ConfigStore,
    browser: BrowserConfig,
    engine: E,
    bridge: TaskBridge,
}

impl<E: AutomationEngine> Orchestrator<E> {
    pub fn new(store: ConfigStore, browser: BrowserConfig, engine: E, bridge: TaskBridge) -> Self {
        Self {
            store,
            browser,
            engine,
            bridge,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn prepare(&self, options: &ExportOptions, now: DateTime<Utc>) -> ExportResult<PreparedRun> {
        let requested = options.month.as_deref().map(parse_month).transpose()?;

        let mut overrides = options.overrides.clone();
        if let Some(output) = &options.output {
            overrides.insert(OUTPUT.to_string(), output.to_string_lossy().into_owned());
        }
        if let Some(month) = &options.month {
            overrides.insert(MONTH.to_string(), month.clone());
        }
        let mut configuration = self.store.resolve(&overrides)?;
        configuration.output = absolute(Path::new(&configuration.output))?
            .to_string_lossy()
            .into_owned();

        let month = match (requested, configuration.month.as_deref()) {
            (Some(month), _) => month,
            (None, Some(stored)) => parse_month(stored)?,
            (None, None) => now.month() as i32,
        };
        let window = DateWindow::for_month(month, now)
            .ok_or_else(|| ExportError::InvalidMonth(month.to_string()))?;

        let engine = EngineConfig {
            base_url: configuration.base_url.clone(),
            selectors: self.browser.selectors.clone(),
            timing: self.browser.timing.clone(),
        };
        let environment = RunEnvironment {
            user: configuration.user.clone(),
            password: configuration.password.clone(),
            output: configuration.output.clone(),
            start: window.start_param(),
            end: window.end_param(),
        };
        Ok(PreparedRun {
            configuration,
            month,
            window,
            engine,
            environment,
        })
    }

    pub async fn execute(&self, prepared: PreparedRun) -> ExportResult<ExportReport> {
        info!(
            month = prepared.month,
            start = %prepared.window.start,
            end = %prepared.window.end,
            output = %prepared.environment.output,
            "starting export run"
        );
        let outcome = self
            .engine
            .run(&prepared.engine, &prepared.environment, &self.bridge)
            .await?;
        Ok(ExportReport {
            month: prepared.month,
            window: prepared.window,
            outcome,
        })
    }

    pub async fn export_month(&self, options: ExportOptions) -> ExportResult<ExportReport> {
        self.export_month_at(options, Utc::now()).await
    }

    pub async fn export_month_at(
        &self,
        options: ExportOptions,
        now: DateTime<Utc>,
    ) -> ExportResult<ExportReport> {
        let prepared = self.prepare(&options, now)?;
        self.execute(prepared).await
    }
}

fn absolute(path: &Path) -> ExportResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
