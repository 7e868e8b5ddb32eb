use async_trait::async_trait;
use tracing::warn;

use crate::bridge::TaskBridge;
use crate::error::ExportResult;
use crate::workflow::{EngineConfig, ExportOutcome, ExportWorkflow, RunEnvironment};

use super::launcher::BrowserLauncher;
use super::session::ChromiumSession;

/// Runs the export workflow against some page implementation.
#[async_trait(?Send)]
pub trait AutomationEngine {
    async fn run(
        &self,
        config: &EngineConfig,
        env: &RunEnvironment,
        bridge: &TaskBridge,
    ) -> ExportResult<ExportOutcome>;
}

#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    launcher: BrowserLauncher,
}

impl ChromiumEngine {
    pub fn new(launcher: BrowserLauncher) -> Self {
        Self { launcher }
    }
}

#[async_trait(?Send)]
impl AutomationEngine for ChromiumEngine {
    async fn run(
        &self,
        config: &EngineConfig,
        env: &RunEnvironment,
        bridge: &TaskBridge,
    ) -> ExportResult<ExportOutcome> {
        let automation = self.launcher.launch().await?;
        let outcome = match automation.new_context().await {
            Ok(context) => {
                let mut session = ChromiumSession::new(context);
                let workflow = ExportWorkflow::new(config.clone(), env.clone(), bridge.clone());
                workflow.run(&mut session).await
            }
            Err(err) => Err(err.into()),
        };
        if let Err(err) = automation.shutdown().await {
            warn!(error = %err, "browser shutdown failed");
        }
        outcome
    }
}
