use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{string_arg, BridgeResult, Task, STATUS};

/// Destination of operator-facing progress lines.
///
/// `report` returns only once the line has been written out, so lines keep
/// the order in which the workflow emits them.
pub trait StatusReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Reporter that routes status lines into the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, message: &str) {
        info!(target: "vendus_core::status", "{message}");
    }
}

pub struct StatusTask {
    reporter: Arc<dyn StatusReporter>,
}

impl StatusTask {
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl Task for StatusTask {
    fn name(&self) -> &'static str {
        STATUS
    }

    async fn call(&self, args: Vec<Value>) -> BridgeResult<Value> {
        let message = match args.first() {
            Some(Value::String(_)) | None => string_arg(STATUS, &args, 0).unwrap_or_default(),
            Some(other) => other.to_string(),
        };
        self.reporter.report(&message);
        Ok(Value::Null)
    }
}
