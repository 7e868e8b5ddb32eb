pub mod bridge;
pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod window;
pub mod workflow;

pub use bridge::{
    BridgeError, DownloadRequest, HttpDownloader, LogReporter, ParsedPath, SessionCookie,
    StatusReporter, TaskBridge,
};
pub use browser::{AutomationEngine, BrowserError, BrowserLauncher, ChromiumEngine};
pub use config::{
    load_browser_config, BrowserConfig, ConfigOverrides, ConfigStore, Configuration,
};
pub use error::{ConfigError, ExportError, ExportResult, Result};
pub use export::{parse_month, ExportOptions, ExportReport, Orchestrator, PreparedRun};
pub use window::DateWindow;
pub use workflow::{
    EngineConfig, ExportOutcome, ExportSession, ExportState, ExportWorkflow, RunEnvironment,
};
