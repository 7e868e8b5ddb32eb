mod engine;
mod error;
mod launcher;
mod session;

pub use engine::{AutomationEngine, ChromiumEngine};
pub use error::{BrowserError, BrowserResult};
pub use launcher::{BrowserAutomation, BrowserContext, BrowserLauncher};
pub use session::ChromiumSession;
