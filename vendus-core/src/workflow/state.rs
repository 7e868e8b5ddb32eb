use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::TimingSection;

/// Steps of an export run, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExportState {
    Unauthenticated,
    Authenticating,
    Navigating,
    Filtering,
    PreflightCheck,
    CancelPendingExport,
    Exporting,
    AwaitingCompletion,
    Downloading,
    Done,
    Skipped,
}

/// Facts observed during a run that the transition guards depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Guards {
    pub preflight_enabled: bool,
    pub no_documents: bool,
}

impl ExportState {
    /// Next state, or `None` from a terminal state.
    pub fn next(self, guards: Guards) -> Option<ExportState> {
        use ExportState::*;
        let next = match self {
            Unauthenticated => Authenticating,
            Authenticating => Navigating,
            Navigating => Filtering,
            Filtering if guards.preflight_enabled => PreflightCheck,
            Filtering => CancelPendingExport,
            PreflightCheck if guards.no_documents => Skipped,
            PreflightCheck => CancelPendingExport,
            CancelPendingExport => Exporting,
            Exporting => AwaitingCompletion,
            AwaitingCompletion => Downloading,
            Downloading => Done,
            Done | Skipped => return None,
        };
        Some(next)
    }

    /// Longest single wait performed while entering this state.
    pub fn timeout_budget(self, timing: &TimingSection) -> Duration {
        match self {
            ExportState::AwaitingCompletion => Duration::from_secs(timing.ready_timeout_seconds),
            ExportState::Unauthenticated | ExportState::Done | ExportState::Skipped => {
                Duration::ZERO
            }
            _ => Duration::from_secs(timing.selector_timeout_seconds),
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExportState::Unauthenticated => "unauthenticated",
            ExportState::Authenticating => "authenticating",
            ExportState::Navigating => "navigating",
            ExportState::Filtering => "filtering",
            ExportState::PreflightCheck => "preflight_check",
            ExportState::CancelPendingExport => "cancel_pending_export",
            ExportState::Exporting => "exporting",
            ExportState::AwaitingCompletion => "awaiting_completion",
            ExportState::Downloading => "downloading",
            ExportState::Done => "done",
            ExportState::Skipped => "skipped",
        };
        f.write_str(label)
    }
}
