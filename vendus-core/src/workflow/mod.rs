//! The invoice export protocol.
//!
//! A run walks [`ExportState`] from `Unauthenticated` to `Done` (or `Skipped`
//! when the month has no documents). Entering a state performs that state's
//! page actions; the transition out of it is decided by [`ExportState::next`]
//! from the guards collected so far. Any missed selector or expired wait ends
//! the run with an error. Nothing is retried.

mod session;
mod state;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace};
use url::Url;

use crate::bridge::{DownloadRequest, TaskBridge};
use crate::browser::BrowserError;
use crate::config::{SelectorSection, TimingSection};
use crate::error::{ExportError, ExportResult};

pub use session::ExportSession;
pub use state::{ExportState, Guards};

/// Engine-level settings: where the back-office lives and how its UI is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub base_url: String,
    pub selectors: SelectorSection,
    pub timing: TimingSection,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            selectors: SelectorSection::default(),
            timing: TimingSection::default(),
        }
    }

    /// `path` appended to the base URL, the way relative visits are resolved.
    pub fn page_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Values scoped to a single run and readable only by the workflow.
#[derive(Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    pub user: String,
    pub password: String,
    pub output: String,
    pub start: String,
    pub end: String,
}

impl fmt::Debug for RunEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunEnvironment")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("output", &self.output)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed { path: PathBuf },
    /// The period has no documents; nothing was exported.
    Skipped { reason: String },
}

impl ExportOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ExportOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum Readiness {
    Attached,
    Visible,
}

#[derive(Debug, Default)]
struct RunState {
    guards: Guards,
    href: Option<String>,
    downloaded: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExportWorkflow {
    config: EngineConfig,
    env: RunEnvironment,
    bridge: TaskBridge,
}

impl ExportWorkflow {
    pub fn new(config: EngineConfig, env: RunEnvironment, bridge: TaskBridge) -> Self {
        Self {
            config,
            env,
            bridge,
        }
    }

    pub async fn run<S>(&self, session: &mut S) -> ExportResult<ExportOutcome>
    where
        S: ExportSession + ?Sized,
    {
        let mut run = RunState {
            guards: Guards {
                preflight_enabled: self.config.selectors.no_documents_text.is_some(),
                no_documents: false,
            },
            ..RunState::default()
        };
        let mut state = ExportState::Unauthenticated;
        info!(start = %self.env.start, end = %self.env.end, "export run started");

        while let Some(next) = state.next(run.guards) {
            debug!(from = %state, to = %next, "export state transition");
            self.enter(next, session, &mut run).await?;
            state = next;
        }

        match state {
            ExportState::Skipped => {
                info!(start = %self.env.start, end = %self.env.end, "no documents in period");
                Ok(ExportOutcome::Skipped {
                    reason: format!(
                        "no documents between {} and {}",
                        self.env.start, self.env.end
                    ),
                })
            }
            _ => {
                let path = run.downloaded.ok_or_else(|| {
                    ExportError::DownloadFailure("export finished without a file".to_string())
                })?;
                info!(path = %path.display(), "export run finished");
                Ok(ExportOutcome::Completed { path })
            }
        }
    }

    async fn enter<S>(
        &self,
        state: ExportState,
        session: &mut S,
        run: &mut RunState,
    ) -> ExportResult<()>
    where
        S: ExportSession + ?Sized,
    {
        let budget = state.timeout_budget(&self.config.timing);
        let selectors = &self.config.selectors;
        match state {
            ExportState::Authenticating => {
                session
                    .goto(&self.config.page_url(&selectors.login_path))
                    .await?;
                self.bridge.status("Authenticating...").await?;
                self.type_into(session, &selectors.email, &self.env.user, false, budget)
                    .await?;
                self.type_into(
                    session,
                    &selectors.password,
                    &self.env.password,
                    false,
                    budget,
                )
                .await?;
                self.click(session, &selectors.submit, false, budget).await?;
            }
            ExportState::Navigating => {
                self.bridge.status("Loading documents...").await?;
                self.click(session, &selectors.documents_menu, false, budget)
                    .await?;
                self.click(session, &selectors.invoice_menu, false, budget)
                    .await?;
            }
            ExportState::Filtering => {
                self.click(session, &selectors.calendar_toggle, false, budget)
                    .await?;
                self.type_into(session, &selectors.filter_start, &self.env.start, true, budget)
                    .await?;
                self.type_into(session, &selectors.filter_end, &self.env.end, true, budget)
                    .await?;
                self.click(session, &selectors.filter_submit, true, budget)
                    .await?;
            }
            ExportState::PreflightCheck => {
                self.settle().await;
                if let Some(sentinel) = &selectors.no_documents_text {
                    run.guards.no_documents = session.contains_text(sentinel).await?;
                }
            }
            ExportState::CancelPendingExport => {
                self.wait_for(session, &selectors.export_button, Readiness::Attached, budget)
                    .await?;
                if session.is_visible(&selectors.export_cancel).await? {
                    info!("cancelling export left pending by a previous run");
                    session.click(&selectors.export_cancel, true).await?;
                }
            }
            ExportState::Exporting => {
                self.settle().await;
                self.bridge.status("Exporting documents...").await?;
                self.click(session, &selectors.export_button, false, budget)
                    .await?;
                self.settle().await;
            }
            ExportState::AwaitingCompletion => {
                self.wait_for(
                    session,
                    &selectors.export_done_link,
                    Readiness::Visible,
                    budget,
                )
                .await?;
                let href = session
                    .href(&selectors.export_done_link)
                    .await?
                    .filter(|href| !href.trim().is_empty())
                    .ok_or_else(|| {
                        BrowserError::Element(format!(
                            "{} has no download link",
                            selectors.export_done_link
                        ))
                    })?;
                run.href = Some(self.resolve_href(&href)?);
            }
            ExportState::Downloading => {
                let href = run.href.clone().ok_or_else(|| {
                    ExportError::DownloadFailure("download link was never captured".to_string())
                })?;
                let parsed = self.bridge.parse_path(&self.env.output).await?;
                self.bridge
                    .status(format!(
                        "Downloading \"{}\" file into \"{}\"...",
                        parsed.base, parsed.dir
                    ))
                    .await?;
                // The session cookie only goes back to the back-office itself.
                let cookies = if self.same_origin(&href) {
                    session.cookies().await?
                } else {
                    debug!(href = %href, "download link leaves the back-office origin");
                    Vec::new()
                };
                let user_agent = session.user_agent().await?;
                let request =
                    DownloadRequest::new(href, parsed.dir, parsed.base).with_session(cookies, user_agent);
                run.downloaded = Some(self.bridge.download_file(&request).await?);
            }
            ExportState::Unauthenticated | ExportState::Done | ExportState::Skipped => {}
        }
        Ok(())
    }

    async fn click<S>(
        &self,
        session: &mut S,
        selector: &str,
        force: bool,
        timeout: Duration,
    ) -> ExportResult<()>
    where
        S: ExportSession + ?Sized,
    {
        self.wait_for(session, selector, readiness(force), timeout)
            .await?;
        session.click(selector, force).await?;
        Ok(())
    }

    async fn type_into<S>(
        &self,
        session: &mut S,
        selector: &str,
        text: &str,
        force: bool,
        timeout: Duration,
    ) -> ExportResult<()>
    where
        S: ExportSession + ?Sized,
    {
        self.wait_for(session, selector, readiness(force), timeout)
            .await?;
        session.type_text(selector, text, force).await?;
        Ok(())
    }

    async fn wait_for<S>(
        &self,
        session: &mut S,
        selector: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> ExportResult<()>
    where
        S: ExportSession + ?Sized,
    {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(self.config.timing.poll_interval_ms.max(10));
        let mut last_error = None;
        loop {
            let check = match readiness {
                Readiness::Attached => session.exists(selector).await,
                Readiness::Visible => session.is_visible(selector).await,
            };
            // A page mid-navigation fails evaluations; that only means "not yet".
            match check {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => {
                    debug!(selector, error = %err, "readiness check failed");
                    last_error = Some(err.to_string());
                }
            }
            if Instant::now() >= deadline {
                let mut what = format!("{selector} ({readiness:?}) after {}s", timeout.as_secs());
                if let Some(err) = last_error {
                    what.push_str(&format!(", last error: {err}"));
                }
                return Err(ExportError::InteractionTimeout(what));
            }
            trace!(selector, ?readiness, "waiting for element");
            sleep(poll).await;
        }
    }

    async fn settle(&self) {
        sleep(Duration::from_millis(self.config.timing.settle_ms)).await;
    }

    fn same_origin(&self, href: &str) -> bool {
        match (Url::parse(&self.config.base_url), Url::parse(href)) {
            (Ok(base), Ok(link)) => base.origin() == link.origin(),
            _ => false,
        }
    }

    fn resolve_href(&self, href: &str) -> ExportResult<String> {
        let base = Url::parse(&self.config.base_url).map_err(|err| {
            ExportError::DownloadFailure(format!("invalid base url {}: {err}", self.config.base_url))
        })?;
        base.join(href)
            .map(|url| url.to_string())
            .map_err(|err| ExportError::DownloadFailure(format!("invalid export link {href}: {err}")))
    }
}

fn readiness(force: bool) -> Readiness {
    if force {
        Readiness::Attached
    } else {
        Readiness::Visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_appends_to_base_path() {
        let config = EngineConfig::new("https://office.example.com/app/");
        assert_eq!(
            config.page_url("/login/"),
            "https://office.example.com/app/login/"
        );
        assert_eq!(
            config.page_url("login/"),
            "https://office.example.com/app/login/"
        );
        assert_eq!(config.page_url("https://other/"), "https://other/");
    }

    #[test]
    fn relative_links_resolve_against_base_url() {
        let workflow = ExportWorkflow::new(
            EngineConfig::new("https://office.example.com"),
            RunEnvironment {
                user: "u".into(),
                password: "p".into(),
                output: "/tmp/x.zip".into(),
                start: "2024/2/1".into(),
                end: "2024/2/29".into(),
            },
            TaskBridge::new(),
        );
        assert_eq!(
            workflow.resolve_href("/export/42.zip").unwrap(),
            "https://office.example.com/export/42.zip"
        );
        assert_eq!(
            workflow.resolve_href("https://cdn.example.com/42.zip").unwrap(),
            "https://cdn.example.com/42.zip"
        );
    }

    #[test]
    fn only_back_office_links_share_its_origin() {
        let workflow = ExportWorkflow::new(
            EngineConfig::new("https://office.example.com/app/"),
            RunEnvironment {
                user: "u".into(),
                password: "p".into(),
                output: "/tmp/x.zip".into(),
                start: "2024/2/1".into(),
                end: "2024/2/29".into(),
            },
            TaskBridge::new(),
        );
        assert!(workflow.same_origin("https://office.example.com/export/42.zip"));
        assert!(!workflow.same_origin("https://cdn.example.com/42.zip"));
        assert!(!workflow.same_origin("http://office.example.com/export/42.zip"));
        assert!(!workflow.same_origin("file:///etc/hostname"));
    }

    #[test]
    fn environment_debug_hides_password() {
        let env = RunEnvironment {
            user: "u".into(),
            password: "secret".into(),
            output: "o".into(),
            start: "s".into(),
            end: "e".into(),
        };
        assert!(!format!("{env:?}").contains("secret"));
    }
}
