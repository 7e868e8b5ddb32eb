#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use serde_json::Value;

use vendus_core::bridge::{
    BridgeResult, DownloadRequest, ParsePathTask, SessionCookie, StatusReporter, StatusTask, Task,
    DOWNLOAD_FILE,
};
use vendus_core::browser::{BrowserError, BrowserResult};
use vendus_core::config::SelectorSection;
use vendus_core::{
    AutomationEngine, EngineConfig, ExportOutcome, ExportResult, ExportSession, ExportWorkflow,
    RunEnvironment, TaskBridge,
};

pub const READY_HREF: &str = "/office/export/download/8812";

/// Scripted back-office page. Selectors in `visible` are shown, selectors in
/// `hidden` exist but are not displayed, everything else is absent.
#[derive(Debug, Default)]
pub struct MockSession {
    pub visible: HashSet<String>,
    pub hidden: HashSet<String>,
    pub page_text: String,
    pub hrefs: HashMap<String, String>,
    pub actions: Vec<String>,
    pub text_checks: usize,
    /// Readiness checks that fail before the page answers normally.
    pub failing_checks: usize,
    /// Navigation never completes; the browser reports a request timeout.
    pub hanging_navigation: bool,
}

impl MockSession {
    /// A page where every step succeeds and the export link shows up.
    pub fn back_office() -> Self {
        let s = SelectorSection::default();
        let mut session = Self::default();
        for selector in [
            &s.email,
            &s.password,
            &s.submit,
            &s.documents_menu,
            &s.invoice_menu,
            &s.calendar_toggle,
            &s.filter_submit,
            &s.export_button,
            &s.export_done_link,
        ] {
            session.visible.insert(selector.clone());
        }
        // The calendar widget keeps its inputs hidden.
        session.hidden.insert(s.filter_start.clone());
        session.hidden.insert(s.filter_end.clone());
        session
            .hrefs
            .insert(s.export_done_link.clone(), READY_HREF.to_string());
        session.page_text = "Faturas 12 documentos".to_string();
        session
    }

    pub fn with_pending_export(mut self) -> Self {
        self.visible
            .insert(SelectorSection::default().export_cancel);
        self
    }

    pub fn with_hidden_pending_export(mut self) -> Self {
        self.hidden
            .insert(SelectorSection::default().export_cancel);
        self
    }

    pub fn without_ready_link(mut self) -> Self {
        let link = SelectorSection::default().export_done_link;
        self.visible.remove(&link);
        self.hidden.insert(link);
        self
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.visible.remove(selector);
        self.hidden.remove(selector);
        self
    }

    pub fn with_ready_href(mut self, href: &str) -> Self {
        self.hrefs
            .insert(SelectorSection::default().export_done_link, href.to_string());
        self
    }

    /// The page is mid-navigation for the next `count` readiness checks.
    pub fn with_failing_checks(mut self, count: usize) -> Self {
        self.failing_checks = count;
        self
    }

    pub fn with_hanging_navigation(mut self) -> Self {
        self.hanging_navigation = true;
        self
    }

    fn check(&mut self) -> BrowserResult<()> {
        if self.failing_checks > 0 {
            self.failing_checks -= 1;
            return Err(BrowserError::Script(
                "Execution context was destroyed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_no_documents(mut self) -> Self {
        self.page_text = "Não existem documentos para o período selecionado".to_string();
        self
    }

    pub fn clicked(&self, selector: &str) -> bool {
        self.actions
            .iter()
            .any(|action| action.starts_with("click") && action.ends_with(selector))
    }
}

#[async_trait(?Send)]
impl ExportSession for MockSession {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.actions.push(format!("goto {url}"));
        if self.hanging_navigation {
            return Err(BrowserError::Cdp(CdpError::Timeout));
        }
        Ok(())
    }

    async fn exists(&mut self, selector: &str) -> BrowserResult<bool> {
        self.check()?;
        Ok(self.visible.contains(selector) || self.hidden.contains(selector))
    }

    async fn is_visible(&mut self, selector: &str) -> BrowserResult<bool> {
        self.check()?;
        Ok(self.visible.contains(selector))
    }

    async fn click(&mut self, selector: &str, force: bool) -> BrowserResult<()> {
        let verb = if force { "click!" } else { "click" };
        self.actions.push(format!("{verb} {selector}"));
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str, force: bool) -> BrowserResult<()> {
        let verb = if force { "type!" } else { "type" };
        self.actions.push(format!("{verb} {selector} {text}"));
        Ok(())
    }

    async fn contains_text(&mut self, text: &str) -> BrowserResult<bool> {
        self.text_checks += 1;
        Ok(self.page_text.contains(text))
    }

    async fn href(&mut self, selector: &str) -> BrowserResult<Option<String>> {
        Ok(self.hrefs.get(selector).cloned())
    }

    async fn cookies(&mut self) -> BrowserResult<Vec<SessionCookie>> {
        Ok(vec![SessionCookie {
            name: "PHPSESSID".into(),
            value: "s3ss10n".into(),
        }])
    }

    async fn user_agent(&mut self) -> BrowserResult<Option<String>> {
        Ok(Some("MockChrome/1.0".into()))
    }
}

#[derive(Default)]
pub struct StatusLog(pub Mutex<Vec<String>>);

impl StatusReporter for StatusLog {
    fn report(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

impl StatusLog {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Stands in for `downloadFile`, recording each request instead of fetching.
#[derive(Clone, Default)]
pub struct RecordingDownload {
    pub requests: Arc<Mutex<Vec<DownloadRequest>>>,
}

#[async_trait]
impl Task for RecordingDownload {
    fn name(&self) -> &'static str {
        DOWNLOAD_FILE
    }

    async fn call(&self, args: Vec<Value>) -> BridgeResult<Value> {
        let request = DownloadRequest::from_args(&args)?;
        let path = request.destination();
        self.requests.lock().unwrap().push(request);
        Ok(Value::String(path.to_string_lossy().into_owned()))
    }
}

impl RecordingDownload {
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub bridge: TaskBridge,
    pub status: Arc<StatusLog>,
    pub downloads: RecordingDownload,
}

pub fn harness() -> Harness {
    let status = Arc::new(StatusLog::default());
    let downloads = RecordingDownload::default();
    let bridge = TaskBridge::new()
        .with_task(StatusTask::new(status.clone()))
        .with_task(ParsePathTask)
        .with_task(downloads.clone());
    Harness {
        bridge,
        status,
        downloads,
    }
}

pub fn environment(output: &str) -> RunEnvironment {
    RunEnvironment {
        user: "ana@example.com".into(),
        password: "hunter2".into(),
        output: output.into(),
        start: "2024/2/1".into(),
        end: "2024/2/29".into(),
    }
}

pub fn engine_config() -> EngineConfig {
    EngineConfig::new("https://office.example.com")
}

/// Engine that runs the real workflow against a fresh [`MockSession`].
pub struct MockEngine {
    build: Box<dyn Fn() -> MockSession>,
    pub runs: RefCell<Vec<(EngineConfig, RunEnvironment)>>,
    pub sessions: RefCell<Vec<MockSession>>,
}

impl MockEngine {
    pub fn new(build: impl Fn() -> MockSession + 'static) -> Self {
        Self {
            build: Box::new(build),
            runs: RefCell::new(Vec::new()),
            sessions: RefCell::new(Vec::new()),
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.borrow().len()
    }
}

#[async_trait(?Send)]
impl AutomationEngine for MockEngine {
    async fn run(
        &self,
        config: &EngineConfig,
        env: &RunEnvironment,
        bridge: &TaskBridge,
    ) -> ExportResult<ExportOutcome> {
        self.runs.borrow_mut().push((config.clone(), env.clone()));
        let mut session = (self.build)();
        let workflow = ExportWorkflow::new(config.clone(), env.clone(), bridge.clone());
        let result = workflow.run(&mut session).await;
        self.sessions.borrow_mut().push(session);
        result
    }
}

pub fn temp_store(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".config.json");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}
