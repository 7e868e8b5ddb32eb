use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;

use super::error::{BrowserError, BrowserResult};

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: Arc<BrowserConfig>,
}

impl BrowserLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Starts Chromium on a throwaway profile that is removed at shutdown.
    pub async fn launch(&self) -> BrowserResult<BrowserAutomation> {
        let profile = tempfile::Builder::new()
            .prefix("vendus-profile-")
            .tempdir()?;
        let chromium_config = self.build_chromium_config(profile.path())?;
        info!(
            profile = %profile.path().display(),
            width = self.config.viewport.width,
            height = self.config.viewport.height,
            headless = self.config.chromium.headless,
            "Launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        Ok(BrowserAutomation {
            browser,
            profile,
            handler_task: Some(handler_task),
        })
    }

    fn build_chromium_config(&self, profile_dir: &Path) -> BrowserResult<ChromiumConfig> {
        let chromium = &self.config.chromium;
        let viewport = &self.config.viewport;
        let mut builder = ChromiumConfig::builder()
            .user_data_dir(profile_dir)
            .viewport(ChromiumViewport {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: viewport.width >= viewport.height,
                has_touch: false,
            });

        if let Some(path) = &chromium.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !chromium.headless {
            builder = builder.with_head();
        }
        if !chromium.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(timeout) = chromium.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        let mut args = vec![
            format!("--window-size={},{}", viewport.width, viewport.height),
            "--no-first-run".to_string(),
            "--password-store=basic".to_string(),
            "--disable-background-timer-throttling".to_string(),
        ];
        if chromium.disable_gpu {
            args.push("--disable-gpu".into());
        }
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

#[derive(Debug)]
pub struct BrowserAutomation {
    browser: Browser,
    profile: TempDir,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserAutomation {
    pub async fn new_context(&self) -> BrowserResult<BrowserContext> {
        let params = CreateTargetParams::new("about:blank");
        let page = self.browser.new_page(params).await?;
        Ok(BrowserContext { page })
    }

    pub async fn shutdown(mut self) -> BrowserResult<()> {
        info!(profile = %self.profile.path().display(), "Shutting down Chromium instance");
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "Failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Browser handler join error");
            }
        }
        Ok(())
    }
}

impl Drop for BrowserAutomation {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!(
                    profile = %self.profile.path().display(),
                    "BrowserAutomation dropped without explicit shutdown"
                );
            }
        }
    }
}

#[derive(Debug)]
pub struct BrowserContext {
    page: Page,
}

impl BrowserContext {
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromium_config_builds_with_explicit_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BrowserConfig::default();
        config.chromium.executable_path = Some("/usr/bin/chromium".into());
        config.chromium.headless = false;
        let launcher = BrowserLauncher::new(config);
        assert!(launcher.build_chromium_config(dir.path()).is_ok());
        assert_eq!(launcher.config().viewport.width, 2048);
    }
}
