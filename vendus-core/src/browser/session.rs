use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::bridge::SessionCookie;
use crate::workflow::ExportSession;

use super::error::{BrowserError, BrowserResult};
use super::launcher::BrowserContext;

const VISIBLE_SCRIPT: &str = r#"(selector) => {
    const el = document.querySelector(selector);
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return false;
    }
    return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
}"#;

const FORCE_CLICK_SCRIPT: &str = r#"(selector) => {
    const el = document.querySelector(selector);
    if (!el) return false;
    el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
    return true;
}"#;

const FORCE_TYPE_SCRIPT: &str = r#"(selector, text) => {
    const el = document.querySelector(selector);
    if (!el) return false;
    el.focus();
    el.value = '';
    for (const ch of text) {
        el.dispatchEvent(new KeyboardEvent('keydown', { key: ch, bubbles: true }));
        el.value += ch;
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new KeyboardEvent('keyup', { key: ch, bubbles: true }));
    }
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}"#;

const HREF_SCRIPT: &str = r#"(selector) => {
    const el = document.querySelector(selector);
    if (!el) return null;
    return el.href ? String(el.href) : el.getAttribute('href');
}"#;

/// [`ExportSession`] backed by a live Chromium page.
///
/// Page-side JavaScript errors are not observed; only selector state counts.
#[derive(Debug)]
pub struct ChromiumSession {
    context: BrowserContext,
}

impl ChromiumSession {
    pub fn new(context: BrowserContext) -> Self {
        Self { context }
    }

    async fn call<T: DeserializeOwned>(&self, function: &str, args: &[&str]) -> BrowserResult<T> {
        let rendered = args
            .iter()
            .map(|arg| Value::String(arg.to_string()).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!("({function})({rendered})");
        trace!(script = %script, "evaluating page script");
        self.context
            .page()
            .evaluate(script.as_str())
            .await?
            .into_value()
            .map_err(|err| BrowserError::Script(format!("unexpected script result: {err}")))
    }

    fn missing(selector: &str) -> BrowserError {
        BrowserError::Element(format!("no element matches {selector}"))
    }
}

#[async_trait(?Send)]
impl ExportSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.context.goto(url).await
    }

    async fn exists(&mut self, selector: &str) -> BrowserResult<bool> {
        self.call("(selector) => document.querySelector(selector) !== null", &[selector])
            .await
    }

    async fn is_visible(&mut self, selector: &str) -> BrowserResult<bool> {
        self.call(VISIBLE_SCRIPT, &[selector]).await
    }

    async fn click(&mut self, selector: &str, force: bool) -> BrowserResult<()> {
        if force {
            let clicked: bool = self.call(FORCE_CLICK_SCRIPT, &[selector]).await?;
            return if clicked {
                Ok(())
            } else {
                Err(Self::missing(selector))
            };
        }
        let element = self
            .context
            .page()
            .find_element(selector)
            .await?;
        element.click().await?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str, force: bool) -> BrowserResult<()> {
        if force {
            let typed: bool = self.call(FORCE_TYPE_SCRIPT, &[selector, text]).await?;
            return if typed {
                Ok(())
            } else {
                Err(Self::missing(selector))
            };
        }
        let element = self
            .context
            .page()
            .find_element(selector)
            .await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn contains_text(&mut self, text: &str) -> BrowserResult<bool> {
        self.call(
            "(text) => !!document.body && document.body.innerText.includes(text)",
            &[text],
        )
        .await
    }

    async fn href(&mut self, selector: &str) -> BrowserResult<Option<String>> {
        self.call(HREF_SCRIPT, &[selector]).await
    }

    async fn cookies(&mut self) -> BrowserResult<Vec<SessionCookie>> {
        let cookies = self.context.page().get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|cookie| SessionCookie {
                name: cookie.name,
                value: cookie.value,
            })
            .collect())
    }

    async fn user_agent(&mut self) -> BrowserResult<Option<String>> {
        self.call("() => navigator.userAgent || null", &[]).await
    }
}
