use async_trait::async_trait;

use crate::bridge::SessionCookie;
use crate::browser::BrowserResult;

/// Page primitives the export workflow is written against.
///
/// Every method acts on the current state of the page and returns at once;
/// waiting and timeouts are the workflow's business.
#[async_trait(?Send)]
pub trait ExportSession {
    /// Navigates to `url` and waits for the load to finish.
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;

    async fn exists(&mut self, selector: &str) -> BrowserResult<bool>;

    async fn is_visible(&mut self, selector: &str) -> BrowserResult<bool>;

    /// Clicks the first match. With `force` the click is dispatched even
    /// when the element is hidden or covered.
    async fn click(&mut self, selector: &str, force: bool) -> BrowserResult<()>;

    /// Types `text` into the first match. With `force` the value is set even
    /// when the widget reports itself as not interactable.
    async fn type_text(&mut self, selector: &str, text: &str, force: bool) -> BrowserResult<()>;

    async fn contains_text(&mut self, text: &str) -> BrowserResult<bool>;

    /// Resolved `href` of the first match, if it has one.
    async fn href(&mut self, selector: &str) -> BrowserResult<Option<String>>;

    async fn cookies(&mut self) -> BrowserResult<Vec<SessionCookie>>;

    async fn user_agent(&mut self) -> BrowserResult<Option<String>>;
}
