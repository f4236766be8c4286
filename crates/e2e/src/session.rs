//! Browser-automation capability used by the UI checks

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Interval between polls of a bounded wait
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Css(String),
    ClassName(String),
    TagName(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Locator::ClassName(name.into())
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Locator::TagName(name.into())
    }

    /// Equivalent CSS selector
    pub fn to_css(&self) -> String {
        match self {
            Locator::Id(id) => format!("#{id}"),
            Locator::Css(selector) => selector.clone(),
            Locator::ClassName(name) => format!(".{name}"),
            Locator::TagName(name) => name.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Opaque handle to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// Opaque handle to a browser window or tab
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State an element must reach before a wait succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Present,
    Visible,
    Clickable,
}

/// A live browser session.
///
/// Element and window handles are only valid inside the session that
/// returned them. The `wait_*` methods are bounded polls built on the
/// primitives and fail with [`E2eError::Timeout`] once the deadline passes.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    async fn refresh(&self) -> E2eResult<()>;

    /// Fails with [`E2eError::ElementNotFound`] when nothing matches
    async fn find_element(&self, locator: &Locator) -> E2eResult<ElementRef>;

    async fn find_elements(&self, locator: &Locator) -> E2eResult<Vec<ElementRef>>;

    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> E2eResult<ElementRef>;

    async fn find_children(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> E2eResult<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> E2eResult<()>;

    async fn double_click(&self, element: &ElementRef) -> E2eResult<()>;

    /// Right click, opening the element's context menu if it has one
    async fn context_click(&self, element: &ElementRef) -> E2eResult<()>;

    async fn clear(&self, element: &ElementRef) -> E2eResult<()>;

    /// Type into the element as keystrokes
    async fn type_text(&self, element: &ElementRef, text: &str) -> E2eResult<()>;

    /// Set the value of an input or select directly and fire `change`
    async fn set_value(&self, element: &ElementRef, value: &str) -> E2eResult<()>;

    async fn element_text(&self, element: &ElementRef) -> E2eResult<String>;

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool>;

    /// Evaluate a JavaScript expression in the current page
    async fn evaluate(&self, expression: &str) -> E2eResult<Value>;

    /// HTML5 drag of `source` onto `target`
    async fn drag_and_drop(&self, source: &ElementRef, target: &ElementRef) -> E2eResult<()>;

    async fn window_handles(&self) -> E2eResult<Vec<WindowHandle>>;

    async fn current_window(&self) -> E2eResult<WindowHandle>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> E2eResult<()>;

    /// Close the current window; the session stays open
    async fn close_window(&self) -> E2eResult<()>;

    /// Visible text of the whole page
    async fn page_text(&self) -> E2eResult<String>;

    async fn set_viewport(&self, width: u32, height: u32) -> E2eResult<()>;

    /// Accept the JavaScript dialog opened by the last action, if any.
    ///
    /// Returns `false` when no dialog appeared; that is a normal outcome.
    async fn accept_dialog(&self) -> E2eResult<bool>;

    /// End the session
    async fn close(&self) -> E2eResult<()>;

    async fn wait_for(
        &self,
        locator: &Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> E2eResult<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(locator).await {
                Ok(element) => {
                    let ready = match condition {
                        WaitCondition::Present => true,
                        WaitCondition::Visible => self.is_displayed(&element).await?,
                        WaitCondition::Clickable => {
                            self.is_displayed(&element).await? && self.is_enabled(&element).await?
                        }
                    };
                    if ready {
                        return Ok(element);
                    }
                }
                Err(E2eError::ElementNotFound(_)) => {}
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(format!("{locator} to be {condition:?}")));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until `locator` matches nothing or only hidden elements
    async fn wait_until_hidden(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut visible = false;
            for element in self.find_elements(locator).await? {
                if self.is_displayed(&element).await? {
                    visible = true;
                    break;
                }
            }
            if !visible {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(format!("{locator} to be hidden")));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until the page text contains (or, with `present = false`, no
    /// longer contains) `text`
    async fn wait_for_text(&self, text: &str, present: bool, timeout: Duration) -> E2eResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page_text().await?.contains(text) == present {
                return Ok(());
            }

            if Instant::now() >= deadline {
                let state = if present { "appear" } else { "disappear" };
                return Err(E2eError::Timeout(format!("text {text:?} to {state}")));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for a window that is not in `known` and return its handle
    async fn wait_for_new_window(
        &self,
        known: &[WindowHandle],
        timeout: Duration,
    ) -> E2eResult<WindowHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            let handles = self.window_handles().await?;
            if let Some(handle) = handles.into_iter().find(|h| !known.contains(h)) {
                debug!("New window opened: {}", handle);
                return Ok(handle);
            }

            if Instant::now() >= deadline {
                return Err(E2eError::Timeout("a new browser window".to_string()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
