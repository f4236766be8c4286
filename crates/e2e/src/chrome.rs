//! Chrome session over the DevTools protocol (chromiumoxide)

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, ElementRef, Locator, WindowHandle, POLL_INTERVAL};

/// Chrome switches. `--enable-automation` is absent so no automation banner
/// shows; popups stay allowed for the export window.
const CHROME_ARGS: &[&str] = &[
    "--disable-popup-blocking",
    "--disable-notifications",
    "--disable-infobars",
    "--disable-web-security",
    "--allow-running-insecure-content",
    "--allow-file-access-from-files",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
];

/// How long a dialog may take to show up after the action that opens it
const DIALOG_GRACE: Duration = Duration::from_millis(500);

const CLEAR_JS: &str = "function() {
  this.value = '';
  this.dispatchEvent(new Event('input', { bubbles: true }));
}";

const IS_DISPLAYED_JS: &str = "function() {
  const style = window.getComputedStyle(this);
  return style.display !== 'none'
    && style.visibility !== 'hidden'
    && this.getClientRects().length > 0;
}";

const IS_ENABLED_JS: &str = "function() { return !this.disabled; }";

const MARK_DROP_TARGET_JS: &str =
    "function() { this.setAttribute('data-planner-qa-drop', ''); }";

/// HTML5 drag and drop does not start from synthetic mouse input, so the
/// drag events are dispatched from the page.
const DRAG_TO_MARKED_JS: &str = "function() {
  const target = document.querySelector('[data-planner-qa-drop]');
  target.removeAttribute('data-planner-qa-drop');
  const data = new DataTransfer();
  const fire = (el, type) => el.dispatchEvent(
    new DragEvent(type, { bubbles: true, cancelable: true, dataTransfer: data })
  );
  fire(this, 'dragstart');
  fire(target, 'dragenter');
  fire(target, 'dragover');
  fire(target, 'drop');
  fire(this, 'dragend');
}";

const PAGE_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// Elements handed out as [`ElementRef`]s; cleared whenever the page changes
#[derive(Default)]
struct ElementStore {
    next: u64,
    elements: HashMap<String, Arc<Element>>,
}

impl ElementStore {
    fn insert(&mut self, element: Element) -> ElementRef {
        self.next += 1;
        let key = format!("e{}", self.next);
        self.elements.insert(key.clone(), Arc::new(element));
        ElementRef(key)
    }
}

/// A Chrome process plus the page the checks are looking at
pub struct ChromeSession {
    browser: AsyncMutex<Browser>,
    page: RwLock<Page>,
    elements: Mutex<ElementStore>,
    dialogs_accepted: Arc<AtomicUsize>,
    handler_task: JoinHandle<()>,
    dialog_task: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chrome and open a blank page
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        let launch_config = launch_config(config)?;
        info!(
            "Launching Chrome ({}, {}x{})",
            if config.headless { "headless" } else { "headed" },
            config.window_width,
            config.window_height
        );

        let (browser, mut handler) = timeout(config.launch_timeout(), Browser::launch(launch_config))
            .await
            .map_err(|_| {
                E2eError::BrowserLaunch(format!(
                    "no DevTools connection after {}s",
                    config.launch_timeout_secs
                ))
            })?
            .map_err(|e| E2eError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler: {}", e);
                }
            }
        });

        match open_page(&browser, config).await {
            Ok((page, dialog_task, dialogs_accepted)) => {
                info!("Chrome is ready");
                Ok(Self {
                    browser: AsyncMutex::new(browser),
                    page: RwLock::new(page),
                    elements: Mutex::new(ElementStore::default()),
                    dialogs_accepted,
                    handler_task,
                    dialog_task,
                })
            }
            Err(e) => {
                handler_task.abort();
                Err(E2eError::SessionStartup(e.to_string()))
            }
        }
    }

    /// Product string of the running browser, e.g. `HeadlessChrome/120.0`
    pub async fn version(&self) -> E2eResult<String> {
        Ok(self.browser.lock().await.version().await?.product)
    }

    fn store(&self) -> MutexGuard<'_, ElementStore> {
        self.elements.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember(&self, elements: Vec<Element>) -> Vec<ElementRef> {
        let mut store = self.store();
        elements.into_iter().map(|e| store.insert(e)).collect()
    }

    fn forget_elements(&self) {
        self.store().elements.clear();
    }

    fn element(&self, element: &ElementRef) -> E2eResult<Arc<Element>> {
        self.store()
            .elements
            .get(&element.0)
            .cloned()
            .ok_or_else(|| E2eError::ElementNotFound(format!("stale handle {}", element.0)))
    }

    async fn current_page(&self) -> Page {
        self.page.read().await.clone()
    }

    async fn call_bool(&self, element: &ElementRef, function: &str) -> E2eResult<bool> {
        let returned = self.element(element)?.call_js_fn(function, false).await?;
        Ok(returned
            .result
            .value
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Press and release `button` `clicks` times at the element's centre
    async fn mouse(&self, element: &ElementRef, button: MouseButton, clicks: i64) -> E2eResult<()> {
        let element = self.element(element)?;
        element.scroll_into_view().await?;
        let point = element.clickable_point().await?;
        let page = self.current_page().await;

        for count in 1..=clicks {
            for kind in [
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let event = DispatchMouseEventParams::builder()
                    .r#type(kind)
                    .x(point.x)
                    .y(point.y)
                    .button(button.clone())
                    .click_count(count)
                    .build()
                    .map_err(E2eError::Command)?;
                page.execute(event).await?;
            }
        }
        Ok(())
    }
}

fn launch_config(config: &BrowserConfig) -> E2eResult<LaunchConfig> {
    let mut builder = LaunchConfig::builder()
        .disable_default_args()
        .args(CHROME_ARGS.iter().copied())
        .window_size(config.window_width, config.window_height);

    if !config.headless {
        builder = builder.with_head();
    }
    if !config.sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(executable) = &config.executable {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(E2eError::BrowserNotFound)
}

/// Open the working page and start accepting its dialogs
async fn open_page(
    browser: &Browser,
    config: &BrowserConfig,
) -> E2eResult<(Page, JoinHandle<()>, Arc<AtomicUsize>)> {
    let page = browser.new_page("about:blank").await?;
    page.execute(viewport(config.window_width, config.window_height)?)
        .await?;

    let mut dialogs = page.event_listener::<EventJavascriptDialogOpening>().await?;
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    let dialog_page = page.clone();

    let dialog_task = tokio::spawn(async move {
        while let Some(event) = dialogs.next().await {
            debug!("Accepting dialog: {}", event.message);
            match dialog_page
                .execute(HandleJavaScriptDialogParams::new(true))
                .await
            {
                Ok(_) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => warn!("Failed to accept dialog: {}", e),
            }
        }
    });

    Ok((page, dialog_task, accepted))
}

fn viewport(width: u32, height: u32) -> E2eResult<SetDeviceMetricsOverrideParams> {
    SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(width))
        .height(i64::from(height))
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(E2eError::Command)
}

fn handle_of(page: &Page) -> WindowHandle {
    WindowHandle(page.target_id().inner().clone())
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.current_page().await.goto(url).await?;
        self.forget_elements();
        Ok(())
    }

    async fn refresh(&self) -> E2eResult<()> {
        self.current_page().await.reload().await?;
        self.forget_elements();
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> E2eResult<ElementRef> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> E2eResult<Vec<ElementRef>> {
        let found = self
            .current_page()
            .await
            .find_elements(locator.to_css())
            .await?;
        Ok(self.remember(found))
    }

    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> E2eResult<ElementRef> {
        self.find_children(parent, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::ElementNotFound(format!("{} inside {}", locator, parent.0)))
    }

    async fn find_children(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> E2eResult<Vec<ElementRef>> {
        let found = self
            .element(parent)?
            .find_elements(locator.to_css())
            .await?;
        Ok(self.remember(found))
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        self.element(element)?.click().await?;
        Ok(())
    }

    async fn double_click(&self, element: &ElementRef) -> E2eResult<()> {
        self.mouse(element, MouseButton::Left, 2).await
    }

    async fn context_click(&self, element: &ElementRef) -> E2eResult<()> {
        self.mouse(element, MouseButton::Right, 1).await
    }

    async fn clear(&self, element: &ElementRef) -> E2eResult<()> {
        self.element(element)?.call_js_fn(CLEAR_JS, false).await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        let element = self.element(element)?;
        element.focus().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> E2eResult<()> {
        let function = format!(
            "function() {{
  this.value = {};
  this.dispatchEvent(new Event('input', {{ bubbles: true }}));
  this.dispatchEvent(new Event('change', {{ bubbles: true }}));
}}",
            serde_json::to_string(value)?
        );
        self.element(element)?.call_js_fn(function, false).await?;
        Ok(())
    }

    async fn element_text(&self, element: &ElementRef) -> E2eResult<String> {
        Ok(self
            .element(element)?
            .inner_text()
            .await?
            .unwrap_or_default())
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        self.call_bool(element, IS_DISPLAYED_JS).await
    }

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool> {
        self.call_bool(element, IS_ENABLED_JS).await
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        let result = self.current_page().await.evaluate(expression).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn drag_and_drop(&self, source: &ElementRef, target: &ElementRef) -> E2eResult<()> {
        debug!("Dragging {} onto {}", source.0, target.0);
        self.element(target)?
            .call_js_fn(MARK_DROP_TARGET_JS, false)
            .await?;
        self.element(source)?
            .call_js_fn(DRAG_TO_MARKED_JS, false)
            .await?;
        Ok(())
    }

    async fn window_handles(&self) -> E2eResult<Vec<WindowHandle>> {
        let pages = self.browser.lock().await.pages().await?;
        Ok(pages.iter().map(handle_of).collect())
    }

    async fn current_window(&self) -> E2eResult<WindowHandle> {
        Ok(handle_of(&self.current_page().await))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> E2eResult<()> {
        let pages = self.browser.lock().await.pages().await?;
        let page = pages
            .into_iter()
            .find(|page| handle_of(page) == *handle)
            .ok_or_else(|| E2eError::NoSuchWindow(handle.to_string()))?;

        page.bring_to_front().await?;
        *self.page.write().await = page;
        self.forget_elements();
        Ok(())
    }

    async fn close_window(&self) -> E2eResult<()> {
        self.current_page().await.close().await?;
        self.forget_elements();
        Ok(())
    }

    async fn page_text(&self) -> E2eResult<String> {
        Ok(self
            .evaluate(PAGE_TEXT_JS)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> E2eResult<()> {
        self.current_page()
            .await
            .execute(viewport(width, height)?)
            .await?;
        Ok(())
    }

    async fn accept_dialog(&self) -> E2eResult<bool> {
        let deadline = Instant::now() + DIALOG_GRACE;
        loop {
            if self.dialogs_accepted.swap(0, Ordering::SeqCst) > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&self) -> E2eResult<()> {
        self.dialog_task.abort();
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        browser.wait().await?;
        self.handler_task.abort();
        info!("Chrome closed");
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.dialog_task.abort();
        self.handler_task.abort();
    }
}
