//! UI suite: drives the planner in a browser session.
//!
//! Cases share one page and run in order; later cases work on the cards and
//! sections earlier ones created, and the suite ends by clearing the board.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::harness::{Harness, Outcome, TestCase};
use crate::session::{
    BrowserSession, ElementRef, Locator, WaitCondition, WindowHandle, POLL_INTERVAL,
};
use crate::suites::contract;

pub const SUITE_NAME: &str = "UI";

const NEW_CARD_TITLE: &str = "Test Study Task";
const NEW_CARD_SUBJECT: &str = "Mathematics";
const NEW_CARD_DESCRIPTION: &str = "This is a test study task for automated testing";
const EDITED_CARD_TITLE: &str = "Updated Test Task";
const PERSISTED_CARD_TITLE: &str = "Persistence Test";
const NEW_SECTION_NAME: &str = "Testing Section";

/// Browser session plus where the app lives
pub struct UiContext {
    session: Box<dyn BrowserSession>,
    app_url: String,
    wait_timeout: Duration,
    viewport: (u32, u32),
}

impl UiContext {
    pub fn new(
        session: Box<dyn BrowserSession>,
        app_url: impl Into<String>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            session,
            app_url: app_url.into(),
            wait_timeout,
            viewport: (1280, 900),
        }
    }

    /// Viewport restored after the mobile layout check
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Close the browser session. Failures are logged, never returned.
    pub async fn release(self) {
        match self.session.close().await {
            Ok(()) => debug!("Browser session released"),
            Err(e) => warn!("Failed to close browser session: {}", e),
        }
    }

    async fn wait(&self, locator: &Locator, condition: WaitCondition) -> E2eResult<ElementRef> {
        self.session
            .wait_for(locator, condition, self.wait_timeout)
            .await
    }

    async fn click_id(&self, id: &str) -> E2eResult<()> {
        let element = self.wait(&contract::by_id(id), WaitCondition::Clickable).await?;
        self.session.click(&element).await
    }

    async fn replace_text(&self, id: &str, text: &str) -> E2eResult<()> {
        let input = self.wait(&contract::by_id(id), WaitCondition::Visible).await?;
        self.session.clear(&input).await?;
        self.session.type_text(&input, text).await
    }

    async fn set_field(&self, id: &str, value: &str) -> E2eResult<()> {
        let field = self.session.find_element(&contract::by_id(id)).await?;
        self.session.set_value(&field, value).await
    }

    /// Poll `condition` until it holds; false once the wait bound passes
    async fn eventually<F, Fut>(&self, mut condition: F) -> E2eResult<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<bool>>,
    {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if condition().await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn texts(&self, elements: Vec<ElementRef>) -> E2eResult<Vec<String>> {
        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            texts.push(self.session.element_text(element).await?);
        }
        Ok(texts)
    }

    pub async fn card_titles(&self) -> E2eResult<Vec<String>> {
        let titles = self.session.find_elements(&contract::card_titles()).await?;
        self.texts(titles).await
    }

    pub async fn section_titles(&self) -> E2eResult<Vec<String>> {
        let titles = self.session.find_elements(&contract::column_titles()).await?;
        self.texts(titles).await
    }

    async fn has_card(&self, title: &str) -> E2eResult<bool> {
        Ok(self.card_titles().await?.iter().any(|t| t.contains(title)))
    }

    async fn wait_for_card(&self, title: &str) -> E2eResult<bool> {
        self.eventually(move || self.has_card(title)).await
    }

    async fn card_count(&self) -> E2eResult<usize> {
        Ok(self.session.find_elements(&contract::cards()).await?.len())
    }

    async fn last_section_has(&self, title: &str) -> E2eResult<bool> {
        let Some(last) = self.session.find_elements(&contract::columns()).await?.pop() else {
            return Ok(false);
        };
        let titles = self
            .session
            .find_children(&last, &contract::card_titles())
            .await?;
        Ok(self.texts(titles).await?.iter().any(|t| t.contains(title)))
    }

    /// Open the card modal, fill the title and save
    async fn add_card(&self, title: &str) -> E2eResult<()> {
        self.click_id(contract::ADD_CARD_BUTTON_ID).await?;
        self.replace_text(contract::CARD_TITLE_INPUT_ID, title).await?;
        self.click_id(contract::SAVE_CARD_BUTTON_ID).await
    }

    async fn export_markers_missing(&self, window: &WindowHandle) -> E2eResult<Vec<&'static str>> {
        self.session.switch_to_window(window).await?;
        let mut missing = Vec::new();
        for marker in contract::EXPORT_MARKERS {
            match self.session.wait_for_text(marker, true, self.wait_timeout).await {
                Ok(()) => {}
                Err(E2eError::Timeout(_)) => missing.push(marker),
                Err(e) => return Err(e),
            }
        }
        Ok(missing)
    }

    /// Close whatever window is focused unless it is `main`, then focus `main`
    async fn return_to(&self, main: &WindowHandle) -> E2eResult<()> {
        if self.session.current_window().await? != *main {
            if let Err(e) = self.session.close_window().await {
                warn!("Failed to close export window: {}", e);
            }
        }
        self.session.switch_to_window(main).await
    }

    async fn mobile_layout_visible(&self) -> E2eResult<bool> {
        let (width, height) = contract::MOBILE_VIEWPORT;
        self.session.set_viewport(width, height).await?;

        let header = self
            .wait(&Locator::class(contract::APP_HEADER_CLASS), WaitCondition::Present)
            .await?;
        let board = self
            .wait(&Locator::class(contract::BOARD_CLASS), WaitCondition::Present)
            .await?;
        Ok(self.session.is_displayed(&header).await? && self.session.is_displayed(&board).await?)
    }
}

fn page_load(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.session().navigate(&ctx.app_url).await?;
        ctx.wait(
            &Locator::class(contract::APP_CONTAINER_CLASS),
            WaitCondition::Present,
        )
        .await?;

        let h1 = ctx.session().find_element(&Locator::tag("h1")).await?;
        let heading = ctx.session().element_text(&h1).await?;
        if heading.contains(contract::APP_HEADING) {
            Ok(Outcome::pass_with(format!("title: {heading}")))
        } else {
            Ok(Outcome::fail(format!("unexpected heading {heading:?}")))
        }
    }
    .boxed()
}

fn add_card_modal(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.click_id(contract::ADD_CARD_BUTTON_ID).await?;
        let modal = contract::by_id(contract::CARD_MODAL_ID);
        match ctx.wait(&modal, WaitCondition::Visible).await {
            Ok(_) => {}
            Err(E2eError::Timeout(_)) => return Ok(Outcome::fail("card modal did not open")),
            Err(e) => return Err(e),
        }

        ctx.click_id(contract::CANCEL_CARD_BUTTON_ID).await?;
        match ctx.session().wait_until_hidden(&modal, ctx.wait_timeout).await {
            Ok(()) => Ok(Outcome::pass()),
            Err(E2eError::Timeout(_)) => Ok(Outcome::fail("card modal stayed open after cancel")),
            Err(e) => Err(e),
        }
    }
    .boxed()
}

fn add_new_card(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.click_id(contract::ADD_CARD_BUTTON_ID).await?;
        ctx.replace_text(contract::CARD_TITLE_INPUT_ID, NEW_CARD_TITLE)
            .await?;
        ctx.replace_text(contract::CARD_SUBJECT_INPUT_ID, NEW_CARD_SUBJECT)
            .await?;

        let tomorrow = (Local::now() + chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        ctx.set_field(contract::CARD_DUE_DATE_INPUT_ID, &tomorrow)
            .await?;
        ctx.set_field(contract::CARD_PRIORITY_SELECT_ID, contract::PRIORITY_HIGH)
            .await?;
        ctx.replace_text(contract::CARD_DESCRIPTION_INPUT_ID, NEW_CARD_DESCRIPTION)
            .await?;
        ctx.click_id(contract::SAVE_CARD_BUTTON_ID).await?;

        let found = ctx.wait_for_card(NEW_CARD_TITLE).await?;
        let count = ctx.card_count().await?;
        if found {
            Ok(Outcome::pass_with(format!("found {count} cards")))
        } else {
            Ok(Outcome::fail(format!(
                "card {NEW_CARD_TITLE:?} not on the board ({count} cards)"
            )))
        }
    }
    .boxed()
}

fn task_id_display(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        if ctx.card_count().await? == 0 {
            return Ok(Outcome::fail("no cards found"));
        }

        let ids = ctx
            .session()
            .find_elements(&Locator::class(contract::CARD_TASK_ID_CLASS))
            .await?;
        let Some(first) = ids.first() else {
            return Ok(Outcome::fail("task id not found"));
        };

        let task_id = ctx.session().element_text(first).await?;
        if task_id.starts_with(contract::TASK_ID_PREFIX) {
            Ok(Outcome::pass_with(format!("task id: {task_id}")))
        } else {
            Ok(Outcome::fail(format!("unexpected task id {task_id:?}")))
        }
    }
    .boxed()
}

fn add_custom_section(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.click_id(contract::ADD_COLUMN_BUTTON_ID).await?;
        ctx.replace_text(contract::COLUMN_NAME_INPUT_ID, NEW_SECTION_NAME)
            .await?;
        ctx.set_field(contract::COLUMN_COLOR_SELECT_ID, contract::COLUMN_COLOR_BLUE)
            .await?;
        ctx.click_id(contract::SAVE_COLUMN_BUTTON_ID).await?;

        let ctx = &*ctx;
        let added = ctx
            .eventually(move || async move {
                let sections = ctx.section_titles().await?;
                Ok::<_, E2eError>(sections.iter().any(|t| t.contains(NEW_SECTION_NAME)))
            })
            .await?;
        let sections = ctx.section_titles().await?;
        if added {
            Ok(Outcome::pass_with(format!("found sections: {sections:?}")))
        } else {
            Ok(Outcome::fail(format!(
                "{NEW_SECTION_NAME:?} not among sections {sections:?}"
            )))
        }
    }
    .boxed()
}

fn drag_and_drop(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let session = ctx.session();
        let cards = session.find_elements(&contract::cards()).await?;
        let Some(card) = cards.first() else {
            return Ok(Outcome::fail("no cards to drag"));
        };

        let sections = session.find_elements(&contract::columns()).await?;
        if sections.len() < 2 {
            return Ok(Outcome::fail("need at least 2 sections"));
        }
        let target = &sections[sections.len() - 1];

        let title_el = session
            .find_child(card, &Locator::class(contract::CARD_TITLE_CLASS))
            .await?;
        let title = session.element_text(&title_el).await?;
        let drop_zone = session
            .find_child(target, &Locator::class(contract::COLUMN_CONTENT_CLASS))
            .await?;
        session.drag_and_drop(card, &drop_zone).await?;

        let title = title.as_str();
        let ctx = &*ctx;
        let moved = ctx.eventually(move || ctx.last_section_has(title)).await?;
        Ok(if moved {
            Outcome::pass_with("card moved between sections")
        } else {
            Outcome::fail(format!("card {title:?} did not reach the last section"))
        })
    }
    .boxed()
}

fn card_context_menu(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let session = ctx.session();
        let cards = session.find_elements(&contract::cards()).await?;
        let Some(card) = cards.first() else {
            return Ok(Outcome::fail("no cards found"));
        };

        session.context_click(card).await?;
        match ctx
            .wait(&Locator::class(contract::CONTEXT_MENU_CLASS), WaitCondition::Present)
            .await
        {
            Ok(_) => {}
            Err(E2eError::Timeout(_)) => return Ok(Outcome::fail("context menu did not appear")),
            Err(e) => return Err(e),
        }

        let body = session.find_element(&Locator::tag("body")).await?;
        session.click(&body).await?;
        Ok(Outcome::pass())
    }
    .boxed()
}

fn edit_card(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let cards = ctx.session().find_elements(&contract::cards()).await?;
        let Some(card) = cards.first() else {
            return Ok(Outcome::fail("no cards found"));
        };

        ctx.session().double_click(card).await?;
        match ctx
            .wait(&contract::by_id(contract::CARD_MODAL_ID), WaitCondition::Visible)
            .await
        {
            Ok(_) => {}
            Err(E2eError::Timeout(_)) => return Ok(Outcome::fail("modal not opened")),
            Err(e) => return Err(e),
        }

        ctx.replace_text(contract::CARD_TITLE_INPUT_ID, EDITED_CARD_TITLE)
            .await?;
        ctx.click_id(contract::SAVE_CARD_BUTTON_ID).await?;

        Ok(if ctx.wait_for_card(EDITED_CARD_TITLE).await? {
            Outcome::pass_with("card edited successfully")
        } else {
            Outcome::fail(format!("no card titled {EDITED_CARD_TITLE:?} after saving"))
        })
    }
    .boxed()
}

/// Infers a working export from a new window holding the marker text; the
/// rendered PDF itself is not inspected.
fn export_pdf(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let session = ctx.session();
        let main = session.current_window().await?;
        let known = session.window_handles().await?;

        ctx.click_id(contract::EXPORT_BUTTON_ID).await?;
        let window = match session.wait_for_new_window(&known, ctx.wait_timeout).await {
            Ok(window) => window,
            Err(E2eError::Timeout(_)) => {
                return Ok(Outcome::fail("export did not open a new window"))
            }
            Err(e) => return Err(e),
        };

        // Later cases need the main window whatever happened in the export one
        let inspected = ctx.export_markers_missing(&window).await;
        let restored = ctx.return_to(&main).await;
        let missing = inspected?;
        restored?;

        Ok(if missing.is_empty() {
            Outcome::pass_with("export window opened with content")
        } else {
            Outcome::fail(format!("export window is missing: {}", missing.join(", ")))
        })
    }
    .boxed()
}

fn local_storage(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.add_card(PERSISTED_CARD_TITLE).await?;
        if !ctx.wait_for_card(PERSISTED_CARD_TITLE).await? {
            return Ok(Outcome::fail(format!(
                "card {PERSISTED_CARD_TITLE:?} was not added"
            )));
        }

        let read_cards = format!(
            "window.localStorage.getItem({})",
            serde_json::to_string(contract::CARDS_STORAGE_KEY)?
        );
        let stored = ctx.session().evaluate(&read_cards).await?;
        if !stored.as_str().is_some_and(|s| s.contains(PERSISTED_CARD_TITLE)) {
            return Ok(Outcome::fail(format!(
                "card not saved under localStorage key {:?}",
                contract::CARDS_STORAGE_KEY
            )));
        }

        ctx.session().refresh().await?;
        ctx.wait(
            &Locator::class(contract::APP_CONTAINER_CLASS),
            WaitCondition::Present,
        )
        .await?;

        Ok(if ctx.wait_for_card(PERSISTED_CARD_TITLE).await? {
            Outcome::pass_with("data persists after refresh")
        } else {
            Outcome::fail("card missing after refresh")
        })
    }
    .boxed()
}

fn responsive_design(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let visible = ctx.mobile_layout_visible().await;
        let (width, height) = ctx.viewport;
        let restored = ctx.session().set_viewport(width, height).await;
        let visible = visible?;
        restored?;

        Ok(Outcome::check(visible, "header or board hidden at 375x667"))
    }
    .boxed()
}

fn clear_all_data(ctx: &mut UiContext) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        ctx.click_id(contract::CLEAR_ALL_BUTTON_ID).await?;

        // The app asks for confirmation; a build without the dialog is fine too
        let confirmed = ctx.session().accept_dialog().await?;
        debug!("Clear confirmation dialog shown: {}", confirmed);

        let ctx = &*ctx;
        ctx.eventually(move || async move { Ok::<_, E2eError>(ctx.card_count().await? == 0) })
            .await?;
        let remaining = ctx.card_count().await?;
        Ok(Outcome {
            passed: remaining == 0,
            message: format!("remaining cards: {remaining}"),
        })
    }
    .boxed()
}

pub fn test_cases() -> Vec<TestCase<UiContext>> {
    vec![
        TestCase::from_fn("Page Load", page_load),
        TestCase::from_fn("Add Card Modal", add_card_modal),
        TestCase::from_fn("Add New Card", add_new_card),
        TestCase::from_fn("Task ID Display", task_id_display),
        TestCase::from_fn("Add Custom Section", add_custom_section),
        TestCase::from_fn("Drag and Drop", drag_and_drop),
        TestCase::from_fn("Card Context Menu", card_context_menu),
        TestCase::from_fn("Edit Card", edit_card),
        TestCase::from_fn("Export PDF", export_pdf),
        TestCase::from_fn("Local Storage", local_storage),
        TestCase::from_fn("Responsive Design", responsive_design),
        TestCase::from_fn("Clear All Data", clear_all_data),
    ]
}

pub fn harness(cancel: CancellationToken) -> Harness<UiContext> {
    let mut harness = Harness::new(SUITE_NAME).with_cancellation(cancel);
    harness.register(test_cases());
    info!("UI suite registered {} test(s)", harness.len());
    harness
}
