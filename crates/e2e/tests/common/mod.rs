//! In-memory stand-in for a browser showing the Study Planner app

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use planner_e2e::suites::contract;
use planner_e2e::{BrowserSession, E2eError, E2eResult, ElementRef, Locator, WindowHandle};

const MAIN_WINDOW: &str = "main";
const EXPORT_WINDOW: &str = "export";
const DEFAULT_SECTIONS: [&str; 3] = ["Category 1", "Category 2", "Category 3"];

/// Narrowest viewport at which a layout without a mobile breakpoint still
/// shows its header
const DESKTOP_MIN_WIDTH: u32 = 768;

#[derive(Clone, Serialize)]
struct Card {
    title: String,
    #[serde(rename = "taskId")]
    task_id: String,
    #[serde(skip)]
    section: usize,
}

#[derive(Clone)]
struct Board {
    sections: Vec<String>,
    cards: Vec<Card>,
    task_counter: u32,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            cards: Vec::new(),
            task_counter: 1,
        }
    }
}

struct State {
    url: String,
    board: Board,
    saved: Option<Board>,
    card_modal: bool,
    editing: Option<usize>,
    card_draft: String,
    column_draft: String,
    context_menu: bool,
    clear_pending: bool,
    windows: Vec<String>,
    current: String,
    viewport: (u32, u32),
    closes: usize,
}

impl State {
    fn new() -> Self {
        Self {
            url: String::new(),
            board: Board::default(),
            saved: None,
            card_modal: false,
            editing: None,
            card_draft: String::new(),
            column_draft: String::new(),
            context_menu: false,
            clear_pending: false,
            windows: vec![MAIN_WINDOW.to_string()],
            current: MAIN_WINDOW.to_string(),
            viewport: (1280, 900),
            closes: 0,
        }
    }

    fn save(&mut self) {
        self.saved = Some(self.board.clone());
    }

    fn load(&mut self) {
        self.board = self.saved.clone().unwrap_or_default();
        self.card_modal = false;
        self.editing = None;
        self.context_menu = false;
    }

    fn stored_cards(&self) -> Option<String> {
        let saved = self.saved.as_ref()?;
        serde_json::to_string(&saved.cards).ok()
    }

    /// Card indices in page order: by section, then by creation
    fn card_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.board.cards.len()).collect();
        order.sort_by_key(|&i| self.board.cards[i].section);
        order
    }

    fn cards_in(&self, section: usize) -> Vec<usize> {
        self.card_order()
            .into_iter()
            .filter(|&i| self.board.cards[i].section == section)
            .collect()
    }

    fn clear_board(&mut self) {
        self.board = Board::default();
        self.save();
    }
}

/// Knobs for breaking one behaviour of the fake app
#[derive(Clone, Copy)]
pub struct Behaviour {
    pub serves_app: bool,
    pub export_opens_window: bool,
    pub export_has_calendar: bool,
    pub confirm_before_clear: bool,
    pub context_menu: bool,
    pub mobile_layout: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            serves_app: true,
            export_opens_window: true,
            export_has_calendar: true,
            confirm_before_clear: true,
            context_menu: true,
            mobile_layout: true,
        }
    }
}

/// Read access to the fake after it has been moved into a session box
#[derive(Clone)]
pub struct Observer(Arc<Mutex<State>>);

impl Observer {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    pub fn current_window(&self) -> String {
        self.state().current.clone()
    }

    pub fn open_windows(&self) -> usize {
        self.state().windows.len()
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.state().viewport
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    pub fn card_titles(&self) -> Vec<String> {
        self.state().board.cards.iter().map(|c| c.title.clone()).collect()
    }
}

pub struct FakePlanner {
    state: Arc<Mutex<State>>,
    behaviour: Behaviour,
}

impl FakePlanner {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
            behaviour,
        }
    }

    pub fn observer(&self) -> Observer {
        Observer(Arc::clone(&self.state))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn app_loaded(&self, state: &State) -> bool {
        self.behaviour.serves_app
            && !state.url.is_empty()
            && !state.url.starts_with("data:")
            && state.current == MAIN_WINDOW
    }

    fn locate_all(&self, state: &State, locator: &Locator) -> Vec<String> {
        if state.url.starts_with("data:") {
            return match locator {
                Locator::TagName(tag) if tag == "h1" => vec!["h1".to_string()],
                _ => Vec::new(),
            };
        }
        if !self.app_loaded(state) {
            return Vec::new();
        }

        let indexed = |prefix: &str, indices: Vec<usize>| -> Vec<String> {
            indices.into_iter().map(|i| format!("{prefix}:{i}")).collect()
        };
        let sections = 0..state.board.sections.len();

        match locator {
            Locator::Id(id) => {
                let known = [
                    contract::ADD_CARD_BUTTON_ID,
                    contract::CARD_MODAL_ID,
                    contract::CARD_TITLE_INPUT_ID,
                    contract::CARD_SUBJECT_INPUT_ID,
                    contract::CARD_DUE_DATE_INPUT_ID,
                    contract::CARD_PRIORITY_SELECT_ID,
                    contract::CARD_DESCRIPTION_INPUT_ID,
                    contract::SAVE_CARD_BUTTON_ID,
                    contract::CANCEL_CARD_BUTTON_ID,
                    contract::ADD_COLUMN_BUTTON_ID,
                    contract::COLUMN_NAME_INPUT_ID,
                    contract::COLUMN_COLOR_SELECT_ID,
                    contract::SAVE_COLUMN_BUTTON_ID,
                    contract::EXPORT_BUTTON_ID,
                    contract::CLEAR_ALL_BUTTON_ID,
                ];
                if known.contains(&id.as_str()) {
                    vec![format!("#{id}")]
                } else {
                    Vec::new()
                }
            }
            Locator::TagName(tag) if tag == "h1" || tag == "body" => vec![tag.clone()],
            Locator::ClassName(class) => match class.as_str() {
                contract::APP_CONTAINER_CLASS => vec!["container".to_string()],
                contract::APP_HEADER_CLASS => vec!["header".to_string()],
                contract::BOARD_CLASS => vec!["board".to_string()],
                contract::CARD_CLASS => indexed("card", state.card_order()),
                contract::CARD_TASK_ID_CLASS => indexed("taskid", state.card_order()),
                contract::COLUMN_CLASS => indexed("col", sections.collect()),
                contract::CONTEXT_MENU_CLASS if state.context_menu => vec!["menu".to_string()],
                _ => Vec::new(),
            },
            _ if *locator == contract::card_titles() => indexed("title", state.card_order()),
            _ if *locator == contract::column_titles() => indexed("coltitle", sections.collect()),
            _ => Vec::new(),
        }
    }

    fn children(&self, state: &State, parent: &ElementRef, locator: &Locator) -> Vec<String> {
        if let Some(section) = index(parent, "col:") {
            if *locator == Locator::class(contract::COLUMN_CONTENT_CLASS) {
                return vec![format!("content:{section}")];
            }
            if *locator == contract::card_titles() {
                return state
                    .cards_in(section)
                    .into_iter()
                    .map(|i| format!("title:{i}"))
                    .collect();
            }
        }
        if let Some(card) = index(parent, "card:") {
            if *locator == Locator::class(contract::CARD_TITLE_CLASS) {
                return vec![format!("title:{card}")];
            }
        }
        Vec::new()
    }

    fn press(&self, state: &mut State, element: &ElementRef) {
        match element.0.as_str() {
            "#addCardBtn" => {
                state.card_modal = true;
                state.editing = None;
                state.card_draft.clear();
            }
            "#cancelCard" => state.card_modal = false,
            "#saveCard" if state.card_modal && !state.card_draft.is_empty() => {
                let title = std::mem::take(&mut state.card_draft);
                match state.editing.take() {
                    Some(i) => state.board.cards[i].title = title,
                    None => {
                        let task_id = format!("TSK-{:03}", state.board.task_counter);
                        state.board.task_counter += 1;
                        state.board.cards.push(Card {
                            title,
                            task_id,
                            section: 0,
                        });
                    }
                }
                state.card_modal = false;
                state.save();
            }
            "#addColumnBtn" => state.column_draft.clear(),
            "#saveColumn" if !state.column_draft.is_empty() => {
                let name = std::mem::take(&mut state.column_draft);
                state.board.sections.push(name);
                state.save();
            }
            "#exportPdfBtn" if self.behaviour.export_opens_window => {
                state.windows.push(EXPORT_WINDOW.to_string());
            }
            "#clearAllBtn" => {
                if self.behaviour.confirm_before_clear {
                    state.clear_pending = true;
                } else {
                    state.clear_board();
                }
            }
            "body" => state.context_menu = false,
            _ => {
                // Clicking a card opens it for editing
                if let Some(i) = index(element, "card:") {
                    state.card_modal = true;
                    state.editing = Some(i);
                    state.card_draft = state.board.cards[i].title.clone();
                }
            }
        }
    }
}

fn index(element: &ElementRef, prefix: &str) -> Option<usize> {
    element.0.strip_prefix(prefix)?.parse().ok()
}

fn stale(element: &ElementRef) -> E2eError {
    E2eError::ElementNotFound(format!("stale handle {}", element.0))
}

#[async_trait]
impl BrowserSession for FakePlanner {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state();
        state.url = url.to_string();
        state.load();
        Ok(())
    }

    async fn refresh(&self) -> E2eResult<()> {
        self.state().load();
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
        let state = self.state();
        Ok(self
            .locate_all(&state, locator)
            .into_iter()
            .map(ElementRef)
            .collect())
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
        let state = self.state();
        Ok(self
            .children(&state, parent, locator)
            .into_iter()
            .map(ElementRef)
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        let mut state = self.state();
        self.press(&mut state, element);
        Ok(())
    }

    async fn double_click(&self, element: &ElementRef) -> E2eResult<()> {
        let mut state = self.state();
        self.press(&mut state, element);
        self.press(&mut state, element);
        Ok(())
    }

    async fn context_click(&self, element: &ElementRef) -> E2eResult<()> {
        if self.behaviour.context_menu && index(element, "card:").is_some() {
            self.state().context_menu = true;
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> E2eResult<()> {
        let mut state = self.state();
        match element.0.as_str() {
            "#cardTitle" => state.card_draft.clear(),
            "#columnName" => state.column_draft.clear(),
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        let mut state = self.state();
        match element.0.as_str() {
            "#cardTitle" => state.card_draft.push_str(text),
            "#columnName" => state.column_draft.push_str(text),
            _ => {}
        }
        Ok(())
    }

    async fn set_value(&self, _element: &ElementRef, _value: &str) -> E2eResult<()> {
        Ok(())
    }

    async fn element_text(&self, element: &ElementRef) -> E2eResult<String> {
        let state = self.state();
        if element.0 == "h1" {
            let heading = if state.url.starts_with("data:") {
                "Test"
            } else {
                contract::APP_HEADING
            };
            return Ok(heading.to_string());
        }

        let card = |prefix| index(element, prefix).and_then(|i| state.board.cards.get(i));
        if let Some(card) = card("title:") {
            return Ok(card.title.clone());
        }
        if let Some(card) = card("taskid:") {
            return Ok(card.task_id.clone());
        }
        index(element, "coltitle:")
            .and_then(|i| state.board.sections.get(i))
            .cloned()
            .ok_or_else(|| stale(element))
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        let state = self.state();
        Ok(match element.0.as_str() {
            "#cardModal" => state.card_modal,
            "header" | "board" => {
                self.behaviour.mobile_layout || state.viewport.0 >= DESKTOP_MIN_WIDTH
            }
            _ => true,
        })
    }

    async fn is_enabled(&self, _element: &ElementRef) -> E2eResult<bool> {
        Ok(true)
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        let state = self.state();
        if expression.contains("localStorage.getItem") && expression.contains(contract::CARDS_STORAGE_KEY) {
            return Ok(state.stored_cards().map(Value::String).unwrap_or(Value::Null));
        }
        Ok(Value::Null)
    }

    async fn drag_and_drop(&self, source: &ElementRef, target: &ElementRef) -> E2eResult<()> {
        let mut state = self.state();
        let card = index(source, "card:").ok_or_else(|| stale(source))?;
        let section = index(target, "content:").ok_or_else(|| stale(target))?;
        state.board.cards[card].section = section;
        state.save();
        Ok(())
    }

    async fn window_handles(&self) -> E2eResult<Vec<WindowHandle>> {
        Ok(self.state().windows.iter().cloned().map(WindowHandle).collect())
    }

    async fn current_window(&self) -> E2eResult<WindowHandle> {
        Ok(WindowHandle(self.state().current.clone()))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> E2eResult<()> {
        let mut state = self.state();
        if !state.windows.contains(&handle.0) {
            return Err(E2eError::NoSuchWindow(handle.0.clone()));
        }
        state.current = handle.0.clone();
        Ok(())
    }

    async fn close_window(&self) -> E2eResult<()> {
        let mut state = self.state();
        let current = state.current.clone();
        state.windows.retain(|w| *w != current);
        Ok(())
    }

    async fn page_text(&self) -> E2eResult<String> {
        let state = self.state();
        if state.current == EXPORT_WINDOW {
            let mut text = String::from("Smart Study Planner\n");
            if self.behaviour.export_has_calendar {
                text.push_str("Study Calendar - October 2026\n");
            }
            return Ok(text);
        }
        if !self.app_loaded(&state) {
            return Ok(String::new());
        }
        let titles: Vec<&str> = state.board.cards.iter().map(|c| c.title.as_str()).collect();
        Ok(format!("{}\n{}", contract::APP_HEADING, titles.join("\n")))
    }

    async fn set_viewport(&self, width: u32, height: u32) -> E2eResult<()> {
        self.state().viewport = (width, height);
        Ok(())
    }

    async fn accept_dialog(&self) -> E2eResult<bool> {
        let mut state = self.state();
        if !state.clear_pending {
            return Ok(false);
        }
        state.clear_pending = false;
        state.clear_board();
        Ok(true)
    }

    async fn close(&self) -> E2eResult<()> {
        self.state().closes += 1;
        Ok(())
    }
}
