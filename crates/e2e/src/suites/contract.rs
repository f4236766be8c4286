//! Identifiers the Smart Study Planner app exposes to the checks.
//!
//! Renaming any of these in the app breaks the checks, not the other way
//! round.

use crate::session::Locator;

pub const INDEX_FILE: &str = "index.html";
pub const STYLESHEET_FILE: &str = "style.css";
pub const SCRIPT_FILE: &str = "script-new.js";

pub const SOURCE_FILES: [&str; 3] = [INDEX_FILE, STYLESHEET_FILE, SCRIPT_FILE];

/// Text of the page's `h1`
pub const APP_HEADING: &str = "Smart Study Planner";

pub const APP_CONTAINER_CLASS: &str = "app-container";
pub const APP_HEADER_CLASS: &str = "app-header";
pub const BOARD_CLASS: &str = "kanban-board";

pub const ADD_CARD_BUTTON_ID: &str = "addCardBtn";
pub const CARD_MODAL_ID: &str = "cardModal";
pub const CARD_TITLE_INPUT_ID: &str = "cardTitle";
pub const CARD_SUBJECT_INPUT_ID: &str = "cardSubject";
pub const CARD_DUE_DATE_INPUT_ID: &str = "cardDueDate";
pub const CARD_PRIORITY_SELECT_ID: &str = "cardPriority";
pub const CARD_DESCRIPTION_INPUT_ID: &str = "cardDescription";
pub const SAVE_CARD_BUTTON_ID: &str = "saveCard";
pub const CANCEL_CARD_BUTTON_ID: &str = "cancelCard";

pub const ADD_COLUMN_BUTTON_ID: &str = "addColumnBtn";
pub const COLUMN_NAME_INPUT_ID: &str = "columnName";
pub const COLUMN_COLOR_SELECT_ID: &str = "columnColor";
pub const SAVE_COLUMN_BUTTON_ID: &str = "saveColumn";

pub const EXPORT_BUTTON_ID: &str = "exportPdfBtn";
pub const CLEAR_ALL_BUTTON_ID: &str = "clearAllBtn";

pub const CARD_CLASS: &str = "study-card";
pub const CARD_TITLE_CLASS: &str = "card-title";
pub const CARD_TASK_ID_CLASS: &str = "card-task-id";
pub const CONTEXT_MENU_CLASS: &str = "context-menu";

/// Sections are rendered as `.board-column`, cards go into `.column-content`
pub const COLUMN_CLASS: &str = "board-column";
pub const COLUMN_CONTENT_CLASS: &str = "column-content";
pub const COLUMN_TITLE_SELECTOR: &str = ".board-column .column-header h3";

/// Task ids look like `TSK-001`
pub const TASK_ID_PREFIX: &str = "TSK-";

pub const PRIORITY_HIGH: &str = "high";
pub const COLUMN_COLOR_BLUE: &str = "blue";

/// localStorage key holding the cards
pub const CARDS_STORAGE_KEY: &str = "studyCards";

/// Text the export window must contain
pub const EXPORT_MARKERS: [&str; 2] = ["Smart Study Planner", "Study Calendar"];

/// Viewport used to check the mobile layout
pub const MOBILE_VIEWPORT: (u32, u32) = (375, 667);

pub fn by_id(id: &str) -> Locator {
    Locator::id(id)
}

pub fn cards() -> Locator {
    Locator::class(CARD_CLASS)
}

pub fn card_titles() -> Locator {
    Locator::css(format!(".{CARD_CLASS} .{CARD_TITLE_CLASS}"))
}

pub fn columns() -> Locator {
    Locator::class(COLUMN_CLASS)
}

pub fn column_titles() -> Locator {
    Locator::css(COLUMN_TITLE_SELECTOR)
}

/// One rule a source file must satisfy
#[derive(Debug, Clone, Copy)]
pub enum SourceRule {
    /// Every substring must occur
    Contains(&'static [&'static str]),
    /// None of the substrings may occur
    Absent(&'static [&'static str]),
    /// As many `{` as `}`
    BalancedBraces,
    /// `needle` occurs at least `min` times
    AtLeast { needle: &'static str, min: usize },
}

/// Named set of rules over one source file
#[derive(Debug, Clone, Copy)]
pub struct SourceExpectation {
    pub name: &'static str,
    pub file: &'static str,
    pub rules: &'static [SourceRule],
}

pub const SOURCE_EXPECTATIONS: &[SourceExpectation] = &[
    SourceExpectation {
        name: "HTML Structure",
        file: INDEX_FILE,
        rules: &[SourceRule::Contains(&[
            "kanbanBoard",
            "cardModal",
            "columnModal",
            "addCardBtn",
            SCRIPT_FILE,
        ])],
    },
    SourceExpectation {
        name: "CSS Syntax",
        file: STYLESHEET_FILE,
        rules: &[
            SourceRule::BalancedBraces,
            SourceRule::Contains(&[
                ".study-card",
                ".board-column",
                ".completion-toggle-btn",
                ".card-header",
            ]),
        ],
    },
    SourceExpectation {
        name: "JavaScript Syntax",
        file: SCRIPT_FILE,
        rules: &[
            SourceRule::Contains(&[
                "class StudyPlannerKanban",
                "saveColumn()",
                "toggleCardCompletion(",
                "exportToPDF()",
                "createCardElement(",
                "renderColumns()",
                "getDefaultColumns()",
            ]),
            SourceRule::AtLeast {
                needle: "console.log",
                min: 5,
            },
            SourceRule::Contains(&["const "]),
            SourceRule::Contains(&["let "]),
        ],
    },
    SourceExpectation {
        name: "Completion Feature",
        file: SCRIPT_FILE,
        rules: &[SourceRule::Contains(&[
            "toggleCardCompletion",
            "completion-toggle-btn",
            "isCompleted",
            "completedDate",
        ])],
    },
    SourceExpectation {
        name: "Enter Key Support",
        file: SCRIPT_FILE,
        rules: &[SourceRule::Contains(&[
            "addEventListener('keydown'",
            "e.key === 'Enter'",
            "e.preventDefault()",
            "handleEnterKey",
        ])],
    },
    SourceExpectation {
        name: "PDF Export Feature",
        file: SCRIPT_FILE,
        rules: &[SourceRule::Contains(&[
            "exportToPDF()",
            "window.open",
            "generateCalendarHtml",
            "completion-badge",
            "status-badge",
        ])],
    },
    SourceExpectation {
        name: "Color Scheme",
        file: STYLESHEET_FILE,
        rules: &[SourceRule::Contains(&[
            "#0d1117", "#161b22", "#21262d", "#30363d", "#e6edf3",
        ])],
    },
    SourceExpectation {
        name: "Customizable Categories",
        file: SCRIPT_FILE,
        rules: &[
            SourceRule::Contains(&[
                "openColumnModal",
                "saveColumn()",
                "deleteColumn()",
                "Category 1",
                "currentEditColumnId",
            ]),
            // Column names from before sections became user-defined
            SourceRule::Absent(&[
                "name: 'Backlog'",
                "name: 'In Progress'",
                "name: 'Completed'",
            ]),
        ],
    },
];
