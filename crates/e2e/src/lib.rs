//! Study Planner QA harness
//!
//! This crate provides the checks for the Study Planner kanban app:
//! - An ordered test harness that isolates failures and reports them
//! - A browser-session capability backed by Chrome over DevTools
//! - A UI suite that drives the app in Chrome
//! - A console suite that inspects the app's markup, stylesheet and script
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Harness<C>                              │
//! │    ├── register([TestCase<C>])                              │
//! │    ├── run(&mut C) -> SuiteRun                              │
//! │    │     └── per case: Ok(Outcome) | Err | panic -> result  │
//! │    └── SuiteRun                                             │
//! │          ├── report()        console summary                │
//! │          └── persist(path)   JSON RunReport                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  C = UiContext      Box<dyn BrowserSession>                 │
//! │                       └── ChromeSession (chromiumoxide)     │
//! │  C = SourceTree     app root directory                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod chrome;
pub mod config;
pub mod doctor;
pub mod error;
pub mod harness;
pub mod report;
pub mod session;
pub mod suites;

pub use chrome::ChromeSession;
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use harness::{Check, Harness, Outcome, SuiteRun, TestCase};
pub use report::{RunReport, RunSummary, TestResult};
pub use session::{BrowserSession, ElementRef, Locator, WaitCondition, WindowHandle};
