//! The two check suites run by the harness

pub mod console;
pub mod contract;
pub mod ui;

pub use console::SourceTree;
pub use ui::UiContext;
