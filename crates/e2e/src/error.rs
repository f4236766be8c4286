//! Error types for the Study Planner checks

use chromiumoxide::error::CdpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Chrome not found: {0}")]
    BrowserNotFound(String),

    #[error("Chrome failed to start: {0}")]
    BrowserLaunch(String),

    #[error("Browser page could not be opened: {0}")]
    SessionStartup(String),

    #[error("DevTools error: {0}")]
    Cdp(#[from] CdpError),

    #[error("Invalid DevTools command: {0}")]
    Command(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("No such window: {0}")]
    NoSuchWindow(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl E2eError {
    /// Whether this error comes from acquiring the browser.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            E2eError::BrowserNotFound(_) | E2eError::BrowserLaunch(_) | E2eError::SessionStartup(_)
        )
    }

    /// Steps an operator can take to fix a setup failure.
    pub fn remediation(&self) -> &'static [&'static str] {
        if !self.is_setup_failure() {
            return &[];
        }
        &[
            "Install Google Chrome or Chromium (https://www.google.com/chrome/)",
            "Or point `browser.executable` in planner-qa.toml (or --chrome) at the browser binary",
            "In containers, keep `browser.headless = true` and `browser.sandbox = false`",
            "Then run `planner-qa doctor` to confirm the browser starts",
        ]
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
