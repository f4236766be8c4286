//! Browser smoke test: can Chrome start and render a page?

use serde::Serialize;
use tracing::{info, warn};

use crate::chrome::ChromeSession;
use crate::config::{BrowserConfig, HarnessConfig};
use crate::error::E2eResult;
use crate::session::{BrowserSession, Locator};

/// Page with a single known heading
pub const SMOKE_PAGE: &str = "data:text/html,<html><body><h1>Test</h1></body></html>";

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub browser_version: String,
    pub session_ok: bool,
}

/// Load the smoke page and read its heading back
pub async fn verify_session(session: &dyn BrowserSession) -> E2eResult<bool> {
    session.navigate(SMOKE_PAGE).await?;
    let heading = session.find_element(&Locator::tag("h1")).await?;
    Ok(session.element_text(&heading).await? == "Test")
}

/// Start a headless Chrome and verify it renders the smoke page
pub async fn run(config: &HarnessConfig) -> E2eResult<DoctorReport> {
    let browser = BrowserConfig {
        headless: true,
        ..config.browser.clone()
    };
    let session = ChromeSession::launch(&browser).await?;
    let browser_version = session.version().await;
    let verified = verify_session(&session).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close smoke-test browser: {}", e);
    }

    let browser_version = browser_version?;
    info!("Found {}", browser_version);
    Ok(DoctorReport {
        browser_version,
        session_ok: verified?,
    })
}
