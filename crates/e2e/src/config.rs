//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::suites::contract;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "planner-qa.toml";

/// Harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Application under test
    pub app: AppConfig,

    /// Browser launch and session
    pub browser: BrowserConfig,

    /// Report locations
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the app's markup, stylesheet and script
    pub root: PathBuf,

    /// URL the UI suite opens; defaults to `<root>/index.html` as a file URL
    pub url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            url: None,
        }
    }
}

impl AppConfig {
    pub fn entry_url(&self) -> E2eResult<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let index = self.root.join(contract::INDEX_FILE);
        let absolute = index.canonicalize().map_err(|e| {
            E2eError::Config(format!("cannot resolve {}: {}", index.display(), e))
        })?;
        Ok(format!("file://{}", absolute.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome or Chromium binary (None = auto-detect)
    pub executable: Option<PathBuf>,

    pub headless: bool,

    /// Run Chrome with its sandbox; containers running as root need `false`
    pub sandbox: bool,

    pub window_width: u32,
    pub window_height: u32,

    /// Seconds to wait for the browser to come up
    pub launch_timeout_secs: u64,

    /// Bound for every element wait in the UI suite
    pub wait_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: false,
            window_width: 1280,
            window_height: 900,
            launch_timeout_secs: 30,
            wait_timeout_secs: 10,
        }
    }
}

impl BrowserConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub ui_report: String,
    pub console_report: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("test-results"),
            ui_report: "ui-results.json".to_string(),
            console_report: "console-results.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn ui_report_path(&self) -> PathBuf {
        self.dir.join(&self.ui_report)
    }

    pub fn console_report_path(&self) -> PathBuf {
        self.dir.join(&self.console_report)
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}
