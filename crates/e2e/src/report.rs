//! Result records and the persisted JSON report

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::E2eResult;

/// Recorded outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test: String,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(test: impl Into<String>, success: bool, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            success,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate statistics for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed tests, rounded to one decimal place
    pub success_rate: f64,
    pub duration_ms: u64,
    #[serde(default)]
    pub interrupted: bool,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult], elapsed: Duration, interrupted: bool) -> Self {
        let total_tests = results.len();
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total_tests,
            passed,
            failed: total_tests - passed,
            success_rate: success_rate(passed, total_tests),
            duration_ms: elapsed.as_millis() as u64,
            interrupted,
        }
    }
}

/// `passed / total * 100` rounded to one decimal; 0.0 for an empty run.
pub fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Persisted form of a suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub suite: String,
    pub summary: RunSummary,
    pub results: Vec<TestResult>,
}

impl RunReport {
    /// Write the report as pretty JSON, replacing any existing file
    pub fn write(&self, path: &Path) -> E2eResult<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path.to_path_buf())
    }

    pub fn load(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
