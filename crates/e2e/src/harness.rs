//! Ordered test harness: registration, isolated execution and reporting

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::E2eResult;
use crate::report::{RunReport, RunSummary, TestResult};

const RULE_WIDTH: usize = 60;

/// Outcome of a check that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub passed: bool,
    pub message: String,
}

impl Outcome {
    pub fn pass() -> Self {
        Self::pass_with("")
    }

    pub fn pass_with(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// Pass when `condition` holds, otherwise fail with `failure`
    pub fn check(condition: bool, failure: impl Into<String>) -> Self {
        if condition {
            Self::pass()
        } else {
            Self::fail(failure)
        }
    }
}

/// Body of a test case.
///
/// `Ok` carries the deliberate verdict. `Err` and panics are unexpected
/// failures; the harness turns both into failed results.
#[async_trait]
pub trait Check<C: Send>: Send + Sync {
    async fn check(&self, ctx: &mut C) -> E2eResult<Outcome>;
}

/// Plain async function usable as a check
pub type CheckFn<C> = for<'a> fn(&'a mut C) -> BoxFuture<'a, E2eResult<Outcome>>;

struct FnCheck<C>(CheckFn<C>);

#[async_trait]
impl<C: Send + 'static> Check<C> for FnCheck<C> {
    async fn check(&self, ctx: &mut C) -> E2eResult<Outcome> {
        (self.0)(ctx).await
    }
}

/// A named check
pub struct TestCase<C: Send> {
    name: String,
    check: Box<dyn Check<C>>,
}

impl<C: Send + 'static> TestCase<C> {
    pub fn new(name: impl Into<String>, check: impl Check<C> + 'static) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn from_fn(name: impl Into<String>, check: CheckFn<C>) -> Self {
        Self::new(name, FnCheck(check))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runs registered cases in order against a shared context
pub struct Harness<C: Send> {
    suite: String,
    cases: Vec<TestCase<C>>,
    cancel: CancellationToken,
}

impl<C: Send + 'static> Harness<C> {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            cases: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run early when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Append cases in execution order. Duplicate names are kept.
    pub fn register(&mut self, tests: impl IntoIterator<Item = TestCase<C>>) -> &mut Self {
        self.cases.extend(tests);
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(TestCase::name)
    }

    /// Execute every case in registration order.
    ///
    /// Never short-circuits: each case yields exactly one result unless the
    /// run is interrupted, in which case the in-flight case is recorded as
    /// failed and the remaining cases are skipped.
    pub async fn run(&self, ctx: &mut C) -> SuiteRun {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(self.cases.len());
        let mut interrupted = false;

        info!("Running {} test(s) in the {} suite...", self.cases.len(), self.suite);

        for case in &self.cases {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            debug!("Running test: {}", case.name);
            let case_start = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    interrupted = true;
                    Outcome::fail("interrupted")
                }
                settled = AssertUnwindSafe(case.check.check(ctx)).catch_unwind() => settle(settled),
            };

            let result = TestResult::new(case.name.clone(), outcome.passed, outcome.message);
            if result.success {
                info!("✓ {} ({} ms)", result.test, case_start.elapsed().as_millis());
            } else {
                error!("✗ {} - {}", result.test, result.message);
            }
            results.push(result);

            if interrupted {
                break;
            }
        }

        if interrupted {
            warn!(
                "Run interrupted after {} of {} test(s)",
                results.len(),
                self.cases.len()
            );
        }

        let summary = RunSummary::from_results(&results, start.elapsed(), interrupted);
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            summary.passed, summary.failed, summary.duration_ms
        );

        SuiteRun {
            suite: self.suite.clone(),
            started_at,
            results,
            summary,
        }
    }
}

fn settle(settled: std::thread::Result<E2eResult<Outcome>>) -> Outcome {
    match settled {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Outcome::fail(e.to_string()),
        Err(payload) => Outcome::fail(format!("check panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Results of one harness run. The summary is fixed at construction.
#[derive(Debug, Clone)]
pub struct SuiteRun {
    suite: String,
    started_at: DateTime<Utc>,
    results: Vec<TestResult>,
    summary: RunSummary,
}

impl SuiteRun {
    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn interrupted(&self) -> bool {
        self.summary.interrupted
    }

    /// True iff every recorded result succeeded (vacuously true when empty)
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Human-readable report: one line per result, summary, then failures
    pub fn render_report(&self) -> String {
        self.to_string()
    }

    /// Print the report to stdout
    pub fn report(&self) {
        print!("{}", self.render_report());
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            timestamp: self.started_at,
            suite: self.suite.clone(),
            summary: self.summary.clone(),
            results: self.results.clone(),
        }
    }

    /// Write the JSON report to `path`, overwriting any existing file
    pub fn persist(&self, path: &Path) -> E2eResult<PathBuf> {
        self.to_report().write(path)
    }
}

impl fmt::Display for SuiteRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "{heavy}")?;
        writeln!(f, "{} results", self.suite)?;
        writeln!(f, "{heavy}")?;

        for result in &self.results {
            let marker = if result.success { "PASS" } else { "FAIL" };
            if result.message.is_empty() {
                writeln!(f, "[{marker}] {}", result.test)?;
            } else {
                writeln!(f, "[{marker}] {} - {}", result.test, result.message)?;
            }
        }

        let s = &self.summary;
        writeln!(f, "{light}")?;
        writeln!(
            f,
            "Total: {} | Passed: {} | Failed: {} | Success rate: {:.1}%",
            s.total_tests, s.passed, s.failed, s.success_rate
        )?;
        writeln!(f, "Duration: {} ms", s.duration_ms)?;
        if s.interrupted {
            writeln!(f, "Run interrupted before all tests completed")?;
        }

        if s.failed > 0 {
            writeln!(f)?;
            writeln!(f, "Failures to fix:")?;
            for (i, failure) in self.failures().enumerate() {
                if failure.message.is_empty() {
                    writeln!(f, "  {}. {}", i + 1, failure.test)?;
                } else {
                    writeln!(f, "  {}. {}: {}", i + 1, failure.test, failure.message)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;

    fn passes(_: &mut ()) -> BoxFuture<'_, E2eResult<Outcome>> {
        async { Ok(Outcome::pass()) }.boxed()
    }

    fn errors(_: &mut ()) -> BoxFuture<'_, E2eResult<Outcome>> {
        async { Err(E2eError::Timeout("#cardModal".into())) }.boxed()
    }

    fn missing_element(_: &mut ()) -> BoxFuture<'_, E2eResult<Outcome>> {
        async { Ok(Outcome::fail("missing element")) }.boxed()
    }

    fn bump(counter: &mut u32) -> BoxFuture<'_, E2eResult<Outcome>> {
        async move {
            *counter += 1;
            Ok(Outcome::pass_with(format!("call {counter}")))
        }
        .boxed()
    }

    struct Panics;

    #[async_trait]
    impl Check<()> for Panics {
        async fn check(&self, _: &mut ()) -> E2eResult<Outcome> {
            panic!("check exploded")
        }
    }

    #[tokio::test]
    async fn mixed_outcomes_are_recorded_in_order() {
        let mut harness = Harness::new("unit");
        harness.register([
            TestCase::from_fn("passes", passes),
            TestCase::from_fn("errors", errors),
            TestCase::from_fn("missing", missing_element),
        ]);

        let run = harness.run(&mut ()).await;
        let got: Vec<(&str, bool, &str)> = run
            .results()
            .iter()
            .map(|r| (r.test.as_str(), r.success, r.message.as_str()))
            .collect();

        assert_eq!(
            got,
            vec![
                ("passes", true, ""),
                ("errors", false, "Timeout waiting for: #cardModal"),
                ("missing", false, "missing element"),
            ]
        );
        assert!(!run.all_passed());
        assert_eq!(run.summary().total_tests, 3);
        assert_eq!(run.summary().passed, 1);
        assert_eq!(run.summary().failed, 2);
    }

    #[tokio::test]
    async fn panicking_case_does_not_abort_the_run() {
        let mut harness = Harness::new("unit");
        harness.register([
            TestCase::from_fn("first", passes),
            TestCase::new("explodes", Panics),
            TestCase::from_fn("last", passes),
        ]);

        let run = harness.run(&mut ()).await;
        assert_eq!(run.results().len(), 3);
        assert_eq!(run.results()[1].message, "check panicked: check exploded");
        assert!(run.results()[2].success);
    }

    #[tokio::test]
    async fn empty_run_is_vacuously_successful() {
        let harness: Harness<()> = Harness::new("empty");
        let run = harness.run(&mut ()).await;

        assert!(run.all_passed());
        assert_eq!(run.summary().total_tests, 0);
        assert_eq!(run.summary().passed, 0);
        assert_eq!(run.summary().failed, 0);
        assert_eq!(run.summary().success_rate, 0.0);
        assert!(run.render_report().contains("Success rate: 0.0%"));
    }

    #[tokio::test]
    async fn duplicate_names_are_kept_by_position() {
        let mut harness = Harness::new("dupes");
        harness.register([TestCase::from_fn("same", bump)]);
        harness.register([TestCase::from_fn("same", bump)]);

        let mut counter = 0;
        let run = harness.run(&mut counter).await;

        assert_eq!(counter, 2);
        assert_eq!(run.results()[0].message, "call 1");
        assert_eq!(run.results()[1].message, "call 2");
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let mut harness = Harness::new("cancelled").with_cancellation(token);
        harness.register([TestCase::from_fn("never", passes)]);

        let run = harness.run(&mut ()).await;
        assert!(run.results().is_empty());
        assert!(run.interrupted());
    }

    fn cancels_then_hangs(token: &mut CancellationToken) -> BoxFuture<'_, E2eResult<Outcome>> {
        async move {
            token.cancel();
            std::future::pending::<()>().await;
            Ok(Outcome::pass())
        }
        .boxed()
    }

    fn token_passes(_: &mut CancellationToken) -> BoxFuture<'_, E2eResult<Outcome>> {
        async { Ok(Outcome::pass()) }.boxed()
    }

    #[tokio::test]
    async fn cancel_during_a_case_fails_it_and_skips_the_rest() {
        let mut token = CancellationToken::new();
        let mut harness = Harness::new("cancelled").with_cancellation(token.clone());
        harness.register([
            TestCase::from_fn("a", token_passes),
            TestCase::from_fn("b", cancels_then_hangs),
            TestCase::from_fn("c", token_passes),
        ]);

        let run = harness.run(&mut token).await;
        let got: Vec<(&str, bool, &str)> = run
            .results()
            .iter()
            .map(|r| (r.test.as_str(), r.success, r.message.as_str()))
            .collect();

        assert_eq!(got, vec![("a", true, ""), ("b", false, "interrupted")]);
        assert!(run.interrupted());
        assert_eq!(run.summary().total_tests, 2);
        assert!(run.render_report().contains("Run interrupted before all tests completed"));
    }

    #[tokio::test]
    async fn report_lists_failures_for_remediation() {
        let mut harness = Harness::new("unit");
        harness.register([
            TestCase::from_fn("passes", passes),
            TestCase::from_fn("missing", missing_element),
        ]);

        let report = harness.run(&mut ()).await.render_report();
        assert!(report.contains("[PASS] passes\n"));
        assert!(report.contains("[FAIL] missing - missing element"));
        assert!(report.contains("Total: 2 | Passed: 1 | Failed: 1 | Success rate: 50.0%"));
        assert!(report.contains("Failures to fix:\n  1. missing: missing element"));
    }

    #[tokio::test]
    async fn persist_failure_leaves_verdict_unchanged() {
        let mut harness = Harness::new("unit");
        harness.register([TestCase::from_fn("passes", passes)]);
        let run = harness.run(&mut ()).await;

        let blocker = tempfile::NamedTempFile::new().unwrap();
        let target = blocker.path().join("results.json");

        assert!(run.persist(&target).is_err());
        assert!(run.all_passed());
    }

    #[tokio::test]
    async fn persisted_summary_round_trips() {
        let mut harness = Harness::new("unit");
        harness.register([
            TestCase::from_fn("passes", passes),
            TestCase::from_fn("errors", errors),
        ]);
        let run = harness.run(&mut ()).await;

        let dir = tempfile::tempdir().unwrap();
        let path = run.persist(&dir.path().join("results.json")).unwrap();
        let loaded = RunReport::load(&path).unwrap();

        assert_eq!(loaded.summary.total_tests, run.summary().total_tests);
        assert_eq!(loaded.summary.passed, run.summary().passed);
        assert_eq!(loaded.summary.failed, run.summary().failed);
        assert_eq!(loaded.results, run.results());
    }
}
