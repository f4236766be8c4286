//! Run the console and UI suites

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::error;

use planner_e2e::suites::{console, ui, SourceTree, UiContext};
use planner_e2e::{ChromeSession, E2eError, HarnessConfig, SuiteRun};

use super::ExitStatus;
use crate::output::{print_error, print_info, print_remediation, print_warning};

/// Which suites to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suites {
    All,
    Console,
    Ui,
}

pub async fn execute(
    config: &HarnessConfig,
    suites: Suites,
    cancel: &CancellationToken,
) -> ExitStatus {
    let mut status = ExitStatus::Passed;

    if matches!(suites, Suites::All | Suites::Console) {
        let mut tree = SourceTree::new(&config.app.root);
        let run = console::harness(cancel.clone()).run(&mut tree).await;
        status = status.merge(finish(&run, &config.output.console_report_path()));
    }

    if matches!(suites, Suites::All | Suites::Ui) {
        if cancel.is_cancelled() {
            print_warning("UI suite skipped after interrupt");
            return status.merge(ExitStatus::Interrupted);
        }
        status = status.merge(run_ui(config, cancel).await);
    }

    status
}

/// Launch one browser, run the UI cases against it, then close it
async fn run_ui(config: &HarnessConfig, cancel: &CancellationToken) -> ExitStatus {
    let app_url = match config.app.entry_url() {
        Ok(url) => url,
        Err(e) => {
            print_error(&format!("Cannot locate the app: {}", e));
            return ExitStatus::Failed;
        }
    };

    let session = match ChromeSession::launch(&config.browser).await {
        Ok(session) => session,
        Err(e) => return setup_failed(&e),
    };

    let mut ctx = UiContext::new(Box::new(session), app_url, config.browser.wait_timeout())
        .with_viewport(config.browser.window_width, config.browser.window_height);
    let run = ui::harness(cancel.clone()).run(&mut ctx).await;
    ctx.release().await;

    finish(&run, &config.output.ui_report_path())
}

fn setup_failed(e: &E2eError) -> ExitStatus {
    error!("UI suite setup failed: {}", e);
    print_error(&format!("Browser setup failed: {}", e));
    print_remediation(e.remediation());
    ExitStatus::Failed
}

/// Print the report and persist it; a failed write does not change the verdict
fn finish(run: &SuiteRun, report_path: &Path) -> ExitStatus {
    run.report();

    match run.persist(report_path) {
        Ok(path) => print_info(&format!("Report saved to {}", path.display())),
        Err(e) => {
            error!("Failed to write {}: {}", report_path.display(), e);
            print_error(&format!("Could not save report to {}: {}", report_path.display(), e));
        }
    }

    if run.interrupted() {
        ExitStatus::Interrupted
    } else if run.all_passed() {
        ExitStatus::Passed
    } else {
        ExitStatus::Failed
    }
}
