//! Check that Chrome starts before running the suites

use planner_e2e::{doctor, HarnessConfig};

use super::ExitStatus;
use crate::output::{print_error, print_info, print_remediation, print_success};

pub async fn execute(config: &HarnessConfig) -> ExitStatus {
    print_info("Testing Chrome setup...");

    match doctor::run(config).await {
        Ok(report) if report.session_ok => {
            print_success(&format!("Chrome is working ({})", report.browser_version));
            print_info("Ready to run the full suite: planner-qa");
            ExitStatus::Passed
        }
        Ok(_) => {
            print_error("Chrome started but the test page did not render as expected");
            ExitStatus::Failed
        }
        Err(e) => {
            print_error(&format!("Chrome not working: {}", e));
            print_remediation(e.remediation());
            ExitStatus::Failed
        }
    }
}
