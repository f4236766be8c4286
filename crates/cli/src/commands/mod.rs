//! CLI command implementations

pub mod doctor;
pub mod run;

/// Process exit status, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStatus {
    Passed,
    Failed,
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Passed => 0,
            ExitStatus::Failed => 1,
            ExitStatus::Interrupted => 130,
        }
    }

    /// Keep the more severe of two statuses
    pub fn merge(self, other: ExitStatus) -> ExitStatus {
        self.max(other)
    }
}
