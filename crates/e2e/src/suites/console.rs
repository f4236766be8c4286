//! Console suite: static checks over the app's source files

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::harness::{Check, Harness, Outcome, TestCase};
use crate::suites::contract::{self, SourceExpectation, SourceRule};

pub const SUITE_NAME: &str = "Console";

/// Root directory of the app's sources
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn read(&self, file: &str) -> E2eResult<String> {
        let path = self.root.join(file);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            E2eError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })
    }
}

/// Evaluate one rule against a file's content, returning the issue if any
pub fn evaluate_rule(rule: &SourceRule, file: &str, content: &str) -> Option<String> {
    match *rule {
        SourceRule::Contains(needles) => {
            let missing: Vec<&str> = needles
                .iter()
                .copied()
                .filter(|needle| !content.contains(needle))
                .collect();
            (!missing.is_empty()).then(|| format!("missing from {file}: {}", quote_all(&missing)))
        }
        SourceRule::Absent(needles) => {
            let present: Vec<&str> = needles
                .iter()
                .copied()
                .filter(|needle| content.contains(needle))
                .collect();
            (!present.is_empty()).then(|| format!("still present in {file}: {}", quote_all(&present)))
        }
        SourceRule::BalancedBraces => {
            let open = content.matches('{').count();
            let close = content.matches('}').count();
            (open != close)
                .then(|| format!("mismatched braces in {file}: {open} open, {close} close"))
        }
        SourceRule::AtLeast { needle, min } => {
            let found = content.matches(needle).count();
            (found < min)
                .then(|| format!("only {found} `{needle}` in {file}, expected at least {min}"))
        }
    }
}

fn quote_all(needles: &[&str]) -> String {
    needles
        .iter()
        .map(|needle| format!("`{needle}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Passes when a file satisfies every rule of its expectation
pub struct SourceCheck {
    expectation: SourceExpectation,
}

impl SourceCheck {
    pub fn new(expectation: SourceExpectation) -> Self {
        Self { expectation }
    }
}

#[async_trait]
impl Check<SourceTree> for SourceCheck {
    async fn check(&self, tree: &mut SourceTree) -> E2eResult<Outcome> {
        let file = self.expectation.file;
        let content = tree.read(file).await?;
        let issues: Vec<String> = self
            .expectation
            .rules
            .iter()
            .filter_map(|rule| evaluate_rule(rule, file, &content))
            .collect();

        if !issues.is_empty() {
            debug!("{}: {} issue(s)", self.expectation.name, issues.len());
        }
        Ok(Outcome::check(issues.is_empty(), issues.join("; ")))
    }
}

fn file_structure(tree: &mut SourceTree) -> BoxFuture<'_, E2eResult<Outcome>> {
    async move {
        let mut missing = Vec::new();
        for file in contract::SOURCE_FILES {
            if !tokio::fs::try_exists(tree.root().join(file)).await? {
                missing.push(file);
            }
        }
        Ok(Outcome::check(
            missing.is_empty(),
            format!("missing files: {}", missing.join(", ")),
        ))
    }
    .boxed()
}

pub fn test_cases() -> Vec<TestCase<SourceTree>> {
    let mut cases = vec![TestCase::from_fn("File Structure", file_structure)];
    cases.extend(
        contract::SOURCE_EXPECTATIONS
            .iter()
            .map(|expectation| TestCase::new(expectation.name, SourceCheck::new(*expectation))),
    );
    cases
}

pub fn harness(cancel: CancellationToken) -> Harness<SourceTree> {
    let mut harness = Harness::new(SUITE_NAME).with_cancellation(cancel);
    harness.register(test_cases());
    harness
}
