//! Turning one compile's outcome into success or failure.
//!
//! Run mode and watch mode share this policy; they only differ in where a
//! fatal outcome goes (the aggregate future vs. the callback).

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{CompilerFault, Error};
use crate::stats::Stats;

/// Outcome of one compile, normalized from the compiler's completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub descriptor_path: PathBuf,
    /// `None` when the compiler faulted.
    pub stats: Option<Stats>,
    /// Fault message, when the compiler faulted.
    pub fault: Option<String>,
    pub has_errors: bool,
    pub has_warnings: bool,
}

impl BuildResult {
    pub fn from_completion(
        descriptor_path: PathBuf,
        completion: Result<Stats, CompilerFault>,
    ) -> Self {
        match completion {
            Ok(stats) => Self {
                descriptor_path,
                has_errors: stats.has_errors(),
                has_warnings: stats.has_warnings(),
                stats: Some(stats),
                fault: None,
            },
            Err(fault) => Self {
                descriptor_path,
                stats: None,
                fault: Some(fault.to_string()),
                has_errors: true,
                has_warnings: false,
            },
        }
    }
}

/// Escalation policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Escalation {
    /// Treat warnings as fatal.
    pub fail_on: bool,
}

impl Escalation {
    pub fn new(fail_on: bool) -> Self {
        Self { fail_on }
    }

    /// The fatal error for `result`, or `None` when it may succeed.
    pub fn evaluate(&self, result: &BuildResult) -> Option<Error> {
        let config = result.descriptor_path.clone();

        if let Some(fault) = &result.fault {
            return Some(Error::Compile {
                config,
                reason: fault.clone(),
            });
        }

        let stats = result.stats.as_ref()?;
        if result.has_errors {
            let errors = stats.all_errors();
            let first = errors
                .first()
                .and_then(|message| message.lines().next())
                .unwrap_or_default();
            return Some(Error::Compile {
                config,
                reason: format!("{} error(s), first: {}", errors.len(), first),
            });
        }

        if self.fail_on && result.has_warnings {
            return Some(Error::CompileWarning {
                config,
                count: stats.all_warnings().len(),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(errors: &[&str], warnings: &[&str]) -> Stats {
        Stats {
            config: PathBuf::from("/repo/a/globpack.json"),
            errors: errors.iter().map(|s| s.to_string()).collect(),
            warnings: warnings.iter().map(|s| s.to_string()).collect(),
            ..Stats::default()
        }
    }

    fn result(completion: Result<Stats, CompilerFault>) -> BuildResult {
        BuildResult::from_completion(PathBuf::from("/repo/a/globpack.json"), completion)
    }

    #[test]
    fn clean_stats_pass() {
        let outcome = result(Ok(stats(&[], &[])));
        assert!(Escalation::new(true).evaluate(&outcome).is_none());
    }

    #[test]
    fn faults_are_fatal() {
        let outcome = result(Err(CompilerFault::Simulated));
        assert!(outcome.stats.is_none());
        let err = Escalation::default().evaluate(&outcome).unwrap();
        assert!(matches!(err, Error::Compile { .. }));
        assert!(err.to_string().contains("simulated"));
    }

    #[test]
    fn stats_errors_are_fatal_regardless_of_fail_on() {
        let outcome = result(Ok(stats(&["Module not found\ndetails"], &[])));
        let err = Escalation::new(false).evaluate(&outcome).unwrap();
        let message = err.to_string();
        assert!(message.contains("1 error(s)"));
        assert!(!message.contains("details"));
    }

    #[test]
    fn warnings_escalate_only_under_fail_on() {
        let outcome = result(Ok(stats(&[], &["big asset"])));
        assert!(Escalation::new(false).evaluate(&outcome).is_none());
        assert!(matches!(
            Escalation::new(true).evaluate(&outcome),
            Some(Error::CompileWarning { count: 1, .. })
        ));
    }
}
