use std::path::PathBuf;

use diffwarden_core::DiffwardenConfig;

use crate::report::{self, Report};

/// Result of a full review run.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use diffwarden_review::pipeline::ReviewOutcome;
/// use diffwarden_review::report::Report;
///
/// let outcome = ReviewOutcome {
///     report: Report::no_changes(),
///     output: PathBuf::from("ai_review_report.txt"),
///     save_error: None,
/// };
/// assert!(outcome.saved());
/// ```
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// The report produced by this run.
    pub report: Report,
    /// Where the report was (or should have been) written.
    pub output: PathBuf,
    /// Why the report file could not be written, if it could not.
    pub save_error: Option<String>,
}

impl ReviewOutcome {
    /// `true` when the report file holds this run's report.
    pub fn saved(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Review the latest commit of `config.review.repo` and write the report.
///
/// Runs diff acquisition, the review request, and the file write in
/// sequence. Never fails: every error ends up in the returned outcome, and
/// in the report file when it can be written.
pub async fn run_review(config: &DiffwardenConfig) -> ReviewOutcome {
    let report = match diffwarden_git::diff_last_commit(&config.review.repo) {
        Ok(diff) => {
            tracing::info!(
                base = %diff.base,
                head = %diff.head,
                files = diff.files_changed,
                "reviewing last commit"
            );
            report::review_diff(&config.llm, &diff.patch).await
        }
        Err(e) => {
            tracing::warn!(error = %e, repo = %config.review.repo.display(), "could not read diff");
            Report::from_error(&e)
        }
    };

    let output = config.review.output.clone();
    let save_error = match report.save(&output) {
        Ok(()) => {
            tracing::info!(status = %report.status, path = %output.display(), "report saved");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, path = %output.display(), "failed to write report");
            Some(e.to_string())
        }
    };

    ReviewOutcome {
        report,
        output,
        save_error,
    }
}
