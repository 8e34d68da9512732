//! Review reports and the degraded-mode fallback.
//!
//! A review never fails: a missing credential or a provider error becomes a
//! `WARNING:` report written in place of the model output, so the calling
//! pipeline can carry on unattended.

use std::fmt;
use std::path::Path;

use diffwarden_core::{DiffwardenError, LlmConfig};

use crate::llm::LlmClient;
use crate::prompt;

/// Prefix shared by every synthesized warning report.
pub const WARNING_PREFIX: &str = "WARNING:";

/// Report body for an empty diff.
pub const NO_CHANGES: &str = "No changes detected.";

/// How a report came about.
///
/// # Examples
///
/// ```
/// use diffwarden_review::report::ReportStatus;
///
/// assert_eq!(ReportStatus::RateLimited.to_string(), "rate_limited");
/// assert!(ReportStatus::RateLimited.is_degraded());
/// assert!(!ReportStatus::NoChanges.is_degraded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// The model reviewed the diff.
    Reviewed,
    /// The diff was empty; nothing was sent.
    NoChanges,
    /// No credential was configured; nothing was sent.
    MissingApiKey,
    /// The provider rejected the request with 429.
    RateLimited,
    /// The provider answered with another error status.
    ApiError,
    /// Anything else: git, transport, decoding.
    Failed,
}

impl ReportStatus {
    /// `true` for statuses whose body is a synthesized warning.
    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Reviewed | Self::NoChanges)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Reviewed => "reviewed",
            Self::NoChanges => "no_changes",
            Self::MissingApiKey => "missing_api_key",
            Self::RateLimited => "rate_limited",
            Self::ApiError => "api_error",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The text written to the report file, with the status that produced it.
///
/// # Examples
///
/// ```
/// use diffwarden_review::report::{Report, ReportStatus, NO_CHANGES};
///
/// let report = Report::no_changes();
/// assert_eq!(report.status, ReportStatus::NoChanges);
/// assert_eq!(report.body, NO_CHANGES);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// How the body was produced.
    pub status: ReportStatus,
    /// Exact content of the report file.
    pub body: String,
}

impl Report {
    /// A report holding the model's answer verbatim.
    pub fn reviewed(text: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Reviewed,
            body: text.into(),
        }
    }

    /// The fixed report for an empty diff.
    pub fn no_changes() -> Self {
        Self {
            status: ReportStatus::NoChanges,
            body: NO_CHANGES.to_string(),
        }
    }

    /// Fold an error into a warning report.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffwarden_core::DiffwardenError;
    /// use diffwarden_review::report::{Report, ReportStatus, WARNING_PREFIX};
    ///
    /// let err = DiffwardenError::RateLimited("slow down".into());
    /// let report = Report::from_error(&err);
    /// assert_eq!(report.status, ReportStatus::RateLimited);
    /// assert!(report.body.starts_with(WARNING_PREFIX));
    /// assert!(report.body.contains("slow down"));
    /// ```
    pub fn from_error(err: &DiffwardenError) -> Self {
        let (status, body) = match err {
            DiffwardenError::MissingApiKey(var) => (
                ReportStatus::MissingApiKey,
                format!("{WARNING_PREFIX} {var} is not set. Skipping AI code review."),
            ),
            DiffwardenError::RateLimited(detail) => (
                ReportStatus::RateLimited,
                format!(
                    "{WARNING_PREFIX} AI review skipped because the API rate limit was exceeded. {detail}"
                ),
            ),
            DiffwardenError::Api { .. } => (
                ReportStatus::ApiError,
                format!("{WARNING_PREFIX} AI review failed with an API error. {err}"),
            ),
            other => (
                ReportStatus::Failed,
                format!("{WARNING_PREFIX} AI review failed unexpectedly. {other}"),
            ),
        };
        Self {
            status,
            body: body.trim_end().to_string(),
        }
    }

    /// `true` when the body is a synthesized warning.
    pub fn is_degraded(&self) -> bool {
        self.status.is_degraded()
    }

    /// Overwrite `path` with the report body as UTF-8.
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns [`DiffwardenError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), DiffwardenError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.body)?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

/// Ask the model to review `diff`, degrading to a warning report on failure.
///
/// An empty diff short-circuits to [`NO_CHANGES`]; a missing credential
/// short-circuits to a warning. Neither sends a request. Otherwise prints
/// `Sending diff to <provider>...` to stdout before the request goes out.
pub async fn review_diff(llm: &LlmConfig, diff: &str) -> Report {
    if diff.trim().is_empty() {
        tracing::info!("diff is empty, skipping review");
        return Report::no_changes();
    }

    let Some(api_key) = llm.resolve_api_key() else {
        tracing::warn!(env = %llm.api_key_env, "no API key configured");
        return Report::from_error(&DiffwardenError::MissingApiKey(llm.api_key_env.clone()));
    };

    let config = LlmConfig {
        api_key: Some(api_key),
        ..llm.clone()
    };

    match request_review(&config, diff).await {
        Ok(text) => Report::reviewed(text),
        Err(e) => {
            tracing::warn!(error = %e, "review request failed");
            Report::from_error(&e)
        }
    }
}

async fn request_review(config: &LlmConfig, diff: &str) -> Result<String, DiffwardenError> {
    let client = LlmClient::new(config)?;
    println!("Sending diff to {}...", config.provider_label());
    tracing::info!(
        model = client.model(),
        token_estimate = diff.len() / 4,
        "sending diff for review"
    );
    client.chat(prompt::build_messages(diff)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DIFF: &str = "diff --git a/app.py b/app.py\n@@ -1 +1,2 @@\n print('a')\n+eval(input())\n";

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            base_url: Some(server.uri()),
            ..LlmConfig::default()
        }
    }

    fn unset_key_config() -> LlmConfig {
        LlmConfig {
            api_key_env: "DIFFWARDEN_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn empty_diff_reports_no_changes() {
        let report = review_diff(&unset_key_config(), "  \n\t\n").await;
        assert_eq!(report.status, ReportStatus::NoChanges);
        assert_eq!(report.body, "No changes detected.");
    }

    #[tokio::test]
    async fn missing_key_reports_warning_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: Some(server.uri()),
            ..unset_key_config()
        };
        let report = review_diff(&config, DIFF).await;
        assert_eq!(report.status, ReportStatus::MissingApiKey);
        assert!(report.body.starts_with(WARNING_PREFIX));
        assert!(report
            .body
            .contains("DIFFWARDEN_TEST_KEY_THAT_IS_NEVER_SET is not set"));
    }

    #[tokio::test]
    async fn successful_review_is_verbatim() {
        let server = MockServer::start().await;
        let answer = "# Review\n\n## Security vulnerabilities\n- `eval(input())` executes arbitrary code.\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": answer}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = review_diff(&config_for(&server), DIFF).await;
        assert_eq!(report.status, ReportStatus::Reviewed);
        assert_eq!(report.body, answer);
    }

    #[tokio::test]
    async fn rate_limit_degrades_to_warning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached"}
            })))
            .mount(&server)
            .await;

        let report = review_diff(&config_for(&server), DIFF).await;
        assert_eq!(report.status, ReportStatus::RateLimited);
        assert!(report.body.starts_with(WARNING_PREFIX));
        assert!(report.body.contains("rate limit was exceeded"));
        assert!(report.body.contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn server_error_degrades_to_api_warning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let report = review_diff(&config_for(&server), DIFF).await;
        assert_eq!(report.status, ReportStatus::ApiError);
        assert!(report.body.contains("503"));
        assert!(report.body.contains("overloaded"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_failed() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            // Reserved port on loopback, nothing listens there.
            base_url: Some("http://127.0.0.1:9".into()),
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let report = review_diff(&config, DIFF).await;
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.body.starts_with(WARNING_PREFIX));
    }

    #[test]
    fn save_overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/ai_review_report.txt");

        Report::reviewed("first run").save(&path).unwrap();
        Report::no_changes().save(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), NO_CHANGES);
    }

    #[test]
    fn git_errors_become_failed_reports() {
        let err = DiffwardenError::Git("HEAD has no parent commit".into());
        let report = Report::from_error(&err);
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(
            report.body,
            "WARNING: AI review failed unexpectedly. git error: HEAD has no parent commit"
        );
    }

    #[test]
    fn report_displays_body() {
        let report = Report::reviewed("looks good");
        assert_eq!(report.to_string(), "looks good");
        assert!(!report.is_degraded());
    }
}
