use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use git2::{Repository, Signature};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("CI", "ci@example.com").unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// A checkout whose last commit adds a line to `app.py`.
fn two_commit_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "app.py", "print('hello')\n", "initial");
    commit_file(
        &repo,
        "app.py",
        "print('hello')\nimport os; os.system(input())\n",
        "run user input",
    );
    dir
}

fn review_command(repo: &Path, report: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_diffwarden"));
    cmd.arg("review")
        .arg("--repo")
        .arg(repo)
        .arg("--output")
        .arg(report)
        .current_dir(repo)
        .env_remove("RUST_LOG");
    cmd
}

async fn run(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn report_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("ai_review_report.txt")
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_review_writes_model_text() {
    let repo = two_commit_repo();
    let out = tempfile::tempdir().unwrap();
    let report = report_path(&out);
    let answer = "# Code Review\n\n## Security vulnerabilities\n- Command injection via os.system.\n";

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": answer}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = review_command(repo.path(), &report);
    cmd.arg("--base-url")
        .arg(server.uri())
        .env("OPENAI_API_KEY", "sk-test");
    let output = run(cmd).await;

    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&report).unwrap(), answer);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let sending = stdout
        .find("Sending diff to 127.0.0.1:")
        .expect("status line before the request");
    let completed = stdout
        .find("AI Review Completed! Report saved to")
        .expect("completion line");
    assert!(sending < completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_writes_warning_and_exits_zero() {
    let repo = two_commit_repo();
    let out = tempfile::tempdir().unwrap();
    let report = report_path(&out);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Rate limit reached for requests", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let mut cmd = review_command(repo.path(), &report);
    cmd.arg("--base-url")
        .arg(server.uri())
        .env("OPENAI_API_KEY", "sk-test");
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0));
    let written = std::fs::read_to_string(&report).unwrap();
    assert!(written.starts_with("WARNING:"));
    assert!(written.contains("rate limit was exceeded"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sending diff to"));
    assert!(stdout.contains("rate limit was exceeded"));
    assert!(stdout.contains("Report saved to"));
    assert!(!stdout.contains("Completed!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_key_writes_warning_without_calling_api() {
    let repo = two_commit_repo();
    let out = tempfile::tempdir().unwrap();
    let report = report_path(&out);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cmd = review_command(repo.path(), &report);
    cmd.arg("--base-url")
        .arg(server.uri())
        .env_remove("OPENAI_API_KEY");
    let output = run(cmd).await;

    assert!(output.status.success());
    let written = std::fs::read_to_string(&report).unwrap();
    assert_eq!(
        written,
        "WARNING: OPENAI_API_KEY is not set. Skipping AI code review."
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Sending diff to"));
}

#[test]
fn non_repository_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("ai_review_report.txt");

    let output = review_command(dir.path(), &report).output().unwrap();

    assert!(output.status.success());
    let written = std::fs::read_to_string(&report).unwrap();
    assert!(written.starts_with("WARNING: AI review failed unexpectedly."));
}

#[test]
fn single_commit_repository_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "README.md", "# demo\n", "initial");
    let out = tempfile::tempdir().unwrap();
    let report = report_path(&out);

    let output = review_command(dir.path(), &report).output().unwrap();

    assert!(output.status.success());
    let written = std::fs::read_to_string(&report).unwrap();
    assert!(written.contains("at least two commits"));
}

#[test]
fn empty_commit_reports_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "a.txt", "same\n", "initial");
    commit_file(&repo, "a.txt", "same\n", "no-op");
    let out = tempfile::tempdir().unwrap();
    let report = report_path(&out);

    let output = review_command(dir.path(), &report)
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        std::fs::read_to_string(&report).unwrap(),
        "No changes detected."
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Sending diff to"));
    assert!(stdout.contains("AI Review Completed!"));
}

#[test]
fn broken_config_file_does_not_fail_the_review() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".diffwarden.toml"), "{{not toml").unwrap();
    let report = dir.path().join("ai_review_report.txt");

    let output = review_command(dir.path(), &report).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("WARNING: ignoring configuration"));
    assert!(report.exists());
}
