use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use diffwarden_core::{DiffwardenConfig, CONFIG_FILE_NAME};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "diffwarden",
    version,
    about = "AI review of the latest commit for CI pipelines",
    long_about = "diffwarden sends the diff of the latest commit to an OpenAI-compatible\n\
                   chat-completion endpoint and saves the review to a report file.\n\
                   Failures never break the pipeline: they are written to the report as warnings.\n\n\
                   Examples:\n  \
                     diffwarden review                  Review HEAD~1..HEAD of the current repo\n  \
                     diffwarden review --output r.txt   Write the report somewhere else\n  \
                     diffwarden serve                   Start the deployment smoke-test server\n  \
                     diffwarden doctor                  Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .diffwarden.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Review the latest commit with AI and save the report
    #[command(long_about = "Review the latest commit with AI and save the report.\n\n\
        Computes the diff between HEAD~1 and HEAD, sends it to the configured model and\n\
        writes the answer to the report file. A missing API key, a rate limit or any other\n\
        failure is written to the report as a WARNING line. Always exits with status 0.\n\n\
        Examples:\n  diffwarden review\n  diffwarden review --repo path/to/checkout --output review.txt")]
    Review {
        /// Repository checkout to review (default: .)
        #[arg(long)]
        repo: Option<PathBuf>,
        /// Report file (default: ai_review_report.txt)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Model identifier (default: gpt-4o-mini)
        #[arg(long)]
        model: Option<String>,
        /// Base URL of an OpenAI-compatible API
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Serve the deployment smoke-test page
    #[command(long_about = "Serve the deployment smoke-test page.\n\n\
        Answers GET / with a static HTML fragment. Stops on Ctrl-C.\n\n\
        Examples:\n  diffwarden serve\n  diffwarden serve --host 127.0.0.1 --port 8080")]
    Serve {
        /// Interface to bind (default: 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (default: 5000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create a default .diffwarden.toml configuration file
    #[command(long_about = "Create a default .diffwarden.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .diffwarden.toml already exists.")]
    Init,
    /// Check your diffwarden setup and environment
    Doctor {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mdiffwarden\x1b[0m v{version} - AI review of the latest commit\n");
        println!("Commands:");
        println!("  \x1b[32mreview\x1b[0m   Review HEAD~1..HEAD and save the report");
        println!("  \x1b[32mserve\x1b[0m    Start the deployment smoke-test server");
        println!("  \x1b[32minit\x1b[0m     Create default configuration");
        println!("  \x1b[32mdoctor\x1b[0m   Check your setup and environment\n");
    } else {
        println!("diffwarden v{version} - AI review of the latest commit\n");
        println!("Commands:");
        println!("  review   Review HEAD~1..HEAD and save the report");
        println!("  serve    Start the deployment smoke-test server");
        println!("  init     Create default configuration");
        println!("  doctor   Check your setup and environment\n");
    }

    println!("Run 'diffwarden <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn,diffwarden_app=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> diffwarden_core::Result<DiffwardenConfig> {
    match explicit {
        Some(path) => DiffwardenConfig::from_file(path),
        None => DiffwardenConfig::discover(Path::new(".")),
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self, use_color: bool) -> &'static str {
        match (self.status, use_color) {
            ("pass", true) => "\x1b[32m\u{2713}\x1b[0m",
            ("fail", true) => "\x1b[31m\u{2717}\x1b[0m",
            (_, true) => "\x1b[33m~\x1b[0m",
            ("pass", false) => "\u{2713}",
            ("fail", false) => "\u{2717}",
            _ => "~",
        }
    }
}

fn run_doctor(
    config: &DiffwardenConfig,
    config_path: Option<&Path>,
    json: bool,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();
    let repo_path = &config.review.repo;

    // 1. Repository and commit depth
    match git2::Repository::open(repo_path) {
        Ok(repo) => {
            checks.push(CheckResult::pass(
                "git_repository",
                format!("found at {}", repo_path.display()),
            ));
            let depth = repo
                .head()
                .and_then(|h| h.peel_to_commit())
                .map(|c| c.parent_count());
            match depth {
                Ok(n) if n > 0 => {
                    checks.push(CheckResult::pass("commit_depth", "HEAD~1 is reachable"))
                }
                Ok(_) => checks.push(CheckResult::fail(
                    "commit_depth",
                    "HEAD has no parent commit",
                    "the review needs at least two commits (use fetch-depth: 2 in CI)",
                )),
                Err(e) => checks.push(CheckResult::fail(
                    "commit_depth",
                    format!("cannot resolve HEAD: {}", e.message()),
                    "commit something first",
                )),
            }
        }
        Err(_) => checks.push(CheckResult::fail(
            "git_repository",
            format!("{} is not a git repository", repo_path.display()),
            "run from the root of a checkout or set [review] repo",
        )),
    }

    // 2. Config file
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE_NAME));
    if path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{} not found, using defaults", path.display()),
        ));
    }

    // 3. Model and API key
    checks.push(CheckResult::info(
        "llm_endpoint",
        format!("{} at {}", config.llm.model, config.llm.base_url()),
    ));
    let env_var = &config.llm.api_key_env;
    if config.llm.resolve_api_key().is_some() {
        checks.push(CheckResult::pass("llm_api_key", "API key configured"));
    } else {
        checks.push(CheckResult::fail(
            "llm_api_key",
            format!("{env_var} not set"),
            format!("export {env_var}=... or set api_key in {CONFIG_FILE_NAME}"),
        ));
    }

    // 4. Report destination
    checks.push(CheckResult::info(
        "report_file",
        format!("{}", config.review.output.display()),
    ));

    if json {
        let version = env!("CARGO_PKG_VERSION");
        let value = serde_json::json!({
            "version": version,
            "checks": checks,
        });
        println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        return Ok(());
    }

    let version = env!("CARGO_PKG_VERSION");
    println!("diffwarden v{version} - Environment Check\n");
    for check in &checks {
        let label = check.name.replace('_', " ");
        println!("  {} {label:<16} {}", check.symbol(use_color), check.detail);
        if let Some(hint) = &check.hint {
            println!("    hint: {hint}");
        }
    }

    let passed = checks.iter().filter(|c| c.status == "pass").count();
    let failed = checks.iter().filter(|c| c.status == "fail").count();
    let info = checks.iter().filter(|c| c.status == "info").count();
    println!("\n{passed} checks passed, {failed} failed, {info} info");

    Ok(())
}

async fn run_review_command(config: DiffwardenConfig) {
    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) =
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
        {
            pb.set_style(style);
        }
        pb.set_message("Reviewing latest commit...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let outcome = diffwarden_review::pipeline::run_review(&config).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let output = outcome.output.display();
    if !outcome.saved() {
        let reason = outcome.save_error.as_deref().unwrap_or_default();
        if outcome.report.is_degraded() {
            println!("{}", outcome.report.body);
        }
        println!("WARNING: could not write report to {output}: {reason}");
    } else if outcome.report.is_degraded() {
        println!("{}", outcome.report.body);
        println!("Report saved to {output}");
    } else {
        println!("AI Review Completed! Report saved to {output}");
    }
}

const DEFAULT_CONFIG: &str = r#"# diffwarden configuration

[llm]
# model = "gpt-4o-mini"
# api_key_env = "OPENAI_API_KEY"
# base_url = "https://api.openai.com"
# temperature = 0.2
# timeout_secs = 120

[review]
# repo = "."
# output = "ai_review_report.txt"

[app]
# host = "0.0.0.0"
# port = 5000
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Review {
            repo,
            output,
            model,
            base_url,
        }) => {
            // A broken config degrades to defaults; review always exits 0.
            let mut config = match load_config(cli.config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unusable configuration");
                    println!("WARNING: ignoring configuration: {e}");
                    DiffwardenConfig::default()
                }
            };
            if let Some(repo) = repo {
                config.review.repo = repo;
            }
            if let Some(output) = output {
                config.review.output = output;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(base_url) = base_url {
                config.llm.base_url = Some(base_url);
            }
            run_review_command(config).await;
        }
        Some(Command::Serve { host, port }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.app.host = host;
            }
            if let Some(port) = port {
                config.app.port = port;
            }
            diffwarden_app::serve(&config.app).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!("{CONFIG_FILE_NAME} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
        }
        Some(Command::Doctor { json }) => {
            let config = load_config(cli.config.as_deref())?;
            run_doctor(&config, cli.config.as_deref(), json, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "diffwarden", &mut std::io::stdout());
        }
    }

    Ok(())
}
