use std::path::PathBuf;

/// Errors that can occur across diffwarden.
///
/// Library crates return this type directly; the binary renders it through
/// `miette` at the boundary. The review path never surfaces it to the user:
/// every variant is folded into a warning report instead.
///
/// # Examples
///
/// ```
/// use diffwarden_core::DiffwardenError;
///
/// let err = DiffwardenError::Config("missing model".into());
/// assert!(err.to_string().contains("missing model"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DiffwardenError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(diffwarden::io))]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(diffwarden::config))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(
        code(diffwarden::git),
        help("run from the root of a checkout that has at least two commits")
    )]
    Git(String),

    /// No credential for the LLM provider. Holds the environment variable name.
    #[error("{0} is not set")]
    #[diagnostic(
        code(diffwarden::missing_api_key),
        help("export the variable or set api_key under [llm] in .diffwarden.toml")
    )]
    MissingApiKey(String),

    /// The provider answered 429 Too Many Requests.
    #[error("rate limit exceeded: {0}")]
    #[diagnostic(code(diffwarden::rate_limited))]
    RateLimited(String),

    /// The provider answered with a non-success status other than 429.
    #[error("LLM API error {status}: {body}")]
    #[diagnostic(code(diffwarden::api))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Transport or response decoding failure talking to the LLM.
    #[error("LLM error: {0}")]
    #[diagnostic(code(diffwarden::llm))]
    Llm(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(diffwarden::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(diffwarden::file_not_found))]
    FileNotFound(PathBuf),
}
