use crate::llm::{ChatMessage, Role};

const SYSTEM_PROMPT: &str = "You are an expert code reviewer.";

const REVIEW_PROMPT_HEAD: &str = "\
You are a senior software engineer. Review the following code diff and identify:
- Bugs
- Security vulnerabilities
- Improvements
- Best practices
- Any risky patterns

Code Diff:
";

const REVIEW_PROMPT_TAIL: &str = "\n\nProvide a structured report with clear headings.";

/// Build the system prompt for the code review LLM.
///
/// # Examples
///
/// ```
/// use diffwarden_review::prompt::build_system_prompt;
///
/// assert_eq!(build_system_prompt(), "You are an expert code reviewer.");
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt embedding the diff to review.
///
/// # Examples
///
/// ```
/// use diffwarden_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("+new line");
/// assert!(prompt.contains("Code Diff:\n+new line"));
/// ```
pub fn build_review_prompt(diff: &str) -> String {
    format!("{REVIEW_PROMPT_HEAD}{diff}{REVIEW_PROMPT_TAIL}")
}

/// The `[system, user]` message pair sent for a review.
pub fn build_messages(diff: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: build_system_prompt(),
        },
        ChatMessage {
            role: Role::User,
            content: build_review_prompt(diff),
        },
    ]
}
