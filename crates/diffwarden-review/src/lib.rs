//! AI review of the latest commit.
//!
//! Provides the review path: prompt construction, the OpenAI-compatible
//! LLM client, reports with degraded-mode fallback, and the end-to-end
//! pipeline that writes the report file.

pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod report;
