//! Prompt assembly.
//!
//! A [`Prompt`] combines the conversation history of the active collection,
//! the retrieved document excerpts and the new question. [`Prompt::render`]
//! lays them out in a fixed template ending with the answering rules:
//! answer only from the document and the history, and say so when the
//! document does not contain the answer.
//!
//! ```text
//! {persona}
//! Here is the conversation so far:
//! {history}
//!
//! Here are excerpts from the document that may help:
//! {context}
//!
//! New question: {question}
//! {instructions}
//! ```

use serde::Serialize;

use crate::models::{HistoryEntry, ScoredChunk};

/// Opening line used when the configuration does not set a persona.
pub const DEFAULT_PERSONA: &str =
    "You are a helpful assistant answering questions about a document the user provided.";

/// Answering rules appended to every prompt.
pub const INSTRUCTIONS: &str = "Answer only on the basis of the document excerpts and the conversation history above.\n\
If the document does not contain the answer, say clearly that the document does not contain it; do not make one up.";

/// Rendered in place of the context section when nothing was retrieved.
pub const NO_CONTEXT: &str = "(No relevant passage was found in the document.)";

/// Rendered in place of the history section at the start of a conversation.
pub const NO_HISTORY: &str = "(No previous questions.)";

/// The variable sections of a model prompt, before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub persona: String,
    /// `User:` / `Assistant:` lines, oldest first. Empty for a new conversation.
    pub history: String,
    /// Retrieved chunk texts separated by blank lines. Empty when nothing
    /// was retrieved.
    pub context: String,
    pub question: String,
}

impl Prompt {
    pub fn assemble(
        persona: &str,
        history: &[HistoryEntry],
        hits: &[ScoredChunk],
        question: &str,
    ) -> Self {
        Self {
            persona: persona.to_string(),
            history: format_history(history),
            context: format_context(hits),
            question: question.to_string(),
        }
    }

    /// Render the prompt text sent to the model.
    pub fn render(&self) -> String {
        let history: &str = if self.history.is_empty() {
            NO_HISTORY
        } else {
            &self.history
        };
        let context: &str = if self.context.is_empty() {
            NO_CONTEXT
        } else {
            &self.context
        };
        format!(
            "{}\nHere is the conversation so far:\n{}\n\nHere are excerpts from the document that may help:\n{}\n\nNew question: {}\n{}\n",
            self.persona, history, context, self.question, INSTRUCTIONS
        )
    }
}

/// Serialize history as alternating `User:` / `Assistant:` lines.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("User: {}\nAssistant: {}", e.question, e.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Concatenate retrieved chunk texts in retrieval order, one blank line apart.
pub fn format_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
