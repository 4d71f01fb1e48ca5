//! Prompt rendering.
//!
//! ```text
//! {preamble}Context:
//! {fragment}{fragment}...
//!
//!  Q: {query}
//!  A:
//! ```

use crate::models::AssembledContext;

/// Instruction placed ahead of the context block.
pub const DEFAULT_PREAMBLE: &str = "Answer the question as truthfully as possible using the provided context, \
and if the answer is not contained within the text below, say \"I don't know.\"\n\n";

const CONTEXT_LABEL: &str = "Context:\n";

/// Fixed prompt structure with a configurable preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub preamble: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    pub fn render(&self, context: &AssembledContext, query: &str) -> String {
        let body_len: usize = context.fragments.iter().map(String::len).sum();
        let mut prompt = String::with_capacity(
            self.preamble.len() + CONTEXT_LABEL.len() + body_len + query.len() + 12,
        );
        prompt.push_str(&self.preamble);
        prompt.push_str(CONTEXT_LABEL);
        for fragment in &context.fragments {
            prompt.push_str(fragment);
        }
        prompt.push_str("\n\n Q: ");
        prompt.push_str(query);
        prompt.push_str("\n A:");
        prompt
    }
}
