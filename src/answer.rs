//! Answer synthesis from a retrieval context.

use std::sync::Arc;

use tracing::debug;

use crate::integrations::CompletionClient;
use crate::retriever::RetrievalContext;
use crate::Result;

pub const NO_CONTEXT: &str = "No relevant information found.";

pub struct AnswerGenerator {
    llm: Arc<dyn CompletionClient>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// System prompt carrying the route and the joined context.
    pub fn system_prompt(context: &RetrievalContext) -> String {
        let text = context.joined_text();
        let text = if text.trim().is_empty() {
            NO_CONTEXT
        } else {
            text.as_str()
        };

        format!(
            "You are an intelligent assistant using {} retrieval strategy. \
             Use the provided context to answer the user's question.\n\nContext:\n{}",
            context.effective_route, text
        )
    }

    pub async fn generate(&self, question: &str, context: &RetrievalContext) -> Result<String> {
        let system = Self::system_prompt(context);
        debug!("Answer prompt: {} chars of system context", system.len());
        self.llm.complete(&system, question).await
    }
}
