//! Named prompt templates with `{placeholder}` substitution.

use std::collections::HashMap;

use crate::error::{RagError, Result};

/// Template key for the summarization prompt. Expects `{text}`.
pub const SUMMARIZE_TEXT: &str = "summarize_text";
/// Template key for the retrieval-grounded answer prompt. Expects
/// `{question}` and `{context}`.
pub const RAG_CONTEXT: &str = "rag_context";

/// A library of named prompt templates.
///
/// The default library carries the two templates the pipeline uses,
/// [`SUMMARIZE_TEXT`] and [`RAG_CONTEXT`]. Callers can register their own
/// under new keys or replace the built-in texts.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<String, String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            SUMMARIZE_TEXT.to_string(),
            "Summarize the text below after the colon at the end. \
             Only use this text. \
             Do not add any information that is not part of the text. \
             Make the summary concise. Mirror the style of the input text. \
             Text to summarize: {text}"
                .to_string(),
        );
        templates.insert(
            RAG_CONTEXT.to_string(),
            "Answer the question using only the context below. \
             If the context does not contain the answer, say that you do not know. \
             Do not add any information that is not part of the context.\n\n\
             Context:\n{context}\n\n\
             Question: {question}"
                .to_string(),
        );
        Self { templates }
    }
}

impl PromptLibrary {
    /// The default library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under `key`, replacing any existing one.
    pub fn register(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Render the template registered under `key`, substituting every
    /// `{name}` placeholder with its value from `vars`.
    ///
    /// Placeholders without a matching variable are left in place; variables
    /// without a matching placeholder are ignored.
    ///
    /// # Errors
    /// Returns [`RagError::ConfigError`] when no template is registered
    /// under `key`. An unknown prompt key is a configuration mistake, not a
    /// runtime condition.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| RagError::ConfigError(format!("prompt template '{key}' not found")))?;
        let mut rendered = template.clone();
        for (name, value) in vars {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        Ok(rendered)
    }
}
