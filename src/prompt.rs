//! Prompt assembly: documents plus transcript become the outbound message
//! sequence for the completion API.

use crate::models::{ChatTurn, RetrievedDocument, Role};

/// Exact refusal sentence the assistant is instructed to use when the
/// documents do not contain the answer.
pub const REFUSAL_PHRASE: &str = "I cannot answer that from the provided documents.";

/// Built-in system-prompt template. `{documents}` receives the rendered
/// document block; `{history}` is kept for templates that inline prior
/// turns as text (the default sends history as separate messages, so the
/// slot renders empty).
pub fn default_template() -> String {
    format!(
        "You are a health information assistant. Your task is to inform. Based on the \
         documents below, answer a user who has no medical knowledge.\n\n\
         Documents:\n\
         {{documents}}\n\n\
         Instructions:\n\
         Use only the documents above to build your answer. If the information is not in \
         the documents, reply exactly: \"{REFUSAL_PHRASE}\" Be empathetic, polite and \
         reassuring. Never make a diagnosis and never prescribe medication. Keep the \
         answer short. Gently correct the user if they are mistaken. Explain medical \
         terms so that anyone, even a child, can understand them. Use plain language; \
         there is no need to refer the user to a health professional.{{history}}"
    )
}

/// An editable system-prompt template with `{documents}` and `{history}`
/// slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Fill the template slots. Pure: the same documents in the same
    /// order always produce the same bytes. `{documents}` is substituted
    /// last, so slot markers inside document text stay verbatim.
    pub fn render(&self, documents: &[RetrievedDocument], history: Option<&str>) -> String {
        self.template
            .replace("{history}", history.unwrap_or(""))
            .replace("{documents}", &render_document_block(documents))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(default_template())
    }
}

/// Render retrieved documents as a block of `Document N:` sections in
/// ranking order. Document text goes in verbatim, trailing newlines
/// included.
pub fn render_document_block(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return "(no matching documents were found)".to_string();
    }

    let blocks: Vec<String> = documents
        .iter()
        .map(|doc| {
            let mut block = match doc.metadata.section.as_deref() {
                Some(section) => {
                    format!("Document {}: {} ({})", doc.rank, doc.metadata.name, section)
                }
                None => format!("Document {}: {}", doc.rank, doc.metadata.name),
            };
            block.push('\n');
            block.push_str(&doc.content);
            block
        })
        .collect();
    blocks.join("\n\n")
}

/// Assemble the outbound messages: one system message first, then the
/// transcript's user and assistant turns in order. Client-supplied system
/// turns are dropped so exactly one system message reaches the model.
pub fn build_messages(system_prompt: String, transcript: &[ChatTurn]) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatTurn::new(Role::System, system_prompt));
    messages.extend(
        transcript
            .iter()
            .filter(|turn| turn.role != Role::System)
            .cloned(),
    );
    messages
}
