//! Prompt templates and context assembly.
//!
//! The [`ContextAssembler`] joins ranked document content into a single
//! context block and renders it, together with the conversation history and
//! the new question, into the answer prompt.
//!
//! Grounding is a prompt-level contract: the default template instructs the
//! model to answer only from the supplied context and to reply with
//! [`FALLBACK_ANSWER`] otherwise. Nothing here checks that the model obeyed.

use crate::document::{ConversationTurn, RankedContext};
use crate::error::{RagError, Result};

/// The sentence the model is told to give when the context does not answer the question.
pub const FALLBACK_ANSWER: &str =
    "I don't have enough information to answer that based on the provided context.";

/// The default answer template with strict grounding instructions.
pub const GROUNDED_TEMPLATE: &str = r#"
Answer the question based solely on the provided context.
Do not use any external knowledge.

If the context is empty or insufficient, respond with:
"I don't have enough information to answer that based on the provided context."

Context:
{context}

Chat History:
{chat_history}

Question:
{question}

Answer:
"#;

/// Template used to turn a follow-up into a standalone question before retrieval.
pub const CONDENSE_QUESTION_TEMPLATE: &str = "Given the following conversation and a follow up \
question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

/// Separator placed between consecutive documents in the context block.
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// A named placeholder in a [`PromptTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Context,
    ChatHistory,
    Question,
}

impl Slot {
    const ALL: [Slot; 3] = [Slot::Context, Slot::ChatHistory, Slot::Question];

    fn placeholder(self) -> &'static str {
        match self {
            Slot::Context => "{context}",
            Slot::ChatHistory => "{chat_history}",
            Slot::Question => "{question}",
        }
    }
}

/// A text template with `{context}`, `{chat_history}` and `{question}` slots.
///
/// Any other braces are kept literally. Rendering is a single pass over the
/// template, so slot-like text inside substituted values is never expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn has_slot(&self, slot: Slot) -> bool {
        self.text.contains(slot.placeholder())
    }

    /// Render the template, taking each slot's value from `value`.
    pub fn render<'a>(&self, value: impl Fn(Slot) -> &'a str) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match Slot::ALL.iter().find(|slot| tail.starts_with(slot.placeholder())) {
                Some(slot) => {
                    out.push_str(value(*slot));
                    rest = &tail[slot.placeholder().len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(GROUNDED_TEMPLATE)
    }
}

/// Join document content in rank order, separated by a blank line.
///
/// An empty context yields the empty string.
pub fn render_context(ranked: &RankedContext) -> String {
    ranked.iter().map(|doc| doc.content.as_str()).collect::<Vec<_>>().join(DOCUMENT_SEPARATOR)
}

/// Render turns oldest first as alternating `Human:` / `Assistant:` lines.
pub fn render_chat_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the prompt asking the model to condense `question` given `history`.
pub fn condense_question_prompt(history: &[ConversationTurn], question: &str) -> String {
    let chat_history = render_chat_history(history);
    PromptTemplate::new(CONDENSE_QUESTION_TEMPLATE).render(|slot| match slot {
        Slot::ChatHistory => chat_history.as_str(),
        Slot::Question => question,
        Slot::Context => "",
    })
}

/// Builds the answer prompt from ranked context, history and the new question.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    template: PromptTemplate,
}

impl ContextAssembler {
    /// Create an assembler using [`GROUNDED_TEMPLATE`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler with a custom template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the template lacks any of the
    /// `{context}`, `{chat_history}` or `{question}` slots.
    pub fn with_template(template: PromptTemplate) -> Result<Self> {
        if let Some(missing) = Slot::ALL.iter().find(|slot| !template.has_slot(**slot)) {
            return Err(RagError::ConfigError(format!(
                "prompt template is missing the {} slot",
                missing.placeholder()
            )));
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Render the answer prompt.
    ///
    /// An empty `ranked` still renders, with an empty context slot; the
    /// fallback answer is left to the model.
    pub fn assemble(
        &self,
        ranked: &RankedContext,
        history: &[ConversationTurn],
        question: &str,
    ) -> String {
        let context = render_context(ranked);
        let chat_history = render_chat_history(history);
        self.template.render(|slot| match slot {
            Slot::Context => context.as_str(),
            Slot::ChatHistory => chat_history.as_str(),
            Slot::Question => question,
        })
    }
}
