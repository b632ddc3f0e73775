//! Reply generation: persona + windowed history + final user turn with context.
//!
//! History only grows on success, by exactly two turns (user, then assistant).

use tracing::debug;

use crate::config::Config;
use crate::history::{History, HistoryWindow, Role, Turn};
use crate::lead::LeadRecord;
use crate::prompts;
use crate::service::{GenerationService, ServiceError};

/// What the final user turn is grounded on.
#[derive(Debug, Clone, Copy)]
pub enum Context<'a> {
    /// Answer text of the retrieved corpus entry.
    Retrieved(&'a str),
    /// Facts already known about the lead, so the model doesn't ask again.
    Lead(&'a LeadRecord),
}

impl Context<'_> {
    fn compose(&self, user_input: &str) -> String {
        match self {
            Context::Retrieved(answer) => prompts::faq_turn(user_input, answer),
            Context::Lead(record) => prompts::lead_turn(user_input, &record.to_prompt_text()),
        }
    }
}

/// Options for one assistant variant.
#[derive(Debug, Clone)]
pub struct ResponderOptions {
    /// System instruction sent first on every request.
    pub persona: String,
    pub window: HistoryWindow,
    /// Role tag stored on assistant replies.
    pub reply_role: Role,
}

impl ResponderOptions {
    pub fn faq() -> Self {
        Self {
            persona: prompts::FAQ_PERSONA.to_string(),
            window: HistoryWindow::default(),
            reply_role: Role::Assistant,
        }
    }

    pub fn lead() -> Self {
        Self {
            persona: prompts::LEAD_PERSONA.to_string(),
            ..Self::faq()
        }
    }

    /// Take the history window and reply role from `config`.
    pub fn configured(self, config: &Config) -> Self {
        Self {
            window: config.history_window(),
            reply_role: config.assistant_role,
            ..self
        }
    }
}

pub struct Responder<G> {
    generator: G,
    options: ResponderOptions,
}

impl<G: GenerationService> Responder<G> {
    pub fn new(generator: G, options: ResponderOptions) -> Self {
        Self { generator, options }
    }

    /// The messages sent for `user_input` given the current history.
    pub fn request(&self, user_input: &str, context: Context<'_>, history: &History) -> Vec<Turn> {
        let prior = history.window(self.options.window);
        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(Turn::system(self.options.persona.clone()));
        messages.extend_from_slice(prior);
        messages.push(Turn::user(context.compose(user_input)));
        messages
    }

    /// Generate a reply. On success the raw input and the reply are appended to `history`.
    pub async fn respond(
        &self,
        user_input: &str,
        context: Context<'_>,
        history: &mut History,
    ) -> Result<String, ResponseError> {
        let messages = self.request(user_input, context, history);
        debug!(messages = messages.len(), "requesting reply");
        let reply = self.generator.complete(&messages).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(ResponseError::EmptyCompletion);
        }
        history.push(Turn::user(user_input));
        history.push(Turn::new(self.options.reply_role, reply));
        Ok(reply.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("generation error: {0}")]
    Generation(#[from] ServiceError),
    #[error("generation service returned an empty reply")]
    EmptyCompletion,
}
