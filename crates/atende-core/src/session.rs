//! Per-user conversation state and the turn loop for both assistants.
//!
//! A session owns its history (and, for the commercial agent, the lead record).
//! Each turn runs its service calls one after another; `&mut self` keeps turns
//! of one session from overlapping.

use tracing::warn;

use crate::history::History;
use crate::lead::{FactAccumulator, LeadRecord, MergeError};
use crate::responder::{Context, Responder, ResponseError};
use crate::retriever::{RetrieveError, Retriever};
use crate::service::{EmbeddingService, GenerationService};

/// Prefix of the user-visible text for a failed turn.
pub const ERROR_PREFIX: &str = "Erro ao obter resposta:";

/// FAQ consultant: retrieve the closest answer, then phrase a reply around it.
pub struct FaqSession<'a, E, G> {
    retriever: Retriever<'a, E>,
    responder: Responder<G>,
    history: History,
}

impl<'a, E: EmbeddingService, G: GenerationService> FaqSession<'a, E, G> {
    pub fn new(retriever: Retriever<'a, E>, responder: Responder<G>) -> Self {
        Self {
            retriever,
            responder,
            history: History::new(),
        }
    }

    pub async fn turn(&mut self, user_input: &str) -> Result<String, ChatError> {
        let answer = self.retriever.retrieve(user_input).await?;
        let reply = self
            .responder
            .respond(user_input, Context::Retrieved(answer), &mut self.history)
            .await?;
        Ok(reply)
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

/// Outcome of a commercial-agent turn.
#[derive(Debug)]
pub struct LeadTurn {
    pub reply: String,
    pub facts: FactUpdate,
}

/// What happened to the lead record during a turn.
#[derive(Debug)]
pub enum FactUpdate {
    /// Merge applied; number of keys added or changed.
    Merged(usize),
    /// Merge failed; the previous record was kept.
    Kept(MergeError),
}

/// Commercial agent: reply using the known lead facts, then merge the user's answer into them.
pub struct LeadSession<G, M> {
    responder: Responder<G>,
    accumulator: FactAccumulator<M>,
    history: History,
    record: LeadRecord,
}

impl<G: GenerationService, M: GenerationService> LeadSession<G, M> {
    /// `greeting`, when given, is the first assistant turn and the first question merged against.
    pub fn new(responder: Responder<G>, accumulator: FactAccumulator<M>, greeting: Option<&str>) -> Self {
        Self {
            responder,
            accumulator,
            history: greeting.map(History::with_greeting).unwrap_or_default(),
            record: LeadRecord::new(),
        }
    }

    /// Reply first, then merge. The merge pairs the user's input with the question
    /// the assistant asked just before it. A failed reply skips the merge so the
    /// answer can be sent again.
    pub async fn turn(&mut self, user_input: &str) -> Result<LeadTurn, ChatError> {
        let question = self.history.last_prompt_to_user().unwrap_or_default().to_string();
        let reply = self
            .responder
            .respond(user_input, Context::Lead(&self.record), &mut self.history)
            .await?;
        let facts = match self.accumulator.merge(&mut self.record, &question, user_input).await {
            Ok(changed) => FactUpdate::Merged(changed),
            Err(e) => {
                warn!(error = %e, "lead facts not updated this turn");
                FactUpdate::Kept(e)
            }
        };
        Ok(LeadTurn { reply, facts })
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn record(&self) -> &LeadRecord {
        &self.record
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrieveError),
    #[error("reply failed: {0}")]
    Response(#[from] ResponseError),
}

impl ChatError {
    /// Text to show in place of a reply.
    pub fn user_message(&self) -> String {
        format!("{} {}", ERROR_PREFIX, self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::corpus::{Corpus, CorpusEntry};
    use crate::history::Role;
    use crate::prompts::LEAD_GREETING;
    use crate::responder::ResponderOptions;
    use crate::store::VectorIndex;
    use crate::testing::{FakeEmbedder, FakeGenerator};

    #[tokio::test]
    async fn faq_turn_grounds_reply_on_retrieved_answer() {
        let corpus = Corpus::new(vec![CorpusEntry::new("Qual é o horário?", "Das 9h às 18h.")]).unwrap();
        let index = VectorIndex::from_vectors("fake", vec![vec![0.5, 0.5]]).unwrap();
        let embedder = FakeEmbedder::new().with_fallback_dims(2);
        let generator = FakeGenerator::new().reply("Abrimos das 9h às 18h.");
        let mut session = FaqSession::new(
            Retriever::new(&corpus, &index, &embedder).unwrap(),
            Responder::new(&generator, ResponderOptions::faq()),
        );

        let reply = session.turn("Que horas vocês abrem?").await.unwrap();

        assert_eq!(reply, "Abrimos das 9h às 18h.");
        assert!(generator.last_request()[1].content.contains("Das 9h às 18h."));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn faq_generation_failure_is_typed_and_prefixed() {
        let corpus = Corpus::new(vec![CorpusEntry::new("q", "a")]).unwrap();
        let index = VectorIndex::from_vectors("fake", vec![vec![1.0]]).unwrap();
        let embedder = FakeEmbedder::new().with_fallback_dims(1);
        let generator = FakeGenerator::new().fail("503");
        let mut session = FaqSession::new(
            Retriever::new(&corpus, &index, &embedder).unwrap(),
            Responder::new(&generator, ResponderOptions::faq()),
        );

        let err = session.turn("oi").await.unwrap_err();

        assert!(matches!(err, ChatError::Response(ResponseError::Generation(_))));
        assert!(err.user_message().starts_with(ERROR_PREFIX));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn lead_turn_merges_answer_against_greeting() {
        let replies = FakeGenerator::new().reply("Prazer, Ana! Qual a sua empresa?");
        let merges = FakeGenerator::new().reply(r#"{"nome": "Ana"}"#);
        let mut session = LeadSession::new(
            Responder::new(&replies, ResponderOptions::lead()),
            FactAccumulator::new(&merges),
            Some(LEAD_GREETING),
        );

        let turn = session.turn("Ana").await.unwrap();

        assert_eq!(turn.reply, "Prazer, Ana! Qual a sua empresa?");
        assert!(matches!(turn.facts, FactUpdate::Merged(1)));
        assert_eq!(session.record().get("nome"), Some(&json!("Ana")));
        assert!(merges.last_request()[1].content.contains(LEAD_GREETING));
        assert_eq!(session.history().turns()[0].role, Role::Assistant);
        assert_eq!(session.history().len(), 3);
    }

    #[tokio::test]
    async fn second_turn_sees_known_facts_and_previous_question() {
        let replies = FakeGenerator::new()
            .reply("Qual o setor da Acme?")
            .reply("Obrigado!");
        let merges = FakeGenerator::new()
            .reply(r#"{"empresa": "Acme"}"#)
            .reply(r#"{"empresa": "Acme", "setor": "industrial"}"#);
        let mut session = LeadSession::new(
            Responder::new(&replies, ResponderOptions::lead()),
            FactAccumulator::new(&merges),
            Some(LEAD_GREETING),
        );

        session.turn("Sou da Acme").await.unwrap();
        session.turn("Somos do setor industrial").await.unwrap();

        let last_reply_request = replies.last_request();
        assert!(last_reply_request
            .last()
            .unwrap()
            .content
            .contains(r#"{"empresa":"Acme"}"#));
        assert!(merges.last_request()[1].content.contains("Qual o setor da Acme?"));
        assert_eq!(session.record().get("empresa"), Some(&json!("Acme")));
        assert_eq!(session.record().get("setor"), Some(&json!("industrial")));
    }

    #[tokio::test]
    async fn failed_merge_keeps_record_and_still_replies() {
        let replies = FakeGenerator::new().reply("Qual o setor?").reply("Certo.");
        let merges = FakeGenerator::new()
            .reply(r#"{"empresa": "Acme"}"#)
            .fail("rate limited");
        let mut session = LeadSession::new(
            Responder::new(&replies, ResponderOptions::lead()),
            FactAccumulator::new(&merges),
            None,
        );

        session.turn("Acme").await.unwrap();
        let turn = session.turn("Indústria").await.unwrap();

        assert_eq!(turn.reply, "Certo.");
        assert!(matches!(turn.facts, FactUpdate::Kept(MergeError::Generation(_))));
        assert_eq!(session.record().len(), 1);
        assert_eq!(session.record().get("empresa"), Some(&json!("Acme")));
    }

    #[tokio::test]
    async fn failed_reply_skips_merge() {
        let replies = FakeGenerator::new().fail("down");
        let merges = FakeGenerator::new();
        let mut session = LeadSession::new(
            Responder::new(&replies, ResponderOptions::lead()),
            FactAccumulator::new(&merges),
            Some(LEAD_GREETING),
        );

        assert!(session.turn("Ana").await.is_err());
        assert!(merges.requests().is_empty());
        assert_eq!(session.history().len(), 1);
        assert!(session.record().is_empty());
    }
}
