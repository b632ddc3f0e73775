//! Lead facts gathered across the commercial agent's conversation.
//!
//! [FactAccumulator] asks the generation service to fold a new answer into the
//! record, then validates the proposal and applies it with [LeadRecord::merge].
//! A rejected proposal leaves the previous record untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::history::Turn;
use crate::prompts;
use crate::service::{GenerationService, ServiceError};

/// String-keyed facts about a lead. Keys are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadRecord {
    facts: BTreeMap<String, Value>,
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object, tolerating code fences around it.
    pub fn parse(text: &str) -> Result<Self, MergeError> {
        let stripped = strip_fences(text);
        let value: Value = serde_json::from_str(stripped).map_err(|e| MergeError::Malformed(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self {
                facts: map.into_iter().collect(),
            }),
            other => Err(MergeError::Malformed(format!("expected a JSON object, got {other}"))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    /// Set a fact directly. Blank values are dropped like in [LeadRecord::merge].
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if let Some(value) = prune(value.into()) {
            self.facts.insert(key.into(), value);
        }
    }

    /// Apply `proposal` on top of this record: new keys are added, non-blank values
    /// refine old ones, and keys missing from the proposal are kept. Nested objects
    /// merge key by key under the same rule.
    /// Returns the number of top-level keys added or changed.
    pub fn merge(&mut self, proposal: LeadRecord) -> usize {
        let mut changed = 0;
        for (key, value) in proposal.facts {
            let updated = match self.facts.get_mut(&key) {
                Some(current) => refine(current, value),
                None => match prune(value) {
                    Some(value) => {
                        self.facts.insert(key, value);
                        true
                    }
                    None => false,
                },
            };
            if updated {
                changed += 1;
            }
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Compact JSON text used inside prompts.
    pub fn to_prompt_text(&self) -> String {
        serde_json::to_string(&self.facts).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Null, blank strings and empty containers carry no fact.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// `value` with blank members removed from objects, or `None` if nothing is left.
fn prune(value: Value) -> Option<Value> {
    let value = match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect(),
        ),
        other => other,
    };
    (!is_blank(&value)).then_some(value)
}

/// Fold `proposed` into `current`. Objects merge member by member; an object is
/// never replaced by a non-object. Returns whether `current` changed.
fn refine(current: &mut Value, proposed: Value) -> bool {
    let Some(proposed) = prune(proposed) else {
        return false;
    };
    match (current, proposed) {
        (Value::Object(current), Value::Object(proposed)) => {
            let mut changed = false;
            for (key, value) in proposed {
                match current.get_mut(&key) {
                    Some(slot) => changed |= refine(slot, value),
                    None => {
                        current.insert(key, value);
                        changed = true;
                    }
                }
            }
            changed
        }
        (Value::Object(_), _) => false,
        (current, proposed) => {
            if *current == proposed {
                false
            } else {
                *current = proposed;
                true
            }
        }
    }
}

/// Remove Markdown code fences (```json ... ```) the model may wrap around its output.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```JSON"))
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

/// Merges new user answers into a [LeadRecord] through the generation service.
pub struct FactAccumulator<G> {
    generator: G,
}

impl<G: GenerationService> FactAccumulator<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Fold `answer` (a reply to `question`) into `record`.
    ///
    /// On any error `record` is left as it was. Callers must not run two merges
    /// on the same record concurrently; `&mut` enforces that within a process.
    pub async fn merge(&self, record: &mut LeadRecord, question: &str, answer: &str) -> Result<usize, MergeError> {
        let messages = [
            Turn::system(prompts::MERGE_INSTRUCTION),
            Turn::user(prompts::merge_turn(&record.to_prompt_text(), question, answer)),
        ];
        let raw = self.generator.complete(&messages).await?;
        let proposal = LeadRecord::parse(&raw).inspect_err(|e| {
            warn!(error = %e, "merge output rejected, keeping previous lead record");
        })?;
        let changed = record.merge(proposal);
        debug!(changed, keys = record.len(), "lead record merged");
        Ok(changed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("generation error: {0}")]
    Generation(#[from] ServiceError),
    #[error("merge output is not a JSON object: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::history::Role;
    use crate::testing::FakeGenerator;

    fn acme() -> LeadRecord {
        let mut r = LeadRecord::new();
        r.insert("empresa", "Acme");
        r
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(matches!(LeadRecord::parse("[1, 2]"), Err(MergeError::Malformed(_))));
        assert!(matches!(LeadRecord::parse("Erro ao obter resposta"), Err(MergeError::Malformed(_))));
    }

    #[test]
    fn merge_never_drops_or_blanks_keys() {
        let mut r = acme();
        r.insert("setor", "indústria");
        let proposal = LeadRecord::parse(r#"{"setor": "industrial", "empresa": null, "porte": ""}"#).unwrap();

        assert_eq!(r.merge(proposal), 1);
        assert_eq!(r.get("empresa"), Some(&json!("Acme")));
        assert_eq!(r.get("setor"), Some(&json!("industrial")));
        assert_eq!(r.get("porte"), None);
    }

    #[test]
    fn empty_containers_and_partial_objects_do_not_erase_facts() {
        let mut r = LeadRecord::new();
        r.insert("setor", "industrial");
        r.insert("porte", json!(["médio"]));
        r.insert("contato", json!({"nome": "Ana", "email": "a@x.com"}));
        let proposal = LeadRecord::parse(
            r#"{"setor": [], "porte": {}, "contato": {"telefone": "123", "nome": null}}"#,
        )
        .unwrap();

        assert_eq!(r.merge(proposal), 1);
        assert_eq!(r.get("setor"), Some(&json!("industrial")));
        assert_eq!(r.get("porte"), Some(&json!(["médio"])));
        assert_eq!(
            r.get("contato"),
            Some(&json!({"nome": "Ana", "email": "a@x.com", "telefone": "123"}))
        );
    }

    #[test]
    fn object_fact_is_not_replaced_by_a_scalar() {
        let mut r = LeadRecord::new();
        r.insert("contato", json!({"nome": "Ana"}));
        let proposal = LeadRecord::parse(r#"{"contato": "Ana", "cargo": {"area": null}}"#).unwrap();

        assert_eq!(r.merge(proposal), 0);
        assert_eq!(r.get("contato"), Some(&json!({"nome": "Ana"})));
        assert_eq!(r.get("cargo"), None);
    }

    #[tokio::test]
    async fn merge_keeps_prior_fact_and_adds_new_one() {
        let generator = FakeGenerator::new().reply("```json\n{\"empresa\": \"Acme\", \"setor\": \"industrial\"}\n```");
        let acc = FactAccumulator::new(&generator);
        let mut record = acme();

        acc.merge(&mut record, "Qual o setor?", "Somos do setor industrial")
            .await
            .unwrap();

        assert_eq!(record.get("empresa"), Some(&json!("Acme")));
        assert_eq!(record.get("setor"), Some(&json!("industrial")));
    }

    #[tokio::test]
    async fn merge_keeps_keys_the_model_forgot() {
        let generator = FakeGenerator::new().reply(r#"{"nome": "Ana"}"#);
        let acc = FactAccumulator::new(&generator);
        let mut record = acme();

        acc.merge(&mut record, "Qual o seu nome?", "Ana").await.unwrap();

        assert_eq!(record.get("empresa"), Some(&json!("Acme")));
        assert_eq!(record.get("nome"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn request_carries_record_question_and_answer() {
        let generator = FakeGenerator::new().reply("{}");
        let acc = FactAccumulator::new(&generator);
        let mut record = acme();

        acc.merge(&mut record, "Qual o setor?", "Somos do setor industrial")
            .await
            .unwrap();

        let req = generator.last_request();
        assert_eq!(req.len(), 2);
        assert_eq!(req[0].role, Role::System);
        assert!(req[1].content.contains(r#"{"empresa":"Acme"}"#));
        assert!(req[1].content.contains("Qual o setor?"));
        assert!(req[1].content.contains("Somos do setor industrial"));
    }

    #[tokio::test]
    async fn malformed_output_keeps_previous_record() {
        let generator = FakeGenerator::new().reply("Claro! O lead é da Acme.");
        let acc = FactAccumulator::new(&generator);
        let mut record = acme();

        let err = acc.merge(&mut record, "q", "a").await.unwrap_err();
        assert!(matches!(err, MergeError::Malformed(_)));
        assert_eq!(record, acme());
    }

    #[tokio::test]
    async fn service_failure_keeps_previous_record() {
        let generator = FakeGenerator::new().fail("connection refused");
        let acc = FactAccumulator::new(&generator);
        let mut record = acme();

        let err = acc.merge(&mut record, "q", "a").await.unwrap_err();
        assert!(matches!(err, MergeError::Generation(_)));
        assert_eq!(record, acme());
    }
}
