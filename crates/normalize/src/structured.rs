use crate::action::CrudActionList;
use crate::error::{NormalizeError, Result};
use crate::glossary::TermGlossary;
use crate::prompt::{build_normalization_system_prompt, default_few_shots, NormalizationFewShot};
use crate::request::NormalizationRequest;
use crate::safety::{guarded_messages, mask_pii, ChatMessage, DEFAULT_MASK_LENGTH};
use crate::stage::NormalizeStage;
use serde_json::{json, Value};

const SCHEMA_NAME: &str = "CRUDActionList";

/// Model endpoint that answers a conversation with a JSON document.
///
/// Retries, timeouts and transport belong to the implementation.
pub trait StructuredOutputClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

impl<T: StructuredOutputClient + ?Sized> StructuredOutputClient for &T {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(messages)
    }
}

/// JSON Schema response format describing [`CrudActionList`].
pub fn crud_action_response_format() -> Value {
    let schema = schemars::schema_for!(CrudActionList);
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "schema": schema,
            "strict": true,
        },
    })
}

/// Normalization delegated to a structured-output model.
pub struct StructuredNormalizer<C> {
    client: C,
    glossary: TermGlossary,
    few_shots: Vec<NormalizationFewShot>,
}

impl<C: StructuredOutputClient> StructuredNormalizer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            glossary: TermGlossary::builtin(),
            few_shots: default_few_shots(),
        }
    }

    pub fn with_glossary(mut self, glossary: TermGlossary) -> Self {
        self.glossary = glossary;
        self
    }

    pub fn with_few_shots(mut self, few_shots: Vec<NormalizationFewShot>) -> Self {
        self.few_shots = few_shots;
        self
    }

    /// Conversation sent for `requests`: guard, system prompt, one user message each.
    pub fn build_messages(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<Vec<ChatMessage>> {
        let glossary = self.glossary.merge(glossary_overrides);
        let mut system = build_normalization_system_prompt(&glossary, &self.few_shots);
        if let Some(service) = default_service.filter(|s| !s.is_empty()) {
            system.push_str(&format!(
                "\nWhen a description names no service, use '{}'.",
                glossary.canonical_service(service)
            ));
        }

        let mut messages = vec![ChatMessage::system(system)];
        for request in requests {
            messages.push(ChatMessage::user(serde_json::to_string(request)?));
        }
        Ok(guarded_messages(messages))
    }
}

/// Parse and validate a model reply.
pub fn parse_action_list(raw: &str) -> Result<CrudActionList> {
    let actions: CrudActionList =
        serde_json::from_str(raw.trim()).map_err(|err| NormalizeError::StructuredOutput {
            reason: err.to_string(),
            raw_response: mask_pii(raw, DEFAULT_MASK_LENGTH),
        })?;
    actions
        .validate()
        .map_err(|err| NormalizeError::StructuredOutput {
            reason: err.to_string(),
            raw_response: mask_pii(raw, DEFAULT_MASK_LENGTH),
        })?;
    Ok(actions)
}

impl<C: StructuredOutputClient> NormalizeStage for StructuredNormalizer<C> {
    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList> {
        let messages = self.build_messages(requests, default_service, glossary_overrides)?;
        log::debug!(
            "Requesting structured normalization for {} descriptions",
            requests.len()
        );
        let raw = self.client.complete(&messages)?;
        let actions = parse_action_list(&raw)?;
        log::debug!("Model returned {} actions", actions.len());
        Ok(actions)
    }
}
