//! # crudmap normalize
//!
//! Turns free-text CRUD descriptions ("the billing svc appends checkout totals to the
//! ledger") into structured [`CrudAction`]s.
//!
//! Two implementations of [`NormalizeStage`] ship here:
//!
//! - [`Normalizer`]: keyword tables and regex heuristics, fully deterministic
//! - [`StructuredNormalizer`]: delegates to a structured-output model through
//!   [`StructuredOutputClient`] using a glossary-aware system prompt
//!
//! Both resolve aliases through a [`TermGlossary`]. Text that reaches the logs goes through
//! [`mask_pii`] first.

mod action;
mod error;
mod glossary;
mod normalizer;
mod prompt;
mod request;
mod safety;
mod stage;
mod structured;

pub use action::{CodeLocation, CrudAction, CrudActionList, CrudVerb};
pub use error::{NormalizeError, Result};
pub use glossary::{canonical_key, AliasMap, TermGlossary};
pub use normalizer::{sanitize_identifier, Normalizer};
pub use prompt::{
    build_normalization_system_prompt, default_few_shots, format_few_shot_block,
    format_glossary_block, NormalizationFewShot,
};
pub use request::NormalizationRequest;
pub use safety::{
    guard_message, guarded_messages, mask_pii, scrub_json, ChatMessage, DEFAULT_MASK_LENGTH,
    GUARD_SYSTEM_PROMPT,
};
pub use stage::NormalizeStage;
pub use structured::{
    crud_action_response_format, parse_action_list, StructuredNormalizer, StructuredOutputClient,
};
