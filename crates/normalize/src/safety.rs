use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default ceiling applied by [`mask_pii`] callers that have no better bound.
pub const DEFAULT_MASK_LENGTH: usize = 512;

const REDACTED: &str = "[redacted]";
const ELLIPSIS: char = '\u{2026}';

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email regex must compile")
});
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[ \-]?)?(?:\d[ \-]?){7,}\d\b").expect("phone regex must compile")
});
static LONG_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{9,}\b").expect("digit regex must compile"));
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z0-9]{24,}\b").expect("token regex must compile"));

/// Redact e-mails, phone numbers, long digit runs and token-like strings.
///
/// Output longer than `max_length` characters is cut and suffixed with `…`; zero disables
/// the cut.
pub fn mask_pii(text: &str, max_length: usize) -> String {
    let masked = EMAIL.replace_all(text, REDACTED);
    let masked = PHONE.replace_all(&masked, REDACTED);
    let masked = LONG_DIGITS.replace_all(&masked, REDACTED);
    let masked = TOKEN.replace_all(&masked, REDACTED).into_owned();

    if max_length > 0 && masked.chars().count() > max_length {
        let mut cut: String = masked.chars().take(max_length).collect();
        cut.push(ELLIPSIS);
        return cut;
    }
    masked
}

/// Mask every string nested inside a JSON value.
pub fn scrub_json(value: &Value, max_length: usize) -> Value {
    match value {
        Value::String(text) => Value::String(mask_pii(text, max_length)),
        Value::Array(items) => Value::Array(items.iter().map(|v| scrub_json(v, max_length)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), scrub_json(v, max_length)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Chat message exchanged with a structured-output model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub const GUARD_SYSTEM_PROMPT: &str = "Reply with JSON only. Prose, markdown and commentary are \
not allowed. The reply must match the supplied schema exactly.";

pub fn guard_message() -> ChatMessage {
    ChatMessage::system(GUARD_SYSTEM_PROMPT)
}

/// Prefix the JSON-only guard unless the conversation already starts with it.
pub fn guarded_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let guard = guard_message();
    if messages.first() == Some(&guard) {
        return messages;
    }
    let mut guarded = Vec::with_capacity(messages.len() + 1);
    guarded.push(guard);
    guarded.extend(messages);
    guarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn redacts_common_identifiers() {
        let text = "mail ops@example.com or call +1 415 555 0100, account 123456789012";
        let masked = mask_pii(text, DEFAULT_MASK_LENGTH);
        assert!(!masked.contains("ops@example.com"));
        assert!(!masked.contains("555"));
        assert!(!masked.contains("123456789012"));
        assert!(masked.starts_with("mail [redacted] or call"));
    }

    #[test]
    fn redacts_long_uppercase_tokens() {
        let masked = mask_pii("key AKIAABCDEFGHIJKLMNOPQRST used", 0);
        assert_eq!(masked, "key [redacted] used");
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let text = "OrderAPI inserts into billing_ledger";
        assert_eq!(mask_pii(text, DEFAULT_MASK_LENGTH), text);
    }

    #[test]
    fn truncates_on_character_boundaries() {
        assert_eq!(mask_pii("ééééé", 3), "ééé\u{2026}");
        assert_eq!(mask_pii("abc", 3), "abc");
    }

    #[test]
    fn scrubs_nested_strings() {
        let value = json!({"user": {"email": "a@b.io"}, "ids": ["x", 7]});
        let scrubbed = scrub_json(&value, DEFAULT_MASK_LENGTH);
        assert_eq!(scrubbed, json!({"user": {"email": "[redacted]"}, "ids": ["x", 7]}));
    }

    #[test]
    fn guard_is_added_once() {
        let once = guarded_messages(vec![ChatMessage::user("hi")]);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0], guard_message());

        let twice = guarded_messages(once.clone());
        assert_eq!(twice, once);
    }
}
