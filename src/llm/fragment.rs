//! Typed stream fragments.
//!
//! Each server-sent `data:` payload is decoded exactly once, at the
//! transport boundary, into a [`ResponseFragment`]. Providers disagree on the
//! delta shape: some send `content` as a list of `{text}` / `{data}` entries,
//! some as a plain string, some put text in a separate `output_text` field.
//! Decoding folds those into a closed set of variants so the aggregator can
//! match exhaustively instead of probing for fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::endpoint::LlmError;

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Token accounting reported by the terminal chunk.
///
/// Fields other than the three standard counters are kept in `extra`, as are
/// counters that are not unsigned integers (`12.0`, `"12"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<BTreeMap<String, Value>> for Usage {
    fn from(mut fields: BTreeMap<String, Value>) -> Self {
        let mut counter = |name: &str| {
            let value = fields.get(name).and_then(Value::as_u64)?;
            fields.remove(name);
            Some(value)
        };
        let prompt_tokens = counter("prompt_tokens");
        let completion_tokens = counter("completion_tokens");
        let total_tokens = counter("total_tokens");
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            extra: fields,
        }
    }
}

impl Usage {
    /// Usage from a raw `usage` value; anything but an object is dropped.
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from(map.into_iter().collect::<BTreeMap<_, _>>())),
            Value::Null => None,
            other => {
                log::debug!("Ignoring non-object usage: {other}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fragment variants
// ---------------------------------------------------------------------------

/// One entry of a list-shaped delta.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaItem {
    /// Mapping with a `text` key. Wins over `data` when both are present.
    Text(String),
    /// Mapping with a `data` key and no `text` key.
    Data(String),
    /// Bare string entry.
    Plain(String),
    /// Anything else; contributes nothing.
    Unrecognized,
}

impl DeltaItem {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DeltaItem::Text(s) | DeltaItem::Data(s) | DeltaItem::Plain(s) => Some(s),
            DeltaItem::Unrecognized => None,
        }
    }
}

/// Textual payload of a fragment that carries a choice.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentDelta {
    Items(Vec<DeltaItem>),
    OutputText(String),
    Text(String),
    Empty,
}

/// A decoded stream chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFragment {
    /// A choice delta.
    Delta(FragmentDelta),
    /// No choices at all: the terminal usage carrier (usage may be absent).
    Metadata { usage: Option<Usage> },
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    choices: Option<Vec<RawChoice>>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    delta: Option<RawDelta>,
}

#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    output_text: Option<String>,
}

impl ResponseFragment {
    /// Decode one `data:` payload.
    ///
    /// Only the first choice is read. Shape precedence is: non-empty list
    /// content, then a non-empty `output_text`, then string content.
    pub fn decode(payload: &str) -> Result<Self, LlmError> {
        let chunk: RawChunk = serde_json::from_str(payload)
            .map_err(|e| LlmError::Parse(format!("{e} in stream chunk: {payload}")))?;

        let Some(choice) = chunk.choices.and_then(|c| c.into_iter().next()) else {
            return Ok(ResponseFragment::Metadata {
                usage: chunk.usage.and_then(Usage::from_value),
            });
        };

        let delta = match choice.delta {
            Some(delta) => FragmentDelta::from_raw(delta),
            None => FragmentDelta::Empty,
        };
        Ok(ResponseFragment::Delta(delta))
    }
}

impl FragmentDelta {
    fn from_raw(raw: RawDelta) -> Self {
        if let Some(Value::Array(items)) = &raw.content {
            if !items.is_empty() {
                return FragmentDelta::Items(items.iter().map(DeltaItem::from_value).collect());
            }
        }
        if let Some(text) = raw.output_text.filter(|t| !t.is_empty()) {
            return FragmentDelta::OutputText(text);
        }
        match raw.content {
            Some(Value::String(text)) => FragmentDelta::Text(text),
            _ => FragmentDelta::Empty,
        }
    }
}

impl DeltaItem {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => DeltaItem::Plain(s.clone()),
            Value::Object(map) => {
                if let Some(text) = map.get("text") {
                    DeltaItem::Text(text.as_str().unwrap_or_default().to_string())
                } else if let Some(data) = map.get("data") {
                    DeltaItem::Data(data.as_str().unwrap_or_default().to_string())
                } else {
                    DeltaItem::Unrecognized
                }
            }
            _ => DeltaItem::Unrecognized,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(payload: &str) -> FragmentDelta {
        match ResponseFragment::decode(payload).expect("decode") {
            ResponseFragment::Delta(d) => d,
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn string_content_decodes_to_text() {
        let d = delta(r#"{"choices":[{"index":0,"delta":{"content":"Band 6"}}]}"#);
        assert_eq!(d, FragmentDelta::Text("Band 6".into()));
    }

    #[test]
    fn list_content_decodes_each_item() {
        let d = delta(
            r#"{"choices":[{"delta":{"content":[
                {"text":"he"},
                {"data":"ll"},
                "o",
                {"text":"!","data":"ignored"},
                {"audio":"xyz"},
                7
            ]}}]}"#,
        );
        assert_eq!(
            d,
            FragmentDelta::Items(vec![
                DeltaItem::Text("he".into()),
                DeltaItem::Data("ll".into()),
                DeltaItem::Plain("o".into()),
                DeltaItem::Text("!".into()),
                DeltaItem::Unrecognized,
                DeltaItem::Unrecognized,
            ])
        );
    }

    #[test]
    fn output_text_decodes_when_content_missing() {
        let d = delta(r#"{"choices":[{"delta":{"output_text":"Fluency"}}]}"#);
        assert_eq!(d, FragmentDelta::OutputText("Fluency".into()));
    }

    #[test]
    fn list_content_takes_precedence_over_output_text() {
        let d = delta(r#"{"choices":[{"delta":{"content":[{"text":"a"}],"output_text":"b"}}]}"#);
        assert_eq!(d, FragmentDelta::Items(vec![DeltaItem::Text("a".into())]));
    }

    #[test]
    fn output_text_takes_precedence_over_string_content() {
        let d = delta(r#"{"choices":[{"delta":{"content":"","output_text":"b"}}]}"#);
        assert_eq!(d, FragmentDelta::OutputText("b".into()));
    }

    #[test]
    fn role_only_delta_is_empty() {
        assert_eq!(
            delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            FragmentDelta::Empty
        );
        assert_eq!(
            delta(r#"{"choices":[{"delta":{"content":null}}]}"#),
            FragmentDelta::Empty
        );
        assert_eq!(
            delta(r#"{"choices":[{"finish_reason":"stop"}]}"#),
            FragmentDelta::Empty
        );
    }

    #[test]
    fn empty_choices_with_usage_is_metadata() {
        let fragment = ResponseFragment::decode(
            r#"{"choices":[],"usage":{"prompt_tokens":812,"completion_tokens":340,"total_tokens":1152,"prompt_tokens_details":{"audio_tokens":400}}}"#,
        )
        .expect("decode");

        let ResponseFragment::Metadata { usage: Some(usage) } = fragment else {
            panic!("expected metadata with usage");
        };
        assert_eq!(usage.prompt_tokens, Some(812));
        assert_eq!(usage.completion_tokens, Some(340));
        assert_eq!(usage.total_tokens, Some(1152));
        assert!(usage.extra.contains_key("prompt_tokens_details"));
    }

    #[test]
    fn missing_choices_without_usage_is_bare_metadata() {
        assert_eq!(
            ResponseFragment::decode(r#"{"id":"chatcmpl-1"}"#).expect("decode"),
            ResponseFragment::Metadata { usage: None }
        );
        assert_eq!(
            ResponseFragment::decode(r#"{"choices":null,"usage":null}"#).expect("decode"),
            ResponseFragment::Metadata { usage: None }
        );
    }

    #[test]
    fn non_standard_usage_fields_are_kept() {
        let fragment = ResponseFragment::decode(r#"{"choices":[],"usage":{"tokens":42}}"#)
            .expect("decode");
        let ResponseFragment::Metadata { usage: Some(usage) } = fragment else {
            panic!("expected usage");
        };
        assert_eq!(usage.extra.get("tokens"), Some(&serde_json::json!(42)));
        assert_eq!(usage.total_tokens, None);
    }

    #[test]
    fn ill_typed_counters_are_kept_as_extra() {
        let fragment = ResponseFragment::decode(
            r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":"2","total_tokens":12.0}}"#,
        )
        .expect("decode");
        let ResponseFragment::Metadata { usage: Some(usage) } = fragment else {
            panic!("expected usage");
        };
        assert_eq!(usage.prompt_tokens, Some(10));
        assert_eq!(usage.completion_tokens, None);
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.extra.get("completion_tokens"), Some(&serde_json::json!("2")));
        assert_eq!(usage.extra.get("total_tokens"), Some(&serde_json::json!(12.0)));
        assert!(!usage.extra.contains_key("prompt_tokens"));
    }

    #[test]
    fn non_object_usage_is_dropped() {
        assert_eq!(
            ResponseFragment::decode(r#"{"choices":[],"usage":"n/a"}"#).expect("decode"),
            ResponseFragment::Metadata { usage: None }
        );
    }

    #[test]
    fn empty_list_content_falls_through_to_output_text() {
        let d = delta(r#"{"choices":[{"delta":{"content":[],"output_text":"Coherence"}}]}"#);
        assert_eq!(d, FragmentDelta::OutputText("Coherence".into()));

        assert_eq!(
            delta(r#"{"choices":[{"delta":{"content":[]}}]}"#),
            FragmentDelta::Empty
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ResponseFragment::decode("{not json").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }
}
