//! Prompt construction for IELTS Speaking evaluation.
//!
//! [`PromptBuilder`] turns an [`AudioReference`] into an immutable
//! [`EvaluationRequest`]: one user message carrying exactly one
//! `input_audio` item followed by one `text` item with the instruction.
//! The instruction is the same for every clip (preamble + rubric), so it is
//! rendered once when the builder is created and shared between requests.
//!
//! The request serialises to the OpenAI-compatible chat-completions body via
//! [`EvaluationRequest::to_body`].

use std::sync::Arc;

use serde::Serialize;

use crate::llm::audio::AudioReference;
use crate::llm::rubric::Rubric;

// ---------------------------------------------------------------------------
// Instruction preamble
// ---------------------------------------------------------------------------

/// Frames the recording as an examiner/candidate conversation; only the
/// candidate is assessed.
const EVALUATION_PREAMBLE: &str = "\
The purpose of this evaluation is to assess the IELTS Speaking performance of the test taker based on the official band descriptors. Remember, the goal is a fair, descriptor-based scoring focused solely on the test taker's contributions to provide actionable feedback for improvement.

The provided audio is a conversation between the IELTS examiner and the test taker during the speaking test. Please focus exclusively on the test taker's speech for the evaluation\u{2014}ignore the examiner's contributions entirely and only analyze the candidate's responses, fluency, vocabulary, grammar, and pronunciation. Do not reference or score the examiner's speech in any way.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Audio payload of an `input_audio` content item.
///
/// `format` is omitted from the wire body when the locator had no extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputAudio {
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    InputAudio { input_audio: InputAudio },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

/// Full chat-completions request body, streaming enabled.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub modalities: [&'static str; 1],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

// ---------------------------------------------------------------------------
// EvaluationRequest
// ---------------------------------------------------------------------------

/// One clip plus the fixed instruction. Built once per evaluation call and
/// never mutated.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    audio: AudioReference,
    instruction: Arc<str>,
}

impl EvaluationRequest {
    pub fn audio(&self) -> &AudioReference {
        &self.audio
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The single user message: audio item first, instruction second.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: Role::User,
            content: vec![
                ContentItem::InputAudio {
                    input_audio: InputAudio {
                        data: self.audio.locator().to_string(),
                        format: self.audio.format().map(str::to_string),
                    },
                },
                ContentItem::Text {
                    text: self.instruction.to_string(),
                },
            ],
        }]
    }

    /// Streaming request body for `model`.
    pub fn to_body<'a>(&self, model: &'a str, include_usage: bool) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model,
            messages: self.messages(),
            modalities: ["text"],
            stream: true,
            stream_options: include_usage.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds evaluation requests around a fixed rubric.
///
/// # Example
/// ```rust
/// use ielts_speaking_eval::llm::{AudioReference, PromptBuilder, Rubric};
///
/// let builder = PromptBuilder::new(&Rubric::builtin());
/// let request = builder.build(AudioReference::new("https://example.org/part_1.mp3"));
/// assert_eq!(request.audio().format(), Some("mp3"));
/// assert!(request.instruction().contains("IELTS Speaking"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: Arc<str>,
}

impl PromptBuilder {
    pub fn new(rubric: &Rubric) -> Self {
        let instruction = format!("\n{EVALUATION_PREAMBLE}\n\n{}\n", rubric.text().trim_end());
        Self {
            instruction: Arc::from(instruction),
        }
    }

    /// Build the request for one clip.
    ///
    /// A locator without an extension still produces a request; the format
    /// tag is simply absent.
    pub fn build(&self, audio: AudioReference) -> EvaluationRequest {
        if audio.format().is_none() {
            log::warn!(
                "No file extension on {}; sending audio without a format tag",
                audio.locator()
            );
        }
        EvaluationRequest {
            audio,
            instruction: Arc::clone(&self.instruction),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&Rubric::builtin())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(locator: &str) -> EvaluationRequest {
        PromptBuilder::default().build(AudioReference::new(locator))
    }

    #[test]
    fn message_has_audio_then_text() {
        let request = build("https://example.org/part_1.mp3");
        let messages = request.messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content.len(), 2);
        assert!(matches!(
            &messages[0].content[0],
            ContentItem::InputAudio { input_audio }
                if input_audio.data == "https://example.org/part_1.mp3"
                    && input_audio.format.as_deref() == Some("mp3")
        ));
        assert!(matches!(&messages[0].content[1], ContentItem::Text { .. }));
    }

    #[test]
    fn instruction_embeds_preamble_and_rubric() {
        let request = build("clip.wav");
        let text = request.instruction();

        assert!(text.starts_with("\nThe purpose of this evaluation"));
        assert!(text.contains("focus exclusively on the test taker's speech"));
        assert!(text.contains("You are an IELTS Speaking examiner"));
        assert!(text.contains("================ BAND 0 ================="));
        assert!(text.ends_with("REFRAIN FROM BEING TOO GENEROUS WITH BAND SCORES.\n"));
    }

    #[test]
    fn instruction_is_identical_across_clips() {
        let builder = PromptBuilder::default();
        let a = builder.build(AudioReference::new("a.mp3"));
        let b = builder.build(AudioReference::new("https://host/b"));
        assert_eq!(a.instruction(), b.instruction());
    }

    #[test]
    fn custom_rubric_flows_into_instruction() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rubric.txt");
        std::fs::write(&path, "Band 9 only.\n\n").expect("write");
        let rubric = Rubric::load_from(&path).expect("load");

        let builder = PromptBuilder::new(&rubric);
        assert!(builder.instruction().ends_with("\n\nBand 9 only.\n"));
    }

    #[test]
    fn missing_extension_builds_without_format() {
        let request = build("https://host.example/recordings/latest");
        assert_eq!(request.audio().format(), None);

        let messages = request.messages();
        match &messages[0].content[0] {
            ContentItem::InputAudio { input_audio } => assert!(input_audio.format.is_none()),
            other => panic!("expected audio item, got {other:?}"),
        }
    }

    #[test]
    fn body_serialises_streaming_wire_format() {
        let request = build("https://example.org/part_2.mp3");
        let body = serde_json::to_value(request.to_body("qwen3-omni-flash", true)).expect("json");

        assert_eq!(body["model"], "qwen3-omni-flash");
        assert_eq!(body["modalities"], json!(["text"]));
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"], json!({ "include_usage": true }));

        let content = &body["messages"][0]["content"];
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(content[0]["type"], "input_audio");
        assert_eq!(
            content[0]["input_audio"],
            json!({ "data": "https://example.org/part_2.mp3", "format": "mp3" })
        );
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], request.instruction());
    }

    #[test]
    fn body_omits_format_field_when_absent() {
        let request = build("recording");
        let body = serde_json::to_value(request.to_body("m", true)).expect("json");
        let audio = &body["messages"][0]["content"][0]["input_audio"];

        assert_eq!(audio["data"], "recording");
        assert!(audio.get("format").is_none());
    }

    #[test]
    fn body_without_usage_drops_stream_options() {
        let request = build("a.mp3");
        let body = serde_json::to_value(request.to_body("m", false)).expect("json");
        assert!(body.get("stream_options").is_none());
    }
}
