//! `CompletionEndpoint` trait and the streaming `ApiEndpoint` implementation.
//!
//! `ApiEndpoint` posts to any OpenAI-compatible `/chat/completions` URL with
//! `stream: true` and turns the server-sent-event body into a stream of
//! typed [`ResponseFragment`]s. Connection details come from [`LlmConfig`];
//! nothing is hardcoded.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::fragment::ResponseFragment;
use crate::llm::prompt::EvaluationRequest;
use crate::llm::sse::{SseDecoder, SseEvent};

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while establishing or reading the stream.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A stream chunk could not be framed or parsed.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionEndpoint trait
// ---------------------------------------------------------------------------

/// Ordered stream of decoded fragments; the first `Err` ends it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<ResponseFragment, LlmError>> + Send>>;

/// A hosted chat-completions endpoint that delivers responses incrementally.
///
/// Implementors must be `Send + Sync` so they can be shared behind
/// `Arc<dyn CompletionEndpoint>`.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    /// Submit `request` to `model` and return the fragment stream.
    async fn stream(
        &self,
        request: &EvaluationRequest,
        model: &str,
    ) -> Result<FragmentStream, LlmError>;
}

// ---------------------------------------------------------------------------
// ApiEndpoint
// ---------------------------------------------------------------------------

/// Streams from an OpenAI-compatible `{base_url}/chat/completions`.
///
/// The `Authorization: Bearer …` header is attached only when a non-empty
/// key resolves from config or the configured environment variable.
pub struct ApiEndpoint {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl ApiEndpoint {
    /// Build an `ApiEndpoint` from application config.
    ///
    /// The client timeout covers the whole streamed response. A default
    /// client is used if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            log::warn!(
                "No API key configured (set llm.api_key or {}); sending unauthenticated requests",
                config.api_key_env
            );
        }

        Self {
            client,
            config: config.clone(),
            api_key,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionEndpoint for ApiEndpoint {
    async fn stream(
        &self,
        request: &EvaluationRequest,
        model: &str,
    ) -> Result<FragmentStream, LlmError> {
        let body = request.to_body(model, self.config.include_usage);

        let mut req = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(fragment_stream(response.bytes_stream()))
    }
}

// ---------------------------------------------------------------------------
// Byte stream → fragment stream
// ---------------------------------------------------------------------------

struct FrameState {
    chunks: BoxStream<'static, Result<Vec<u8>, LlmError>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<ResponseFragment, LlmError>>,
    finished: bool,
}

impl FrameState {
    fn ingest(&mut self, bytes: &[u8]) {
        match self.decoder.push(bytes) {
            Ok(events) => {
                for event in events {
                    if self.finished {
                        break;
                    }
                    self.enqueue(event);
                }
            }
            Err(e) => self.fail(e),
        }
        if self.decoder.is_done() {
            self.finished = true;
        }
    }

    fn flush(&mut self) {
        match self.decoder.finish() {
            Ok(Some(event)) => self.enqueue(event),
            Ok(None) => {}
            Err(e) => self.fail(e),
        }
        self.finished = true;
    }

    fn enqueue(&mut self, event: SseEvent) {
        match event {
            SseEvent::Data(payload) => match ResponseFragment::decode(&payload) {
                Ok(fragment) => self.pending.push_back(Ok(fragment)),
                Err(e) => self.fail(e),
            },
            SseEvent::Done => self.finished = true,
        }
    }

    fn fail(&mut self, e: LlmError) {
        self.pending.push_back(Err(e));
        self.finished = true;
    }
}

/// Frame an SSE byte stream into decoded fragments.
///
/// Ends at `[DONE]`, at the end of the body, or right after the first error.
pub fn fragment_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: Into<LlmError> + 'static,
{
    let chunks: BoxStream<'static, Result<Vec<u8>, LlmError>> = bytes
        .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(Into::into))
        .boxed();

    let state = FrameState {
        chunks,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(bytes)) => state.ingest(&bytes),
                Some(Err(e)) => state.fail(e),
                None => state.flush(),
            }
        }
    })
    .boxed()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
