//! Reduces a fragment stream to one feedback document.
//!
//! [`StreamingResponseAggregator`] is created empty for each evaluation,
//! fed fragments strictly in arrival order, and consumed by
//! [`finish`](StreamingResponseAggregator::finish), which trims the text and
//! freezes it into an [`AggregatedResult`].

use futures::{Stream, StreamExt};

use crate::llm::endpoint::LlmError;
use crate::llm::fragment::{FragmentDelta, ResponseFragment, Usage};

/// Final feedback text plus the usage record, if the stream reported one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Per-call accumulator. Not shared, not reused.
///
/// ```rust
/// use ielts_speaking_eval::llm::{FragmentDelta, ResponseFragment, StreamingResponseAggregator};
///
/// let mut agg = StreamingResponseAggregator::new();
/// agg.push(ResponseFragment::Delta(FragmentDelta::Text(" Band ".into())));
/// agg.push(ResponseFragment::Delta(FragmentDelta::Text("6.5\n".into())));
/// assert_eq!(agg.finish().text, "Band 6.5");
/// ```
#[derive(Debug, Default)]
pub struct StreamingResponseAggregator {
    text: String,
    usage: Option<Usage>,
    fragments: usize,
}

impl StreamingResponseAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the accumulator.
    pub fn push(&mut self, fragment: ResponseFragment) {
        self.fragments += 1;
        match fragment {
            ResponseFragment::Metadata { usage } => {
                if usage.is_some() {
                    self.usage = usage;
                }
            }
            ResponseFragment::Delta(FragmentDelta::Items(items)) => {
                for item in &items {
                    if let Some(text) = item.as_text() {
                        self.text.push_str(text);
                    }
                }
            }
            ResponseFragment::Delta(FragmentDelta::OutputText(text))
            | ResponseFragment::Delta(FragmentDelta::Text(text)) => self.text.push_str(&text),
            ResponseFragment::Delta(FragmentDelta::Empty) => {}
        }
    }

    /// Number of fragments seen so far.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Trim and freeze the accumulated text.
    pub fn finish(self) -> AggregatedResult {
        AggregatedResult {
            text: self.text.trim().to_string(),
            usage: self.usage,
        }
    }

    /// Drain `stream` to completion.
    ///
    /// The first error aborts consumption and drops everything accumulated
    /// so far.
    pub async fn consume<S>(mut self, stream: S) -> Result<AggregatedResult, LlmError>
    where
        S: Stream<Item = Result<ResponseFragment, LlmError>>,
    {
        futures::pin_mut!(stream);
        while let Some(fragment) = stream.next().await {
            self.push(fragment?);
        }
        log::debug!("Stream complete after {} fragments", self.fragments);
        Ok(self.finish())
    }
}
