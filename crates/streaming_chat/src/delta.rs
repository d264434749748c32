use crate::chat_completions::{ChatCompletionChunk, FinishReason};
use crate::finish_reason::apply_policy;
use crate::{Error, Result};

/// One incremental unit of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatDelta {
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatDelta {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: None,
        }
    }

    pub fn finished(finish_reason: FinishReason) -> Self {
        Self {
            content: None,
            finish_reason: Some(finish_reason),
        }
    }

    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = Some(finish_reason);
        self
    }

    /// True when the delta carries neither a fragment nor a terminal signal.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty) && self.finish_reason.is_none()
    }
}

impl From<ChatCompletionChunk> for ChatDelta {
    fn from(chunk: ChatCompletionChunk) -> Self {
        chunk
            .choices
            .into_iter()
            .find(|choice| choice.index == 0)
            .map(|choice| ChatDelta {
                content: choice.delta.content,
                finish_reason: choice.finish_reason,
            })
            .unwrap_or_default()
    }
}

/// Reduces the deltas of a single turn into its final text.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    buffer: String,
    finish_reason: Option<FinishReason>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `delta` and returns the fragment it appended, if any.
    ///
    /// A second terminal reason fails with [`Error::ProtocolViolationError`]
    /// and leaves the accumulator untouched.
    pub fn observe<'a>(&mut self, delta: &'a ChatDelta) -> Result<Option<&'a str>> {
        if let (Some(previous), Some(next)) = (self.finish_reason, delta.finish_reason) {
            return Err(Error::ProtocolViolationError(format!(
                "received finish reason {next:?} after the turn already finished with {previous:?}"
            )));
        }

        let fragment = delta
            .content
            .as_deref()
            .filter(|fragment| !fragment.is_empty());
        if let Some(fragment) = fragment {
            self.buffer.push_str(fragment);
        }
        if delta.finish_reason.is_some() {
            self.finish_reason = delta.finish_reason;
        }

        Ok(fragment)
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Consumes the accumulator once the stream has ended. A stream that
    /// ended without a terminal reason counts as [`FinishReason::Stop`].
    pub fn finalize(self) -> String {
        apply_policy(
            self.buffer,
            Some(self.finish_reason.unwrap_or(FinishReason::Stop)),
        )
    }
}
