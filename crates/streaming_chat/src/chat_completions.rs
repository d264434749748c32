use std::pin::Pin;

use crate::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use dyn_clone::DynClone;
use futures::Stream;
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    role: Role,
    content: String,
}

impl ChatCompletionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(pattern = "mutable")]
#[builder(setter(into, strip_option))]
#[builder(derive(Debug))]
pub struct ChatCompletionRequest {
    /// Model name for OpenAI, deployment name for Azure OpenAI.
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    #[builder(default = "None")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[builder(default = "None")]
    #[serde(skip)]
    pub cancellation_token: Option<CancellationToken>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponseMessage {
    pub content: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatCompletionResponseMessage,
    pub finish_reason: Option<FinishReason>,
}

/// Why the provider ended a response.
///
/// Wire values other than `stop`, `length` and `content_filter` (tool calls,
/// function calls, values added by newer API versions) decode as [`FinishReason::Other`].
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "length")]
    TokenLimitReached,
    #[serde(rename = "content_filter")]
    ContentFiltered,
    #[serde(rename = "other")]
    Other,
}

impl FinishReason {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::TokenLimitReached,
            "content_filter" => FinishReason::ContentFiltered,
            _ => FinishReason::Other,
        }
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(FinishReason::from_wire(&value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChunkChoice>,
    pub usage: Option<Usage>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunkChoice {
    pub delta: ChatCompletionChunkChoiceDelta,
    pub index: u32,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunkChoiceDelta {
    pub content: Option<String>,
    pub role: Option<Role>,
}

pub type ChatCompletionStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// A remote chat-completion provider.
#[async_trait]
pub trait ChatCompletion: DynClone + Send + Sync {
    async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse>;

    /// Opens a finite, non-restartable stream of chunks for `request`.
    async fn stream_chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionStream>;
}

dyn_clone::clone_trait_object!(ChatCompletion);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let message = ChatCompletionMessage::system("You are a helpful assistant.");
        assert_eq!(
            r#"{"role":"system","content":"You are a helpful assistant."}"#,
            serde_json::to_string(&message).unwrap()
        );

        let message = ChatCompletionMessage::user("");
        assert_eq!(
            r#"{"role":"user","content":""}"#,
            serde_json::to_string(&message).unwrap()
        );
    }

    #[test]
    fn test_streaming_request_serialization() {
        let request = ChatCompletionRequestBuilder::default()
            .model("gpt-4o-mini")
            .messages(vec![ChatCompletionMessage::user("Hello")])
            .stream(true)
            .cancellation_token(CancellationToken::new())
            .build()
            .unwrap();

        assert_eq!(
            r#"{"model":"gpt-4o-mini","messages":[{"role":"user","content":"Hello"}],"stream":true}"#,
            serde_json::to_string(&request).unwrap()
        );
    }

    #[test]
    fn test_finish_reason_wire_values() {
        let cases = vec![
            (r#""stop""#, FinishReason::Stop),
            (r#""length""#, FinishReason::TokenLimitReached),
            (r#""content_filter""#, FinishReason::ContentFiltered),
            (r#""tool_calls""#, FinishReason::Other),
            (r#""something_new""#, FinishReason::Other),
        ];

        for (json, expected) in cases {
            assert_eq!(serde_json::from_str::<FinishReason>(json).unwrap(), expected);
        }

        assert_eq!(
            serde_json::to_string(&FinishReason::TokenLimitReached).unwrap(),
            r#""length""#
        );
    }

    #[test]
    fn test_azure_prompt_filter_chunk() {
        // Azure sends an empty-choice preamble carrying prompt filter results.
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[],"created":0,"id":"","model":"","object":"","prompt_filter_results":[{"prompt_index":0,"content_filter_results":{}}]}"#,
        )
        .unwrap();
        assert!(chunk.choices.is_empty());
    }

    #[test]
    fn test_chunk_with_finish_reason() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1700000000,"model":"gpt-4o-mini","choices":[{"index":0,"delta":{},"finish_reason":"content_filter"}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content, None);
        assert_eq!(
            chunk.choices[0].finish_reason,
            Some(FinishReason::ContentFiltered)
        );
    }

    #[test]
    fn test_response_deserialization() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"chatcmpl-2","object":"chat.completion","created":1700000000,"model":"gpt-4o-mini","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}"#,
        )
        .unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Hi"));
        assert_eq!(response.usage.unwrap().total_tokens, 6);
    }
}
