use crate::chat_completions::{
    ChatCompletion, ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStream,
};
use crate::utils::uri::ensure_no_trailing_slash;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_NAME_ENV_VAR: &str = "OPENAI_MODEL_NAME";
pub const OPENAI_ORGANIZATION_ENV_VAR: &str = "OPENAI_ORG_ID";
pub const OPENAI_BASE_URL_ENV_VAR: &str = "OPENAI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const ORGANIZATION_HEADER: &str = "openai-organization";

/// Client for the OpenAI API and servers that speak the same protocol,
/// such as a local Ollama at `http://localhost:11434/v1`.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    organization: Option<String>,
}

impl Client {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::from_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn from_url(api_key: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            http_client: reqwest::Client::default(),
            api_key: api_key.into(),
            base_url: ensure_no_trailing_slash(base_url),
            organization: None,
        })
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose_secret())).map_err(
                |e| Error::InvalidHeaderValue(reqwest::header::AUTHORIZATION.to_string(), e),
            )?,
        );
        if let Some(organization) = &self.organization {
            headers.insert(
                ORGANIZATION_HEADER,
                HeaderValue::from_str(organization)
                    .map_err(|e| Error::InvalidHeaderValue(ORGANIZATION_HEADER.to_string(), e))?,
            );
        }
        Ok(headers)
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatCompletion for Client {
    async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        super::ensure_not_streaming(request)?;

        let response = super::post_chat_request(
            &self.http_client,
            self.chat_completions_url(),
            self.headers()?,
            request,
        )
        .await?;

        Ok(response.json::<ChatCompletionResponse>().await?)
    }

    async fn stream_chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionStream> {
        let request = super::streaming_request(request);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening openai chat completion stream"
        );

        let response = super::post_chat_request(
            &self.http_client,
            self.chat_completions_url(),
            self.headers()?,
            &request,
        )
        .await?;

        Ok(super::chunk_stream(
            response,
            request.cancellation_token.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_completions::{ChatCompletionMessage, ChatCompletionRequestBuilder};
    use futures::StreamExt;
    use httpmock::prelude::*;
    use tokio_util::sync::CancellationToken;

    fn request(cancellation_token: Option<CancellationToken>) -> ChatCompletionRequest {
        let mut builder = ChatCompletionRequestBuilder::default();
        builder
            .model("gemma3")
            .messages(vec![ChatCompletionMessage::user("Hello")]);
        if let Some(token) = cancellation_token {
            builder.cancellation_token(token);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_stream_with_organization_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .header("openai-organization", "org-123")
                    .body_contains("\"model\":\"gemma3\"");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(concat!(
                        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"partial\"}}]}\n\n",
                        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"length\"}]}\n\n",
                    ));
            })
            .await;

        let client = Client::from_url("sk-test", &server.url("/v1/"))
            .unwrap()
            .with_organization("org-123");

        let chunks: Vec<_> = client
            .stream_chat_completions(&request(None))
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        mock.assert_async().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[1].choices[0].finish_reason,
            Some(crate::chat_completions::FinishReason::TokenLimitReached)
        );
    }

    #[tokio::test]
    async fn test_cancelled_stream_ends_without_chunks() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body("data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"late\"}}]}\n\n");
            })
            .await;

        let token = CancellationToken::new();
        let client = Client::from_url("sk-test", &server.base_url()).unwrap();
        let stream = client
            .stream_chat_completions(&request(Some(token.clone())))
            .await
            .unwrap();

        token.cancel();
        let chunks: Vec<_> = stream.collect().await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_surfaces_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body("data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {oops\n\n");
            })
            .await;

        let client = Client::from_url("sk-test", &server.base_url()).unwrap();
        let items: Vec<_> = client
            .stream_chat_completions(&request(None))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::SerdeJsonError(_))));
    }
}
