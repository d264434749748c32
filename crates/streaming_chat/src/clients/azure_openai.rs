use std::str::FromStr;

use crate::chat_completions::{
    ChatCompletion, ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStream,
};
use crate::utils::uri::ensure_no_trailing_slash;
use crate::{Error, Result};
use async_trait::async_trait;
use derive_builder::Builder;
use reqwest::header::{HeaderMap, HeaderName};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

pub const AZURE_OPENAI_ENDPOINT_ENV_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_API_KEY_ENV_VAR: &str = "AZURE_OPENAI_KEY";
pub const AZURE_OPENAI_API_VERSION_ENV_VAR: &str = "AZURE_OPENAI_API_VERSION";
pub const AZURE_OPENAI_CHAT_DEPLOYMENT_ENV_VAR: &str = "AZURE_OPENAI_CHAT_DEPLOYMENT";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

#[derive(Debug, Clone, Builder)]
#[builder(derive(Debug))]
#[builder(setter(into))]
pub struct Client {
    #[builder(default)]
    http_client: reqwest::Client,
    #[builder(default = "DEFAULT_API_VERSION.to_string()")]
    api_version: String,
    base_url: String,
    auth: Auth,
}

#[derive(Debug, Clone)]
pub enum Auth {
    BearerToken(SecretString),
    ApiKey(SecretString),
}

impl Client {
    pub fn new(auth: Auth, base_url: &str, api_version: &str) -> Result<Self> {
        Ok(Self {
            http_client: reqwest::Client::default(),
            api_version: api_version.to_string(),
            base_url: ensure_no_trailing_slash(base_url),
            auth,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let (auth_header_key, auth_header_value) = match &self.auth {
            Auth::BearerToken(secret_box) => (
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    secret_box.expose_secret()
                ))
                .map_err(|e| {
                    Error::InvalidHeaderValue(reqwest::header::AUTHORIZATION.to_string(), e)
                })?,
            ),
            Auth::ApiKey(secret_box) => (
                HeaderName::from_str("api-key")
                    .map_err(|e| Error::InvalidHeaderName("api-key".to_owned(), e))?,
                reqwest::header::HeaderValue::from_str(secret_box.expose_secret())
                    .map_err(|e| Error::InvalidHeaderValue("api-key".to_string(), e))?,
            ),
        };
        headers.insert(auth_header_key, auth_header_value);
        Ok(headers)
    }

    fn chat_completions_url(&self, deployment_id: &str) -> String {
        // NOTE: use model as the deployment_id
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            ensure_no_trailing_slash(self.base_url.as_str()),
            deployment_id,
            self.api_version
        )
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
            self.chat_completions_url(&request.model),
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
            deployment_id = %request.model,
            messages = request.messages.len(),
            "opening azure openai chat completion stream"
        );

        let response = super::post_chat_request(
            &self.http_client,
            self.chat_completions_url(&request.model),
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
