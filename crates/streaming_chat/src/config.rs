use std::env::VarError;
use std::time::Duration;

use derive_builder::Builder;
use secrecy::{ExposeSecret, SecretString};

use crate::chat_completions::ChatCompletion;
use crate::clients::{azure_openai, openai};
use crate::{Error, Result};

pub const AZURE_OPENAI_SYSTEM_PROMPT_ENV_VAR: &str = "AZURE_OPENAI_SYSTEM_PROMPT";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Immutable settings of a [`crate::session::ChatSession`].
#[derive(Debug, Clone, Builder)]
#[builder(derive(Debug))]
#[builder(setter(into))]
pub struct SessionConfig {
    /// Deployment name for Azure OpenAI, model name for OpenAI.
    deployment_id: String,
    #[builder(default = "DEFAULT_SYSTEM_PROMPT.to_string()")]
    system_prompt: String,
    /// Upper bound on a whole turn, from opening the stream to its terminal event.
    #[builder(default, setter(into, strip_option))]
    turn_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(deployment_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            system_prompt: system_prompt.into(),
            turn_timeout: None,
        }
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout
    }
}

/// Which provider to talk to and how to authenticate.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    AzureOpenAI {
        endpoint: String,
        api_key: SecretString,
        api_version: String,
    },
    OpenAI {
        api_key: SecretString,
        base_url: Option<String>,
        organization: Option<String>,
    },
}

impl ProviderConfig {
    pub fn build_client(&self) -> Result<Box<dyn ChatCompletion>> {
        match self {
            ProviderConfig::AzureOpenAI {
                endpoint,
                api_key,
                api_version,
            } => Ok(Box::new(azure_openai::Client::new(
                azure_openai::Auth::ApiKey(api_key.clone()),
                endpoint,
                api_version,
            )?)),
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                organization,
            } => {
                let client = openai::Client::from_url(
                    api_key.expose_secret(),
                    base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
                )?;
                Ok(Box::new(match organization {
                    Some(organization) => client.with_organization(organization),
                    None => client,
                }))
            }
        }
    }
}

/// Provider and session settings read from the environment.
///
/// Azure OpenAI is selected when `AZURE_OPENAI_ENDPOINT` is set, the OpenAI
/// API otherwise. Empty values count as unset.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub provider: ProviderConfig,
    pub session: SessionConfig,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, VarError>,
    {
        let optional = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
                Ok(_) | Err(VarError::NotPresent) => Ok(None),
                Err(e) => Err(Error::EnvVarError(name.to_string(), e)),
            }
        };
        let required = |name: &str| -> Result<String> {
            optional(name)?.ok_or_else(|| Error::EnvVarError(name.to_string(), VarError::NotPresent))
        };

        let (provider, deployment_id) = match optional(azure_openai::AZURE_OPENAI_ENDPOINT_ENV_VAR)? {
            Some(endpoint) => (
                ProviderConfig::AzureOpenAI {
                    endpoint,
                    api_key: required(azure_openai::AZURE_OPENAI_API_KEY_ENV_VAR)?.into(),
                    api_version: optional(azure_openai::AZURE_OPENAI_API_VERSION_ENV_VAR)?
                        .unwrap_or_else(|| azure_openai::DEFAULT_API_VERSION.to_string()),
                },
                required(azure_openai::AZURE_OPENAI_CHAT_DEPLOYMENT_ENV_VAR)?,
            ),
            None => (
                ProviderConfig::OpenAI {
                    api_key: required(openai::OPENAI_API_KEY_ENV_VAR)?.into(),
                    base_url: optional(openai::OPENAI_BASE_URL_ENV_VAR)?,
                    organization: optional(openai::OPENAI_ORGANIZATION_ENV_VAR)?,
                },
                required(openai::OPENAI_MODEL_NAME_ENV_VAR)?,
            ),
        };

        let mut session = SessionConfigBuilder::default();
        session.deployment_id(deployment_id);
        if let Some(system_prompt) = optional(AZURE_OPENAI_SYSTEM_PROMPT_ENV_VAR)? {
            session.system_prompt(system_prompt);
        }

        Ok(Self {
            provider,
            session: session.build()?,
        })
    }
}
