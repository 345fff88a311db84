use async_trait::async_trait;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Cheap request proving the credential and endpoint are usable
    async fn check_connection(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
    model: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let adapter: Box<dyn LLMAdapter> = match provider.name.as_str() {
            "google" | "gemini" => Box::new(match &provider.api_base {
                Some(base) => crate::llm::google::GoogleAdapter::with_api_base(&provider.api_key, base),
                None => crate::llm::google::GoogleAdapter::new(&provider.api_key),
            }),
            other => {
                return Err(AppError::Config(format!("Unsupported LLM provider: {}", other)));
            }
        };

        Ok(Self {
            adapter,
            provider_name: provider.name,
            model: provider.model,
        })
    }

    /// Wrap an already-built adapter
    pub fn from_adapter(
        adapter: Box<dyn LLMAdapter>,
        provider_name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            provider_name: provider_name.into(),
            model: model.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    pub async fn check_connection(&self) -> AppResult<()> {
        self.adapter.check_connection().await
    }
}
