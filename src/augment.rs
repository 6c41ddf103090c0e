//! LLM augmentation of recommendations.
//!
//! Augmentation is strictly best-effort: callers fall back to the templated
//! rationale and generated schema whenever a call fails, times out or
//! returns an unusable body.

use crate::profile::{DataProfile, FeatureSet, StorageType};
use crate::rules::RuleDecision;
use crate::{Result, StoreScoutError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the chat-completions augmenter.
#[derive(Debug, Clone)]
pub struct AugmenterConfig {
    /// API endpoint URL
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// Overall deadline per request
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AugmenterConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4".to_string(),
            timeout: Duration::from_secs(30),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

/// Enriches a recommendation with model-written prose and schema tweaks.
#[async_trait]
pub trait Augmenter: Send + Sync {
    /// Rewrite the templated rationale into analyst-grade prose.
    async fn generate_rationale(
        &self,
        profile: &DataProfile,
        decision: &RuleDecision,
    ) -> Result<String>;

    /// Refine a generated schema script for the target store.
    async fn generate_ddl(
        &self,
        features: &FeatureSet,
        target: StorageType,
        table_name: &str,
        base_ddl: &str,
    ) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

/// Chat-completions client implementing [`Augmenter`].
pub struct HttpAugmenter {
    client: Client,
    config: AugmenterConfig,
}

impl HttpAugmenter {
    pub fn new(config: AugmenterConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(endpoint = %self.config.endpoint, "augmenter API call");
        let response = tokio::time::timeout(
            self.config.timeout,
            self.client
                .post(&self.config.endpoint)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send(),
        )
        .await??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreScoutError::Augmenter(format!(
                "API error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(StoreScoutError::Augmenter(
                "empty completion content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl Augmenter for HttpAugmenter {
    async fn generate_rationale(
        &self,
        profile: &DataProfile,
        decision: &RuleDecision,
    ) -> Result<String> {
        let profile_json = serde_json::to_string_pretty(profile)?;
        let user_prompt = format!(
            "A rule engine selected `{}` (confidence {:.2}) for the dataset \
             profiled below. Rewrite the rationale for a data engineer in two \
             or three sentences. Base rationale: {}\n\nProfile:\n{}",
            decision.target, decision.confidence, decision.rationale, profile_json
        );
        self.complete(
            "You are a data infrastructure advisor. Explain storage choices \
             concisely and concretely, without hedging.",
            &user_prompt,
        )
        .await
    }

    async fn generate_ddl(
        &self,
        features: &FeatureSet,
        target: StorageType,
        table_name: &str,
        base_ddl: &str,
    ) -> Result<String> {
        let stats = serde_json::to_string_pretty(features)?;
        let user_prompt = format!(
            "Refine this {target} DDL for table `{table_name}`. Keep it \
             executable and keep every column. Column statistics:\n{stats}\n\n\
             DDL:\n{base_ddl}"
        );
        self.complete(
            "You are a database schema expert. Return only an executable DDL \
             script, no commentary.",
            &user_prompt,
        )
        .await
    }
}
