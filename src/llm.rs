use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::cli::{SummaryEngine, SummaryEngineArgs};
use crate::{gemini, openai};

/// Prompt in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;

        tracing::info!(engine = "openai", model = %self.model, "generate text");
        openai::responses_text(
            &self.client,
            &self.endpoint,
            api_key,
            &openai::ResponsesRequest {
                model: &self.model,
                instructions: None,
                input: prompt,
                temperature: Some(self.temperature),
            },
        )
        .await
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;

        tracing::info!(engine = "gemini", model = %self.model, "generate text");
        gemini::generate_text(&self.client, &self.endpoint, api_key, prompt).await
    }
}

/// Builds the configured generator. Missing API keys surface on the first call.
pub fn generator_from_args(args: &SummaryEngineArgs) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.generation_timeout_secs.max(1)))
        .build()
        .context("build generation http client")?;

    let generator: Arc<dyn TextGenerator> = match args.summary_engine {
        SummaryEngine::Openai => Arc::new(OpenAiGenerator {
            client,
            endpoint: openai::responses_endpoint(&args.openai_base_url),
            api_key: env_key("OPENAI_API_KEY"),
            model: args.openai_model.clone(),
            temperature: args.openai_temperature,
        }),
        SummaryEngine::Gemini => Arc::new(GeminiGenerator {
            client,
            endpoint: gemini::generate_content_endpoint(&args.gemini_base_url, &args.gemini_model),
            api_key: env_key("GEMINI_API_KEY"),
            model: args.gemini_model.clone(),
        }),
    };
    Ok(generator)
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
