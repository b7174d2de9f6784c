use crate::conversation::{Role, Turn};
use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use std::time::Duration;

/// Sampling and deadline settings for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CompletionParams {
    /// Short conversational replies with rolling history.
    pub const CONVERSATION: Self = Self {
        max_tokens: 300,
        temperature: 0.7,
        timeout: Duration::from_secs(30),
    };

    /// Tool-augmented answers; allowed to run longer.
    pub const TOOL_AGENT: Self = Self {
        max_tokens: 500,
        temperature: 0.5,
        timeout: Duration::from_secs(45),
    };
}

/// A generic chat-completion client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends the system prompt followed by `messages` and returns the reply
    /// content. An empty reply is an error.
    async fn complete(
        &self,
        system_prompt: String,
        messages: Vec<Turn>,
        params: CompletionParams,
    ) -> Result<String>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

fn to_request_messages(
    system_prompt: String,
    messages: Vec<Turn>,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into(),
    ];
    for turn in messages {
        match turn.role {
            Role::User => out.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content)
                    .build()?
                    .into(),
            ),
            Role::Assistant => out.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content)
                    .build()?
                    .into(),
            ),
        }
    }
    Ok(out)
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    #[allow(deprecated)]
    async fn complete(
        &self,
        system_prompt: String,
        messages: Vec<Turn>,
        params: CompletionParams,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(system_prompt, messages)?)
            .max_tokens(params.max_tokens)
            .temperature(params.temperature)
            .build()?;

        let response: CreateChatCompletionResponse =
            tokio::time::timeout(params.timeout, self.client.chat().create(request))
                .await
                .map_err(|_| anyhow!("LLM call timed out after {:?}", params.timeout))??;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(anyhow!("LLM returned an empty reply"));
        }
        Ok(content)
    }
}
