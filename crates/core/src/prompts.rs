//! System prompts for the two language-model tiers.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::collections::HashMap;

pub const CONVERSATION_KEY: &str = "conversation";
pub const TOOL_AGENT_KEY: &str = "tool_agent";

/// Placeholder in the tool-agent prompt replaced with the current local time.
pub const NOW_PLACEHOLDER: &str = "{now}";

#[derive(Debug, Clone)]
pub struct Prompts {
    conversation: String,
    tool_agent: String,
}

impl Prompts {
    pub fn new(conversation: impl Into<String>, tool_agent: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            tool_agent: tool_agent.into(),
        }
    }

    /// Picks the required templates out of a file-stem → content map.
    pub fn from_map(prompts: &HashMap<String, String>) -> Result<Self> {
        let conversation = prompts
            .get(CONVERSATION_KEY)
            .context("Missing prompt template: 'conversation'")?;
        let tool_agent = prompts
            .get(TOOL_AGENT_KEY)
            .context("Missing prompt template: 'tool_agent'")?;
        Ok(Self::new(conversation.clone(), tool_agent.clone()))
    }

    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    /// The conversational prompt extended with the time-stamped tool-agent
    /// section.
    pub fn tool_agent(&self, now: DateTime<Local>) -> String {
        let stamp = now.format("%H:%M on %A, %d %B %Y").to_string();
        format!(
            "{}\n\n{}",
            self.conversation,
            self.tool_agent.replace(NOW_PLACEHOLDER, &stamp)
        )
    }
}
