//! Events flowing in and directives flowing out of the dispatcher.

use crate::mood::{Light, Mood};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A recognized utterance, alive for the duration of one dispatch.
#[derive(Debug, Clone)]
pub struct VoiceEvent {
    pub id: Uuid,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl VoiceEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// The strategy that produced a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Canned response from the reflex table.
    Reflex,
    /// Language model with rolling conversation history.
    Conversational,
    /// Language model prompted for tool/knowledge access.
    ToolAugmented,
    /// Fixed apology after every language-model path failed.
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Reflex => "reflex",
            Tier::Conversational => "conversational",
            Tier::ToolAugmented => "tool_augmented",
            Tier::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// The combined payload for the actuation endpoint's `/combo` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub speak: String,
    pub rgb: Light,
}

impl Directive {
    /// Builds a directive, falling back to the mood's light when no explicit
    /// light is supplied.
    pub fn new(actions: Vec<String>, speak: impl Into<String>, mood: Mood, rgb: Option<Light>) -> Self {
        Self {
            actions,
            speak: speak.into(),
            rgb: rgb.unwrap_or_else(|| mood.light()),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub event_id: Uuid,
    pub tier: Tier,
    pub mood: Mood,
    pub directive: Directive,
}
