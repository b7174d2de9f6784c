//! Defensive parsing of language-model replies.
//!
//! Models are asked for `{"speak", "actions", "emotion"}` but routinely wrap
//! it in code fences or chat around it. Parsing tries, in order: the whole
//! text, the first fenced block, the first balanced top-level object. If
//! none yields a JSON object, the raw text becomes speech.

use crate::mood::{Light, Mood};
use serde_json::{Map, Value};
use tracing::warn;

const MAX_RAW_SPEECH_CHARS: usize = 200;

/// A reply reduced to the fields the dispatcher acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub speak: String,
    pub actions: Vec<String>,
    pub mood: Mood,
    pub rgb: Option<Light>,
}

/// Parses `text`, using `default_mood` when the reply names no emotion.
pub fn parse_reply(text: &str, default_mood: Mood) -> ParsedReply {
    match extract_object(text) {
        Some(object) => from_object(&object, default_mood),
        None => {
            warn!(preview = %preview(text), "Reply was not structured, using raw text");
            ParsedReply {
                speak: text.trim().chars().take(MAX_RAW_SPEECH_CHARS).collect(),
                actions: Vec::new(),
                mood: Mood::Neutral,
                rgb: None,
            }
        }
    }
}

fn extract_object(text: &str) -> Option<Map<String, Value>> {
    as_object(text.trim())
        .or_else(|| fenced_block(text).and_then(|block| as_object(block.trim())))
        .or_else(|| first_balanced_object(text).and_then(as_object))
}

fn as_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Body of the first ```` ```json ```` block, or of the first bare fence.
fn fenced_block(text: &str) -> Option<&str> {
    let after_open = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else {
        text.split_once("```")?.1
    };
    Some(after_open.split_once("```").map_or(after_open, |(body, _)| body))
}

/// The first `{ ... }` span whose braces balance, ignoring braces inside
/// string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn from_object(object: &Map<String, Value>, default_mood: Mood) -> ParsedReply {
    let speak = object
        .get("speak")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let actions = object
        .get("actions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let mood = object
        .get("emotion")
        .and_then(Value::as_str)
        .map(Mood::from_tag)
        .unwrap_or(default_mood);
    let rgb = object
        .get("rgb")
        .and_then(|v| serde_json::from_value::<Light>(v.clone()).ok());

    ParsedReply {
        speak,
        actions,
        mood,
        rgb,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::LightMode;

    #[test]
    fn test_direct_json() {
        let r = parse_reply(
            r#"{"speak":"Super!","actions":["wag_tail"],"emotion":"excited"}"#,
            Mood::Neutral,
        );
        assert_eq!(r.speak, "Super!");
        assert_eq!(r.actions, vec!["wag_tail"]);
        assert_eq!(r.mood, Mood::Excited);
        assert_eq!(r.rgb, None);
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n{\"speak\":\"Hi\",\"actions\":[]}\n```\nEnjoy";
        let r = parse_reply(text, Mood::Think);
        assert_eq!(r.speak, "Hi");
        assert_eq!(r.mood, Mood::Think);
    }

    #[test]
    fn test_bare_fence() {
        let text = "```\n{\"speak\":\"Bare\",\"emotion\":\"sad\"}\n```";
        let r = parse_reply(text, Mood::Neutral);
        assert_eq!(r.speak, "Bare");
        assert_eq!(r.mood, Mood::Sad);
    }

    #[test]
    fn test_embedded_object_with_braces_in_strings() {
        let text = r#"Sure! {"speak":"I like {curly} things","actions":["bark"]} and then {"speak":"second"}"#;
        let r = parse_reply(text, Mood::Neutral);
        assert_eq!(r.speak, "I like {curly} things");
        assert_eq!(r.actions, vec!["bark"]);
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"x {"speak":"she said \"}\" loudly"} y"#;
        let r = parse_reply(text, Mood::Neutral);
        assert_eq!(r.speak, "she said \"}\" loudly");
    }

    #[test]
    fn test_plain_text_becomes_speech() {
        let r = parse_reply("  Woof, I am just a dog.  ", Mood::Think);
        assert_eq!(r.speak, "Woof, I am just a dog.");
        assert!(r.actions.is_empty());
        assert_eq!(r.mood, Mood::Neutral);
    }

    #[test]
    fn test_raw_speech_is_truncated() {
        let long = "ä".repeat(500);
        let r = parse_reply(&long, Mood::Neutral);
        assert_eq!(r.speak.chars().count(), 200);
    }

    #[test]
    fn test_non_object_json_is_raw_text() {
        let r = parse_reply("[1, 2, 3]", Mood::Neutral);
        assert_eq!(r.speak, "[1, 2, 3]");
    }

    #[test]
    fn test_unbalanced_object_is_raw_text() {
        let r = parse_reply("{\"speak\": \"never closed\"", Mood::Neutral);
        assert_eq!(r.speak, "{\"speak\": \"never closed\"");
    }

    #[test]
    fn test_explicit_rgb_and_unknown_emotion() {
        let r = parse_reply(
            r#"{"speak":"Red!","emotion":"grumpy","rgb":{"r":255,"g":0,"b":0,"mode":"boom","bps":2}}"#,
            Mood::Think,
        );
        assert_eq!(r.mood, Mood::Neutral);
        assert_eq!(r.rgb, Some(Light::new(255, 0, 0, LightMode::Boom, 2.0)));
    }

    #[test]
    fn test_malformed_fields_default() {
        let r = parse_reply(r#"{"speak": 42, "actions": "sit", "rgb": "red"}"#, Mood::Think);
        assert_eq!(r.speak, "");
        assert!(r.actions.is_empty());
        assert_eq!(r.mood, Mood::Think);
        assert_eq!(r.rgb, None);
    }
}
