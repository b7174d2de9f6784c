//! Mood tags and their light presentation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional tag attached to every directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Curious,
    Excited,
    Alert,
    Sleepy,
    Love,
    Think,
    Neutral,
    Proud,
    Confused,
    Scared,
}

impl Mood {
    pub const ALL: [Mood; 12] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Curious,
        Mood::Excited,
        Mood::Alert,
        Mood::Sleepy,
        Mood::Love,
        Mood::Think,
        Mood::Neutral,
        Mood::Proud,
        Mood::Confused,
        Mood::Scared,
    ];

    /// Parses a free-form tag as returned by a language model.
    ///
    /// Matching is case-insensitive; anything unrecognized becomes `Neutral`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "happy" => Mood::Happy,
            "sad" => Mood::Sad,
            "curious" => Mood::Curious,
            "excited" => Mood::Excited,
            "alert" => Mood::Alert,
            "sleepy" => Mood::Sleepy,
            "love" => Mood::Love,
            "think" => Mood::Think,
            "proud" => Mood::Proud,
            "confused" => Mood::Confused,
            "scared" => Mood::Scared,
            _ => Mood::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Curious => "curious",
            Mood::Excited => "excited",
            Mood::Alert => "alert",
            Mood::Sleepy => "sleepy",
            Mood::Love => "love",
            Mood::Think => "think",
            Mood::Neutral => "neutral",
            Mood::Proud => "proud",
            Mood::Confused => "confused",
            Mood::Scared => "scared",
        }
    }

    /// The LED setting used when a tier supplies no explicit light directive.
    pub fn light(&self) -> Light {
        use LightMode::{Boom, Breath};
        match self {
            Mood::Happy => Light::new(0, 255, 0, Breath, 1.5),
            Mood::Sad => Light::new(0, 0, 128, Breath, 0.3),
            Mood::Curious => Light::new(0, 255, 255, Breath, 1.0),
            Mood::Excited => Light::new(255, 255, 0, Boom, 2.0),
            Mood::Alert => Light::new(255, 100, 0, Boom, 1.5),
            Mood::Sleepy => Light::new(0, 0, 80, Breath, 0.3),
            Mood::Love => Light::new(255, 50, 150, Breath, 1.0),
            Mood::Think | Mood::Neutral => Light::new(128, 0, 255, Breath, 0.8),
            Mood::Proud => Light::new(255, 200, 0, Breath, 1.2),
            Mood::Confused => Light::new(255, 128, 0, Breath, 0.6),
            Mood::Scared => Light::new(255, 0, 0, Boom, 2.5),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    Breath,
    Boom,
}

/// An RGB LED directive as understood by the actuation endpoint's `/rgb` and
/// `/combo` calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub mode: LightMode,
    /// Animation rate in beats per second.
    #[serde(rename = "bps")]
    pub rate: f32,
}

impl Light {
    pub const fn new(r: u8, g: u8, b: u8, mode: LightMode, rate: f32) -> Self {
        Self {
            r,
            g,
            b,
            mode,
            rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_round_trips_every_mood() {
        for mood in Mood::ALL {
            assert_eq!(Mood::from_tag(mood.as_str()), mood);
        }
    }

    #[test]
    fn test_unknown_tag_is_neutral() {
        assert_eq!(Mood::from_tag("melancholic"), Mood::Neutral);
        assert_eq!(Mood::from_tag(""), Mood::Neutral);
        assert_eq!(Mood::from_tag("  HAPPY "), Mood::Happy);
    }

    #[test]
    fn test_neutral_light_is_purple_breath() {
        let light = Mood::Neutral.light();
        assert_eq!((light.r, light.g, light.b), (128, 0, 255));
        assert_eq!(light.mode, LightMode::Breath);
    }

    #[test]
    fn test_light_serializes_rate_as_bps() {
        let json = serde_json::to_value(Mood::Scared.light()).unwrap();
        assert_eq!(json["mode"], "boom");
        assert_eq!(json["bps"], 2.5);
        assert!(json.get("rate").is_none());
    }
}
