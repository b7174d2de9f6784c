//! Keyword classifiers used to pick a tier and to decide which context to
//! gather.

/// Decides whether an utterance should be escalated to the tool-augmented
/// tier.
///
/// Implementations are policy knobs: a false positive costs a slower model
/// call, a false negative falls back to plain conversation.
pub trait ToolNeedClassifier: Send + Sync {
    fn needs_tools(&self, utterance: &str) -> bool;
}

/// Case-insensitive substring scan over a fixed keyword list.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Weather, time, calendar, mail, search and general-knowledge cues.
    pub fn tool_need() -> Self {
        Self::new(TOOL_KEYWORDS)
    }

    /// Cues that the speaker wants the robot to look at something.
    pub fn vision() -> Self {
        Self::new(VISION_KEYWORDS)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl ToolNeedClassifier for KeywordSet {
    fn needs_tools(&self, utterance: &str) -> bool {
        self.matches(utterance)
    }
}

const TOOL_KEYWORDS: &[&str] = &[
    // weather
    "wetter", "weather", "temperatur", "temperature", "regen", "rain",
    "schnee", "snow", "wind", "sturm", "storm", "forecast", "vorhersage",
    // time
    "uhrzeit", "time", "wie spät", "what time", "datum", "date",
    "welcher tag", "what day", "wochentag",
    // calendar
    "kalender", "calendar", "termin", "appointment", "meeting",
    "was steht an", "what's next", "schedule", "zeitplan",
    // mail
    "email", "e-mail", "mail", "nachricht", "message", "posteingang", "inbox",
    // search
    "suche", "such", "search", "google", "news", "nachrichten",
    "was ist", "what is", "wer ist", "who is", "erkläre", "explain",
    // knowledge
    "wikipedia", "wiki", "definition",
    // smart home
    "licht", "light", "heizung", "heating", "thermostat",
];

const VISION_KEYWORDS: &[&str] = &[
    "siehst", "sehen", "schau", "guck", "kamera", "foto",
    "see", "look", "watch", "camera", "photo",
    "wer ist", "who is", "was ist da", "what's there",
];
