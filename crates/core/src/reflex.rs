//! Tier 1: the reflex trigger table.
//!
//! A reflex maps a short, canonical command phrase straight to a canned
//! action/speech/mood triple, so common commands never wait on a language
//! model. Lookup is an exact match on the normalized utterance, then a
//! bounded edit-distance search over the table in insertion order.

use crate::edit_distance::levenshtein;
use crate::mood::Mood;
use std::collections::HashMap;
use tracing::debug;

/// Leading address/filler tokens, each stripped at most once, in this order.
const LEADING_FILLERS: &[&str] = &[
    "hey buddy, ",
    "hey buddy ",
    "buddy, ",
    "buddy ",
    "okay ",
    "ok ",
    "bitte ",
    "mal ",
    "please ",
];

/// Trailing politeness tokens, each stripped at most once, in this order.
const TRAILING_FILLERS: &[&str] = &[" bitte", " please", " mal"];

/// Fuzzy matching is skipped for inputs shorter than this many characters.
const MIN_FUZZY_LEN: usize = 3;

/// Candidates whose length differs from the input by more are ignored.
const MAX_LEN_DELTA: usize = 3;

/// A canned response for one trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflexEntry {
    pub actions: Vec<String>,
    pub speak: String,
    pub mood: Mood,
}

impl ReflexEntry {
    pub fn new(actions: &[&str], speak: &str, mood: Mood) -> Self {
        Self {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            speak: speak.to_string(),
            mood,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReflexTableError {
    #[error("duplicate reflex trigger: '{0}'")]
    DuplicateTrigger(String),
    #[error("reflex trigger '{0}' is not in canonical form (lowercase, trimmed, non-empty)")]
    NonCanonicalTrigger(String),
}

/// How a reflex was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy { distance: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflexMatch<'a> {
    pub trigger: &'a str,
    pub entry: &'a ReflexEntry,
    pub kind: MatchKind,
}

/// Immutable, insertion-ordered trigger table.
#[derive(Debug, Clone)]
pub struct ReflexTable {
    triggers: Vec<(String, ReflexEntry)>,
    index: HashMap<String, usize>,
}

impl ReflexTable {
    /// Builds a table, rejecting duplicate or non-canonical triggers.
    pub fn new<I, S>(entries: I) -> Result<Self, ReflexTableError>
    where
        I: IntoIterator<Item = (S, ReflexEntry)>,
        S: Into<String>,
    {
        let mut triggers = Vec::new();
        let mut index = HashMap::new();
        for (trigger, entry) in entries {
            let trigger = trigger.into();
            if trigger.is_empty() || trigger != trigger.trim().to_lowercase() {
                return Err(ReflexTableError::NonCanonicalTrigger(trigger));
            }
            if index.contains_key(&trigger) {
                return Err(ReflexTableError::DuplicateTrigger(trigger));
            }
            index.insert(trigger.clone(), triggers.len());
            triggers.push((trigger, entry));
        }
        Ok(Self { triggers, index })
    }

    /// The built-in German/English command vocabulary.
    pub fn builtin() -> Result<Self, ReflexTableError> {
        Self::new(
            BUILTIN
                .iter()
                .map(|(trigger, actions, speak, mood)| (*trigger, ReflexEntry::new(actions, speak, *mood))),
        )
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn get(&self, trigger: &str) -> Option<&ReflexEntry> {
        self.index.get(trigger).map(|&i| &self.triggers[i].1)
    }

    /// Resolves an utterance to a reflex, or `None` when it should fall
    /// through to the language-model tiers.
    pub fn lookup(&self, utterance: &str) -> Option<ReflexMatch<'_>> {
        let cleaned = normalize(utterance);

        if let Some(&i) = self.index.get(cleaned.as_str()) {
            let (trigger, entry) = &self.triggers[i];
            return Some(ReflexMatch {
                trigger,
                entry,
                kind: MatchKind::Exact,
            });
        }

        let input_len = cleaned.chars().count();
        if input_len < MIN_FUZZY_LEN {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;
        for (i, (trigger, _)) in self.triggers.iter().enumerate() {
            let trigger_len = trigger.chars().count();
            if trigger_len.abs_diff(input_len) > MAX_LEN_DELTA {
                continue;
            }
            let allowed = if trigger_len <= 5 { 1 } else { 2 };
            let distance = levenshtein(&cleaned, trigger);
            if distance <= allowed && best.is_none_or(|(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        best.map(|(i, distance)| {
            let (trigger, entry) = &self.triggers[i];
            debug!(input = %cleaned, %trigger, distance, "Fuzzy reflex match");
            ReflexMatch {
                trigger,
                entry,
                kind: MatchKind::Fuzzy { distance },
            }
        })
    }
}

/// Lowercases, trims, drops trailing sentence punctuation, and strips the
/// leading and trailing filler tokens.
pub fn normalize(utterance: &str) -> String {
    let mut cleaned = utterance
        .trim()
        .to_lowercase()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_string();

    for filler in LEADING_FILLERS {
        if let Some(rest) = cleaned.strip_prefix(filler) {
            cleaned = rest.trim().to_string();
        }
    }
    for filler in TRAILING_FILLERS {
        if let Some(rest) = cleaned.strip_suffix(filler) {
            cleaned = rest.trim().to_string();
        }
    }
    cleaned
}

type BuiltinReflex = (&'static str, &'static [&'static str], &'static str, Mood);

#[rustfmt::skip]
const BUILTIN: &[BuiltinReflex] = &[
    // sit
    ("sitz",           &["sit"],              "On it!",                   Mood::Happy),
    ("sit",            &["sit"],              "On it!",                   Mood::Happy),
    ("sit down",       &["sit"],              "On it!",                   Mood::Happy),
    ("hinsetzen",      &["sit"],              "Yes sir!",                 Mood::Happy),
    ("setz dich",      &["sit"],              "Okay!",                    Mood::Happy),
    // stand
    ("steh",           &["stand"],            "Already up!",              Mood::Happy),
    ("steh auf",       &["stand"],            "Up I get!",                Mood::Excited),
    ("stand",          &["stand"],            "Standing!",                Mood::Happy),
    ("stand up",       &["stand"],            "I'm up!",                  Mood::Happy),
    ("aufstehen",      &["stand"],            "Yes sir!",                 Mood::Excited),
    ("auf",            &["stand"],            "I'm awake!",               Mood::Happy),
    // lie down
    ("platz",          &["lie"],              "Comfy!",                   Mood::Sleepy),
    ("leg dich",       &["lie"],              "Gladly.",                  Mood::Sleepy),
    ("leg dich hin",   &["lie"],              "Nice down here.",          Mood::Sleepy),
    ("lie",            &["lie"],              "Comfy!",                   Mood::Sleepy),
    ("lie down",       &["lie"],              "Lying down!",              Mood::Sleepy),
    ("down",           &["lie"],              "Going down.",              Mood::Sleepy),
    // come / forward
    ("komm",           &["forward"],          "Coming!",                  Mood::Excited),
    ("komm her",       &["forward"],          "Be right there!",          Mood::Excited),
    ("komm hier",      &["forward"],          "Be right there!",          Mood::Excited),
    ("hierher",        &["forward"],          "On my way!",               Mood::Excited),
    ("come",           &["forward"],          "Coming!",                  Mood::Excited),
    ("come here",      &["forward"],          "Be right there!",          Mood::Excited),
    ("forward",        &["forward"],          "Let's go!",                Mood::Happy),
    ("vorwärts",       &["forward"],          "March!",                   Mood::Happy),
    ("vor",            &["forward"],          "Forward!",                 Mood::Happy),
    // back
    ("zurück",         &["backward"],         "Backing up!",              Mood::Neutral),
    ("back",           &["backward"],         "Reverse!",                 Mood::Neutral),
    ("backward",       &["backward"],         "Backing up!",              Mood::Neutral),
    ("go back",        &["backward"],         "On it!",                   Mood::Neutral),
    ("rückwärts",      &["backward"],         "Reverse march!",           Mood::Neutral),
    // turns
    ("links",          &["turn_left"],        "To the left!",             Mood::Happy),
    ("turn left",      &["turn_left"],        "Turning left!",            Mood::Happy),
    ("left",           &["turn_left"],        "Left it is!",              Mood::Happy),
    ("rechts",         &["turn_right"],       "To the right!",            Mood::Happy),
    ("turn right",     &["turn_right"],       "Turning right!",           Mood::Happy),
    ("right",          &["turn_right"],       "Right it is!",             Mood::Happy),
    // tail
    ("wedel",          &["wag_tail"],         "Joy!",                     Mood::Happy),
    ("wedeln",         &["wag_tail"],         "Wag wag!",                 Mood::Happy),
    ("wag",            &["wag_tail"],         "Wag wag!",                 Mood::Happy),
    ("tail",           &["wag_tail"],         "Tail wagging!",            Mood::Happy),
    ("wag tail",       &["wag_tail"],         "Like this!",               Mood::Happy),
    // bark
    ("bell",           &["bark"],             "Woof!",                    Mood::Excited),
    ("bellen",         &["bark"],             "Woof woof!",               Mood::Excited),
    ("bark",           &["bark"],             "Woof!",                    Mood::Excited),
    ("speak",          &["bark"],             "Woof woof!",               Mood::Excited),
    // tricks
    ("stretch",        &["stretch"],          "Stretchy stretch!",        Mood::Happy),
    ("strecken",       &["stretch"],          "That feels good!",         Mood::Happy),
    ("streck dich",    &["stretch"],          "Ahh, lovely!",             Mood::Happy),
    ("push up",        &["push_up"],          "One, two, three!",         Mood::Proud),
    ("pushup",         &["push_up"],          "Workout time!",            Mood::Proud),
    ("liegestütz",     &["push_up"],          "Fitness time!",            Mood::Proud),
    ("liegestütze",    &["push_up"],          "Here we go!",              Mood::Proud),
    ("heul",           &["howling"],          "Awoooo!",                  Mood::Sad),
    ("heulen",         &["howling"],          "Awooooo!",                 Mood::Sad),
    ("howl",           &["howling"],          "Awoooo!",                  Mood::Sad),
    ("trab",           &["trot"],             "Trot trot!",               Mood::Happy),
    ("traben",         &["trot"],             "Trotting!",                Mood::Happy),
    ("trot",           &["trot"],             "Trot trot trot!",          Mood::Happy),
    ("schlaf",         &["doze_off"],         "Good night...",            Mood::Sleepy),
    ("schlafen",       &["doze_off"],         "Sleep tight...",           Mood::Sleepy),
    ("sleep",          &["doze_off"],         "Zzzzz...",                 Mood::Sleepy),
    ("nap",            &["doze_off"],         "A little nap...",          Mood::Sleepy),
    ("penn",           &["doze_off"],         "Eyes closed...",           Mood::Sleepy),
    ("kopf schütteln", &["shake_head"],       "No no!",                   Mood::Confused),
    ("schüttel",       &["shake_head"],       "Nope!",                    Mood::Confused),
    ("shake",          &["shake_head"],       "No!",                      Mood::Confused),
    ("shake head",     &["shake_head"],       "Head shake!",              Mood::Confused),
    ("hecheln",        &["pant"],             "Pant pant!",               Mood::Happy),
    ("hechel",         &["pant"],             "Pant!",                    Mood::Happy),
    ("pant",           &["pant"],             "Pant pant!",               Mood::Happy),
    ("nick",           &["nod"],              "Yes yes!",                 Mood::Happy),
    ("nicken",         &["nod"],              "Exactly!",                 Mood::Happy),
    ("nod",            &["nod"],              "Yes sir!",                 Mood::Happy),
    // praise
    ("braver hund",    &["sit", "wag_tail"],  "Thank you!",               Mood::Love),
    ("good boy",       &["sit", "wag_tail"],  "Thanks, that makes me happy!", Mood::Love),
    ("good dog",       &["wag_tail"],         "Thank you so much!",       Mood::Love),
    ("guter hund",     &["sit", "wag_tail"],  "I love hearing that!",     Mood::Love),
    ("brav",           &["wag_tail"],         "Thank you!",               Mood::Love),
    // stop
    ("stopp",          &["stand"],            "Stopped!",                 Mood::Alert),
    ("stop",           &["stand"],            "Stopping!",                Mood::Alert),
    ("halt",           &["stand"],            "Halt!",                    Mood::Alert),
    ("still",          &["stand"],            "Keeping still.",           Mood::Neutral),
    // greetings
    ("hallo",          &["wag_tail", "bark"], "Hello! Good to see you!",  Mood::Excited),
    ("hello",          &["wag_tail", "bark"], "Hello!",                   Mood::Excited),
    ("hi",             &["wag_tail"],         "Hi!",                      Mood::Happy),
    ("hey",            &["wag_tail"],         "Hey!",                     Mood::Happy),
    ("moin",           &["wag_tail", "bark"], "Moin moin!",               Mood::Excited),
];
