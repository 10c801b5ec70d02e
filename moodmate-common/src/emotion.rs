//! Emotion label normalization and encouragement messages
//!
//! Classifiers behind the backend report emotions in several spellings
//! ("joy", "Happy", "😡 Anger", ...). Everything that is stored in a
//! modality slot or tallied for a vote goes through [`normalize`] first so
//! that the same feeling is always counted under the same name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentence shown when no canonical emotion matches
pub const DEFAULT_ENCOURAGEMENT: &str =
    "How are you feeling? Let us recommend activities that suit your current mood.";

/// Closed set of emotion categories used throughout the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalEmotion {
    Sadness,
    Anger,
    Fear,
    Love,
    Joy,
    Surprise,
    Disgust,
    Neutral,
}

impl CanonicalEmotion {
    /// All categories, in the order used for chart axes
    pub const ALL: [CanonicalEmotion; 8] = [
        CanonicalEmotion::Anger,
        CanonicalEmotion::Fear,
        CanonicalEmotion::Sadness,
        CanonicalEmotion::Joy,
        CanonicalEmotion::Love,
        CanonicalEmotion::Surprise,
        CanonicalEmotion::Disgust,
        CanonicalEmotion::Neutral,
    ];

    /// Canonical display name ("Joy", "Sadness", ...)
    pub fn name(self) -> &'static str {
        match self {
            CanonicalEmotion::Sadness => "Sadness",
            CanonicalEmotion::Anger => "Anger",
            CanonicalEmotion::Fear => "Fear",
            CanonicalEmotion::Love => "Love",
            CanonicalEmotion::Joy => "Joy",
            CanonicalEmotion::Surprise => "Surprise",
            CanonicalEmotion::Disgust => "Disgust",
            CanonicalEmotion::Neutral => "Neutral",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            CanonicalEmotion::Sadness => "🥺",
            CanonicalEmotion::Anger => "😡",
            CanonicalEmotion::Fear => "😱",
            CanonicalEmotion::Love => "😍",
            CanonicalEmotion::Joy => "😃",
            CanonicalEmotion::Surprise => "😯",
            CanonicalEmotion::Disgust => "🤮",
            CanonicalEmotion::Neutral => "😐",
        }
    }

    /// Fixed encouragement sentence for this emotion
    pub fn encouragement(self) -> &'static str {
        match self {
            CanonicalEmotion::Sadness => "We sense that you're feeling sad. Let us suggest activities to help lift your mood. Give them a try, and see if they bring a little sunshine to your day.",
            CanonicalEmotion::Anger => "It looks like you're experiencing anger. Take a moment to breathe, and let us recommend activities that might help you find calm and peace.",
            CanonicalEmotion::Fear => "We noticed you're feeling afraid. Let us guide you with activities designed to bring comfort and ease to your mind.",
            CanonicalEmotion::Love => "You're feeling love! That's wonderful. Let us suggest activities that can amplify this positive energy and keep the good vibes flowing.",
            CanonicalEmotion::Joy => "It’s great to see you’re joyful! How about some activities to keep that joy shining even brighter?",
            CanonicalEmotion::Surprise => "You seem surprised! Explore our recommendations to see how you can turn that surprise into something even more exciting.",
            CanonicalEmotion::Disgust => "We sense some feelings of disgust. Let us offer activities to help shift your focus and bring positivity to your day.",
            CanonicalEmotion::Neutral => "You're feeling neutral at the moment. Let's find activities that can add a touch of joy and inspiration to your day.",
        }
    }

    /// Synonym table lookup on an already lower-cased label
    fn from_synonym(lowered: &str) -> Option<Self> {
        let emotion = match lowered {
            "sad" | "sadness" | "🥲 sad" | "🥺 sadness" => CanonicalEmotion::Sadness,
            "anger" | "angry" | "mad" | "rage" | "😡 anger" => CanonicalEmotion::Anger,
            "fear" | "afraid" | "scared" | "😱 fear" => CanonicalEmotion::Fear,
            "love" | "affection" | "😍 love" => CanonicalEmotion::Love,
            "joy" | "happy" | "happiness" | "😃 joy" => CanonicalEmotion::Joy,
            "surprise" | "shocked" | "😯 surprise" => CanonicalEmotion::Surprise,
            "disgust" | "disgusted" | "🤢 disgust" | "🤮 disgust" => CanonicalEmotion::Disgust,
            "neutral" | "calm" | "😐 neutral" => CanonicalEmotion::Neutral,
            _ => return None,
        };
        Some(emotion)
    }
}

impl fmt::Display for CanonicalEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact canonical name only; use [`normalize`] for raw classifier output
impl FromStr for CanonicalEmotion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalEmotion::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("not a canonical emotion: {}", s)))
    }
}

/// Result of normalizing a raw classifier label
///
/// `Unrecognized` carries the input verbatim. It is displayed and tallied
/// like any other label but is not a new category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Canonical(CanonicalEmotion),
    Unrecognized(String),
}

impl EmotionLabel {
    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Canonical(e) => e.name(),
            EmotionLabel::Unrecognized(raw) => raw,
        }
    }

    pub fn canonical(&self) -> Option<CanonicalEmotion> {
        match self {
            EmotionLabel::Canonical(e) => Some(*e),
            EmotionLabel::Unrecognized(_) => None,
        }
    }

    pub fn encouragement(&self) -> &'static str {
        match self {
            EmotionLabel::Canonical(e) => e.encouragement(),
            EmotionLabel::Unrecognized(_) => DEFAULT_ENCOURAGEMENT,
        }
    }

    /// Label decorated with its emoji ("Joy 😃"); unrecognized labels as-is
    pub fn decorated(&self) -> String {
        match self {
            EmotionLabel::Canonical(e) => format!("{} {}", e.name(), e.emoji()),
            EmotionLabel::Unrecognized(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CanonicalEmotion> for EmotionLabel {
    fn from(emotion: CanonicalEmotion) -> Self {
        EmotionLabel::Canonical(emotion)
    }
}

/// Map a raw classifier label to its canonical emotion
///
/// Matching is case-insensitive. Labels missing from the synonym table are
/// passed through unchanged.
pub fn normalize(raw: &str) -> EmotionLabel {
    match CanonicalEmotion::from_synonym(&raw.to_lowercase()) {
        Some(emotion) => EmotionLabel::Canonical(emotion),
        None => EmotionLabel::Unrecognized(raw.to_string()),
    }
}

/// Encouragement sentence for a canonical emotion name
///
/// Only the exact canonical spelling ("Joy", not "joy") selects a specific
/// sentence; anything else gets [`DEFAULT_ENCOURAGEMENT`].
pub fn encouragement(label: &str) -> &'static str {
    label
        .parse::<CanonicalEmotion>()
        .map(CanonicalEmotion::encouragement)
        .unwrap_or(DEFAULT_ENCOURAGEMENT)
}
