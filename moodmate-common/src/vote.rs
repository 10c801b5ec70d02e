//! Per-modality mood slots and majority vote
//!
//! Each input channel (text, audio, video) remembers only the last label it
//! produced in the current session. When a recommendation is requested the
//! populated slots are tallied and the most frequent label wins.
//!
//! Ties resolve to the label counted first, counting in slot order text,
//! audio, video. This is a deliberately simple rule: it does not prefer the
//! most recent or the most confident result.

use std::fmt;

use crate::emotion::EmotionLabel;

/// Text shown when no modality has produced a result yet
pub const NO_EMOTION_DETECTED: &str = "No emotions detected.";

/// Input channel that produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Audio,
    Video,
}

impl Modality {
    /// Vote counting order
    pub const ALL: [Modality; 3] = [Modality::Text, Modality::Audio, Modality::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Audio => "audio",
            Modality::Video => "video",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last normalized label seen for each modality
///
/// Slots only move from absent to set, or from set to a new value. There is
/// no way to clear a single slot; dropping the owning session clears them all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalitySlots {
    text: Option<EmotionLabel>,
    audio: Option<EmotionLabel>,
    video: Option<EmotionLabel>,
}

impl ModalitySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot for `modality` with a fresh classification
    pub fn set(&mut self, modality: Modality, label: EmotionLabel) {
        tracing::debug!(modality = %modality, label = %label, "Modality slot updated");
        *self.slot_mut(modality) = Some(label);
    }

    pub fn get(&self, modality: Modality) -> Option<&EmotionLabel> {
        match modality {
            Modality::Text => self.text.as_ref(),
            Modality::Audio => self.audio.as_ref(),
            Modality::Video => self.video.as_ref(),
        }
    }

    fn slot_mut(&mut self, modality: Modality) -> &mut Option<EmotionLabel> {
        match modality {
            Modality::Text => &mut self.text,
            Modality::Audio => &mut self.audio,
            Modality::Video => &mut self.video,
        }
    }

    /// Populated slots in vote counting order
    pub fn populated(&self) -> impl Iterator<Item = (Modality, &EmotionLabel)> + '_ {
        Modality::ALL
            .into_iter()
            .filter_map(move |m| self.get(m).map(|label| (m, label)))
    }

    pub fn is_empty(&self) -> bool {
        self.populated().next().is_none()
    }

    /// Tally the populated slots and pick the dominant label
    pub fn majority(&self) -> MoodVerdict {
        let tally = VoteTally::from_labels(self.populated().map(|(_, label)| label));
        match tally.winner() {
            Some(label) => MoodVerdict::Detected(label.clone()),
            None => MoodVerdict::NoneDetected,
        }
    }
}

/// Insertion-ordered label counts
///
/// A `Vec` rather than a `HashMap` so that the first-counted label wins ties.
#[derive(Debug, Clone, Default)]
pub struct VoteTally<'a> {
    counts: Vec<(&'a EmotionLabel, usize)>,
}

impl<'a> VoteTally<'a> {
    pub fn from_labels<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a EmotionLabel>,
    {
        let mut tally = VoteTally::default();
        for label in labels {
            tally.add(label);
        }
        tally
    }

    pub fn add(&mut self, label: &'a EmotionLabel) {
        match self.counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((label, 1)),
        }
    }

    pub fn count(&self, label: &EmotionLabel) -> usize {
        self.counts
            .iter()
            .find(|(seen, _)| *seen == label)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Highest count; earliest inserted on ties
    pub fn winner(&self) -> Option<&'a EmotionLabel> {
        let mut best: Option<(&'a EmotionLabel, usize)> = None;
        for &(label, count) in &self.counts {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }
}

/// Outcome of the majority vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoodVerdict {
    Detected(EmotionLabel),
    /// No modality has reported yet; a valid, displayable result
    NoneDetected,
}

impl MoodVerdict {
    pub fn label(&self) -> Option<&EmotionLabel> {
        match self {
            MoodVerdict::Detected(label) => Some(label),
            MoodVerdict::NoneDetected => None,
        }
    }
}

impl fmt::Display for MoodVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoodVerdict::Detected(label) => write!(f, "{}", label),
            MoodVerdict::NoneDetected => f.write_str(NO_EMOTION_DETECTED),
        }
    }
}
