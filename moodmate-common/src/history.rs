//! Mood history built from the user's diary notes
//!
//! The backend stores every classified diary entry as a note with a raw
//! emotion label and a creation timestamp. The timeline normalizes both so
//! the trend chart and the diary list can be rendered in date order.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Ordering;

use crate::api::Note;
use crate::emotion::{normalize, EmotionLabel};

/// Naive timestamp layouts seen in stored notes, tried in order
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a `date_created` value
///
/// Accepts RFC 3339, RFC 2822 / HTTP dates (`Tue, 05 Nov 2024 10:00:00 GMT`)
/// and naive ISO-like timestamps, which are taken as UTC.
pub fn parse_note_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// One diary note with its label normalized and date parsed
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub at: Option<DateTime<Utc>>,
    pub emotion: EmotionLabel,
    pub text: String,
    /// Unparsed `date_created`, shown when the date could not be read
    pub raw_date: String,
}

impl TimelineEntry {
    pub fn from_note(note: &Note) -> Self {
        Self {
            at: parse_note_date(&note.date_created),
            emotion: normalize(&note.emotion),
            text: note.text.clone().unwrap_or_else(|| "No text".to_string()),
            raw_date: note.date_created.clone(),
        }
    }

    /// `%Y-%m-%d %H:%M`, or the raw value for undated entries
    pub fn date_label(&self) -> String {
        match self.at {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => self.raw_date.clone(),
        }
    }
}

/// Diary notes in chronological order
#[derive(Debug, Clone, Default)]
pub struct MoodTimeline {
    entries: Vec<TimelineEntry>,
}

impl MoodTimeline {
    pub fn from_notes(notes: &[Note]) -> Self {
        let mut entries: Vec<TimelineEntry> = notes.iter().map(TimelineEntry::from_note).collect();
        // Stable sort: undated entries keep their stored order after dated ones
        entries.sort_by(|a, b| compare_dated(a.at, b.at));
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Oldest first, for the trend chart
    pub fn chronological(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Newest first, for the diary list; undated entries still come last
    pub fn newest_first(&self) -> Vec<&TimelineEntry> {
        let mut entries: Vec<&TimelineEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| match (a.at, b.at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (x, y) => compare_dated(x, y),
        });
        entries
    }

    /// Dated entries only, as chart points
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, &EmotionLabel)> + '_ {
        self.entries.iter().filter_map(|e| e.at.map(|at| (at, &e.emotion)))
    }
}

fn compare_dated(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
