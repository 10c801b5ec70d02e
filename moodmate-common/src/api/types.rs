//! Request and response bodies exchanged with the classification backend
//!
//! Field names follow the backend's wire format, including the misspelt
//! `recomendation` key of the recommendation response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::emotion::{normalize, EmotionLabel};
use crate::Error;

/// One diary entry stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub text: Option<String>,
    /// Raw classifier label recorded with the entry
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub date_created: String,
    /// Fields we don't interpret, kept so the note round-trips unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User profile as returned by sign in, sign up and text classification
///
/// Only the fields the UI reads are typed. Everything else (age, likes,
/// salary, ...) stays in `extra` and is sent back verbatim to `/recommend`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub notes: Option<Vec<Note>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.as_deref().unwrap_or(&[])
    }
}

/// `{"user_data": ...}` envelope of the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_data: UserProfile,
}

/// Text classifier variant, sent as `model_select`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextModel {
    #[default]
    AugmentedEn,
    AugmentedSi,
    AugmentedTm,
    OriginalEn,
    OriginalSi,
    OriginalTm,
}

impl TextModel {
    pub const ALL: [TextModel; 6] = [
        TextModel::AugmentedEn,
        TextModel::AugmentedSi,
        TextModel::AugmentedTm,
        TextModel::OriginalEn,
        TextModel::OriginalSi,
        TextModel::OriginalTm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextModel::AugmentedEn => "augmented_en",
            TextModel::AugmentedSi => "augmented_si",
            TextModel::AugmentedTm => "augmented_tm",
            TextModel::OriginalEn => "original_en",
            TextModel::OriginalSi => "original_si",
            TextModel::OriginalTm => "original_tm",
        }
    }
}

impl fmt::Display for TextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextModel::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown text model: {}", s)))
    }
}

/// Form body of `POST /text_classification`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassificationRequest {
    pub input_text: String,
    pub model_select: TextModel,
    pub email: String,
}

/// Response of `POST /text_classification`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassification {
    /// Predicted raw label
    pub pred: String,
    /// Label → confidence percentage
    #[serde(default)]
    pub confs: HashMap<String, f64>,
    /// Profile including the newly stored note
    pub user_data: UserProfile,
}

impl TextClassification {
    pub fn label(&self) -> EmotionLabel {
        normalize(&self.pred)
    }

    /// Confidences, highest first (label order breaks ties)
    pub fn ranked_confidences(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> =
            self.confs.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// Response of `POST /recommend`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "recomendation", default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Recommendation {
    /// Title and description, only when both are present and non-empty
    pub fn suggestion(&self) -> Option<(&str, &str)> {
        let title = self.recommendation.as_deref().filter(|s| !s.trim().is_empty())?;
        let description = self.description.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((title, description))
    }
}

/// Form body of `POST /signin`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

/// Form body of `POST /signup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: u32,
    pub sex: String,
    pub location: String,
    pub relationship_status: String,
    pub designation: String,
    pub salary: u64,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub dislikes: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub weaknesses: String,
}

impl SignupForm {
    pub const SEX_OPTIONS: [&'static str; 3] = ["Male", "Female", "Other"];
    pub const RELATIONSHIP_OPTIONS: [&'static str; 4] =
        ["Single", "In a relationship", "Married", "Other"];

    /// Check the constraints the sign-up form enforces before submitting
    pub fn validate(&self) -> crate::Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::InvalidInput("email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::InvalidInput("password is required".to_string()));
        }
        if self.age < 1 {
            return Err(Error::InvalidInput("age must be at least 1".to_string()));
        }
        if !Self::SEX_OPTIONS.contains(&self.sex.as_str()) {
            return Err(Error::InvalidInput(format!("unknown sex option: {}", self.sex)));
        }
        if !Self::RELATIONSHIP_OPTIONS.contains(&self.relationship_status.as_str()) {
            return Err(Error::InvalidInput(format!(
                "unknown relationship status: {}",
                self.relationship_status
            )));
        }
        Ok(())
    }
}

/// Extract the label from a plain-text classification response
///
/// Some backends answer with a JSON string literal (`"joy"\n`) rather than
/// bare text, so one pair of surrounding quotes is stripped as well.
pub fn parse_label_body(body: &str) -> &str {
    let trimmed = body.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}
