//! Per-session state of one interactive user
//!
//! The context is an ordinary value: handlers receive it, apply the outcome
//! of their backend call and hand it back to whatever stores it. Nothing in
//! here touches the network.

use crate::api::UserProfile;
use crate::emotion::{normalize, EmotionLabel};
use crate::history::MoodTimeline;
use crate::vote::{Modality, ModalitySlots, MoodVerdict};

/// Auth flag, user profile and modality slots of one session
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    authenticated: bool,
    user: Option<UserProfile>,
    slots: ModalitySlots,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.user.is_some()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Email the backend keys diary notes by; empty when signed out
    pub fn user_email(&self) -> &str {
        self.user.as_ref().map(|u| u.email.as_str()).unwrap_or("")
    }

    pub fn slots(&self) -> &ModalitySlots {
        &self.slots
    }

    /// Mark the session signed in with the profile returned by the backend
    pub fn sign_in(&mut self, profile: UserProfile) {
        tracing::info!(email = %profile.email, "Session signed in");
        self.authenticated = true;
        self.user = Some(profile);
    }

    /// Replace the stored profile, e.g. after a diary entry added a note
    pub fn update_profile(&mut self, profile: UserProfile) {
        self.user = Some(profile);
    }

    /// Normalize a raw classifier label and store it in the modality's slot
    ///
    /// Returns the normalized label so callers can render it.
    pub fn record_classification(&mut self, modality: Modality, raw_label: &str) -> EmotionLabel {
        let label = normalize(raw_label);
        self.slots.set(modality, label.clone());
        label
    }

    /// Majority vote across the populated modality slots
    pub fn dominant_mood(&self) -> MoodVerdict {
        self.slots.majority()
    }

    /// Diary history of the signed-in user
    pub fn timeline(&self) -> MoodTimeline {
        MoodTimeline::from_notes(self.user.as_ref().map(|u| u.notes()).unwrap_or(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::CanonicalEmotion;

    fn profile(email: &str) -> UserProfile {
        UserProfile {
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_is_anonymous_and_empty() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_authenticated());
        assert!(ctx.user().is_none());
        assert_eq!(ctx.user_email(), "");
        assert_eq!(ctx.dominant_mood(), MoodVerdict::NoneDetected);
        assert!(ctx.timeline().is_empty());
    }

    #[test]
    fn test_sign_in_and_profile_update() {
        let mut ctx = SessionContext::new();
        ctx.sign_in(profile("a@b.c"));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.user_email(), "a@b.c");

        let mut updated = profile("a@b.c");
        updated.name = Some("Alex".into());
        ctx.update_profile(updated);
        assert_eq!(ctx.user().unwrap().display_name(), "Alex");
    }

    #[test]
    fn test_record_classification_normalizes_before_storing() {
        let mut ctx = SessionContext::new();
        let label = ctx.record_classification(Modality::Audio, "happy");
        assert_eq!(label, CanonicalEmotion::Joy.into());
        assert_eq!(ctx.slots().get(Modality::Audio), Some(&label));

        ctx.record_classification(Modality::Video, "sad");
        ctx.record_classification(Modality::Text, "😃 Joy");
        assert_eq!(
            ctx.dominant_mood(),
            MoodVerdict::Detected(CanonicalEmotion::Joy.into())
        );
    }
}
