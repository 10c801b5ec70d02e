//! # MoodMate Common Library
//!
//! Shared code for the MoodMate front end including:
//! - Emotion label normalization and encouragement messages
//! - Per-modality vote aggregation
//! - Session context (auth flag, user profile, modality slots)
//! - Mood history timeline built from diary notes
//! - Backend request/response types
//! - Configuration loading

pub mod api;
pub mod config;
pub mod emotion;
pub mod error;
pub mod history;
pub mod session;
pub mod vote;

pub use emotion::{encouragement, normalize, CanonicalEmotion, EmotionLabel};
pub use error::{Error, Result};
pub use session::SessionContext;
pub use vote::{Modality, ModalitySlots, MoodVerdict, VoteTally};
