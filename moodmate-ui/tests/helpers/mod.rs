//! Test Helper Utilities
//!
//! Shared utilities for testing moodmate-ui

#![allow(dead_code)]

pub mod fake_backend;

pub use fake_backend::{FakeBackend, FakeConfig};
