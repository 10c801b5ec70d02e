//! Backend API types shared between the client and its tests

pub mod types;

pub use types::*;
