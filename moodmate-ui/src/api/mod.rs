//! JSON endpoints

pub mod health;

pub use health::health_routes;
