//! # Lumen Hub
//!
//! Server side of the Lumen shell: the provider registry and
//! OpenAI-compatible provider, the AI theme generation pipeline
//! (sanitizer, prompt contract, orchestration), and the REST API that
//! exposes both to clients.

pub mod api;
pub mod middleware;
pub mod providers;
pub mod theme;
