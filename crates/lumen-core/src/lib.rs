//! # Lumen Core
//!
//! Shared types and traits for the Lumen AI chat shell: the LLM provider
//! abstraction, chat messages, the theme data model (including the closed
//! whitelist of themeable CSS custom properties), and the environmental
//! signal subsystem that drives theme proposals.

pub mod config;
pub mod error;
pub mod message;
pub mod provider;
pub mod signal;
pub mod theme;
