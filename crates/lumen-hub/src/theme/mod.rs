//! The AI-generated theme pipeline: prompt construction, reply parsing,
//! CSS sanitization, and generation orchestration.

pub mod generate;
pub mod prompt;
pub mod sanitizer;

pub use generate::{generate_theme, GenerationSuccess, ThemeGenerationRequest};
pub use sanitizer::{sanitize_css, validate_css};
