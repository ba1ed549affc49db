//! Theme data model — the whitelist of themeable CSS custom properties,
//! generated themes, and user-facing theme settings.
//!
//! `THEME_VARS` is the single source of truth for which properties a theme
//! may set and what shape each value must have. The sanitizer's validator,
//! the prompt builder's contract text, and the client's variable listing
//! are all derived from this one table — never duplicate it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal::SignalValue;

// ─── Whitelist ─────────────────────────────────────────────

/// Value shape class for a themeable custom property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarClass {
    /// Hex colors only: `#RGB`, `#RRGGBB`, or `#RRGGBBAA`.
    Color,
    /// A decimal number with a `rem`, `em`, or `px` unit.
    Size,
    /// A multiple of 100 in 100–900.
    Weight,
    /// A font-family stack: letters, whitespace, hyphens, commas, quotes.
    Family,
}

impl VarClass {
    /// True for the typography half of the whitelist.
    pub fn is_typography(self) -> bool {
        !matches!(self, VarClass::Color)
    }
}

/// One entry of the closed whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeVar {
    pub name: &'static str,
    pub class: VarClass,
}

/// The closed whitelist of themeable custom properties.
pub const THEME_VARS: &[ThemeVar] = &[
    // Colors
    ThemeVar { name: "--color-bg-primary", class: VarClass::Color },
    ThemeVar { name: "--color-bg-secondary", class: VarClass::Color },
    ThemeVar { name: "--color-bg-tertiary", class: VarClass::Color },
    ThemeVar { name: "--color-text-primary", class: VarClass::Color },
    ThemeVar { name: "--color-text-secondary", class: VarClass::Color },
    ThemeVar { name: "--color-accent", class: VarClass::Color },
    ThemeVar { name: "--color-accent-hover", class: VarClass::Color },
    ThemeVar { name: "--color-border", class: VarClass::Color },
    ThemeVar { name: "--color-success", class: VarClass::Color },
    ThemeVar { name: "--color-warning", class: VarClass::Color },
    ThemeVar { name: "--color-error", class: VarClass::Color },
    // Typography
    ThemeVar { name: "--font-family-base", class: VarClass::Family },
    ThemeVar { name: "--font-family-heading", class: VarClass::Family },
    ThemeVar { name: "--font-family-mono", class: VarClass::Family },
    ThemeVar { name: "--font-size-sm", class: VarClass::Size },
    ThemeVar { name: "--font-size-base", class: VarClass::Size },
    ThemeVar { name: "--font-size-lg", class: VarClass::Size },
    ThemeVar { name: "--font-weight-normal", class: VarClass::Weight },
    ThemeVar { name: "--font-weight-bold", class: VarClass::Weight },
];

/// Look up a whitelist entry by property name.
pub fn theme_var(name: &str) -> Option<&'static ThemeVar> {
    THEME_VARS.iter().find(|v| v.name == name)
}

/// Whitelisted color property names.
pub fn color_var_names() -> impl Iterator<Item = &'static str> {
    THEME_VARS
        .iter()
        .filter(|v| v.class == VarClass::Color)
        .map(|v| v.name)
}

/// Whitelisted typography property names.
pub fn typography_var_names() -> impl Iterator<Item = &'static str> {
    THEME_VARS
        .iter()
        .filter(|v| v.class.is_typography())
        .map(|v| v.name)
}

// ─── Generated themes ──────────────────────────────────────

/// A Google Fonts family request: validated family name plus weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleFontSpec {
    pub family: String,
    pub weights: Vec<u32>,
}

/// A theme produced by the generation pipeline.
///
/// `css` is always the sanitizer's output — a `GeneratedTheme` is only
/// constructed from an already-sanitized payload, never from raw model
/// text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTheme {
    pub id: String,
    pub name: String,
    pub css: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fonts: Vec<GoogleFontSpec>,
    pub generated_at: DateTime<Utc>,
    /// The signal snapshot that triggered generation, kept for display.
    #[serde(default)]
    pub signals: HashMap<String, SignalValue>,
}

impl GeneratedTheme {
    /// Wrap a sanitized theme payload with a fresh time-based id.
    pub fn from_sanitized(
        name: &str,
        sanitized_css: &str,
        fonts: Vec<GoogleFontSpec>,
        signals: HashMap<String, SignalValue>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("theme_{}", now.timestamp_millis()),
            name: name.to_string(),
            css: sanitized_css.to_string(),
            fonts,
            generated_at: now,
            signals,
        }
    }
}

// ─── Settings ──────────────────────────────────────────────

/// How often the signal monitor polls for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckFrequency {
    High,
    Medium,
    Low,
}

impl CheckFrequency {
    /// Polling interval: 5, 15, or 30 minutes.
    pub fn interval(self) -> Duration {
        match self {
            Self::High => Duration::from_secs(5 * 60),
            Self::Medium => Duration::from_secs(15 * 60),
            Self::Low => Duration::from_secs(30 * 60),
        }
    }
}

/// User-facing theme settings, persisted client-side only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub auto_generate: bool,
    pub check_frequency: CheckFrequency,
    pub use_google_fonts: bool,
    pub prefer_dark_mode: bool,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            auto_generate: false,
            check_frequency: CheckFrequency::Medium,
            use_google_fonts: true,
            prefer_dark_mode: false,
        }
    }
}

// ─── Diagnostics ───────────────────────────────────────────

/// Lint diagnostics returned alongside sanitization results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintReport {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_lookup() {
        assert_eq!(
            theme_var("--color-accent").map(|v| v.class),
            Some(VarClass::Color)
        );
        assert_eq!(
            theme_var("--font-weight-bold").map(|v| v.class),
            Some(VarClass::Weight)
        );
        assert!(theme_var("--custom-hack").is_none());
    }

    #[test]
    fn whitelist_partitions_cover_everything() {
        let colors = color_var_names().count();
        let typography = typography_var_names().count();
        assert_eq!(colors + typography, THEME_VARS.len());
    }

    #[test]
    fn check_frequency_intervals() {
        assert_eq!(CheckFrequency::High.interval().as_secs(), 300);
        assert_eq!(CheckFrequency::Medium.interval().as_secs(), 900);
        assert_eq!(CheckFrequency::Low.interval().as_secs(), 1800);
    }
}
