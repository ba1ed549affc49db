//! Theme prompt builder and reply parser — the text contract between the
//! generation endpoint and the model.
//!
//! The builder derives the allowed-property listing from the core
//! whitelist table, so prompt text and validator can never drift apart.
//! The parser treats the model reply as untrusted free text: it extracts
//! the candidate stylesheet and optional fonts, and fails with explicit
//! contract errors — full CSS validation happens downstream in the
//! sanitizer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use lumen_core::error::{LumenError, Result};
use lumen_core::theme::{color_var_names, typography_var_names, GoogleFontSpec};

use super::generate::{SignalSnapshot, ThemePreferences};

const MAX_FONT_FAMILIES: usize = 2;
const MAX_FAMILY_LEN: usize = 99;
const DEFAULT_THEME_NAME: &str = "Generated Theme";

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z]*[ \t]*\n((?s).*?)```").unwrap());

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*Theme:\s*([^*]+?)\s*\*/").unwrap());

// ─── Builder ───────────────────────────────────────────────

/// Build the (system, user) instruction pair for theme generation.
pub fn build_theme_prompt(
    signals: &[(&str, &SignalSnapshot)],
    prefs: &ThemePreferences,
    current_css: Option<&str>,
) -> (String, String) {
    let colors: Vec<&str> = color_var_names().collect();
    let typography: Vec<&str> = typography_var_names().collect();

    let mut system = String::from(
        "You are a visual theme designer for a chat application. \
         You produce complete CSS custom-property themes.\n\n\
         You may set ONLY the following custom properties:\n\n",
    );
    system.push_str("Color properties (hex values only):\n");
    for name in &colors {
        system.push_str(&format!("  {}\n", name));
    }
    system.push_str("\nTypography properties:\n");
    for name in &typography {
        system.push_str(&format!("  {}\n", name));
    }
    system.push_str(
        "\nHard rules for values:\n\
         - Colors: hex only (#RGB, #RRGGBB, or #RRGGBBAA). No named colors, no rgb()/hsl().\n\
         - Sizes: a decimal number immediately followed by rem, em, or px. No unitless values, no %.\n\
         - Font weights: exactly one of 100, 200, 300, 400, 500, 600, 700, 800, 900.\n\
         - Font families: letters, spaces, hyphens, commas, and quotes only.\n\
         - Never use url(), @import, javascript:, or any external reference.\n\n\
         Output format:\n\
         Reply with a single fenced CSS code block containing one :root { } rule \
         that sets every property listed above. The first line inside the block \
         must be a comment naming the theme: /* Theme: <name> */\n",
    );
    if prefs.use_google_fonts {
        system.push_str(
            "\nYou may additionally suggest up to 2 Google Fonts. After the CSS block, \
             add a fenced JSON code block of the form \
             {\"fonts\": [{\"family\": \"Name\", \"weights\": [400, 700]}]}.\n",
        );
    } else {
        system.push_str(
            "\nDo not suggest web fonts; use only generic or system font family stacks.\n",
        );
    }

    let mut user = String::from("Design a theme for the current context.\n\nContext signals:\n");
    for (id, snapshot) in signals {
        user.push_str(&format!("- {}: {}\n", id, snapshot.label));
    }
    user.push_str(&format!(
        "\nThe user prefers a {} appearance.\n",
        if prefs.prefer_dark_mode { "dark" } else { "light" }
    ));
    if let Some(css) = current_css {
        user.push_str(&format!(
            "\nThe currently active theme is:\n{}\n\n\
             The new theme must differ materially from it — shift the hue, invert the \
             color temperature, change saturation or contrast, or pick a different \
             color harmony. Do not return a near-copy.\n",
            css
        ));
    }

    (system, user)
}

// ─── Parser ────────────────────────────────────────────────

/// Structured candidate extracted from a model reply. `css` is still raw
/// and untrusted — it has passed only a minimal sanity check.
#[derive(Debug, Clone)]
pub struct ParsedTheme {
    pub name: String,
    pub css: String,
    pub fonts: Vec<GoogleFontSpec>,
}

/// Parse the model's free-text reply into a theme candidate.
///
/// The first fenced block (whatever its language tag) is the stylesheet;
/// a missing block or a block without `:root`/`--` markers is a contract
/// violation. Fonts come from a later fenced JSON block and are optional:
/// missing or malformed font data is silently ignored.
pub fn parse_theme_reply(reply: &str, fonts_enabled: bool) -> Result<ParsedTheme> {
    let blocks: Vec<String> = FENCED_RE
        .captures_iter(reply)
        .map(|cap| cap[1].trim().to_string())
        .collect();

    let css = blocks
        .first()
        .ok_or_else(|| {
            LumenError::ParseContract("no fenced CSS block found in model reply".to_string())
        })?
        .clone();

    if !css.contains(":root") && !css.contains("--") {
        return Err(LumenError::ParseContract(
            "fenced block contains no :root rule or custom properties".to_string(),
        ));
    }

    let name = NAME_RE
        .captures(&css)
        .map(|cap| cap[1].trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_THEME_NAME.to_string());

    let fonts = if fonts_enabled {
        extract_fonts(&blocks[1..])
    } else {
        Vec::new()
    };

    Ok(ParsedTheme { name, css, fonts })
}

/// Pull a `{"fonts": [...]}` payload out of the remaining fenced blocks.
/// Best effort: the first block that parses as JSON with a `fonts` array
/// wins; anything else is skipped.
fn extract_fonts(blocks: &[String]) -> Vec<GoogleFontSpec> {
    for block in blocks {
        let parsed: Value = match serde_json::from_str(block) {
            Ok(v) => v,
            Err(e) => {
                debug!("skipping non-JSON fenced block: {}", e);
                continue;
            }
        };
        let Some(entries) = parsed.get("fonts").and_then(Value::as_array) else {
            continue;
        };
        let fonts: Vec<GoogleFontSpec> = entries
            .iter()
            .filter_map(validate_font_entry)
            .take(MAX_FONT_FAMILIES)
            .collect();
        return fonts;
    }
    Vec::new()
}

/// Validate one font entry: family sanitized to letters/digits/space/
/// hyphen (1–99 chars after), weights filtered to multiples of 100 in
/// [100, 900] with a 400 fallback when none survive.
fn validate_font_entry(entry: &Value) -> Option<GoogleFontSpec> {
    let family_raw = entry.get("family")?.as_str()?;
    let family: String = family_raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect();
    let family = family.trim().to_string();
    if family.is_empty() || family.len() > MAX_FAMILY_LEN {
        return None;
    }

    let mut weights: Vec<u32> = entry
        .get("weights")
        .and_then(Value::as_array)
        .map(|ws| {
            ws.iter()
                .filter_map(Value::as_i64)
                .filter(|w| (100..=900).contains(w) && w % 100 == 0)
                .map(|w| w as u32)
                .collect()
        })
        .unwrap_or_default();
    if weights.is_empty() {
        weights.push(400);
    }

    Some(GoogleFontSpec { family, weights })
}
