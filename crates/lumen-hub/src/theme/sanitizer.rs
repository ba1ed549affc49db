//! CSS sanitizer — reduces untrusted model output to the whitelisted,
//! shape-valid custom-property declarations it contains.
//!
//! Everything here is a pure function over the input text; safe to call
//! from concurrent requests. The dangerous-pattern check is a hard gate
//! over the entire raw input: one forbidden token anywhere aborts the
//! whole payload, valid declarations included.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use lumen_core::error::{LumenError, Result};
use lumen_core::theme::{theme_var, LintReport, VarClass};

// ─── Dangerous patterns ────────────────────────────────────

const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    ("javascript:", r"(?i)javascript\s*:"),
    ("expression(", r"(?i)expression\s*\("),
    ("@import", r"(?i)@import"),
    ("url(", r"(?i)url\s*\("),
    ("behavior:", r"(?i)behavior\s*:"),
    ("-moz-binding", r"(?i)-moz-binding"),
    ("data:", r"(?i)data\s*:"),
];

static DANGEROUS_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).unwrap()))
        .collect()
});

static DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(--[A-Za-z0-9-]+)\s*:\s*([^;{}]+);").unwrap());

static HEX_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?(?:rem|em|px)$").unwrap());

static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9]00$").unwrap());

static FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^[A-Za-z\s,'"-]+$"#).unwrap());

/// Reject input containing any forbidden construct, before any parsing.
pub fn check_dangerous_patterns(input: &str) -> Result<()> {
    for (label, re) in DANGEROUS_RES.iter() {
        if re.is_match(input) {
            return Err(LumenError::SecurityRejection(format!(
                "forbidden pattern '{}' found in CSS",
                label
            )));
        }
    }
    Ok(())
}

// ─── Declarations ──────────────────────────────────────────

/// One extracted `--name: value;` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// Pull custom-property declarations out of the input, in order, whether
/// or not they sit inside a `:root { }` block.
pub fn extract_declarations(input: &str) -> Vec<Declaration> {
    DECL_RE
        .captures_iter(input)
        .map(|cap| Declaration {
            property: cap[1].to_string(),
            value: cap[2].trim().to_string(),
        })
        .collect()
}

/// Check one declaration against the whitelist and its value-shape rule.
///
/// Whitelist membership is checked first: a non-whitelisted property never
/// reaches shape checking, so its reason is always the whitelist one.
pub fn validate_property(property: &str, value: &str) -> std::result::Result<(), String> {
    let var = theme_var(property)
        .ok_or_else(|| format!("Property '{}' is not in the whitelist", property))?;

    let shape_ok = match var.class {
        VarClass::Color => HEX_COLOR_RE.is_match(value),
        VarClass::Size => SIZE_RE.is_match(value),
        VarClass::Weight => WEIGHT_RE.is_match(value),
        VarClass::Family => FAMILY_RE.is_match(value),
    };

    if shape_ok {
        Ok(())
    } else {
        Err(format!("Invalid value '{}' for {}", value, property))
    }
}

// ─── Sanitize ──────────────────────────────────────────────

/// A declaration dropped during sanitization, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedProperty {
    pub property: String,
    pub value: String,
    pub reason: String,
}

/// Result of sanitizing untrusted CSS.
#[derive(Debug, Clone)]
pub struct SanitizeOutcome {
    /// Surviving declarations re-emitted in a single `:root { }` block,
    /// or the empty string when nothing survived.
    pub css: String,
    pub removed: Vec<RemovedProperty>,
}

/// Keep only whitelisted, shape-valid declarations.
///
/// Errors only on dangerous patterns; invalid declarations are dropped
/// and recorded, never fatal. Idempotent on its own output.
pub fn sanitize_css(input: &str) -> Result<SanitizeOutcome> {
    check_dangerous_patterns(input)?;

    let mut kept = Vec::new();
    let mut removed = Vec::new();

    for decl in extract_declarations(input) {
        match validate_property(&decl.property, &decl.value) {
            Ok(()) => kept.push(decl),
            Err(reason) => removed.push(RemovedProperty {
                property: decl.property,
                value: decl.value,
                reason,
            }),
        }
    }

    let css = if kept.is_empty() {
        // Explicit "no valid theme" signal, not a malformed stylesheet.
        String::new()
    } else {
        let mut out = String::from(":root {\n");
        for decl in &kept {
            out.push_str(&format!("  {}: {};\n", decl.property, decl.value));
        }
        out.push('}');
        out
    };

    Ok(SanitizeOutcome { css, removed })
}

// ─── Lint ──────────────────────────────────────────────────

/// Structural diagnostics over the raw input. Same dangerous-pattern gate
/// as `sanitize_css`; unbalanced braces and unterminated quotes are hard
/// errors, a missing `--` declaration is only a warning.
pub fn validate_css(input: &str) -> Result<LintReport> {
    check_dangerous_patterns(input)?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let open = input.matches('{').count();
    let close = input.matches('}').count();
    if open != close {
        errors.push(format!("Unbalanced braces: {} '{{' vs {} '}}'", open, close));
    }

    if input.matches('\'').count() % 2 != 0 {
        errors.push("Unterminated single quote".to_string());
    }
    if input.matches('"').count() % 2 != 0 {
        errors.push("Unterminated double quote".to_string());
    }

    if extract_declarations(input).is_empty() {
        warnings.push("No custom properties found".to_string());
    }

    Ok(LintReport {
        valid: errors.is_empty(),
        warnings,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_hex_forms_on_color_properties() {
        for value in ["#abc", "#aabbcc", "#aabbccdd", "#ABC", "#1A2b3C"] {
            assert!(
                validate_property("--color-accent", value).is_ok(),
                "expected {} to validate",
                value
            );
        }
    }

    #[test]
    fn rejects_non_hex_color_values() {
        for value in ["red", "rgb(1, 2, 3)", "aabbcc", "hsl(120, 50%, 50%)", "#12"] {
            let err = validate_property("--color-accent", value).unwrap_err();
            assert!(err.contains("Invalid value"), "got: {}", err);
        }
    }

    #[test]
    fn rejects_non_whitelisted_properties_regardless_of_value() {
        for value in ["#aabbcc", "anything at all"] {
            let err = validate_property("--custom-hack", value).unwrap_err();
            assert!(err.contains("not in the whitelist"), "got: {}", err);
        }
    }

    #[test]
    fn size_values_require_a_unit() {
        assert!(validate_property("--font-size-base", "1rem").is_ok());
        assert!(validate_property("--font-size-base", "0.875rem").is_ok());
        assert!(validate_property("--font-size-base", "14px").is_ok());
        assert!(validate_property("--font-size-base", "1.2em").is_ok());
        assert!(validate_property("--font-size-base", "16").is_err());
        assert!(validate_property("--font-size-base", "100%").is_err());
    }

    #[test]
    fn weights_are_multiples_of_100() {
        assert!(validate_property("--font-weight-bold", "700").is_ok());
        assert!(validate_property("--font-weight-bold", "100").is_ok());
        assert!(validate_property("--font-weight-bold", "900").is_ok());
        assert!(validate_property("--font-weight-bold", "bold").is_err());
        assert!(validate_property("--font-weight-bold", "750").is_err());
        assert!(validate_property("--font-weight-bold", "1000").is_err());
    }

    #[test]
    fn family_values_block_function_like_text() {
        assert!(validate_property("--font-family-base", "'Inter', sans-serif").is_ok());
        assert!(validate_property("--font-family-base", "Georgia, serif").is_ok());
        assert!(validate_property("--font-family-base", "calc(1 + 1)").is_err());
    }

    #[test]
    fn extracts_declarations_with_and_without_root_block() {
        let bare = "--color-accent: #abc;\n--font-size-base: 1rem;";
        let wrapped = ":root {\n  --color-accent: #abc;\n  --font-size-base: 1rem;\n}";
        for input in [bare, wrapped] {
            let decls = extract_declarations(input);
            assert_eq!(decls.len(), 2);
            assert_eq!(decls[0].property, "--color-accent");
            assert_eq!(decls[1].value, "1rem");
        }
    }

    #[test]
    fn sanitize_drops_invalid_and_keeps_valid() {
        let input = ":root {\n  --color-accent: #aabbcc;\n  --color-border: red;\n  --evil: #fff;\n}";
        let out = sanitize_css(input).unwrap();
        assert!(out.css.contains("--color-accent: #aabbcc;"));
        assert!(!out.css.contains("--color-border"));
        assert_eq!(out.removed.len(), 2);
        assert!(out.removed[0].reason.contains("Invalid value"));
        assert!(out.removed[1].reason.contains("not in the whitelist"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let input = "--color-accent: #aabbcc; --font-weight-bold: 700; --bogus: 12;";
        let first = sanitize_css(input).unwrap();
        let second = sanitize_css(&first.css).unwrap();
        assert_eq!(first.css, second.css);
        assert!(second.removed.is_empty());
    }

    #[test]
    fn empty_output_when_nothing_survives() {
        let out = sanitize_css("--nope: red; --also-nope: blue;").unwrap();
        assert_eq!(out.css, "");
        assert_eq!(out.removed.len(), 2);
    }

    #[test]
    fn dangerous_tokens_abort_the_whole_payload() {
        let payloads = [
            "--color-accent: #abc; background: url(evil.png);",
            "JAVASCRIPT:alert(1)",
            "@import 'other.css';",
            "width: expression(alert(1));",
            "behavior: something;",
            "--x: data:text/html;base64,xxx;",
            "-moz-binding: something;",
        ];
        for payload in payloads {
            assert!(
                matches!(
                    sanitize_css(payload),
                    Err(LumenError::SecurityRejection(_))
                ),
                "sanitize accepted: {}",
                payload
            );
            assert!(check_dangerous_patterns(payload).is_err());
            assert!(validate_css(payload).is_err());
        }
    }

    #[test]
    fn lint_reports_structural_errors() {
        let report = validate_css(":root {\n  --color-accent: #abc;\n").unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].contains("Unbalanced braces"));

        let report = validate_css("--font-family-base: 'Inter, sans-serif;").unwrap();
        assert!(report.errors.iter().any(|e| e.contains("single quote")));
    }

    #[test]
    fn lint_warns_when_no_custom_properties() {
        let report = validate_css("body. color. nothing here").unwrap();
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["No custom properties found"]);
    }
}
