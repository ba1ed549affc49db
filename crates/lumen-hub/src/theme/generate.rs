//! Theme generation orchestration — validate the request, build the
//! prompt, call the model, parse, sanitize, and return a structured
//! outcome. Stateless per request; never trusts partial success.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use lumen_core::error::{LumenError, Result};
use lumen_core::message::ChatMessage;
use lumen_core::provider::{ChatRequest, LlmProvider};
use lumen_core::theme::{GoogleFontSpec, LintReport};

use super::prompt::{build_theme_prompt, parse_theme_reply};
use super::sanitizer::{sanitize_css, validate_css};

/// Theme generation favors varied output over the chat path's default.
pub const THEME_TEMPERATURE: f32 = 1.0;
pub const THEME_MAX_TOKENS: u32 = 1500;

// ─── Wire types ────────────────────────────────────────────

/// One signal observation as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub raw: serde_json::Value,
    pub label: String,
}

/// User preferences relevant to generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePreferences {
    pub use_google_fonts: bool,
    pub prefer_dark_mode: bool,
}

/// Theme generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeGenerationRequest {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub signals: HashMap<String, SignalSnapshot>,
    pub preferences: ThemePreferences,
    #[serde(default)]
    pub current_theme_css: Option<String>,
}

/// The generated theme as returned to the client. `css` is sanitizer
/// output, never the model's raw text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemePayload {
    pub name: String,
    pub css: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fonts: Vec<GoogleFontSpec>,
}

/// Successful generation outcome: the sanitized theme plus diagnostics
/// (warnings are informational even on success).
#[derive(Debug, Clone)]
pub struct GenerationSuccess {
    pub theme: ThemePayload,
    pub lint: LintReport,
}

// ─── Orchestration ─────────────────────────────────────────

/// Run the full generation pipeline against a provider.
///
/// Fail-fast validation order: provider+model present, at least one
/// signal, provider enabled. Every failure mode maps to a distinct
/// `LumenError` variant so the API boundary can report parse-contract,
/// security, and empty-result failures separately.
pub async fn generate_theme(
    provider: &dyn LlmProvider,
    req: &ThemeGenerationRequest,
) -> Result<GenerationSuccess> {
    if req.provider.trim().is_empty() || req.model.trim().is_empty() {
        return Err(LumenError::Validation(
            "provider and model are required".to_string(),
        ));
    }
    if req.signals.is_empty() {
        return Err(LumenError::Validation(
            "at least one signal is required".to_string(),
        ));
    }
    if !provider.is_enabled() {
        return Err(LumenError::ProviderDisabled(req.provider.clone()));
    }

    // Deterministic prompt ordering regardless of map iteration order.
    let mut signals: Vec<(&str, &SignalSnapshot)> = req
        .signals
        .iter()
        .map(|(id, snapshot)| (id.as_str(), snapshot))
        .collect();
    signals.sort_by_key(|(id, _)| *id);

    let (system, user) =
        build_theme_prompt(&signals, &req.preferences, req.current_theme_css.as_deref());

    info!(provider = %req.provider, model = %req.model, "requesting theme generation");
    let response = provider
        .chat(ChatRequest {
            messages: vec![ChatMessage::system(&system), ChatMessage::user(&user)],
            model: Some(req.model.clone()),
            max_tokens: THEME_MAX_TOKENS,
            temperature: THEME_TEMPERATURE,
        })
        .await?;

    let reply = response.content.unwrap_or_default();
    if reply.trim().is_empty() {
        return Err(LumenError::ParseContract(
            "model returned an empty reply".to_string(),
        ));
    }

    let parsed = parse_theme_reply(&reply, req.preferences.use_google_fonts)?;

    let outcome = sanitize_css(&parsed.css)?;
    let mut report = validate_css(&parsed.css)?;
    for removed in &outcome.removed {
        report
            .warnings
            .push(format!("Removed {}: {}", removed.property, removed.reason));
    }

    if outcome.css.is_empty() {
        return Err(LumenError::EmptyTheme { report });
    }

    info!(theme = %parsed.name, removed = outcome.removed.len(), "theme generated");
    Ok(GenerationSuccess {
        theme: ThemePayload {
            name: parsed.name,
            css: outcome.css,
            fonts: parsed.fonts,
        },
        lint: report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lumen_core::message::{LlmResponse, TokenUsage};
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted provider that records the request it received.
    struct MockProvider {
        reply: Option<String>,
        enabled: bool,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl MockProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                enabled: true,
                seen: Mutex::new(None),
            }
        }

        fn disabled() -> Self {
            Self {
                reply: None,
                enabled: false,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn chat(&self, request: ChatRequest) -> lumen_core::error::Result<LlmResponse> {
            *self.seen.lock().unwrap() = Some(request);
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: "mock-model".to_string(),
                usage: TokenUsage::default(),
                finish_reason: "stop".to_string(),
            })
        }
    }

    fn request() -> ThemeGenerationRequest {
        let mut signals = HashMap::new();
        signals.insert(
            "time-of-day".to_string(),
            SignalSnapshot {
                raw: json!({"hour": 20, "period": "evening"}),
                label: "Evening (8:00 pm)".to_string(),
            },
        );
        ThemeGenerationRequest {
            provider: "mock".to_string(),
            model: "mock-model".to_string(),
            signals,
            preferences: ThemePreferences {
                use_google_fonts: false,
                prefer_dark_mode: true,
            },
            current_theme_css: None,
        }
    }

    const GOOD_REPLY: &str = "```css\n/* Theme: Dusk Harbor */\n:root {\n  --color-bg-primary: #1a1b2e;\n  --color-text-primary: #e8e6f0;\n  --color-accent: #7f5af0;\n  --font-size-base: 1rem;\n  --font-weight-bold: 700;\n  --not-allowed: #fff;\n}\n```";

    #[tokio::test]
    async fn end_to_end_success() {
        let provider = MockProvider::replying(GOOD_REPLY);
        let result = generate_theme(&provider, &request()).await.unwrap();

        assert_eq!(result.theme.name, "Dusk Harbor");
        assert!(result.theme.css.contains("--color-accent: #7f5af0;"));
        assert!(result.theme.css.contains("--font-weight-bold: 700;"));
        assert!(!result.theme.css.contains("--not-allowed"));
        assert!(result.lint.valid);
        assert!(result
            .lint
            .warnings
            .iter()
            .any(|w| w.contains("--not-allowed")));
    }

    #[tokio::test]
    async fn uses_high_temperature_and_requested_model() {
        let provider = MockProvider::replying(GOOD_REPLY);
        generate_theme(&provider, &request()).await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let chat = seen.as_ref().unwrap();
        assert_eq!(chat.temperature, THEME_TEMPERATURE);
        assert_eq!(chat.model.as_deref(), Some("mock-model"));
        assert_eq!(chat.messages.len(), 2);
    }

    #[tokio::test]
    async fn missing_provider_or_model_is_a_validation_error() {
        let provider = MockProvider::replying(GOOD_REPLY);
        let mut req = request();
        req.model = String::new();
        let err = generate_theme(&provider, &req).await.unwrap_err();
        assert!(matches!(err, LumenError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_signal_set_is_a_validation_error() {
        let provider = MockProvider::replying(GOOD_REPLY);
        let mut req = request();
        req.signals.clear();
        let err = generate_theme(&provider, &req).await.unwrap_err();
        assert!(matches!(err, LumenError::Validation(_)));
    }

    #[tokio::test]
    async fn disabled_provider_is_rejected_before_any_call() {
        let provider = MockProvider::disabled();
        let err = generate_theme(&provider, &request()).await.unwrap_err();
        assert!(matches!(err, LumenError::ProviderDisabled(_)));
        assert!(provider.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn reply_without_fenced_block_is_a_parse_failure() {
        let provider = MockProvider::replying("Sorry, I can't help with that.");
        let err = generate_theme(&provider, &request()).await.unwrap_err();
        assert!(matches!(err, LumenError::ParseContract(_)));
        assert!(err.to_string().contains("no fenced CSS block"));
    }

    #[tokio::test]
    async fn dangerous_css_is_a_security_failure() {
        let provider =
            MockProvider::replying("```css\n:root { --custom-hack: url(evil.com); }\n```");
        let err = generate_theme(&provider, &request()).await.unwrap_err();
        assert!(matches!(err, LumenError::SecurityRejection(_)));
    }

    #[tokio::test]
    async fn nothing_surviving_sanitization_is_an_empty_theme_failure() {
        let provider =
            MockProvider::replying("```css\n:root { --custom-hack: #fff; --other: red; }\n```");
        let err = generate_theme(&provider, &request()).await.unwrap_err();
        match err {
            LumenError::EmptyTheme { report } => {
                assert!(report
                    .warnings
                    .iter()
                    .any(|w| w.contains("not in the whitelist")));
            }
            other => panic!("expected EmptyTheme, got {:?}", other),
        }
    }
}
