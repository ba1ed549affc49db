//! Lumen CLI — chat with an AI, and let it dress the room.
//!
//! The shell keeps conversation history client-side, watches
//! environmental signals (time of day), and proposes a freshly generated
//! theme when they change. Proposals are previewed live and only persist
//! when the user keeps them.

mod document;
mod proposal;
mod store;
mod theme_apply;

use std::io::Write;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

use lumen_core::config::LumenConfig;
use lumen_core::message::{ChatMessage, HistoryEntry};
use lumen_core::provider::{ChatRequest, LlmProvider, ProviderConfig};
use lumen_core::signal::SignalMonitor;
use lumen_core::theme::{GeneratedTheme, ThemeSettings};
use lumen_hub::api::{start_server, ApiState};
use lumen_hub::providers::{self, ProviderRegistry};
use lumen_hub::theme::generate::{
    generate_theme, SignalSnapshot, ThemeGenerationRequest, ThemePreferences,
};

use proposal::ProposalFlow;
use store::{AppSettings, StateStore, SLOT_APP_SETTINGS, SLOT_THEME_SETTINGS};
use theme_apply::ThemeService;

// ─── CLI Definition ────────────────────────────────────────

/// Lumen — an AI chat shell with adaptive themes 🎨
#[derive(Parser)]
#[command(name = "lumen", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 💬 Start interactive chat (with automatic theme proposals)
    Chat {
        /// Provider (overrides config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// API key (overrides config)
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        /// API base URL override
        #[arg(long)]
        api_base: Option<String>,
    },

    /// ❓ Send a single message and get a response
    Ask {
        /// The message to send
        message: String,

        /// Provider
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// API key
        #[arg(short = 'k', long)]
        api_key: Option<String>,
    },

    /// 🎨 Manage themes
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// ⚙️  Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 🌐 Start the REST API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// 📊 Show providers, settings, and theme status
    Status,
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Generate and preview a theme right now
    Generate,
    /// Show the active and favorite themes
    Show,
    /// Restore the favorite theme as active
    Restore,
    /// Clear the active theme
    Clear,
    /// Change a theme setting (auto_generate, check_frequency,
    /// use_google_fonts, prefer_dark_mode)
    Set { key: String, value: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value (provider, model, api_key, api_base)
    Set { key: String, value: String },
    /// Show the config file location
    Path,
}

// ─── Helpers ───────────────────────────────────────────────

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}", format!("  ✦ Lumen v{} ✦", version).cyan().bold());
    println!("{}", "  chat that matches the hour".cyan());
    println!();
}

/// Resolve provider config: CLI args → saved config → provider defaults.
fn resolve_provider_config(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    cli_api_key: Option<&str>,
    cli_api_base: Option<&str>,
) -> anyhow::Result<ProviderConfig> {
    let saved = LumenConfig::load(&LumenConfig::default_path())?;

    let provider = cli_provider
        .map(str::to_string)
        .unwrap_or_else(|| saved.provider.provider.clone());
    let model = cli_model
        .map(str::to_string)
        .or_else(|| {
            if saved.provider.provider == provider {
                Some(saved.provider.model.clone())
            } else {
                None
            }
        })
        .unwrap_or_else(|| providers::default_model(&provider).to_string());
    let api_key = cli_api_key
        .map(str::to_string)
        .or_else(|| saved.provider.api_key.clone())
        .or_else(|| providers::resolve_api_key(&provider));
    let api_base = cli_api_base
        .map(str::to_string)
        .or_else(|| saved.provider.api_base.clone());

    Ok(ProviderConfig {
        provider,
        model,
        api_key,
        api_base,
        ..Default::default()
    })
}

fn load_theme_settings(store: &StateStore) -> ThemeSettings {
    store.load(SLOT_THEME_SETTINGS).unwrap_or_default()
}

fn render_theme(theme: &GeneratedTheme) {
    println!();
    println!("  {} {}", "Theme:".bold(), theme.name.magenta().bold());
    for line in theme.css.lines() {
        println!("    {}", line.dimmed());
    }
    for font in &theme.fonts {
        let weights = font
            .weights
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {} ({})", "Font:".bold(), font.family, weights);
    }
    if !theme.signals.is_empty() {
        for value in theme.signals.values() {
            println!("  {} {}", "Signal:".bold(), value.label.dimmed());
        }
    }
    println!();
}

// ─── Theme proposal flow ───────────────────────────────────

/// Run one generation round: request, preview, and ask the user to keep
/// or dismiss. Skipped entirely when a request is already outstanding.
async fn propose_theme(
    provider: &dyn LlmProvider,
    provider_id: &str,
    model: &str,
    monitor: &SignalMonitor,
    settings: &ThemeSettings,
    flow: &mut ProposalFlow,
    service: &mut ThemeService,
) -> anyhow::Result<()> {
    let Some(seq) = flow.begin_generation() else {
        return Ok(());
    };

    let signals = monitor
        .current()
        .iter()
        .map(|(id, value)| {
            (
                id.clone(),
                SignalSnapshot {
                    raw: value.raw.clone(),
                    label: value.label.clone(),
                },
            )
        })
        .collect();

    let request = ThemeGenerationRequest {
        provider: provider_id.to_string(),
        model: model.to_string(),
        signals,
        preferences: ThemePreferences {
            use_google_fonts: settings.use_google_fonts,
            prefer_dark_mode: settings.prefer_dark_mode,
        },
        current_theme_css: service.current_css().map(str::to_string),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("designing a theme for this moment...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = generate_theme(provider, &request).await;
    spinner.finish_and_clear();

    let success = match result {
        Ok(success) => success,
        Err(e) => {
            // Prior theme state stays untouched; no automatic retry.
            flow.fail_generation(seq);
            println!("{} {}", "Theme generation failed:".red(), e);
            return Ok(());
        }
    };

    for warning in &success.lint.warnings {
        println!("  {} {}", "note:".yellow(), warning.dimmed());
    }

    let theme = GeneratedTheme::from_sanitized(
        &success.theme.name,
        &success.theme.css,
        success.theme.fonts,
        monitor.current().clone(),
    );

    if !flow.offer(seq, theme.clone(), service) {
        return Ok(());
    }
    render_theme(&theme);

    let keep = Confirm::new()
        .with_prompt("Keep this theme?")
        .default(true)
        .interact()?;
    if keep {
        let favorite = Confirm::new()
            .with_prompt("Mark it as your favorite?")
            .default(false)
            .interact()?;
        flow.commit(service, favorite)?;
        println!("{}", "Theme applied. ✨".green());
    } else {
        flow.dismiss(service);
        println!("{}", "Reverted to the previous look.".dimmed());
    }
    Ok(())
}

// ─── Chat loop ─────────────────────────────────────────────

async fn run_chat(config: ProviderConfig) -> anyhow::Result<()> {
    print_banner();

    let provider = providers::from_config(&config);
    let store = StateStore::open_default();
    let settings = load_theme_settings(&store);
    let mut service = ThemeService::new(StateStore::open_default());
    let mut flow = ProposalFlow::new();

    // Remember the session defaults for `lumen status`.
    let _ = store.save(
        SLOT_APP_SETTINGS,
        &AppSettings {
            provider: Some(config.provider.clone()),
            model: Some(config.model.clone()),
        },
    );

    if let Some(active) = service.apply_persisted() {
        println!("  {} {}", "Active theme:".bold(), active.name.magenta());
    }
    println!(
        "  {} {} · {}",
        "Provider:".bold(),
        config.provider,
        config.model
    );
    println!("  {}", "Commands: /theme  /quit".dimmed());
    println!();

    let mut monitor = SignalMonitor::with_defaults();
    let interval = settings.check_frequency.interval();
    let mut last_check = Instant::now();

    // Immediate first check; every signal reports significant on its
    // first observation, so this proposes an initial theme.
    let check = monitor.check();
    if settings.auto_generate && check.changed {
        propose_theme(
            &provider,
            &config.provider,
            &config.model,
            &monitor,
            &settings,
            &mut flow,
            &mut service,
        )
        .await?;
    }

    let mut history: Vec<HistoryEntry> = Vec::new();
    let mut editor = rustyline::DefaultEditor::new()?;

    loop {
        if settings.auto_generate && last_check.elapsed() >= interval {
            last_check = Instant::now();
            if monitor.check().changed {
                propose_theme(
                    &provider,
                    &config.provider,
                    &config.model,
                    &monitor,
                    &settings,
                    &mut flow,
                    &mut service,
                )
                .await?;
            }
        }

        let line = match editor.readline(&"you ❯ ".cyan().to_string()) {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        match line {
            "/quit" | "/exit" => break,
            "/theme" => {
                monitor.check();
                propose_theme(
                    &provider,
                    &config.provider,
                    &config.model,
                    &monitor,
                    &settings,
                    &mut flow,
                    &mut service,
                )
                .await?;
            }
            _ => {
                history.push(HistoryEntry::new(ChatMessage::user(line)));
                let spinner = ProgressBar::new_spinner();
                spinner.enable_steady_tick(Duration::from_millis(100));
                let result = provider
                    .chat(ChatRequest {
                        messages: history.iter().map(|e| e.message.clone()).collect(),
                        ..Default::default()
                    })
                    .await;
                spinner.finish_and_clear();

                match result {
                    Ok(response) => {
                        let content = response.content.unwrap_or_default();
                        println!("{} {}", "lumen ❯".magenta(), content);
                        history.push(HistoryEntry::new(ChatMessage::assistant(&content)));
                    }
                    Err(e) => println!("{} {}", "Error:".red(), e),
                }
            }
        }
    }

    println!("{}", "\nGoodbye! 👋".cyan());
    Ok(())
}

// ─── Subcommand handlers ───────────────────────────────────

async fn run_ask(config: ProviderConfig, message: &str) -> anyhow::Result<()> {
    let provider = providers::from_config(&config);
    let response = provider
        .chat(ChatRequest {
            messages: vec![ChatMessage::user(message)],
            ..Default::default()
        })
        .await?;
    println!("{}", response.content.unwrap_or_default());
    Ok(())
}

async fn run_theme_action(action: ThemeAction, config: ProviderConfig) -> anyhow::Result<()> {
    let store = StateStore::open_default();
    let mut service = ThemeService::new(StateStore::open_default());

    match action {
        ThemeAction::Generate => {
            let provider = providers::from_config(&config);
            let settings = load_theme_settings(&store);
            let mut flow = ProposalFlow::new();
            let mut monitor = SignalMonitor::with_defaults();
            monitor.check();
            service.apply_persisted();
            propose_theme(
                &provider,
                &config.provider,
                &config.model,
                &monitor,
                &settings,
                &mut flow,
                &mut service,
            )
            .await?;
        }
        ThemeAction::Show => {
            match service.load_active() {
                Some(theme) => render_theme(&theme),
                None => println!("No active theme."),
            }
            match service.load_favorite() {
                Some(theme) => println!("  {} {}", "Favorite:".bold(), theme.name.magenta()),
                None => println!("No favorite theme."),
            }
        }
        ThemeAction::Restore => match service.restore_favorite()? {
            Some(theme) => println!("Restored favorite: {}", theme.name.magenta()),
            None => println!("No favorite theme to restore."),
        },
        ThemeAction::Clear => {
            service.clear_active()?;
            println!("Active theme cleared.");
        }
        ThemeAction::Set { key, value } => {
            let mut settings = load_theme_settings(&store);
            match key.as_str() {
                "auto_generate" => settings.auto_generate = value.parse()?,
                "use_google_fonts" => settings.use_google_fonts = value.parse()?,
                "prefer_dark_mode" => settings.prefer_dark_mode = value.parse()?,
                "check_frequency" => {
                    settings.check_frequency =
                        serde_json::from_value(serde_json::Value::String(value.clone()))
                            .map_err(|_| {
                                anyhow::anyhow!(
                                    "check_frequency must be one of: high, medium, low"
                                )
                            })?
                }
                other => anyhow::bail!("unknown theme setting '{}'", other),
            }
            store.save(SLOT_THEME_SETTINGS, &settings)?;
            println!("Set {} = {}", key, value);
        }
    }
    Ok(())
}

fn run_config_action(action: ConfigAction) -> anyhow::Result<()> {
    let path = LumenConfig::default_path();
    match action {
        ConfigAction::Show => {
            let config = LumenConfig::load(&path)?;
            // Never echo the API key back.
            let mut shown = config.clone();
            if shown.provider.api_key.is_some() {
                shown.provider.api_key = Some("••••••••".to_string());
            }
            println!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = LumenConfig::load(&path)?;
            match key.as_str() {
                "provider" => config.provider.provider = value.clone(),
                "model" => config.provider.model = value.clone(),
                "api_key" => config.provider.api_key = Some(value.clone()),
                "api_base" => config.provider.api_base = Some(value.clone()),
                other => anyhow::bail!("unknown config key '{}'", other),
            }
            config.save(&path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn run_status() -> anyhow::Result<()> {
    print_banner();
    let registry = ProviderRegistry::from_env();
    println!("{}", "Providers:".bold());
    for info in registry.list() {
        let mark = if info.enabled {
            "✓".green()
        } else {
            "✗".red()
        };
        println!("  {} {} ({})", mark, info.id, info.default_model.dimmed());
    }

    let monitor = SignalMonitor::with_defaults();
    println!();
    println!("{}", "Signals:".bold());
    for (id, description) in monitor.describe_signals() {
        println!("  {} — {}", id, description.dimmed());
    }

    let store = StateStore::open_default();
    let settings = load_theme_settings(&store);
    println!();
    println!("{}", "Theme settings:".bold());
    println!("  auto_generate: {}", settings.auto_generate);
    println!("  check_frequency: {:?}", settings.check_frequency);
    println!("  use_google_fonts: {}", settings.use_google_fonts);
    println!("  prefer_dark_mode: {}", settings.prefer_dark_mode);

    let service = ThemeService::new(StateStore::open_default());
    println!();
    match service.load_active() {
        Some(theme) => println!("Active theme: {}", theme.name.magenta()),
        None => println!("Active theme: none"),
    }
    match service.load_favorite() {
        Some(theme) => println!("Favorite theme: {}", theme.name.magenta()),
        None => println!("Favorite theme: none"),
    }

    if let Some(app) = store.load::<AppSettings>(SLOT_APP_SETTINGS) {
        let provider = app.provider.unwrap_or_else(|| "-".to_string());
        let model = app.model.unwrap_or_else(|| "-".to_string());
        println!("Last session: {} · {}", provider, model.dimmed());
    }
    std::io::stdout().flush()?;
    Ok(())
}

// ─── Entry point ───────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = resolve_provider_config(None, None, None, None)?;
            run_chat(config).await
        }
        Some(Commands::Chat {
            provider,
            model,
            api_key,
            api_base,
        }) => {
            let config = resolve_provider_config(
                provider.as_deref(),
                model.as_deref(),
                api_key.as_deref(),
                api_base.as_deref(),
            )?;
            run_chat(config).await
        }
        Some(Commands::Ask {
            message,
            provider,
            model,
            api_key,
        }) => {
            let config = resolve_provider_config(
                provider.as_deref(),
                model.as_deref(),
                api_key.as_deref(),
                None,
            )?;
            run_ask(config, &message).await
        }
        Some(Commands::Theme { action }) => {
            let config = resolve_provider_config(None, None, None, None)?;
            run_theme_action(action, config).await
        }
        Some(Commands::Config { action }) => run_config_action(action),
        Some(Commands::Serve { host, port }) => {
            let config = LumenConfig::load(&LumenConfig::default_path())?;
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let state = ApiState {
                providers: ProviderRegistry::from_env(),
            };
            start_server(state, &host, port).await
        }
        Some(Commands::Status) => run_status(),
    }
}
