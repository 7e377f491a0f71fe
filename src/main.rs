use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use subtitle_marker::config::AppConfig;
use subtitle_marker::languages::{self, LanguageHints};
use subtitle_marker::marker::{Anchor, InputEvent, Key};
use subtitle_marker::settings::{Preferences, Theme};
use subtitle_marker::{init_tracing, AppError, MarkerApp};

#[derive(Parser)]
#[command(name = "subtitle-marker", version, about = "Mark subtitle words and translate them in context")]
struct Cli {
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print timing and counter metrics after the command.
    #[arg(long, global = true)]
    metrics: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mark words of a subtitle line and translate the selected phrase.
    Translate {
        /// The subtitle line; also sent as translation context.
        #[arg(long)]
        context: String,
        /// Subtitle line number.
        #[arg(long, default_value_t = 1)]
        line: u32,
        /// 1-based index of a word to mark. Repeat for phrases.
        #[arg(long = "word", required = true)]
        words: Vec<u32>,
        /// Ask for the detailed linguistic record instead.
        #[arg(long)]
        detailed: bool,
    },
    /// Show or change settings.
    Settings {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        theme: Option<Theme>,
    },
    /// Guess a default target language from location and locale.
    DetectLanguage {
        /// Store the result as the target language.
        #[arg(long)]
        save: bool,
    },
    /// Store a backend token for later runs.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored backend token.
    Logout,
    /// Show whether a backend token is stored.
    Status {
        /// Check the stored token with the backend; a rejected one is removed.
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let app = MarkerApp::from_config(config)?;
    let dispatcher = app.start();

    let outcome = execute(&app, cli.command).await;
    dispatcher.abort();
    if cli.metrics {
        let report = serde_json::to_string_pretty(&app.metrics.report())
            .map_err(|e| AppError::Usage(e.to_string()))?;
        println!("{report}");
    }
    outcome
}

async fn execute(app: &MarkerApp, command: Command) -> Result<(), AppError> {
    match command {
        Command::Translate {
            context,
            line,
            words,
            detailed,
        } => translate(app, context, line, &words, detailed).await,
        Command::Settings { language, theme } => {
            if let Some(theme) = theme {
                app.settings.set_theme(theme)?;
            }
            if let Some(language) = language {
                app.settings.set_language(&language)?;
            }
            let current = app.settings.current();
            println!(
                "theme: {:?}\nlanguage: {} ({})",
                current.theme,
                current.language,
                app.settings
                    .language_title(&current.language)
                    .unwrap_or_else(|| "unknown".into())
            );
            Ok(())
        }
        Command::DetectLanguage { save } => {
            let country = languages::locate_country(
                &app.config.geo_lookup_url,
                Duration::from_secs(app.config.request_timeout_secs),
            )
            .await;
            let hints = LanguageHints {
                stored: None,
                country,
                preferred: std::env::var("LANG").ok().into_iter().collect(),
                ui_language: None,
            };
            let detected = languages::detect_default_language(&hints);
            info!(country = ?hints.country, %detected, "default_language_detected");
            if save {
                app.settings.set_language(&detected)?;
            }
            println!("{detected}");
            Ok(())
        }
        Command::Login { token } => {
            app.session.login(token)?;
            println!("logged in");
            Ok(())
        }
        Command::Logout => {
            app.session.logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Status { verify } => {
            let live = if verify {
                app.session
                    .login_with_last_session(app.remote.as_ref())
                    .await
            } else {
                app.session.login_status().status
            };
            println!("{}", if live { "logged in" } else { "logged out" });
            Ok(())
        }
    }
}

async fn translate(
    app: &MarkerApp,
    context: String,
    line: u32,
    words: &[u32],
    detailed: bool,
) -> Result<(), AppError> {
    let tokens: Vec<&str> = context.split_whitespace().collect();
    let tracker = &app.tracker;
    tracker.set_context(context.clone());

    tracker.handle_input(InputEvent::KeyDown(Key::Control));
    for &index in words {
        let token = index
            .checked_sub(1)
            .and_then(|i| tokens.get(i as usize))
            .ok_or_else(|| AppError::Usage(format!("no word {index} in the subtitle line")))?;
        tracker.mark_word(line, index, *token, Anchor::default());
    }

    let phrase = tracker.selected_phrase();
    if detailed {
        let data = app
            .service
            .fetch_detailed_translation(&phrase, &context)
            .await?;
        let pretty = serde_json::to_string_pretty(&data)
            .map_err(|e| AppError::Usage(e.to_string()))?;
        println!("{pretty}");
        return Ok(());
    }

    if let Some(commit) = tracker.handle_input(InputEvent::KeyUp(Key::Control)) {
        if let Err(e) = commit.await {
            warn!(error = %e, "commit task failed");
        }
    }
    match tracker.translation_for(&phrase) {
        Some(translated) => println!("{phrase} → {translated}"),
        None => println!("{phrase} → (no translation)"),
    }
    Ok(())
}
