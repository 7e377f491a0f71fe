//! User settings (theme + target language) and the preference seam the
//! translation layer reads from.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::languages;
use crate::messaging::{Message, MessageBus, MessageHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Theme::Auto),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(SettingsError::UnknownTheme(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    /// Target language code.
    #[serde(default)]
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Auto,
            language: languages::FALLBACK_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Read access to the user's language preference.
pub trait Preferences: Send + Sync {
    fn target_language(&self) -> String;

    fn language_title(&self, code: &str) -> Option<String> {
        languages::language_title(code).map(str::to_string)
    }
}

/// Settings held in memory, mirrored to an optional JSON file, and announced
/// on the message bus whenever they change locally.
pub struct SettingsStore {
    settings: RwLock<Settings>,
    path: Option<PathBuf>,
    bus: MessageBus,
}

impl SettingsStore {
    pub fn in_memory(settings: Settings, bus: MessageBus) -> Self {
        Self {
            settings: RwLock::new(settings),
            path: None,
            bus,
        }
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path, bus: MessageBus) -> Result<Self, SettingsError> {
        let settings = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file missing, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), language = %settings.language, "settings loaded");
        Ok(Self {
            settings: RwLock::new(settings),
            path: Some(path.to_path_buf()),
            bus,
        })
    }

    pub fn current(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn theme(&self) -> Theme {
        self.settings.read().theme
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), SettingsError> {
        self.settings.write().theme = theme;
        self.sync()
    }

    pub fn set_language(&self, code: &str) -> Result<(), SettingsError> {
        if !languages::is_supported(code) {
            return Err(SettingsError::UnsupportedLanguage(code.to_string()));
        }
        self.settings.write().language = code.to_string();
        info!(to = code, "target_language_changed");
        self.sync()?;
        self.bus.publish(Message::TargetChanged {
            target: code.to_string(),
        });
        Ok(())
    }

    /// Merge settings received from another context. Empty fields are ignored
    /// and nothing is republished.
    pub fn apply(&self, incoming: &Settings) {
        let mut settings = self.settings.write();
        settings.theme = incoming.theme;
        if !incoming.language.is_empty() {
            settings.language = incoming.language.clone();
        }
    }

    fn sync(&self) -> Result<(), SettingsError> {
        let snapshot = self.current();
        if let Some(path) = &self.path {
            let body = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(path, body)?;
        }
        self.bus.publish(Message::SyncSettings {
            settings: Some(snapshot),
        });
        Ok(())
    }
}

impl Preferences for SettingsStore {
    fn target_language(&self) -> String {
        self.settings.read().language.clone()
    }
}

impl MessageHandler for SettingsStore {
    fn handle(&self, message: &Message) {
        match message {
            Message::SyncSettings {
                settings: Some(incoming),
            } => self.apply(incoming),
            Message::SyncSettings { settings: None } => {
                debug!("settings_requested");
                self.bus.publish(Message::SyncSettings {
                    settings: Some(self.current()),
                });
            }
            Message::TargetChanged { target } if !target.is_empty() => {
                self.settings.write().language = target.clone();
            }
            _ => {}
        }
    }
}
