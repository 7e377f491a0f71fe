//! subtitle-marker: mark words inside subtitle lines and translate them in
//! context through a remote backend, with a 24h in-memory result cache.

pub mod cancellation;
pub mod clock;
pub mod config;
pub mod console;
pub mod languages;
pub mod marker;
pub mod messaging;
pub mod metrics;
pub mod session;
pub mod settings;
pub mod translate;

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use config::{AppConfig, ConfigError};
use marker::SelectionTracker;
use messaging::{spawn_dispatch, HandlerChain, MessageBus, MessageHandler};
use metrics::MetricsRegistry;
use session::{SessionError, SessionStore};
use settings::{SettingsError, SettingsStore};
use translate::remote::RemoteFunctionClient;
use translate::{TranslateError, TranslateService, TranslationCache};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("invalid input: {0}")]
    Usage(String),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; `json` switches to one JSON object per event.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("subtitle_marker=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Everything a UI layer needs, wired from one config.
pub struct MarkerApp {
    pub config: AppConfig,
    pub bus: MessageBus,
    pub settings: Arc<SettingsStore>,
    pub session: Arc<SessionStore>,
    pub remote: Arc<RemoteFunctionClient>,
    pub metrics: Arc<MetricsRegistry>,
    pub service: Arc<TranslateService>,
    pub tracker: SelectionTracker,
}

impl MarkerApp {
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let bus = MessageBus::default();
        let settings = Arc::new(SettingsStore::load(&config.settings_path, bus.clone())?);
        let session = Arc::new(SessionStore::load(&config.session_path, bus.clone())?);
        if let Some(token) = &config.api_token {
            session.seed(token.clone());
        }
        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(TranslationCache::new(config.cache_ttl()));
        let remote = Arc::new(RemoteFunctionClient::new(&config, session.clone())?);

        let service = Arc::new(TranslateService::new(
            remote.clone(),
            cache,
            settings.clone(),
            Arc::clone(&metrics),
        ));
        let tracker = SelectionTracker::new(Arc::clone(&service), Arc::clone(&metrics));

        info!(backend = %config.backend_url, ttl_secs = config.cache_ttl_secs, "marker app ready");
        Ok(Self {
            config,
            bus,
            settings,
            session,
            remote,
            metrics,
            service,
            tracker,
        })
    }

    /// Answer other contexts on the bus: settings and session requests and
    /// updates. Must be called inside a tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let chain = HandlerChain::new(vec![
            self.settings.clone() as Arc<dyn MessageHandler>,
            self.session.clone() as Arc<dyn MessageHandler>,
        ]);
        info!(origin = self.bus.origin(), "message dispatcher started");
        spawn_dispatch(&self.bus, Arc::new(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::messaging::Message;
    use crate::session::TokenSource;

    fn app_in(dir: &tempfile::TempDir, api_token: Option<&str>) -> MarkerApp {
        let config = AppConfig {
            settings_path: dir.path().join("settings.json"),
            session_path: dir.path().join("session.json"),
            api_token: api_token.map(str::to_string),
            ..AppConfig::default()
        };
        MarkerApp::from_config(config).unwrap()
    }

    async fn settle(mut done: impl FnMut() -> bool) {
        for _ in 0..50 {
            if done() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn app_wires_from_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir, None);
        assert_eq!(app.service.target_language_title(), "English");
        assert!(app.service.cache().is_empty());
        assert_eq!(app.tracker.selected_phrase(), "");
        assert!(!app.session.login_status().status);
    }

    #[tokio::test]
    async fn configured_token_seeds_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir, Some("cfg-token"));
        assert_eq!(app.session.current_token().as_deref(), Some("cfg-token"));
    }

    #[tokio::test]
    async fn started_app_applies_target_changes_from_peers() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir, None);
        let dispatcher = app.start();
        let peer = app.bus.connect();

        peer.publish(Message::TargetChanged { target: "fr".into() });
        settle(|| app.service.target_language_title() == "French").await;
        assert_eq!(app.service.target_language_title(), "French");
        dispatcher.abort();
    }

    #[tokio::test]
    async fn started_app_answers_settings_and_login_requests() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir, Some("tok"));
        let dispatcher = app.start();
        let peer = app.bus.connect();
        let mut rx = peer.subscribe();

        peer.publish(Message::SyncSettings { settings: None });
        peer.publish(Message::GetLoginStatus);

        let mut replies = Vec::new();
        while replies.len() < 2 {
            let envelope = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if envelope.origin == app.bus.origin() {
                replies.push(envelope.message);
            }
        }
        assert!(matches!(
            &replies[0],
            Message::SyncSettings { settings: Some(s) } if s.language == "en"
        ));
        assert_eq!(
            replies[1],
            Message::LoginStatus {
                status: true,
                token: Some("tok".into())
            }
        );
        dispatcher.abort();
    }

    #[tokio::test]
    async fn peer_logout_clears_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir, Some("tok"));
        let dispatcher = app.start();
        app.bus
            .connect()
            .publish(Message::StoreUserToken { token: None });
        settle(|| app.session.current_token().is_none()).await;
        assert_eq!(app.session.current_token(), None);
        dispatcher.abort();
    }
}
