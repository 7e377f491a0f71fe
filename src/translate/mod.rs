//! Translation layer: request/result types, the provider seam, the TTL cache
//! and the cache-then-provider service.

pub mod cache;
pub mod detail;
pub mod remote;
pub mod service;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::TranslationCache;
pub use detail::LanguageLearningData;
pub use service::TranslateService;

/// Backend function every translation goes through.
pub const TRANSLATE_FUNCTION: &str = "translateWithContext";

/// Source language sent with every request; the backend detects it.
pub const AUTO_SOURCE_LANGUAGE: &str = "auto";

/// Flavour of translation asked from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationKind {
    Simple,
    Detailed,
}

impl TranslationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationKind::Simple => "simple",
            TranslationKind::Detailed => "detailed",
        }
    }
}

impl fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text to translate: one phrase or an ordered batch of phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhraseInput {
    Single(String),
    List(Vec<String>),
}

impl PhraseInput {
    /// Key form of the text. Lists are joined with `|`.
    pub fn joined(&self) -> String {
        match self {
            PhraseInput::Single(text) => text.clone(),
            PhraseInput::List(items) => items.join("|"),
        }
    }
}

impl From<&str> for PhraseInput {
    fn from(text: &str) -> Self {
        PhraseInput::Single(text.to_string())
    }
}

impl From<String> for PhraseInput {
    fn from(text: String) -> Self {
        PhraseInput::Single(text)
    }
}

impl From<Vec<String>> for PhraseInput {
    fn from(items: Vec<String>) -> Self {
        PhraseInput::List(items)
    }
}

/// Arguments of one `translateWithContext` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(skip)]
    pub request_id: String,
    pub translation_type: TranslationKind,
    pub source_language: String,
    pub target_language: String,
    pub phrase: PhraseInput,
    pub context: String,
}

impl TranslateRequest {
    pub fn new(
        kind: TranslationKind,
        target_language: &str,
        phrase: PhraseInput,
        context: &str,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            translation_type: kind,
            source_language: AUTO_SOURCE_LANGUAGE.to_string(),
            target_language: target_language.to_string(),
            phrase,
            context: context.to_string(),
        }
    }
}

/// Decoded translation, shaped by its [`TranslationKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutput {
    Simple(String),
    Detailed(Box<LanguageLearningData>),
}

/// Anything able to run a translation request against a backend.
/// Returns the raw JSON result; decoding is the service's job.
pub trait TranslationProvider: Send + Sync {
    fn run_translation(
        &self,
        request: TranslateRequest,
    ) -> BoxFuture<'_, Result<serde_json::Value, TranslateError>>;
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    Api(String),
    #[error("rate limited")]
    RateLimited,
    #[error("translation timeout")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode {kind} result: {reason}")]
    Decode {
        kind: TranslationKind,
        reason: String,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted provider for service and tracker tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::future::BoxFuture;
    use parking_lot::Mutex;

    use super::cache::DEFAULT_TTL;
    use super::{
        TranslateError, TranslateRequest, TranslateService, TranslationCache, TranslationProvider,
    };
    use crate::clock::{Clock, SystemClock};
    use crate::metrics::MetricsRegistry;
    use crate::messaging::MessageBus;
    use crate::settings::{Settings, SettingsStore, Theme};

    /// Service targeting German over `provider`, with a real-time cache.
    pub fn german_service(provider: Arc<ScriptedProvider>) -> Arc<TranslateService> {
        german_service_with_clock(provider, Arc::new(SystemClock))
    }

    /// As [`german_service`], with the cache reading `clock`.
    pub fn german_service_with_clock(
        provider: Arc<ScriptedProvider>,
        clock: Arc<dyn Clock>,
    ) -> Arc<TranslateService> {
        let prefs = SettingsStore::in_memory(
            Settings {
                theme: Theme::Auto,
                language: "de".into(),
            },
            MessageBus::default(),
        );
        Arc::new(TranslateService::new(
            provider,
            Arc::new(TranslationCache::with_clock(DEFAULT_TTL, clock)),
            Arc::new(prefs),
            Arc::new(MetricsRegistry::new()),
        ))
    }

    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: Mutex<HashMap<String, serde_json::Value>>,
        delays: Mutex<HashMap<String, Duration>>,
        failing: Mutex<bool>,
        calls: AtomicUsize,
        seen: Mutex<Vec<TranslateRequest>>,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply for a phrase (keyed by its joined form).
        pub fn reply(&self, phrase: &str, value: serde_json::Value) {
            self.replies.lock().insert(phrase.to_string(), value);
        }

        pub fn delay(&self, phrase: &str, by: Duration) {
            self.delays.lock().insert(phrase.to_string(), by);
        }

        pub fn fail_all(&self, failing: bool) {
            *self.failing.lock() = failing;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<TranslateRequest> {
            self.seen.lock().clone()
        }
    }

    impl TranslationProvider for ScriptedProvider {
        fn run_translation(
            &self,
            request: TranslateRequest,
        ) -> BoxFuture<'_, Result<serde_json::Value, TranslateError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let phrase = request.phrase.joined();
                self.seen.lock().push(request);
                let delay = self.delays.lock().get(&phrase).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if *self.failing.lock() {
                    return Err(TranslateError::Api("scripted failure".into()));
                }
                let reply = self.replies.lock().get(&phrase).cloned();
                Ok(reply.unwrap_or_else(|| serde_json::Value::String(format!("[t] {phrase}"))))
            })
        }
    }
}
