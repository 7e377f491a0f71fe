//! Cache-then-provider translation flow for simple and detailed lookups.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    LanguageLearningData, PhraseInput, TranslateError, TranslateRequest, TranslationCache,
    TranslationKind, TranslationOutput, TranslationProvider,
};
use crate::metrics::{metric_names, MetricsRegistry};
use crate::settings::Preferences;

pub struct TranslateService {
    provider: Arc<dyn TranslationProvider>,
    cache: Arc<TranslationCache>,
    preferences: Arc<dyn Preferences>,
    metrics: Arc<MetricsRegistry>,
}

impl TranslateService {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        cache: Arc<TranslationCache>,
        preferences: Arc<dyn Preferences>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            provider,
            cache,
            preferences,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Title of the current target language as the backend expects it.
    /// Unknown codes are sent as-is.
    pub fn target_language_title(&self) -> String {
        let code = self.preferences.target_language();
        self.preferences.language_title(&code).unwrap_or(code)
    }

    pub async fn fetch_simple_translation(
        &self,
        text: PhraseInput,
        context: &str,
    ) -> Result<String, TranslateError> {
        match self.fetch(TranslationKind::Simple, text, context).await? {
            TranslationOutput::Simple(translated) => Ok(translated),
            TranslationOutput::Detailed(_) => Err(unexpected_shape(TranslationKind::Simple)),
        }
    }

    pub async fn fetch_detailed_translation(
        &self,
        text: &str,
        context: &str,
    ) -> Result<LanguageLearningData, TranslateError> {
        match self
            .fetch(TranslationKind::Detailed, PhraseInput::from(text), context)
            .await?
        {
            TranslationOutput::Detailed(data) => Ok(*data),
            TranslationOutput::Simple(_) => Err(unexpected_shape(TranslationKind::Detailed)),
        }
    }

    async fn fetch(
        &self,
        kind: TranslationKind,
        text: PhraseInput,
        context: &str,
    ) -> Result<TranslationOutput, TranslateError> {
        let title = self.target_language_title();

        if let Some(hit) = self.cache.get(kind, &title, &text, context) {
            self.metrics.increment(metric_names::CACHE_HIT);
            return Ok(hit);
        }
        self.metrics.increment(metric_names::CACHE_MISS);

        let request = TranslateRequest::new(kind, &title, text.clone(), context);
        let request_id = request.request_id.clone();
        debug!(%request_id, kind = %kind, target = %title, "translation_requested");

        let span = self.metrics.span(metric_names::PROVIDER_LATENCY);
        let raw = match self.provider.run_translation(request).await {
            Ok(raw) => raw,
            Err(e) => {
                self.metrics.increment(metric_names::PROVIDER_FAILURE);
                warn!(%request_id, kind = %kind, error = %e, "translation failed");
                return Err(e);
            }
        };
        let elapsed_us = span.finish();

        let output = decode(kind, raw, &text, context)?;
        self.cache.put(kind, &title, &text, context, output.clone());
        debug!(%request_id, elapsed_ms = elapsed_us / 1000.0, "translation_cached");
        Ok(output)
    }
}

fn unexpected_shape(kind: TranslationKind) -> TranslateError {
    TranslateError::Decode {
        kind,
        reason: "cached value has the wrong shape".into(),
    }
}

fn decode(
    kind: TranslationKind,
    raw: serde_json::Value,
    text: &PhraseInput,
    context: &str,
) -> Result<TranslationOutput, TranslateError> {
    match kind {
        TranslationKind::Simple => match raw {
            serde_json::Value::String(translated) => Ok(TranslationOutput::Simple(translated)),
            other => Err(TranslateError::Decode {
                kind,
                reason: format!("expected string, got {other}"),
            }),
        },
        TranslationKind::Detailed => {
            let mut data: LanguageLearningData =
                serde_json::from_value(raw).map_err(|e| TranslateError::Decode {
                    kind,
                    reason: e.to_string(),
                })?;
            data.phrase = text.joined();
            data.context = context.to_string();
            Ok(TranslationOutput::Detailed(Box::new(data)))
        }
    }
}
