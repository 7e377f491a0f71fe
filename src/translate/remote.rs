//! HTTP client for the hosted translation backend.
//! Runs the `translateWithContext` server function; pooled connections via
//! reqwest and a minimum spacing between requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, warn};

use super::{TranslateError, TranslateRequest, TranslationProvider, TRANSLATE_FUNCTION};
use crate::config::AppConfig;
use crate::session::{SessionError, SessionVerifier, TokenSource};

#[derive(Serialize)]
struct FunctionCall<'a> {
    name: &'a str,
    args: &'a TranslateRequest,
}

#[derive(Serialize)]
struct VerifyToken<'a> {
    token: &'a str,
}

pub struct RemoteFunctionClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    /// Earliest instant the next request may leave.
    next_allowed: Arc<tokio::sync::Mutex<Instant>>,
    min_interval: Duration,
}

impl RemoteFunctionClient {
    /// `tokens` is read on every request, so logins and logouts apply at once.
    pub fn new(config: &AppConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TranslateError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            tokens,
            next_allowed: Arc::new(tokio::sync::Mutex::new(Instant::now())),
            min_interval: Duration::from_millis(config.min_request_interval_ms),
        })
    }

    async fn rate_limit_wait(&self) {
        let mut next = self.next_allowed.lock().await;
        let now = Instant::now();
        if *next > now {
            tokio::time::sleep(*next - now).await;
        }
        *next = Instant::now() + self.min_interval;
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.current_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn function_request(&self, request: &TranslateRequest) -> reqwest::RequestBuilder {
        let body = FunctionCall {
            name: TRANSLATE_FUNCTION,
            args: request,
        };
        self.authorized(self.http.post(format!("{}/function/run", self.base_url)).json(&body))
    }

    /// One attempt, no retry. Failures surface to the caller.
    async fn call(&self, request: TranslateRequest) -> Result<serde_json::Value, TranslateError> {
        self.rate_limit_wait().await;

        let builder = self.function_request(&request);
        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TranslateError::Timeout
            } else {
                TranslateError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!(request_id = %request.request_id, "backend rate limited");
            return Err(TranslateError::RateLimited);
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TranslateError::Api(format!(
                "unexpected status {}: {}",
                status,
                body_text.chars().take(200).collect::<String>()
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            TranslateError::Decode {
                kind: request.translation_type,
                reason: e.to_string(),
            }
        })?;
        debug!(
            request_id = %request.request_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "backend_function_returned"
        );
        Ok(unwrap_envelope(value))
    }
}

/// Results may come wrapped as `{ "data": ... }`.
fn unwrap_envelope(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

impl SessionVerifier for RemoteFunctionClient {
    fn verify_token<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let response = self
                .http
                .post(format!("{}/verify/token", self.base_url))
                .json(&VerifyToken { token })
                .send()
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else if status.is_client_error() {
                Err(SessionError::Rejected(status.to_string()))
            } else {
                Err(SessionError::Transport(format!("unexpected status {status}")))
            }
        })
    }
}

impl TranslationProvider for RemoteFunctionClient {
    fn run_translation(
        &self,
        request: TranslateRequest,
    ) -> BoxFuture<'_, Result<serde_json::Value, TranslateError>> {
        Box::pin(self.call(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MessageBus;
    use crate::session::SessionStore;
    use crate::translate::{PhraseInput, TranslationKind};

    fn client(config: &AppConfig, session: &Arc<SessionStore>) -> RemoteFunctionClient {
        RemoteFunctionClient::new(config, session.clone()).unwrap()
    }

    #[test]
    fn envelope_is_unwrapped() {
        let wrapped = serde_json::json!({ "data": "Hallo", "status": "success" });
        assert_eq!(unwrap_envelope(wrapped), serde_json::json!("Hallo"));
        assert_eq!(
            unwrap_envelope(serde_json::json!("Hallo")),
            serde_json::json!("Hallo")
        );
        let bare = serde_json::json!({ "translation": {} });
        assert_eq!(unwrap_envelope(bare.clone()), bare);
    }

    #[test]
    fn call_body_names_the_backend_function() {
        let request = TranslateRequest::new(
            TranslationKind::Simple,
            "German",
            PhraseInput::from("hello"),
            "",
        );
        let body = serde_json::to_value(FunctionCall {
            name: TRANSLATE_FUNCTION,
            args: &request,
        })
        .unwrap();
        assert_eq!(body["name"], "translateWithContext");
        assert_eq!(body["args"]["targetLanguage"], "German");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = AppConfig {
            backend_url: "https://api.example.test/".into(),
            ..AppConfig::default()
        };
        let session = Arc::new(SessionStore::in_memory(None, MessageBus::default()));
        assert_eq!(client(&config, &session).base_url, "https://api.example.test");
    }

    #[test]
    fn requests_carry_the_current_session_token() {
        let session = Arc::new(SessionStore::in_memory(None, MessageBus::default()));
        let client = client(&AppConfig::default(), &session);
        let request =
            TranslateRequest::new(TranslationKind::Simple, "German", PhraseInput::from("hi"), "");
        let auth = |client: &RemoteFunctionClient| {
            client
                .function_request(&request)
                .build()
                .unwrap()
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .map(|v| v.to_str().unwrap().to_string())
        };

        assert_eq!(auth(&client), None);
        session.store_token(Some("tok-1".into())).unwrap();
        assert_eq!(auth(&client).as_deref(), Some("Bearer tok-1"));
        session.store_token(None).unwrap();
        assert_eq!(auth(&client), None);
    }

    #[test]
    fn function_request_targets_run_endpoint() {
        let session = Arc::new(SessionStore::in_memory(None, MessageBus::default()));
        let client = client(&AppConfig::default(), &session);
        let request =
            TranslateRequest::new(TranslationKind::Simple, "German", PhraseInput::from("hi"), "");
        let built = client.function_request(&request).build().unwrap();
        assert_eq!(built.method(), &reqwest::Method::POST);
        assert_eq!(built.url().as_str(), "http://localhost:8080/function/run");
    }
}
