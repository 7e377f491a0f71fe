//! User session: the backend token, persisted next to the settings file and
//! shared with other contexts over the message bus.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::messaging::{Message, MessageBus, MessageHandler};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("verification transport error: {0}")]
    Transport(String),
}

/// Where outgoing requests read the bearer token from.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

/// Checks a stored token against the backend.
pub trait SessionVerifier: Send + Sync {
    fn verify_token<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), SessionError>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    pub status: bool,
    pub token: Option<String>,
}

#[derive(Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    token: Option<String>,
}

pub struct SessionStore {
    token: RwLock<Option<String>>,
    path: Option<PathBuf>,
    bus: MessageBus,
}

impl SessionStore {
    pub fn in_memory(token: Option<String>, bus: MessageBus) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
            path: None,
            bus,
        }
    }

    /// Load from `path`; a missing file means logged out.
    pub fn load(path: &Path, bus: MessageBus) -> Result<Self, SessionError> {
        let file: SessionFile = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionFile::default(),
            Err(e) => return Err(e.into()),
        };
        let token = file.token.filter(|t| !t.is_empty());
        debug!(path = %path.display(), logged_in = token.is_some(), "session loaded");
        Ok(Self {
            token: RwLock::new(token),
            path: Some(path.to_path_buf()),
            bus,
        })
    }

    /// Use `token` for this run when nothing is stored. Not persisted.
    pub fn seed(&self, token: String) {
        let mut current = self.token.write();
        if current.is_none() && !token.is_empty() {
            *current = Some(token);
        }
    }

    pub fn login_status(&self) -> LoginStatus {
        let token = self.token.read().clone();
        LoginStatus {
            status: token.is_some(),
            token,
        }
    }

    /// Replace the stored token and persist it. Publishes nothing.
    pub fn store_token(&self, token: Option<String>) -> Result<(), SessionError> {
        let token = token.filter(|t| !t.is_empty());
        {
            let mut current = self.token.write();
            if *current == token {
                return Ok(());
            }
            *current = token.clone();
        }
        if let Some(path) = &self.path {
            let body = serde_json::to_string_pretty(&SessionFile {
                token: token.clone(),
            })?;
            std::fs::write(path, body)?;
        }
        info!(logged_in = token.is_some(), "user_token_stored");
        Ok(())
    }

    /// Store `token` and tell the other contexts.
    pub fn login(&self, token: String) -> Result<(), SessionError> {
        self.store_token(Some(token.clone()))?;
        self.bus.publish(Message::StoreUserToken { token: Some(token) });
        Ok(())
    }

    /// Forget the token everywhere.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.store_token(None)?;
        self.bus.publish(Message::StoreUserToken { token: None });
        Ok(())
    }

    /// Verify the stored token. A rejected token is dropped and the logout is
    /// announced; transport failures keep it. Returns whether the session is live.
    pub async fn login_with_last_session(&self, verifier: &dyn SessionVerifier) -> bool {
        let Some(token) = self.current_token() else {
            return false;
        };
        match verifier.verify_token(&token).await {
            Ok(()) => {
                info!("last_session_restored");
                true
            }
            Err(SessionError::Rejected(reason)) => {
                warn!(%reason, "last session rejected, logging out");
                if let Err(e) = self.logout() {
                    warn!(error = %e, "failed to clear rejected token");
                }
                false
            }
            Err(e) => {
                warn!(error = %e, "last session could not be verified");
                false
            }
        }
    }
}

impl TokenSource for SessionStore {
    fn current_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

impl MessageHandler for SessionStore {
    fn handle(&self, message: &Message) {
        match message {
            Message::GetLoginStatus => {
                let LoginStatus { status, token } = self.login_status();
                self.bus.publish(Message::LoginStatus { status, token });
            }
            Message::StoreUserToken { token } => {
                if let Err(e) = self.store_token(token.clone()) {
                    warn!(error = %e, "failed to store user token");
                }
            }
            _ => {}
        }
    }
}
