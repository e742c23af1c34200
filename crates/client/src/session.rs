//! Session lifecycle: login, registration, logout, restore.

use crate::credentials::CredentialStore;
use crate::gateway::Gateway;
use labrec_core::{Identity, Session};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    user: Identity,
}

/// Owns the authentication operations and derives session state from
/// credential presence.
///
/// State machine: Unauthenticated → (login success) → Authenticated →
/// (logout, or a 401 detected by the gateway) → Unauthenticated.
pub struct SessionManager {
    gateway: Arc<Gateway>,
    store: Arc<CredentialStore>,
    identity: RwLock<Option<Identity>>,
}

impl SessionManager {
    pub fn new(gateway: Arc<Gateway>, store: Arc<CredentialStore>) -> Self {
        Self {
            gateway,
            store,
            identity: RwLock::new(None),
        }
    }

    /// Startup restore. A persisted token is trusted without a verification
    /// round trip and stays trusted until a request using it is rejected;
    /// the identity is unknown until the next explicit login.
    pub fn restore(&self) -> Session {
        let session = self.session();
        if session.authenticated {
            tracing::debug!("restored persisted session without verification");
        }
        session
    }

    /// Exchange credentials for a bearer token.
    ///
    /// On success the token and identity are recorded and every consumer of
    /// [`SessionManager::session`] sees the transition. On any failure —
    /// non-2xx or a malformed body — prior session state is left unchanged
    /// and `false` is returned; nothing is thrown outward, user-facing
    /// messaging is the caller's decision.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let body = json!({ "email": email, "password": password });
        match self
            .gateway
            .post_json::<LoginResponse, _>("/api/auth/login", &body)
            .await
        {
            Ok(response) if !response.access_token.trim().is_empty() => {
                self.store.set(Some(response.access_token));
                *self.identity.write().unwrap_or_else(|e| e.into_inner()) = Some(response.user);
                true
            }
            Ok(_) => {
                tracing::warn!("login response carried an empty access token");
                false
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "login failed");
                false
            }
        }
    }

    /// Create an account. Same response contract as [`SessionManager::login`],
    /// except registration never logs the user in — that is a separate,
    /// explicit decision by the caller.
    pub async fn register(&self, name: &str, email: &str, password: &str, role: &str) -> bool {
        let body = json!({
            "name": name,
            "email": email,
            "password": password,
            "role": role,
        });
        match self
            .gateway
            .post_json::<serde_json::Value, _>("/api/auth/register", &body)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "registration failed");
                false
            }
        }
    }

    /// Clear the credential and identity unconditionally. Idempotent.
    pub fn logout(&self) {
        self.store.set(None);
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// The derived session view. Authentication is recomputed from credential
    /// presence on every call, so a gateway-forced logout is reflected here
    /// with no stale window.
    pub fn session(&self) -> Session {
        if self.store.get().is_none() {
            return Session::anonymous();
        }
        Session {
            authenticated: true,
            identity: self
                .identity
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    /// Watch authentication-state transitions (true while authenticated).
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.store.subscribe()
    }
}
