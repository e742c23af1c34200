//! Authenticated user identity and the derived session view.

use serde::{Deserialize, Serialize};

/// Identity returned by the authentication endpoint on login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Point-in-time session view.
///
/// Derived from credential presence, never stored independently of it: a
/// credential cleared anywhere (logout, or a rejected request) makes the next
/// derived view unauthenticated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    /// Known only after an explicit login in this process. A session restored
    /// from a persisted credential is authenticated with no identity.
    pub identity: Option<Identity>,
}

impl Session {
    /// The unauthenticated session.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            identity: None,
        }
    }
}
