//! Shared fixtures for wire-level tests.
#![allow(dead_code)] // Not every test binary uses every helper.

use labrec_client::{ClientConfig, CredentialStore, Gateway};
use std::net::TcpListener;
use std::sync::Arc;
use tempfile::TempDir;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// A gateway wired to a mock server with an isolated credential file.
pub struct TestContext {
    pub store: Arc<CredentialStore>,
    pub gateway: Arc<Gateway>,
    _temp: TempDir,
}

impl TestContext {
    pub fn new(server_url: &str) -> Self {
        Self::with_timeout(server_url, 10)
    }

    pub fn with_timeout(server_url: &str, timeout_secs: u64) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = ClientConfig::for_testing(server_url, &temp.path().join("credentials.toml"));
        config.timeout_secs = timeout_secs;
        let store = Arc::new(CredentialStore::open(config.credentials_path().unwrap()));
        let gateway = Arc::new(Gateway::new(&config, Arc::clone(&store)).unwrap());
        Self {
            store,
            gateway,
            _temp: temp,
        }
    }
}
