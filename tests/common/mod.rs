use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use odialingua::audio::{AudioBlob, AudioSink};
use odialingua::auth::User;
use odialingua::config::BackendConfig;
use odialingua::storage::LocalStore;

#[allow(dead_code)]
pub fn create_temp_store() -> (LocalStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("local.db");
    let store = LocalStore::new_with_path(db_path).expect("failed to create local store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn backend_config(uri: &str) -> BackendConfig {
    BackendConfig {
        url: uri.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn user() -> User {
    User {
        id: "u1".to_string(),
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
    }
}

/// Sink that finishes every clip immediately
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingSink {
    plays: AtomicUsize,
}

#[allow(dead_code)]
impl CountingSink {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for CountingSink {
    async fn play(&self, _clip: AudioBlob, _stop: CancellationToken) -> odialingua::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
