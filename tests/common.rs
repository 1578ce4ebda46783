//! Shared helpers for integration tests.

#![allow(dead_code)]

use asset_gc::daemon::{self, AppState, CleanupRunner, HistoryStore};
use asset_gc::gc::{GarbageCollector, RetentionPolicy};
use asset_gc::references::MemoryReferenceSource;
use asset_gc::storage::{MemoryObjectStore, ObjectStore, StoredObject};
use chrono::{DateTime, Duration, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Stores an object created `days` ago.
pub fn insert_aged(store: &MemoryObjectStore, path: &str, days: i64) {
    store.insert(StoredObject::new(path, Utc::now() - Duration::days(days)));
}

/// Stores an object created at `at`.
pub fn insert_at(store: &MemoryObjectStore, path: &str, at: DateTime<Utc>) {
    store.insert(StoredObject::new(path, at));
}

/// Adds a row to `table.column` pointing at `path` in `store`.
pub fn reference(
    refs: &MemoryReferenceSource,
    store: &MemoryObjectStore,
    table: &str,
    column: &str,
    path: &str,
) {
    refs.insert(table, column, store.public_url(path));
}

/// Trigger daemon bound to an ephemeral port over memory backends.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: MemoryObjectStore,
    pub refs: MemoryReferenceSource,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(secret: Option<&str>, history: Option<HistoryStore>) -> Self {
        Self::start_with_policy(secret, history, RetentionPolicy::scheduled()).await
    }

    pub async fn start_with_policy(
        secret: Option<&str>,
        history: Option<HistoryStore>,
        policy: RetentionPolicy,
    ) -> Self {
        let store = MemoryObjectStore::new("images");
        let refs = MemoryReferenceSource::new();
        let collector = GarbageCollector::new(
            Arc::new(store.clone()),
            Arc::new(refs.clone()),
            policy,
        )
        .expect("valid policy");

        let state = Arc::new(AppState {
            runner: Arc::new(CleanupRunner::new(collector, history)),
            trigger_secret: secret.map(str::to_string),
            metrics: None,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = daemon::router(state).into_make_service_with_connect_info::<SocketAddr>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            store,
            refs,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    pub async fn get_with_secret(
        &self,
        path: &str,
        secret: &str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).bearer_auth(secret).send().await
    }

    pub async fn post(
        &self,
        path: &str,
        secret: Option<&str>,
    ) -> reqwest::Result<reqwest::Response> {
        let mut request = self.client.post(self.url(path));
        if let Some(secret) = secret {
            request = request.bearer_auth(secret);
        }
        request.send().await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
