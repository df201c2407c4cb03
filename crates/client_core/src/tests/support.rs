//! Test doubles shared by the controller and runtime tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{BoardId, HostContext, ItemId},
    protocol::BackendRequest,
};
use storage::{KeyValueStore, MemoryStore};
use tokio::sync::Mutex;

use crate::{
    backend::BackendApi,
    controller::WorkflowController,
    credentials::{Clock, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY},
    error::WorkflowError,
    host::{HostPlatform, Notice},
};

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request: BackendRequest,
    pub bearer: Option<String>,
}

/// Backend double that records every dispatch and answers from a per-action
/// queue of scripted replies.
#[derive(Default)]
pub struct ScriptedBackend {
    pub sent: Mutex<Vec<SentRequest>>,
    pub replies: Mutex<HashMap<&'static str, VecDeque<Result<Value, WorkflowError>>>>,
}

impl ScriptedBackend {
    pub async fn reply(&self, action: &'static str, reply: Result<Value, WorkflowError>) {
        self.replies
            .lock()
            .await
            .entry(action)
            .or_default()
            .push_back(reply);
    }

    pub async fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_actions(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|sent| sent.request.action())
            .collect()
    }
}

#[async_trait]
impl BackendApi for ScriptedBackend {
    async fn dispatch(
        &self,
        request: &BackendRequest,
        bearer: Option<&str>,
    ) -> Result<Value, WorkflowError> {
        self.sent.lock().await.push(SentRequest {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });
        self.replies
            .lock()
            .await
            .get_mut(request.action())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(WorkflowError::Network("no scripted reply".into())))
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub notices: Mutex<Vec<Notice>>,
    pub refreshes: Mutex<u32>,
    pub redirects: Mutex<Vec<String>>,
}

#[async_trait]
impl HostPlatform for RecordingHost {
    async fn show_notice(&self, notice: Notice) -> Result<()> {
        self.notices.lock().await.push(notice);
        Ok(())
    }

    async fn request_refresh(&self) -> Result<()> {
        *self.refreshes.lock().await += 1;
        Ok(())
    }

    async fn redirect(&self, url: &str) -> Result<()> {
        self.redirects.lock().await.push(url.to_string());
        Ok(())
    }
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(millis: i64) -> Self {
        Self(AtomicI64::new(millis))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub controller: WorkflowController,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryStore>,
    pub host: Arc<RecordingHost>,
    pub clock: Arc<ManualClock>,
}

pub const NOW: i64 = 1_700_000_000_000;

pub fn harness() -> Harness {
    let backend = Arc::new(ScriptedBackend::default());
    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(RecordingHost::default());
    let clock = Arc::new(ManualClock::at(NOW));
    let controller = WorkflowController::new_with_dependencies(
        Some(backend.clone()),
        store.clone(),
        host.clone(),
        clock.clone(),
    );
    Harness {
        controller,
        backend,
        store,
        host,
        clock,
    }
}

pub async fn seed_credentials(store: &MemoryStore, expiry: i64) {
    store
        .set_many(&[
            (ACCESS_TOKEN_KEY, "stored-at"),
            (REFRESH_TOKEN_KEY, "stored-rt"),
            (TOKEN_EXPIRY_KEY, &expiry.to_string()),
        ])
        .await
        .expect("seed credentials");
}

pub fn host_context(board: &str, item: Option<&str>, token: &str) -> HostContext {
    HostContext {
        board_id: Some(BoardId::from(board)),
        item_id: item.map(ItemId::from),
        short_lived_token: Some(token.to_string()),
    }
}

pub fn analysis_reply(ids: &[&str]) -> Value {
    let placeholders: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": id, "description": "", "suggestedColumnId": "text0" }))
        .collect();
    json!({
        "success": true,
        "placeholders": placeholders,
        "columns": [{ "id": "text0", "title": "Client", "type": "text" }]
    })
}
