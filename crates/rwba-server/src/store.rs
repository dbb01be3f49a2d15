//! In-memory session store.
//!
//! Created once at startup and handed to the router; records live until the
//! process exits. There is no expiry and no persistence.

use std::collections::HashMap;

use tokio::sync::RwLock;

use rwba_core::SessionRecord;

/// Completed sessions keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under its own session id, replacing any previous entry.
    pub async fn insert(&self, record: SessionRecord) {
        let id = record.session_id.clone();
        self.sessions.write().await.insert(id, record);
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwba_core::{AnalysisConfig, SessionRequest, UploadedSource, WalkBoundary, run_session};

    fn record() -> SessionRecord {
        let request = SessionRequest {
            analysis: AnalysisConfig {
                trial_count: 1,
                boundary: WalkBoundary::new(2).unwrap(),
                workers: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        run_session(&UploadedSource::from_bits(vec![1; 84]), &request).unwrap()
    }

    #[tokio::test]
    async fn insert_get_clear() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let rec = record();
        let id = rec.session_id.clone();
        store.insert(rec).await;
        store.insert(record()).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(&id).await.unwrap().session_id, id);
        assert!(store.get("missing").await.is_none());

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
