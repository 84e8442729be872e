//! Per-client session state.
//!
//! Each connected viewer gets one [`ClientSession`]: its own association
//! between original images and the images derived from them, plus handles to
//! its stores. Sessions are created explicitly and torn down explicitly;
//! nothing here is global.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::store::{ClientStores, MemoryAnalysisStore, MemoryImageStore};

/// Which images were derived from which originals.
///
/// Only one derived image per original is tracked. A second kind of derived
/// image for the same original would need a tagged value here rather than a
/// second entry in the same maps.
#[derive(Debug, Default)]
pub struct SessionState {
    derived: HashSet<String>,
    base_to_derived: HashMap<String, String>,
    derived_to_base: HashMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `derived_id` as derived from `original_id`.
    ///
    /// Re-associating an original replaces its forward entry. The previous
    /// derived id keeps resolving to the same original.
    pub fn associate(&mut self, original_id: &str, derived_id: &str) {
        self.derived.insert(derived_id.to_string());
        self.base_to_derived
            .insert(original_id.to_string(), derived_id.to_string());
        self.derived_to_base
            .insert(derived_id.to_string(), original_id.to_string());
    }

    /// The original an image was derived from, or the id itself.
    pub fn resolve_base(&self, id: &str) -> String {
        if self.derived.contains(id) {
            if let Some(base) = self.derived_to_base.get(id) {
                return base.clone();
            }
        }
        id.to_string()
    }

    /// The current derived image of an original, if any.
    pub fn lookup_derived(&self, original_id: &str) -> Option<String> {
        self.base_to_derived.get(original_id).cloned()
    }

    pub fn is_derived(&self, id: &str) -> bool {
        self.derived.contains(id)
    }

    /// Number of known derived images.
    pub fn len(&self) -> usize {
        self.derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }
}

/// State and stores belonging to one connected client.
pub struct ClientSession {
    id: String,
    state: Mutex<SessionState>,
    pub stores: ClientStores,
}

impl ClientSession {
    pub fn new(id: impl Into<String>, stores: ClientStores) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SessionState::new()),
            stores,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lock the session state.
    ///
    /// Registry operations never await, so the guard must be dropped before
    /// the next `.await` in the caller.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        // Mutations are single map inserts; a poisoned lock still holds usable maps.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A session together with the in-memory stores behind it.
#[derive(Clone)]
pub struct HostedSession {
    pub session: Arc<ClientSession>,
    pub images: Arc<MemoryImageStore>,
    pub analysis: Arc<MemoryAnalysisStore>,
}

/// Live sessions of the host process.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, HostedSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with empty state and empty stores.
    pub async fn create(&self) -> HostedSession {
        let id = uuid::Uuid::new_v4().to_string();
        let images = Arc::new(MemoryImageStore::new());
        let analysis = Arc::new(MemoryAnalysisStore::new());
        let stores = ClientStores::in_memory(images.clone(), analysis.clone());

        let hosted = HostedSession {
            session: Arc::new(ClientSession::new(id.clone(), stores)),
            images,
            analysis,
        };
        self.sessions.write().await.insert(id.clone(), hosted.clone());

        tracing::info!(session_id = %id, "Session created");
        hosted
    }

    pub async fn get(&self, id: &str) -> Result<HostedSession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Tear down a session; its state and stores go with it.
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        tracing::info!(session_id = %id, "Session closed");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_associate_links_both_directions() {
        let mut state = SessionState::new();
        state.associate("ct-1", "ct-1_seg");

        assert_eq!(state.resolve_base("ct-1_seg"), "ct-1");
        assert_eq!(state.lookup_derived("ct-1").as_deref(), Some("ct-1_seg"));
        assert!(state.is_derived("ct-1_seg"));
        assert!(!state.is_derived("ct-1"));
    }

    #[test]
    fn test_resolve_base_passes_through_unknown_ids() {
        let state = SessionState::new();
        assert_eq!(state.resolve_base("xray"), "xray");
        assert_eq!(state.lookup_derived("xray"), None);
        assert!(state.is_empty());
    }

    #[test]
    fn test_resolve_base_is_idempotent() {
        let mut state = SessionState::new();
        state.associate("a", "b");
        state.associate("c", "d");

        for id in ["a", "b", "c", "d", "e"] {
            let once = state.resolve_base(id);
            assert_eq!(state.resolve_base(&once), once, "not idempotent for {}", id);
        }
    }

    #[test]
    fn test_reassociation_keeps_stale_reverse_entry() {
        let mut state = SessionState::new();
        state.associate("a", "b1");
        state.associate("a", "b2");

        assert_eq!(state.lookup_derived("a").as_deref(), Some("b2"));
        assert_eq!(state.resolve_base("b2"), "a");
        assert_eq!(state.resolve_base("b1"), "a");
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_lookup_derived_on_derived_id_is_none() {
        let mut state = SessionState::new();
        state.associate("a", "b");
        assert_eq!(state.lookup_derived("b"), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let manager = SessionManager::new();
        let first = manager.create().await;
        let second = manager.create().await;

        first.session.state().associate("img", "img_seg");

        assert_eq!(first.session.state().resolve_base("img_seg"), "img");
        assert_eq!(second.session.state().resolve_base("img_seg"), "img_seg");
        assert_eq!(manager.count().await, 2);
    }

    #[tokio::test]
    async fn test_remove_tears_down_session() {
        let manager = SessionManager::new();
        let hosted = manager.create().await;
        let id = hosted.session.id().to_string();

        manager.remove(&id).await.unwrap();

        assert!(matches!(manager.get(&id).await, Err(Error::SessionNotFound(_))));
        assert!(matches!(manager.remove(&id).await, Err(Error::SessionNotFound(_))));
    }
}
