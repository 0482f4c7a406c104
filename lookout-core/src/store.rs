use crate::error::{Result, TrackError};
use crate::models::{OwnerId, SessionId, SessionSummary, TrackingSession};
use scc::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory registry of active sessions, at most one per owner.
///
/// Sessions are not persisted; a restart drops every session.
pub struct SessionStore {
    sessions: HashMap<OwnerId, TrackingSession>,
    next_id: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn allocate_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Exclusive insert. Fails if the owner already has a session.
    pub async fn create(&self, session: TrackingSession) -> Result<()> {
        self.sessions
            .insert_async(session.owner, session)
            .await
            .map_err(|_| TrackError::AlreadyActive)
    }

    pub async fn contains(&self, owner: OwnerId) -> bool {
        self.sessions.contains_async(&owner).await
    }

    /// Read-only snapshot of the owner's session.
    pub async fn get(&self, owner: OwnerId) -> Option<SessionSummary> {
        self.sessions
            .read_async(&owner, |_, session| session.summary())
            .await
    }

    /// Copy of the session, provided it is still the one identified by `id`.
    pub(crate) async fn snapshot(&self, owner: OwnerId, id: SessionId) -> Option<TrackingSession> {
        self.sessions
            .read_async(&owner, |_, session| (session.id == id).then(|| session.clone()))
            .await
            .flatten()
    }

    /// Mutate the session unless it was stopped or replaced in the meantime.
    pub(crate) async fn update_live<R>(
        &self,
        owner: OwnerId,
        id: SessionId,
        f: impl FnOnce(&mut TrackingSession) -> R,
    ) -> Option<R> {
        self.sessions
            .update_async(&owner, |_, session| {
                (session.id == id && !session.is_stopped()).then(|| f(session))
            })
            .await
            .flatten()
    }

    /// Remove and stop the owner's session. Removing nothing is not an error.
    pub async fn remove(&self, owner: OwnerId) -> Option<TrackingSession> {
        let (_, session) = self.sessions.remove_async(&owner).await?;
        session.stop();
        Some(session)
    }

    /// Remove and stop the session only if it is still the one identified by `id`.
    pub(crate) async fn remove_current(
        &self,
        owner: OwnerId,
        id: SessionId,
    ) -> Option<TrackingSession> {
        let (_, session) = self
            .sessions
            .remove_if_async(&owner, |session| session.id == id)
            .await?;
        session.stop();
        Some(session)
    }

    /// Stop and drop every session. Returns how many were active.
    pub async fn clear_all(&self) -> usize {
        let mut cleared = 0;
        self.sessions
            .retain_async(|_, session| {
                session.stop();
                cleared += 1;
                false
            })
            .await;
        cleared
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerName, RoutePreference, SessionMode};
    use std::time::Duration;

    fn session(store: &SessionStore, owner: OwnerId, target: &str) -> TrackingSession {
        TrackingSession::new(
            store.allocate_id(),
            owner,
            PlayerName::from(target).unwrap(),
            SessionMode::Track {
                route: RoutePreference::Fastest,
            },
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_create_is_exclusive_per_owner() {
        let store = SessionStore::new();
        store.create(session(&store, 1, "Steve")).await.unwrap();

        let second = store.create(session(&store, 1, "Alex")).await;
        assert_eq!(second, Err(TrackError::AlreadyActive));

        // Another owner is unaffected
        store.create(session(&store, 2, "Alex")).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).await.unwrap().target.as_str(), "Steve");
    }

    #[tokio::test]
    async fn test_remove_stops_session_and_is_idempotent() {
        let store = SessionStore::new();
        let created = session(&store, 1, "Steve");
        let token = created.cancellation();
        store.create(created).await.unwrap();

        let removed = store.remove(1).await.unwrap();
        assert!(removed.is_stopped());
        assert!(token.is_cancelled());
        assert!(store.remove(1).await.is_none());
        assert!(store.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_session_id_cannot_touch_replacement() {
        let store = SessionStore::new();
        let first = session(&store, 1, "Steve");
        let first_id = first.id;
        store.create(first).await.unwrap();
        store.remove(1).await.unwrap();

        let second = session(&store, 1, "Alex");
        let second_id = second.id;
        store.create(second).await.unwrap();

        assert!(store.snapshot(1, first_id).await.is_none());
        assert!(store.update_live(1, first_id, |s| s.update_count += 1).await.is_none());
        assert!(store.remove_current(1, first_id).await.is_none());

        store.update_live(1, second_id, |s| s.update_count += 1).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().update_count, 1);
    }

    #[tokio::test]
    async fn test_clear_all_stops_everything() {
        let store = SessionStore::new();
        let a = session(&store, 1, "Steve");
        let b = session(&store, 2, "Alex");
        let (ta, tb) = (a.cancellation(), b.cancellation());
        store.create(a).await.unwrap();
        store.create(b).await.unwrap();

        assert_eq!(store.clear_all().await, 2);
        assert!(store.is_empty());
        assert!(ta.is_cancelled() && tb.is_cancelled());
    }
}
