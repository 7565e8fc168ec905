//! Session registry: per-conversation state and the busy gate.
//!
//! The registry is the only structure shared by concurrent requests. It maps
//! a [`ConversationId`] to an `Arc<Session>`; once a caller holds that `Arc`
//! it never touches the map again, so different conversations proceed fully
//! in parallel.
//!
//! Each [`Session`] carries:
//!
//! - `busy`: an `AtomicBool` gate with try-acquire semantics. It never
//!   blocks: a second chat request on a busy conversation is rejected.
//! - `history` and `model`: each behind its own short-lived mutex, so
//!   `/clear` and `/switch` work regardless of whether a request is in flight.
//!
//! None of the locks here is ever held across an `.await`.

use relay_domain::{ConversationHistory, ConversationId, ModelChoice, Turn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mutable state of one conversation.
#[derive(Debug)]
pub struct Session {
    id: ConversationId,
    history: Mutex<ConversationHistory>,
    model: Mutex<ModelChoice>,
    busy: AtomicBool,
}

impl Session {
    fn new(id: ConversationId, model: ModelChoice) -> Self {
        Self {
            id,
            history: Mutex::new(ConversationHistory::new()),
            model: Mutex::new(model),
            busy: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn model(&self) -> ModelChoice {
        *lock(&self.model)
    }

    pub fn set_model(&self, model: ModelChoice) {
        *lock(&self.model) = model;
    }

    /// Flip to the other model and return the new selection.
    pub fn toggle_model(&self) -> ModelChoice {
        let mut model = lock(&self.model);
        *model = model.toggled();
        *model
    }

    pub fn append_turn(&self, turn: Turn) {
        lock(&self.history).append(turn);
    }

    pub fn clear_history(&self) {
        lock(&self.history).clear();
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        lock(&self.history).snapshot()
    }

    /// At most the `n` most recent turns.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        lock(&self.history).recent(n)
    }

    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Atomically set `busy` if it was clear. Returns whether it was acquired.
    pub fn try_set_busy(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear `busy` unconditionally.
    pub fn clear_busy(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Scoped hold on a session's busy gate.
///
/// Releases the gate when dropped, so every exit path of a request (early
/// return, error, timeout, panic unwinding, cancelled future) clears it
/// exactly once.
#[derive(Debug)]
pub struct BusyGuard {
    session: Arc<Session>,
}

impl BusyGuard {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.session.clear_busy();
        debug!("Released busy gate for conversation {}", self.session.id());
    }
}

/// Map of conversation → session, created at start-up and kept for the
/// process lifetime. In memory only.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConversationId, Arc<Session>>>,
    default_model: ModelChoice,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(ModelChoice::default())
    }
}

impl SessionRegistry {
    /// Create an empty registry; new sessions start on `default_model`.
    pub fn new(default_model: ModelChoice) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_model,
        }
    }

    /// Existing session for `id`, if any.
    pub fn get(&self, id: ConversationId) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Existing session for `id`, or a fresh one with empty history, the
    /// default model and `busy = false`.
    pub fn get_or_create(&self, id: ConversationId) -> Arc<Session> {
        if let Some(session) = self.get(id) {
            return session;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(id)
            .or_insert_with(|| {
                debug!("Creating session for conversation {}", id);
                Arc::new(Session::new(id, self.default_model))
            })
            .clone()
    }

    // ==================== Busy gate ====================

    pub fn try_set_busy(&self, id: ConversationId) -> bool {
        self.get_or_create(id).try_set_busy()
    }

    pub fn clear_busy(&self, id: ConversationId) {
        if let Some(session) = self.get(id) {
            session.clear_busy();
        }
    }

    /// Try to take the busy gate; `None` means a request is already in flight.
    pub fn acquire(&self, id: ConversationId) -> Option<BusyGuard> {
        let session = self.get_or_create(id);
        if session.try_set_busy() {
            debug!("Acquired busy gate for conversation {}", id);
            Some(BusyGuard { session })
        } else {
            None
        }
    }

    // ==================== Model selection ====================

    pub fn model(&self, id: ConversationId) -> ModelChoice {
        self.get(id)
            .map(|session| session.model())
            .unwrap_or(self.default_model)
    }

    pub fn set_model(&self, id: ConversationId, model: ModelChoice) {
        self.get_or_create(id).set_model(model);
    }

    pub fn toggle_model(&self, id: ConversationId) -> ModelChoice {
        self.get_or_create(id).toggle_model()
    }

    // ==================== History ====================

    pub fn append_turn(&self, id: ConversationId, turn: Turn) {
        self.get_or_create(id).append_turn(turn);
    }

    pub fn clear_history(&self, id: ConversationId) {
        if let Some(session) = self.get(id) {
            session.clear_history();
        }
    }

    pub fn snapshot(&self, id: ConversationId) -> Vec<Turn> {
        self.get(id)
            .map(|session| session.snapshot())
            .unwrap_or_default()
    }

    /// Number of known conversations
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn id(n: i64) -> ConversationId {
        ConversationId::new(n)
    }

    #[test]
    fn test_get_or_create_defaults() {
        let registry = SessionRegistry::new(ModelChoice::Secondary);
        let session = registry.get_or_create(id(1));
        assert_eq!(session.id(), id(1));
        assert_eq!(session.model(), ModelChoice::Secondary);
        assert_eq!(session.history_len(), 0);
        assert!(!session.is_busy());
        assert_eq!(registry.len(), 1);

        // Same session on the second call
        let again = registry.get_or_create(id(1));
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_try_set_busy_is_exclusive() {
        let registry = SessionRegistry::default();
        assert!(registry.try_set_busy(id(1)));
        assert!(!registry.try_set_busy(id(1)));

        // Other conversations are unaffected
        assert!(registry.try_set_busy(id(2)));

        registry.clear_busy(id(1));
        assert!(registry.try_set_busy(id(1)));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = SessionRegistry::default();
        {
            let guard = registry.acquire(id(7)).unwrap();
            assert!(guard.session().is_busy());
            assert!(registry.acquire(id(7)).is_none());
        }
        assert!(!registry.get_or_create(id(7)).is_busy());
        assert!(registry.acquire(id(7)).is_some());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let registry = Arc::new(SessionRegistry::default());
        let worker = Arc::clone(&registry);
        let result = thread::spawn(move || {
            let _guard = worker.acquire(id(3)).unwrap();
            panic!("request blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!registry.get_or_create(id(3)).is_busy());
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let registry = Arc::new(SessionRegistry::default());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.try_set_busy(id(42))
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|acquired| *acquired)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_set_and_toggle_model_auto_create() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.model(id(5)), ModelChoice::Primary);
        assert!(registry.is_empty());

        registry.set_model(id(5), ModelChoice::Secondary);
        assert_eq!(registry.model(id(5)), ModelChoice::Secondary);

        assert_eq!(registry.toggle_model(id(5)), ModelChoice::Primary);
        assert_eq!(registry.toggle_model(id(6)), ModelChoice::Secondary);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_model_and_history_ignore_busy_gate() {
        let registry = SessionRegistry::default();
        let _guard = registry.acquire(id(9)).unwrap();

        registry.append_turn(id(9), Turn::user("hello"));
        registry.toggle_model(id(9));
        registry.clear_history(id(9));

        assert!(registry.snapshot(id(9)).is_empty());
        assert_eq!(registry.model(id(9)), ModelChoice::Secondary);
        assert!(registry.get_or_create(id(9)).is_busy());
    }

    #[test]
    fn test_clear_then_snapshot_is_empty() {
        let registry = SessionRegistry::default();
        for i in 0..10 {
            registry.append_turn(id(1), Turn::user(format!("turn {}", i)));
        }
        assert_eq!(registry.snapshot(id(1)).len(), 10);

        registry.clear_history(id(1));
        assert!(registry.snapshot(id(1)).is_empty());

        // Clearing an unknown conversation is not an error
        registry.clear_history(id(99));
        assert!(registry.snapshot(id(99)).is_empty());
    }
}
