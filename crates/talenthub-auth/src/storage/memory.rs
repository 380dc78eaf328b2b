//! In-memory candidate and session store.
//!
//! Behaves like the relational store (uniqueness, soft delete, conditional
//! token rotation, ranked batch deletes) and counts every query it answers,
//! which lets tests observe how much traffic the cache layer saves.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::TokenKind;
use crate::storage::{CandidateStore, SessionStore};
use crate::types::{Candidate, NewCandidate, Session};
use crate::{AuthError, AuthResult};

#[derive(Debug, Clone)]
struct CandidateRow {
    candidate: Candidate,
    password_hash: String,
}

#[derive(Default)]
struct State {
    candidates: HashMap<Uuid, CandidateRow>,
    sessions: HashMap<Uuid, Session>,
}

#[derive(Default)]
struct Counters {
    candidate_by_id: AtomicU64,
    password_by_id: AtomicU64,
    candidate_by_email: AtomicU64,
    candidate_by_phone: AtomicU64,
    unscoped_lookups: AtomicU64,
    session_by_id: AtomicU64,
    session_by_token: AtomicU64,
    token_exists: AtomicU64,
    writes: AtomicU64,
}

/// Snapshot of how many queries each lookup has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounts {
    pub candidate_by_id: u64,
    pub password_by_id: u64,
    pub candidate_by_email: u64,
    pub candidate_by_phone: u64,
    pub unscoped_lookups: u64,
    pub session_by_id: u64,
    pub session_by_token: u64,
    pub token_exists: u64,
    pub writes: u64,
}

/// Thread-safe in-memory store implementing [`CandidateStore`] and [`SessionStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    counters: Arc<Counters>,
    unavailable: Arc<AtomicBool>,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Retention ranking: latest refresh expiry first, then newest, then id.
fn retention_order(a: &Session, b: &Session) -> CmpOrdering {
    b.refresh_token_expires_at
        .cmp(&a.refresh_token_expires_at)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a storage error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current query counters.
    pub fn query_counts(&self) -> QueryCounts {
        let c = &self.counters;
        QueryCounts {
            candidate_by_id: c.candidate_by_id.load(Ordering::Relaxed),
            password_by_id: c.password_by_id.load(Ordering::Relaxed),
            candidate_by_email: c.candidate_by_email.load(Ordering::Relaxed),
            candidate_by_phone: c.candidate_by_phone.load(Ordering::Relaxed),
            unscoped_lookups: c.unscoped_lookups.load(Ordering::Relaxed),
            session_by_id: c.session_by_id.load(Ordering::Relaxed),
            session_by_token: c.session_by_token.load(Ordering::Relaxed),
            token_exists: c.token_exists.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
        }
    }

    /// All sessions of a candidate in retention order.
    pub fn sessions_of(&self, candidate_id: Uuid) -> Vec<Session> {
        let state = self.state.read();
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.candidate_id == candidate_id)
            .cloned()
            .collect();
        sessions.sort_by(retention_order);
        sessions
    }

    /// Number of stored sessions across all candidates.
    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }

    /// Soft-delete a candidate, bypassing any cache (simulates an external writer).
    pub fn soft_delete_candidate(&self, id: Uuid) -> bool {
        let mut state = self.state.write();
        match state.candidates.get_mut(&id) {
            Some(row) => {
                row.candidate.deleted_at = Some(OffsetDateTime::now_utc());
                true
            }
            None => false,
        }
    }

    fn check_available(&self) -> AuthResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AuthError::storage("memory store unavailable"))
        } else {
            Ok(())
        }
    }

    fn live_id_where(&self, matches: impl Fn(&Candidate) -> bool) -> Option<Uuid> {
        self.state
            .read()
            .candidates
            .values()
            .map(|row| &row.candidate)
            .find(|c| !c.is_deleted() && matches(c))
            .map(|c| c.id)
    }

    fn any_id_where(&self, matches: impl Fn(&Candidate) -> bool) -> Option<Uuid> {
        self.state
            .read()
            .candidates
            .values()
            .map(|row| &row.candidate)
            .find(|c| matches(c))
            .map(|c| c.id)
    }
}

fn token_in_use(sessions: &HashMap<Uuid, Session>, token: &str, except: Option<Uuid>) -> bool {
    sessions
        .values()
        .filter(|s| Some(s.id) != except)
        .any(|s| s.access_token == token || s.refresh_token == token)
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Candidate>> {
        self.check_available()?;
        bump(&self.counters.candidate_by_id);
        Ok(self
            .state
            .read()
            .candidates
            .get(&id)
            .filter(|row| !row.candidate.is_deleted())
            .map(|row| row.candidate.clone()))
    }

    async fn find_password_by_id(&self, id: Uuid) -> AuthResult<Option<String>> {
        self.check_available()?;
        bump(&self.counters.password_by_id);
        Ok(self
            .state
            .read()
            .candidates
            .get(&id)
            .filter(|row| !row.candidate.is_deleted())
            .map(|row| row.password_hash.clone()))
    }

    async fn find_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>> {
        self.check_available()?;
        bump(&self.counters.candidate_by_email);
        Ok(self.live_id_where(|c| c.email.as_deref() == Some(email)))
    }

    async fn find_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>> {
        self.check_available()?;
        bump(&self.counters.candidate_by_phone);
        Ok(self.live_id_where(|c| c.phone.as_deref() == Some(phone)))
    }

    async fn find_unscoped_id_by_email(&self, email: &str) -> AuthResult<Option<Uuid>> {
        self.check_available()?;
        bump(&self.counters.unscoped_lookups);
        Ok(self.any_id_where(|c| c.email.as_deref() == Some(email)))
    }

    async fn find_unscoped_id_by_phone(&self, phone: &str) -> AuthResult<Option<Uuid>> {
        self.check_available()?;
        bump(&self.counters.unscoped_lookups);
        Ok(self.any_id_where(|c| c.phone.as_deref() == Some(phone)))
    }

    async fn create(&self, candidate: &NewCandidate) -> AuthResult<Candidate> {
        self.check_available()?;
        bump(&self.counters.writes);

        let mut state = self.state.write();
        let live = || state.candidates.values().map(|row| &row.candidate).filter(|c| !c.is_deleted());

        if candidate.email.is_some()
            && live().any(|c| c.email.is_some() && c.email == candidate.email)
        {
            return Err(AuthError::duplicate("email already registered"));
        }
        if candidate.phone.is_some()
            && live().any(|c| c.phone.is_some() && c.phone == candidate.phone)
        {
            return Err(AuthError::duplicate("phone already registered"));
        }

        let now = OffsetDateTime::now_utc();
        let created = Candidate {
            id: candidate.id,
            full_name: candidate.full_name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.candidates.insert(
            candidate.id,
            CandidateRow {
                candidate: created.clone(),
                password_hash: candidate.password_hash.clone(),
            },
        );
        Ok(created)
    }

    async fn update(&self, candidate: &Candidate) -> AuthResult<Option<Candidate>> {
        self.check_available()?;
        bump(&self.counters.writes);

        let mut state = self.state.write();
        let Some(row) = state.candidates.get_mut(&candidate.id) else {
            return Ok(None);
        };
        let previous = row.candidate.clone();
        row.candidate.full_name = candidate.full_name.clone();
        row.candidate.email = candidate.email.clone();
        row.candidate.phone = candidate.phone.clone();
        row.candidate.deleted_at = candidate.deleted_at;
        row.candidate.updated_at = OffsetDateTime::now_utc();
        Ok(Some(previous))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        self.check_available()?;
        bump(&self.counters.writes);

        let mut state = self.state.write();
        if state.sessions.contains_key(&session.id)
            || token_in_use(&state.sessions, &session.access_token, None)
            || token_in_use(&state.sessions, &session.refresh_token, None)
        {
            return Err(AuthError::duplicate("session token or id already exists"));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>> {
        self.check_available()?;
        bump(&self.counters.session_by_id);
        Ok(self.state.read().sessions.get(&id).cloned())
    }

    async fn find_by_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<Session>> {
        self.check_available()?;
        bump(&self.counters.session_by_token);
        Ok(self
            .state
            .read()
            .sessions
            .values()
            .find(|s| match kind {
                TokenKind::Access => s.access_token == token,
                TokenKind::Refresh => s.refresh_token == token,
            })
            .cloned())
    }

    async fn token_exists(&self, token: &str) -> AuthResult<bool> {
        self.check_available()?;
        bump(&self.counters.token_exists);
        Ok(token_in_use(&self.state.read().sessions, token, None))
    }

    async fn update_tokens(
        &self,
        previous_refresh_token: &str,
        session: &Session,
    ) -> AuthResult<Option<Session>> {
        self.check_available()?;
        bump(&self.counters.writes);

        let mut state = self.state.write();
        let current_matches = state
            .sessions
            .get(&session.id)
            .is_some_and(|s| s.refresh_token == previous_refresh_token);
        if !current_matches {
            return Ok(None);
        }

        if token_in_use(&state.sessions, &session.access_token, Some(session.id))
            || token_in_use(&state.sessions, &session.refresh_token, Some(session.id))
        {
            return Err(AuthError::duplicate("session token already exists"));
        }

        let Some(row) = state.sessions.get_mut(&session.id) else {
            return Ok(None);
        };
        row.access_token = session.access_token.clone();
        row.refresh_token = session.refresh_token.clone();
        row.access_token_expires_at = session.access_token_expires_at;
        row.refresh_token_expires_at = session.refresh_token_expires_at;
        row.client = session.client.clone();
        row.updated_at = session.updated_at;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> AuthResult<bool> {
        self.check_available()?;
        bump(&self.counters.writes);
        Ok(self.state.write().sessions.remove(&id).is_some())
    }

    async fn delete_excess(
        &self,
        candidate_id: Uuid,
        keep: u32,
        limit: u32,
    ) -> AuthResult<Vec<Session>> {
        self.check_available()?;
        bump(&self.counters.writes);

        let mut state = self.state.write();
        let mut ranked: Vec<&Session> = state
            .sessions
            .values()
            .filter(|s| s.candidate_id == candidate_id)
            .collect();
        ranked.sort_by(|a, b| retention_order(a, b));

        let doomed: Vec<Uuid> = ranked
            .into_iter()
            .skip(keep as usize)
            .take(limit as usize)
            .map(|s| s.id)
            .collect();

        Ok(doomed
            .into_iter()
            .filter_map(|id| state.sessions.remove(&id))
            .collect())
    }
}
