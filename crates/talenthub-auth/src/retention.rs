//! Per-candidate session retention.
//!
//! Keeps the `max_active` sessions with the latest refresh expiry and deletes
//! the rest in batches. Each batch is one store transaction selecting at
//! offset `max_active`; the offset never moves because deleted rows stop
//! occupying ranks.

use uuid::Uuid;

use crate::AuthResult;
use crate::config::SessionConfig;
use crate::repository::CachedSessionRepository;

/// Batched eviction of a candidate's oldest sessions.
#[derive(Clone)]
pub struct RetentionPolicy {
    sessions: CachedSessionRepository,
    batch_size: u32,
}

impl RetentionPolicy {
    pub fn new(sessions: CachedSessionRepository, config: &SessionConfig) -> Self {
        Self {
            sessions,
            batch_size: config.session_delete_batch_size.max(1),
        }
    }

    /// Delete every session of `candidate_id` ranked after the first
    /// `max_active`. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// A store failure aborts the current batch (earlier batches stay
    /// committed) and is returned. Cache eviction failures are only logged.
    #[tracing::instrument(skip(self), fields(candidate_id = %candidate_id))]
    pub async fn evict_excess(&self, candidate_id: Uuid, max_active: u32) -> AuthResult<u64> {
        let mut evicted = 0u64;
        loop {
            let deleted = self
                .sessions
                .delete_excess_batch(candidate_id, max_active, self.batch_size)
                .await?;
            if deleted == 0 {
                break;
            }
            evicted += deleted;
        }

        if evicted > 0 {
            tracing::info!(candidate_id = %candidate_id, evicted, max_active, "evicted excess sessions");
        }
        Ok(evicted)
    }
}
