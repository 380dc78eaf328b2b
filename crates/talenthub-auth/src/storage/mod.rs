//! Storage traits for candidates and sessions.
//!
//! These are the system-of-record interfaces. Implementations talk to the
//! relational store directly and know nothing about caching; the cache-aside
//! layer lives in [`crate::repository`].
//!
//! Implementations are provided for:
//! - PostgreSQL (in `talenthub-auth-postgres` crate)
//! - In-memory ([`MemoryStore`]) for tests and single-process use

mod candidate;
pub mod memory;
mod session;

pub use candidate::CandidateStore;
pub use memory::{MemoryStore, QueryCounts};
pub use session::SessionStore;
