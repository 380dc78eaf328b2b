//! Domain types.

mod candidate;
mod session;

pub use candidate::{AuthenticatedCandidate, Candidate, CreateCandidateInput, NewCandidate};
pub use session::{ClientInfo, LoginRequest, RefreshRequest, Session};
