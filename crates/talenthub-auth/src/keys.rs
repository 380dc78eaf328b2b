//! Cache key layout.
//!
//! Token and id-lookup keys live under `cache:id:`, full records under
//! `cache:object:`. Every key has a companion mutex at `lock:<key>`.

use uuid::Uuid;

use crate::types::{Candidate, Session};

/// Session by access or refresh token.
pub fn session_token(token: &str) -> String {
    format!("cache:id:session_token:{token}")
}

/// Session by id.
pub fn session_id(id: Uuid) -> String {
    format!("cache:object:session:id:{id}")
}

/// Candidate record by id.
pub fn candidate_id(id: Uuid) -> String {
    format!("cache:object:candidate:id:{id}")
}

/// Candidate id by normalized email.
pub fn candidate_email(email: &str) -> String {
    format!("cache:id:candidate:email:{email}")
}

/// Candidate id by normalized phone.
pub fn candidate_phone(phone: &str) -> String {
    format!("cache:id:candidate:phone:{phone}")
}

/// Candidate password hash by id.
pub fn candidate_password(id: Uuid) -> String {
    format!("cache:password:id:{id}")
}

/// The three keys a session occupies.
pub fn session_keys(session: &Session) -> Vec<String> {
    vec![
        session_token(&session.access_token),
        session_token(&session.refresh_token),
        session_id(session.id),
    ]
}

/// Keys to drop when a candidate is created or changed.
pub fn candidate_keys(candidate: &Candidate) -> Vec<String> {
    let mut keys = vec![candidate_id(candidate.id), candidate_password(candidate.id)];
    if let Some(email) = &candidate.email {
        keys.push(candidate_email(email));
    }
    if let Some(phone) = &candidate.phone {
        keys.push(candidate_phone(phone));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let id = Uuid::nil();
        assert_eq!(session_token("abc"), "cache:id:session_token:abc");
        assert_eq!(
            session_id(id),
            "cache:object:session:id:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            candidate_id(id),
            "cache:object:candidate:id:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(candidate_email("a@b.co"), "cache:id:candidate:email:a@b.co");
        assert_eq!(candidate_phone("+628123"), "cache:id:candidate:phone:+628123");
        assert_eq!(
            candidate_password(id),
            "cache:password:id:00000000-0000-0000-0000-000000000000"
        );
    }
}
