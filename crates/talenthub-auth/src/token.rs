//! Session token generation.
//!
//! # Format
//!
//! `{base62(owner uuid)}_{random}` where the random part is `token_length`
//! characters from `[A-Za-z0-9]` drawn from the OS CSPRNG. The prefix only
//! identifies the owner for operators; all entropy is in the suffix.

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::{AuthError, AuthResult};

const BASE62_ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Answers whether a token is already in use.
#[async_trait]
pub trait TokenExistence: Send + Sync {
    async fn token_exists(&self, token: &str) -> AuthResult<bool>;
}

/// Base62 encoding of a 128-bit value, most significant digit first.
pub fn base62(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(22);
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Random alphanumeric string of `length` characters.
pub fn random_alphanumeric(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Produces tokens that no existing session uses.
#[derive(Clone)]
pub struct TokenGenerator {
    existence: Arc<dyn TokenExistence>,
    length: usize,
    attempts: u32,
    retry_delay: Duration,
    check_timeout: Duration,
}

impl TokenGenerator {
    pub fn new(existence: Arc<dyn TokenExistence>, config: &SessionConfig) -> Self {
        Self {
            existence,
            length: config.token_length,
            attempts: config.token_retry_attempts.max(1),
            retry_delay: config.token_retry_delay,
            check_timeout: config.token_check_timeout,
        }
    }

    /// Compose a token without checking uniqueness.
    pub fn compose(&self, owner: Uuid) -> String {
        format!("{}_{}", base62(owner.as_u128()), random_alphanumeric(self.length))
    }

    /// Generate a token not in use by any session.
    ///
    /// A check that finds the token, errors, or exceeds its timeout costs one
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GenerationFailure` once every attempt is spent.
    pub async fn generate(&self, owner: Uuid) -> AuthResult<String> {
        for attempt in 1..=self.attempts {
            let token = self.compose(owner);

            match tokio::time::timeout(self.check_timeout, self.existence.token_exists(&token)).await
            {
                Ok(Ok(false)) => return Ok(token),
                Ok(Ok(true)) => {
                    tracing::warn!(owner = %owner, attempt, "generated token already in use");
                }
                Ok(Err(e)) => {
                    tracing::warn!(owner = %owner, attempt, error = %e, "token existence check failed");
                }
                Err(_) => {
                    tracing::warn!(owner = %owner, attempt, "token existence check timed out");
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(AuthError::GenerationFailure {
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        exists_for_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenExistence for Scripted {
        async fn token_exists(&self, _token: &str) -> AuthResult<bool> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(call < self.exists_for_first)
        }
    }

    struct Hanging;

    #[async_trait]
    impl TokenExistence for Hanging {
        async fn token_exists(&self, _token: &str) -> AuthResult<bool> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(false)
        }
    }

    struct Failing;

    #[async_trait]
    impl TokenExistence for Failing {
        async fn token_exists(&self, _token: &str) -> AuthResult<bool> {
            Err(AuthError::storage("down"))
        }
    }

    fn generator(existence: Arc<dyn TokenExistence>) -> TokenGenerator {
        TokenGenerator::new(existence, &SessionConfig::default())
    }

    #[test]
    fn test_base62() {
        assert_eq!(base62(0), "0");
        assert_eq!(base62(61), "Z");
        assert_eq!(base62(62), "10");
        assert_eq!(base62(u128::MAX).len(), 22);
    }

    #[test]
    fn test_compose_format() {
        let owner = Uuid::new_v4();
        let token = generator(Arc::new(Failing)).compose(owner);
        let (prefix, suffix) = token.split_once('_').unwrap();

        assert_eq!(prefix, base62(owner.as_u128()));
        assert_eq!(suffix.len(), 80);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_suffixes_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| random_alphanumeric(80)).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[tokio::test]
    async fn test_retries_past_collisions() {
        let existence = Arc::new(Scripted {
            exists_for_first: 2,
            calls: AtomicU32::new(0),
        });
        let token = generator(existence.clone()).generate(Uuid::new_v4()).await;
        assert!(token.is_ok());
        assert_eq!(existence.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_always_exists_fails_after_three_attempts() {
        let existence = Arc::new(Scripted {
            exists_for_first: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let err = generator(existence.clone())
            .generate(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::GenerationFailure { attempts: 3 }));
        assert_eq!(existence.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_check_errors_and_timeouts_count_as_attempts() {
        let err = generator(Arc::new(Failing))
            .generate(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::GenerationFailure { .. }));

        let started = std::time::Instant::now();
        let err = generator(Arc::new(Hanging))
            .generate(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::GenerationFailure { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
