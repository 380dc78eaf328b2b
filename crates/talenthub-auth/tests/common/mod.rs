//! Shared wiring for integration tests: in-memory store, local cache and a
//! cheap Argon2 configuration.

#![allow(dead_code)]

use std::sync::Arc;
use talenthub_auth::{
    Argon2Hasher, CachedCandidateRepository, CachedSessionRepository, Candidate, CandidateService,
    CandidateStore, ClientInfo, CreateCandidateInput, LoginRequest, MemoryStore, PasswordHasher,
    SessionConfig, SessionManager, SessionStore, Validator,
};
use talenthub_cache::{CacheConfig, CacheManager, LocalCache};

pub const PASSWORD: &str = "secret123";

pub struct Harness {
    pub store: MemoryStore,
    pub local: LocalCache,
    pub cache: CacheManager,
    pub candidate_repo: CachedCandidateRepository,
    pub sessions: SessionManager,
    pub candidates: CandidateService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let local = LocalCache::new();
        let cache = CacheManager::new(Arc::new(local.clone()), &CacheConfig::default());
        Self::build(config, local, cache)
    }

    /// Harness whose cache is switched off.
    pub fn uncached() -> Self {
        Self::build(
            SessionConfig::default(),
            LocalCache::new(),
            CacheManager::disabled(),
        )
    }

    /// Harness whose repositories reach the in-memory store through wrappers.
    pub fn wrapped(
        candidates: impl FnOnce(MemoryStore) -> Arc<dyn CandidateStore>,
        sessions: impl FnOnce(MemoryStore) -> Arc<dyn SessionStore>,
    ) -> Self {
        let local = LocalCache::new();
        let cache = CacheManager::new(Arc::new(local.clone()), &CacheConfig::default());
        Self::build_with(SessionConfig::default(), local, cache, candidates, sessions)
    }

    fn build(config: SessionConfig, local: LocalCache, cache: CacheManager) -> Self {
        Self::build_with(
            config,
            local,
            cache,
            |store| Arc::new(store),
            |store| Arc::new(store),
        )
    }

    fn build_with(
        config: SessionConfig,
        local: LocalCache,
        cache: CacheManager,
        candidates: impl FnOnce(MemoryStore) -> Arc<dyn CandidateStore>,
        sessions: impl FnOnce(MemoryStore) -> Arc<dyn SessionStore>,
    ) -> Self {
        let store = MemoryStore::new();
        let validator = Arc::new(Validator::from_config(&config).unwrap());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());

        let candidate_repo = CachedCandidateRepository::new(candidates(store.clone()), cache.clone());
        let session_repo = CachedSessionRepository::new(sessions(store.clone()), cache.clone());

        let sessions = SessionManager::new(
            candidate_repo.clone(),
            session_repo,
            validator.clone(),
            hasher.clone(),
            config,
        );
        let candidates = CandidateService::new(candidate_repo.clone(), validator, hasher);

        Self {
            store,
            local,
            cache,
            candidate_repo,
            sessions,
            candidates,
        }
    }

    pub async fn register(&self, email: &str, phone: &str) -> Candidate {
        self.candidates
            .create(CreateCandidateInput {
                full_name: "Test Candidate".to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                password: PASSWORD.to_string(),
                password_confirmation: PASSWORD.to_string(),
            })
            .await
            .unwrap()
    }
}

pub fn login_request(identifier: &str, password: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.to_string(),
        password: password.to_string(),
        client: client("test-agent/1.0"),
    }
}

pub fn client(user_agent: &str) -> ClientInfo {
    ClientInfo {
        user_agent: user_agent.to_string(),
        ip_address: "10.0.0.1".to_string(),
        latitude: "-6.2088".to_string(),
        longitude: "106.8456".to_string(),
    }
}
