//! End-to-end session lifecycle tests over the in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use biblio_auth::audit::SecurityEventLogger;
use biblio_auth::error::AuthError;
use biblio_auth::revocation::RevocationManager;
use biblio_auth::session::{SessionRepository, SessionSweeper, TokenIssuer};
use biblio_auth::token::{TokenClass, TokenCodec, sha256_hex};
use biblio_auth::verifier::Verifier;
use biblio_cache::memory::MemoryStore;
use biblio_cache::{StoreManager, keys};
use biblio_core::config::auth::AuthConfig;
use biblio_core::config::session::SessionConfig;
use biblio_core::config::store::MemoryStoreConfig;
use biblio_core::error::AppError;
use biblio_core::result::AppResult;
use biblio_core::traits::kv::KvStore;
use biblio_entity::identity::{CapabilitySet, Identity, IdentityProvider, Role};
use biblio_entity::security_event::SecurityEventKind;
use biblio_entity::session::DeviceInfo;

#[derive(Debug, Default)]
struct StubIdentities {
    users: Mutex<HashMap<Uuid, Identity>>,
}

impl StubIdentities {
    fn insert(&self, identity: Identity) {
        self.users.lock().unwrap().insert(identity.id, identity);
    }

    fn deactivate(&self, id: Uuid) {
        if let Some(identity) = self.users.lock().unwrap().get_mut(&id) {
            identity.active = false;
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentities {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Identity>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

/// A store whose every operation fails, for fail-closed assertions.
#[derive(Debug)]
struct FailingStore;

#[async_trait]
impl KvStore for FailingStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::store("store down"))
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: StdDuration) -> AppResult<()> {
        Err(AppError::store("store down"))
    }
    async fn set_default(&self, _key: &str, _value: &str) -> AppResult<()> {
        Err(AppError::store("store down"))
    }
    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(AppError::store("store down"))
    }
    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::store("store down"))
    }
    async fn expire(&self, _key: &str, _ttl: StdDuration) -> AppResult<bool> {
        Err(AppError::store("store down"))
    }
    async fn incr(&self, _key: &str) -> AppResult<i64> {
        Err(AppError::store("store down"))
    }
    async fn set_add(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(AppError::store("store down"))
    }
    async fn set_remove(&self, _key: &str, _member: &str) -> AppResult<bool> {
        Err(AppError::store("store down"))
    }
    async fn set_members(&self, _key: &str) -> AppResult<Vec<String>> {
        Err(AppError::store("store down"))
    }
    async fn list_push_capped(
        &self,
        _key: &str,
        _value: &str,
        _cap: u64,
        _ttl: StdDuration,
    ) -> AppResult<()> {
        Err(AppError::store("store down"))
    }
    async fn list_range(&self, _key: &str, _limit: u64) -> AppResult<Vec<String>> {
        Err(AppError::store("store down"))
    }
    async fn scan_keys(&self, _pattern: &str) -> AppResult<Vec<String>> {
        Err(AppError::store("store down"))
    }
    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
    async fn flush_all(&self) -> AppResult<()> {
        Err(AppError::store("store down"))
    }
}

struct Harness {
    store: Arc<StoreManager>,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionRepository>,
    revocation: Arc<RevocationManager>,
    audit: Arc<SecurityEventLogger>,
    identities: Arc<StubIdentities>,
    issuer: TokenIssuer,
    verifier: Verifier,
    sweeper: SessionSweeper,
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        access_secret: "integration-access-secret".to_string(),
        refresh_secret: "integration-refresh-secret".to_string(),
        issuer: "biblio".to_string(),
        access_ttl_minutes: 15,
        refresh_ttl_days: 30,
    }
}

fn harness_with_store(provider: Arc<dyn KvStore>) -> Harness {
    let store = Arc::new(StoreManager::from_provider(provider));
    let codec = Arc::new(TokenCodec::new(&auth_config()));
    let session_config = SessionConfig::default();
    let sessions = Arc::new(SessionRepository::new(
        Arc::clone(&store),
        session_config.clone(),
    ));
    let audit = Arc::new(SecurityEventLogger::new(
        Arc::clone(&store),
        session_config,
    ));
    let revocation = Arc::new(RevocationManager::new(
        Arc::clone(&store),
        Arc::clone(&sessions),
        Arc::clone(&audit),
    ));
    let identities = Arc::new(StubIdentities::default());
    let provider_dyn: Arc<dyn IdentityProvider> = identities.clone();

    let issuer = TokenIssuer::new(
        Arc::clone(&codec),
        Arc::clone(&sessions),
        Arc::clone(&revocation),
        Arc::clone(&provider_dyn),
        Arc::clone(&audit),
    );
    let verifier = Verifier::new(
        Arc::clone(&codec),
        Arc::clone(&sessions),
        Arc::clone(&revocation),
        provider_dyn,
        Arc::clone(&audit),
    );
    let sweeper = SessionSweeper::new(
        Arc::clone(&store),
        Arc::clone(&sessions),
        Arc::clone(&audit),
    );

    Harness {
        store,
        codec,
        sessions,
        revocation,
        audit,
        identities,
        issuer,
        verifier,
        sweeper,
    }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new(&MemoryStoreConfig::default(), 300)))
}

fn member(name: &str) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role: Role::Member,
        capabilities: ["books.read", "books.borrow"]
            .into_iter()
            .collect::<CapabilitySet>(),
        active: true,
    }
}

fn device() -> DeviceInfo {
    DeviceInfo::new("203.0.113.7", Some("integration-test"))
}

async fn login(h: &Harness, identity: &Identity) -> biblio_auth::session::IssuedTokens {
    h.identities.insert(identity.clone());
    h.issuer
        .issue_session_tokens(identity, &device())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_issues_verifiable_pair() {
    let h = harness();
    let ident = member("Ana");
    let tokens = login(&h, &ident).await;

    let verified = h
        .verifier
        .verify(&tokens.access_token, TokenClass::Access)
        .await
        .expect("access token should verify");
    assert_eq!(verified.identity.id, ident.id);
    assert_eq!(verified.session_id, tokens.session_id);
    assert_eq!(verified.claims.role, Role::Member);

    let refreshed = h
        .verifier
        .verify(&tokens.refresh_token, TokenClass::Refresh)
        .await
        .expect("refresh token should verify");
    assert_eq!(refreshed.session_id, tokens.session_id);

    let ids = h.sessions.list_ids_for_user(ident.id).await.unwrap();
    assert_eq!(ids, vec![tokens.session_id]);

    let record = h.sessions.get(tokens.session_id).await.unwrap().unwrap();
    assert!(record.is_active);
    assert_eq!(record.user_id, ident.id);
    assert!(record.matches_access_hash(&sha256_hex(&tokens.access_token)));
}

#[tokio::test]
async fn test_wrong_class_is_denied() {
    let h = harness();
    let tokens = login(&h, &member("Bo")).await;

    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Refresh)
            .await
            .is_none()
    );
    assert!(
        h.verifier
            .verify(&tokens.refresh_token, TokenClass::Access)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_access_revocation_deactivates_but_keeps_record() {
    let h = harness();
    let tokens = login(&h, &member("Cleo")).await;

    h.revocation
        .revoke_session(tokens.session_id, TokenClass::Access)
        .await
        .unwrap();

    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
    let rotate = h.issuer.rotate_access_token(&tokens.refresh_token).await;
    assert!(matches!(rotate, Err(AuthError::RevokedSession)));

    // Record survives for audit; only the flag flips.
    let record = h.sessions.get(tokens.session_id).await.unwrap().unwrap();
    assert!(!record.is_active);
}

#[tokio::test]
async fn test_refresh_revocation_terminates_session() {
    let h = harness();
    let ident = member("Devi");
    let tokens = login(&h, &ident).await;

    h.revocation
        .revoke_session(tokens.session_id, TokenClass::Refresh)
        .await
        .unwrap();

    assert!(h.sessions.get(tokens.session_id).await.unwrap().is_none());
    assert!(h.sessions.list_ids_for_user(ident.id).await.unwrap().is_empty());
    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_revocation_is_idempotent() {
    let h = harness();
    let tokens = login(&h, &member("Edo")).await;

    for _ in 0..2 {
        h.revocation
            .revoke_session(tokens.session_id, TokenClass::Access)
            .await
            .unwrap();
    }
    for _ in 0..2 {
        h.revocation
            .revoke_session(tokens.session_id, TokenClass::Refresh)
            .await
            .unwrap();
    }
    assert!(h.sessions.get(tokens.session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_revoke_all_sessions_for_user() {
    let h = harness();
    let ident = member("Fay");
    h.identities.insert(ident.clone());

    let mut sessions = Vec::new();
    for _ in 0..3 {
        sessions.push(
            h.issuer
                .issue_session_tokens(&ident, &device())
                .await
                .unwrap(),
        );
    }

    let outcome = h
        .revocation
        .revoke_all_sessions_for_user(ident.id)
        .await
        .unwrap();
    assert_eq!(outcome.revoked, 3);
    assert_eq!(outcome.failed, 0);

    assert!(h.sessions.list_ids_for_user(ident.id).await.unwrap().is_empty());

    for tokens in &sessions {
        assert!(
            h.store
                .exists(&keys::revoked_session(tokens.session_id))
                .await
                .unwrap()
        );
        assert!(
            h.verifier
                .verify(&tokens.access_token, TokenClass::Access)
                .await
                .is_none()
        );
        assert!(!h.verifier.quick_revocation_check(&tokens.access_token).await);
        let rotate = h.issuer.rotate_access_token(&tokens.refresh_token).await;
        assert!(matches!(rotate, Err(AuthError::RevokedSession)));
    }
}

#[tokio::test]
async fn test_rotation_replaces_both_tokens() {
    let h = harness();
    let tokens = login(&h, &member("Gil")).await;

    let rotated = h
        .issuer
        .rotate_access_token(&tokens.refresh_token)
        .await
        .unwrap();

    // New pair verifies.
    assert!(
        h.verifier
            .verify(&rotated.access_token, TokenClass::Access)
            .await
            .is_some()
    );
    assert!(
        h.verifier
            .verify(&rotated.refresh_token, TokenClass::Refresh)
            .await
            .is_some()
    );

    // Stale pair no longer matches the session record.
    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
    assert!(
        h.verifier
            .verify(&tokens.refresh_token, TokenClass::Refresh)
            .await
            .is_none()
    );

    // Single-use: replaying the consumed refresh token is rejected outright.
    let replay = h.issuer.rotate_access_token(&tokens.refresh_token).await;
    assert!(matches!(replay, Err(AuthError::BlacklistedToken)));

    // The rotated refresh token still works.
    let again = h.issuer.rotate_access_token(&rotated.refresh_token).await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn test_quick_revocation_check() {
    let h = harness();
    let tokens = login(&h, &member("Hana")).await;

    assert!(h.verifier.quick_revocation_check(&tokens.access_token).await);

    h.revocation
        .revoke_session(tokens.session_id, TokenClass::Access)
        .await
        .unwrap();
    assert!(!h.verifier.quick_revocation_check(&tokens.access_token).await);

    assert!(!h.verifier.quick_revocation_check("not-a-token").await);
}

#[tokio::test]
async fn test_inactive_identity_is_denied() {
    let h = harness();
    let ident = member("Ines");
    let tokens = login(&h, &ident).await;

    h.identities.deactivate(ident.id);

    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
    let rotate = h.issuer.rotate_access_token(&tokens.refresh_token).await;
    assert!(matches!(rotate, Err(AuthError::InactiveIdentity)));
}

#[tokio::test]
async fn test_verification_fails_closed_on_store_outage() {
    let live = harness();
    let tokens = login(&live, &member("Jon")).await;

    // Same signing secrets, unreachable store.
    let down = harness_with_store(Arc::new(FailingStore));
    assert!(
        down.codec
            .verify(&tokens.access_token, TokenClass::Access)
            .is_ok(),
        "token itself is cryptographically valid"
    );
    assert!(
        down.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
    assert!(!down.verifier.quick_revocation_check(&tokens.access_token).await);
    let rotate = down.issuer.rotate_access_token(&tokens.refresh_token).await;
    assert!(matches!(rotate, Err(AuthError::InfrastructureUnavailable(_))));
}

#[tokio::test]
async fn test_sweep_removes_expired_sessions() {
    let h = harness();
    let ident = member("Kira");
    let fresh = login(&h, &ident).await;
    let stale = login(&h, &ident).await;

    // Logically expired but physically still present, the drift the
    // sweep exists to correct.
    let mut record = h.sessions.get(stale.session_id).await.unwrap().unwrap();
    record.expires_at = Utc::now() - Duration::hours(2);
    h.store
        .set_json(
            &keys::session_by_id(stale.session_id),
            &record,
            StdDuration::from_secs(60),
        )
        .await
        .unwrap();

    let removed = h.sweeper.run_sweep().await.unwrap();
    assert_eq!(removed, 1);

    assert!(h.sessions.get(stale.session_id).await.unwrap().is_none());
    assert!(h.sessions.get(fresh.session_id).await.unwrap().is_some());
    let ids = h.sessions.list_ids_for_user(ident.id).await.unwrap();
    assert_eq!(ids, vec![fresh.session_id]);
}

#[tokio::test]
async fn test_security_events_are_recorded_newest_first() {
    let h = harness();
    let ident = member("Mira");
    let tokens = login(&h, &ident).await;

    h.issuer
        .rotate_access_token(&tokens.refresh_token)
        .await
        .unwrap();
    h.revocation
        .revoke_session(tokens.session_id, TokenClass::Access)
        .await
        .unwrap();

    let events = h.audit.recent_for_user(ident.id, 10).await.unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SecurityEventKind::Logout,
            SecurityEventKind::TokenRefreshed,
            SecurityEventKind::TokenRevoked,
            SecurityEventKind::Login,
        ]
    );
    assert!(events.iter().all(|e| e.actor_id == ident.id));
}

#[tokio::test]
async fn test_expired_record_is_denied_before_sweep() {
    let h = harness();
    let tokens = login(&h, &member("Lars")).await;

    let mut record = h.sessions.get(tokens.session_id).await.unwrap().unwrap();
    record.expires_at = Utc::now() - Duration::minutes(1);
    h.store
        .set_json(
            &keys::session_by_id(tokens.session_id),
            &record,
            StdDuration::from_secs(60),
        )
        .await
        .unwrap();

    assert!(
        h.verifier
            .verify(&tokens.access_token, TokenClass::Access)
            .await
            .is_none()
    );
    let rotate = h.issuer.rotate_access_token(&tokens.refresh_token).await;
    assert!(matches!(rotate, Err(AuthError::RevokedSession)));
}
