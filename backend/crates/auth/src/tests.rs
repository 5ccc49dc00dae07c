//! Account flows through the router, against an in-memory repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use admission::{AdmissionConfig, AdmissionPipeline, RateLimitTiers, Role};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::clock::SystemClock;
use platform::kv::{KeyValueStore, MemoryStore, StoreError};
use platform::rate_limit::RateLimitPolicy;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::application::{AccountConfig, Passwords};
use crate::domain::entity::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{DisplayName, Email};
use crate::error::{AccountError, AccountResult};
use crate::presentation::router::auth_router_generic;

#[derive(Clone, Default)]
struct InMemoryUsers {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUsers {
    fn set_active(&self, email: &str, active: bool) {
        let mut users = self.users.lock().unwrap();
        for user in users.values_mut() {
            if user.email.as_str() == email {
                user.is_active = active;
            }
        }
    }
}

impl UserRepository for InMemoryUsers {
    async fn create(&self, user: &User) -> AccountResult<()> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AccountError::EmailTaken);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> AccountResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AccountResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| &u.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AccountResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn update(&self, user: &User) -> AccountResult<()> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AccountError::UserNotFound),
        }
    }

    async fn list(&self, skip: i64, limit: i64) -> AccountResult<Vec<User>> {
        let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> AccountResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(id).map(|user| {
            user.last_login_at = Some(at);
            user.clone()
        }))
    }
}

/// Memory store whose prefix deletes can be cut off mid-test
#[derive(Default)]
struct PrefixOutage {
    inner: MemoryStore,
    down: AtomicBool,
}

impl KeyValueStore for PrefixOutage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.delete_prefix(prefix).await
    }

    async fn incr_window(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        self.inner.incr_window(key, ttl).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        replacement: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.inner
            .compare_and_swap(key, expected, replacement, ttl)
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

struct Harness<S = MemoryStore> {
    app: Router,
    repo: InMemoryUsers,
    pipeline: Arc<AdmissionPipeline<S>>,
}

fn harness() -> Harness {
    harness_on(Arc::new(MemoryStore::new()))
}

fn harness_on<S>(store: Arc<S>) -> Harness<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    let generous = RateLimitPolicy::new(1_000, 60);
    let config = AdmissionConfig {
        rate_limits: RateLimitTiers {
            login: generous,
            register: generous,
            refresh: generous,
            general: generous,
        },
        ..AdmissionConfig::development()
    };
    let pipeline = Arc::new(
        AdmissionPipeline::new(config, store, Arc::new(SystemClock)).unwrap(),
    );
    let repo = InMemoryUsers::default();
    let app = auth_router_generic(repo.clone(), pipeline.clone(), AccountConfig::testing()).unwrap();
    Harness {
        app,
        repo,
        pipeline,
    }
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Ada Lovelace", "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_register_login_me() {
    let h = harness();
    let profile = register(&h.app, "Ada@Example.com", "analytical-engine-1843").await;
    assert_eq!(profile["email"], "ada@example.com");
    assert_eq!(profile["role"], "user");

    let (status, tokens) = login(&h.app, "ada@example.com", "analytical-engine-1843").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["expires_in"], 30 * 60);

    // login warmed the session cache
    let id: UserId = profile["id"].as_str().unwrap().parse().unwrap();
    let key = h.pipeline.cache().session_key(&id).await.unwrap();
    assert!(h.pipeline.cache().get(&key).await.is_hit());

    let access = tokens["access_token"].as_str().unwrap();
    let (status, me) = call(&h.app, "GET", "/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], profile["id"]);
    assert!(!me["last_login_at"].is_null());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let h = harness();
    register(&h.app, "grace@example.com", "compiler-cobol-1959").await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Grace", "email": "GRACE@example.com", "password": "another-pass-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Linus", "email": "linus@example.com", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "WEAK_PASSWORD");
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let h = harness();
    register(&h.app, "alan@example.com", "enigma-bombe-1940").await;

    let (status, body) = login(&h.app, "alan@example.com", "enigma-bombe-1941").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_FAILED");

    let (status, _) = login(&h.app, "nobody@example.com", "enigma-bombe-1940").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let h = harness();
    register(&h.app, "edsger@example.com", "shortest-path-1959").await;
    let (_, tokens) = login(&h.app, "edsger@example.com", "shortest-path-1959").await;
    let first = tokens["refresh_token"].as_str().unwrap();

    let (status, rotated) = call(
        &h.app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

    let (status, body) = call(
        &h.app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_inactive_account_cannot_login_or_refresh() {
    let h = harness();
    register(&h.app, "ken@example.com", "unix-pdp7-1969").await;
    let (_, tokens) = login(&h.app, "ken@example.com", "unix-pdp7-1969").await;

    h.repo.set_active("ken@example.com", false);

    let (status, body) = call(
        &h.app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCOUNT_INACTIVE");

    let (status, _) = login(&h.app, "ken@example.com", "unix-pdp7-1969").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_ends_family() {
    let h = harness();
    register(&h.app, "barbara@example.com", "clu-abstraction-1974").await;
    let (_, tokens) = login(&h.app, "barbara@example.com", "clu-abstraction-1974").await;
    let refresh = json!({ "refresh_token": tokens["refresh_token"] });

    let (status, _) = call(&h.app, "POST", "/auth/logout", None, Some(refresh.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&h.app, "POST", "/auth/refresh", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_change_revokes_every_family() {
    let h = harness();
    register(&h.app, "margaret@example.com", "apollo-guidance-1969").await;
    let (_, phone) = login(&h.app, "margaret@example.com", "apollo-guidance-1969").await;
    let (_, laptop) = login(&h.app, "margaret@example.com", "apollo-guidance-1969").await;
    let access = laptop["access_token"].as_str().unwrap();

    let (status, body) = call(
        &h.app,
        "POST",
        "/auth/me/password",
        Some(access),
        Some(json!({ "current_password": "wrong-one-entirely", "new_password": "lunar-module-1969" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INCORRECT_PASSWORD");

    let (status, _) = call(
        &h.app,
        "POST",
        "/auth/me/password",
        Some(access),
        Some(json!({ "current_password": "apollo-guidance-1969", "new_password": "lunar-module-1969" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for device in [&phone, &laptop] {
        let (status, _) = call(
            &h.app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": device["refresh_token"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = login(&h.app, "margaret@example.com", "lunar-module-1969").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_unchanged_when_revocation_fails() {
    let store = Arc::new(PrefixOutage::default());
    let h = harness_on(store.clone());
    register(&h.app, "frances@example.com", "fortran-optimizer-1957").await;
    let (_, tokens) = login(&h.app, "frances@example.com", "fortran-optimizer-1957").await;
    let access = tokens["access_token"].as_str().unwrap();

    store.down.store(true, Ordering::SeqCst);
    let (status, _) = call(
        &h.app,
        "POST",
        "/auth/me/password",
        Some(access),
        Some(json!({ "current_password": "fortran-optimizer-1957", "new_password": "ptran-parallel-1980" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    store.down.store(false, Ordering::SeqCst);

    let (status, _) = login(&h.app, "frances@example.com", "ptran-parallel-1980").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&h.app, "frances@example.com", "fortran-optimizer-1957").await;
    assert_eq!(status, StatusCode::OK);

    // the session from before the attempt is still live
    let (status, _) = call(
        &h.app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_update_drops_cached_session() {
    let h = harness();
    register(&h.app, "donald@example.com", "literate-programs-1984").await;
    let (_, tokens) = login(&h.app, "donald@example.com", "literate-programs-1984").await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, updated) = call(
        &h.app,
        "PATCH",
        "/auth/me",
        Some(access),
        Some(json!({ "name": "Donald E. Knuth" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Donald E. Knuth");

    let (_, me) = call(&h.app, "GET", "/auth/me", Some(access), None).await;
    assert_eq!(me["name"], "Donald E. Knuth");
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let h = harness();
    register(&h.app, "user@example.com", "plain-user-pass-1").await;
    let (_, user_tokens) = login(&h.app, "user@example.com", "plain-user-pass-1").await;

    let passwords = Passwords::new(&AccountConfig::testing()).unwrap();
    let mut admin = User::new(
        DisplayName::new("Root").unwrap(),
        Email::new("root@example.com").unwrap(),
        passwords.choose("admin-pass-0001").await.unwrap(),
    );
    admin.role = Role::Admin;
    h.repo.create(&admin).await.unwrap();
    let (_, admin_tokens) = login(&h.app, "root@example.com", "admin-pass-0001").await;

    let (status, _) = call(
        &h.app,
        "GET",
        "/users",
        user_tokens["access_token"].as_str(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listing) = call(
        &h.app,
        "GET",
        "/users?limit=10",
        admin_tokens["access_token"].as_str(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 2);

    let uri = format!("/users/{}", admin.id);
    let (status, one) = call(&h.app, "GET", &uri, admin_tokens["access_token"].as_str(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["role"], "admin");

    let (status, _) = call(&h.app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
