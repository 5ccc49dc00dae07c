//! HTTP Handlers
//!
//! Every route sits behind the admission middleware; handlers that need the
//! caller take the verified `Principal` from the request extensions.

use std::sync::Arc;

use admission::{AdmissionPipeline, Principal};
use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use kernel::id::UserId;
use platform::kv::KeyValueStore;

use crate::application::{
    AccountConfig, Passwords, Profile, ProfileUseCase, RefreshUseCase, SignInInput,
    SignInUseCase, SignOutUseCase, SignUpInput, SignUpUseCase, UpdateProfileInput, UsersUseCase,
};
use crate::domain::repository::UserRepository;
use crate::error::AccountResult;
use crate::presentation::dto::{
    ChangePasswordRequest, ListUsersQuery, LoginRequest, RefreshRequest, RegisterRequest,
    TokenResponse, UpdateProfileRequest,
};

/// Shared state for account handlers
pub struct AccountState<R, S> {
    pub repo: Arc<R>,
    pub pipeline: Arc<AdmissionPipeline<S>>,
    pub passwords: Arc<Passwords>,
    pub config: Arc<AccountConfig>,
}

impl<R, S> Clone for AccountState<R, S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            pipeline: self.pipeline.clone(),
            passwords: self.passwords.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Register / Login
// ============================================================================

/// POST /auth/register
pub async fn register<R, S>(
    State(state): State<AccountState<R, S>>,
    Json(req): Json<RegisterRequest>,
) -> AccountResult<(StatusCode, Json<Profile>)>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.passwords.clone());

    let user = use_case
        .execute(SignUpInput {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Profile::from(&user))))
}

/// POST /auth/login
pub async fn login<R, S>(
    State(state): State<AccountState<R, S>>,
    Json(req): Json<LoginRequest>,
) -> AccountResult<Json<TokenResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.passwords.clone(),
        state.pipeline.clone(),
    );

    let pair = use_case
        .execute(SignInInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(pair.into()))
}

// ============================================================================
// Refresh / Logout
// ============================================================================

/// POST /auth/refresh
pub async fn refresh<R, S>(
    State(state): State<AccountState<R, S>>,
    Json(req): Json<RefreshRequest>,
) -> AccountResult<Json<TokenResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = RefreshUseCase::new(state.repo.clone(), state.pipeline.clone());
    let pair = use_case.execute(&req.refresh_token).await?;
    Ok(Json(pair.into()))
}

/// POST /auth/logout
pub async fn logout<R, S>(
    State(state): State<AccountState<R, S>>,
    Json(req): Json<RefreshRequest>,
) -> AccountResult<StatusCode>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    SignOutUseCase::new(state.pipeline.clone())
        .execute(&req.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Profile (requires authentication)
// ============================================================================

/// GET /auth/me
pub async fn me<R, S>(
    State(state): State<AccountState<R, S>>,
    Extension(principal): Extension<Principal>,
) -> AccountResult<Json<Profile>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = profile_use_case(&state);
    Ok(Json(use_case.me(&principal.id).await?))
}

/// PATCH /auth/me
pub async fn update_me<R, S>(
    State(state): State<AccountState<R, S>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<UpdateProfileRequest>,
) -> AccountResult<Json<Profile>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = profile_use_case(&state);
    let input = UpdateProfileInput {
        name: req.name,
        email: req.email,
    };
    Ok(Json(use_case.update(&principal.id, input).await?))
}

/// POST /auth/me/password
pub async fn change_password<R, S>(
    State(state): State<AccountState<R, S>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<ChangePasswordRequest>,
) -> AccountResult<StatusCode>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    profile_use_case(&state)
        .change_password(&principal.id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Administration (admin only)
// ============================================================================

/// GET /users
pub async fn list_users<R, S>(
    State(state): State<AccountState<R, S>>,
    Query(query): Query<ListUsersQuery>,
) -> AccountResult<Json<Vec<Profile>>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = UsersUseCase::new(state.repo.clone(), state.config.clone());
    Ok(Json(use_case.list(query.skip, query.limit).await?))
}

/// GET /users/{id}
pub async fn get_user<R, S>(
    State(state): State<AccountState<R, S>>,
    Path(id): Path<UserId>,
) -> AccountResult<Json<Profile>>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let use_case = UsersUseCase::new(state.repo.clone(), state.config.clone());
    Ok(Json(use_case.get(&id).await?))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn profile_use_case<R, S>(state: &AccountState<R, S>) -> ProfileUseCase<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    ProfileUseCase::new(
        state.repo.clone(),
        state.passwords.clone(),
        state.pipeline.clone(),
    )
}
