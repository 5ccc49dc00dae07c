//! Account Router
//!
//! Each route carries its own admission spec: rate-limit class, access
//! level, cache policy and the resources its success invalidates.

use std::sync::Arc;

use admission::{AccessLevel, AdmissionPipeline, RouteClass, RouteSpec, guarded};
use axum::{
    Router,
    routing::{get, patch, post},
};
use platform::kv::KeyValueStore;

use crate::application::{AccountConfig, Passwords};
use crate::domain::repository::UserRepository;
use crate::error::AccountResult;
use crate::infra::postgres::PgUserRepository;
use crate::presentation::handlers::{self, AccountState};

/// Cache prefix of the admin user listing
pub const USERS_RESOURCE: &str = "users";

/// Create the account router with PostgreSQL repository
pub fn auth_router<S>(
    repo: PgUserRepository,
    pipeline: Arc<AdmissionPipeline<S>>,
    config: AccountConfig,
) -> AccountResult<Router>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    auth_router_generic(repo, pipeline, config)
}

/// Create a generic account router for any repository implementation
pub fn auth_router_generic<R, S>(
    repo: R,
    pipeline: Arc<AdmissionPipeline<S>>,
    config: AccountConfig,
) -> AccountResult<Router>
where
    R: UserRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let state = AccountState {
        repo: Arc::new(repo),
        passwords: Arc::new(Passwords::new(&config)?),
        pipeline: pipeline.clone(),
        config: Arc::new(config),
    };
    let p = &pipeline;

    let signed_in = RouteSpec::new(RouteClass::General).access(AccessLevel::Authenticated);
    let admin_read = RouteSpec::new(RouteClass::General)
        .access(AccessLevel::Admin)
        .cached(USERS_RESOURCE);

    let router = Router::new()
        .route(
            "/auth/register",
            guarded(
                post(handlers::register::<R, S>),
                p,
                RouteSpec::new(RouteClass::Register).invalidates(USERS_RESOURCE),
            ),
        )
        .route(
            "/auth/login",
            guarded(
                post(handlers::login::<R, S>),
                p,
                // last_login_at is part of the listing
                RouteSpec::new(RouteClass::Login).invalidates(USERS_RESOURCE),
            ),
        )
        .route(
            "/auth/refresh",
            guarded(
                post(handlers::refresh::<R, S>),
                p,
                RouteSpec::new(RouteClass::Refresh),
            ),
        )
        .route(
            "/auth/logout",
            guarded(
                post(handlers::logout::<R, S>),
                p,
                RouteSpec::new(RouteClass::General),
            ),
        )
        .route(
            "/auth/me",
            guarded(get(handlers::me::<R, S>), p, signed_in.clone()).merge(guarded(
                patch(handlers::update_me::<R, S>),
                p,
                signed_in.clone().invalidates(USERS_RESOURCE),
            )),
        )
        .route(
            "/auth/me/password",
            guarded(post(handlers::change_password::<R, S>), p, signed_in),
        )
        .route(
            "/users",
            guarded(get(handlers::list_users::<R, S>), p, admin_read.clone()),
        )
        .route(
            "/users/{id}",
            guarded(get(handlers::get_user::<R, S>), p, admin_read),
        )
        .with_state(state);

    Ok(router)
}
