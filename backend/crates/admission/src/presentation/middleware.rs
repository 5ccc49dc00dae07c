//! Admission Middleware
//!
//! Runs the [`AdmissionPipeline`] in front of one route. Attach with
//! [`guarded`], or directly:
//!
//! ```ignore
//! get(handler).route_layer(from_fn_with_state(guard, admit::<S>))
//! ```
//!
//! Admitted requests carry the verified [`Principal`] as an extension.
//! Cacheable reads are answered from the cache on a hit and populated from
//! the handler's 200 response on a miss; successful writes invalidate the
//! resources their route declares before the response leaves.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use kernel::error::app_error::AppError;
use platform::client::extract_client_ip;
use platform::kv::KeyValueStore;

use crate::application::pipeline::{AdmissionPipeline, CacheDecision, RequestContext};
use crate::application::rate_limiter::Quota;
use crate::domain::RouteSpec;
use crate::error::AuthError;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Middleware state: the shared pipeline plus the route it guards
pub struct RouteGuard<S> {
    pipeline: Arc<AdmissionPipeline<S>>,
    spec: Arc<RouteSpec>,
}

impl<S> Clone for RouteGuard<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            spec: self.spec.clone(),
        }
    }
}

impl<S> RouteGuard<S> {
    pub fn new(pipeline: Arc<AdmissionPipeline<S>>, spec: RouteSpec) -> Self {
        Self {
            pipeline,
            spec: Arc::new(spec),
        }
    }

    pub fn spec(&self) -> &RouteSpec {
        &self.spec
    }
}

/// Wrap a method router with admission for `spec`
pub fn guarded<St, S>(
    route: MethodRouter<St>,
    pipeline: &Arc<AdmissionPipeline<S>>,
    spec: RouteSpec,
) -> MethodRouter<St>
where
    St: Clone + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(
        RouteGuard::new(pipeline.clone(), spec),
        admit::<S>,
    ))
}

/// Admission middleware
pub async fn admit<S>(
    State(guard): State<RouteGuard<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    S: KeyValueStore + Send + Sync + 'static,
{
    let ctx = match request_context(&req) {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    let admission = match guard.pipeline.admit(&guard.spec, &ctx).await {
        Ok(admission) => admission,
        Err(e) => return e.into_response(),
    };

    if let Some(principal) = admission.principal {
        req.extensions_mut().insert(principal);
    }

    let mut response = match admission.cache {
        CacheDecision::Hit(body) => {
            let mut response =
                (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response();
            response
                .headers_mut()
                .insert(X_CACHE, HeaderValue::from_static("HIT"));
            response
        }
        CacheDecision::Miss { key, ttl } => {
            let response = next.run(req).await;
            if response.status() != StatusCode::OK {
                response
            } else {
                let (mut parts, body) = response.into_parts();
                let bytes = match to_bytes(body, usize::MAX).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to buffer response body");
                        return AppError::internal("Failed to read response").into_response();
                    }
                };
                guard.pipeline.cache().set(&key, &bytes, ttl).await;
                parts
                    .headers
                    .insert(X_CACHE, HeaderValue::from_static("MISS"));
                Response::from_parts(parts, Body::from(bytes))
            }
        }
        CacheDecision::Bypass => {
            let response = next.run(req).await;
            if !ctx.is_read && response.status().is_success() {
                guard.pipeline.complete_write(&guard.spec).await;
            }
            response
        }
    };

    if admission.quota.metered {
        quota_headers(response.headers_mut(), &admission.quota);
    }
    response
}

fn request_context(req: &Request<Body>) -> Result<RequestContext, AuthError> {
    let headers = req.headers();

    let bearer = headers
        .typed_try_get::<Authorization<Bearer>>()
        .map_err(|_| AuthError::Malformed)?
        .map(|auth| auth.token().to_owned());

    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    Ok(RequestContext {
        bearer,
        client_ip: extract_client_ip(headers, peer_ip),
        path: req.uri().path().to_owned(),
        query: req.uri().query().map(str::to_owned),
        is_read: matches!(*req.method(), Method::GET | Method::HEAD),
    })
}

fn quota_headers(headers: &mut HeaderMap, quota: &Quota) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(quota.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(quota.reset_after));
}
