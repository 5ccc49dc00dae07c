//! Token Engine
//!
//! Issues, verifies and rotates HS256 access/refresh token pairs.
//!
//! Access tokens are verified statelessly (signature and expiry only).
//! Refresh tokens carry a rotation marker that must match the marker stored
//! for their session family; every rotation replaces the stored marker, so a
//! superseded refresh token can never be exchanged again.
//!
//! Store layout: `auth:rotation:{user_id}:{family}` -> current marker,
//! expiring with the refresh lifetime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kernel::id::UserId;
use platform::clock::Clock;
use platform::crypto::random_token;
use platform::kv::KeyValueStore;

use crate::application::config::TokenConfig;
use crate::domain::{Claims, Principal, TokenType};
use crate::error::{AuthError, AuthResult, TokenConfigError};

const ROTATION_NAMESPACE: &str = "auth:rotation:";
const MARKER_BYTES: usize = 16;

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// The principal as the access token describes it
    pub principal: Principal,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

pub struct TokenEngine<S> {
    config: TokenConfig,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    header: Header,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl<S> TokenEngine<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    /// Validate the configuration and prove the keys can round-trip a token.
    ///
    /// An error here means no token could ever verify; callers must refuse
    /// to start.
    pub fn new(
        config: TokenConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenConfigError> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let engine = Self {
            encoding: EncodingKey::from_secret(&config.secret),
            decoding: DecodingKey::from_secret(&config.secret),
            header: Header::new(Algorithm::HS256),
            validation,
            config,
            store,
            clock,
        };
        engine.self_check()?;
        Ok(engine)
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn self_check(&self) -> Result<(), TokenConfigError> {
        let now = self.clock.now_secs();
        let claims = self.claims(
            &Principal::new(UserId::new(), Default::default()),
            TokenType::Access,
            now,
            "probe",
            None,
        );
        let token = encode(&self.header, &claims, &self.encoding)
            .map_err(|e| TokenConfigError::Probe(e.to_string()))?;
        let decoded = decode::<Claims>(&token, &self.decoding, &self.validation)
            .map_err(|e| TokenConfigError::Probe(e.to_string()))?;
        if decoded.claims != claims {
            return Err(TokenConfigError::Probe("claims changed in transit".into()));
        }
        Ok(())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Start a new session family for `principal` and issue its first pair.
    ///
    /// Fails closed: without a stored marker the refresh token would be
    /// unusable, so a store failure is reported rather than ignored.
    pub async fn issue(&self, principal: &Principal) -> AuthResult<TokenPair> {
        let family = random_token(MARKER_BYTES);
        let marker = random_token(MARKER_BYTES);
        let pair = self.sign_pair(principal, &family, &marker)?;

        self.store
            .set(
                &rotation_key(&principal.id, &family),
                marker.as_bytes(),
                self.config.refresh_ttl,
            )
            .await
            .map_err(AuthError::StoreUnavailable)?;

        tracing::debug!(user_id = %principal.id, "Issued token pair");
        Ok(pair)
    }

    /// Stateless access token check: signature, type and expiry
    pub fn verify_access(&self, token: &str) -> AuthResult<Principal> {
        let claims = self.decode(token, TokenType::Access)?;
        principal_from(&claims)
    }

    /// Exchange a refresh token for a new pair, advancing the family's marker.
    ///
    /// Exactly one of several concurrent exchanges of the same token succeeds;
    /// the rest fail with [`AuthError::StaleToken`].
    pub async fn rotate(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.decode(refresh_token, TokenType::Refresh)?;
        let current = claims.rot.as_deref().ok_or(AuthError::Malformed)?;
        let principal = principal_from(&claims)?;

        let next = random_token(MARKER_BYTES);
        let pair = self.sign_pair(&principal, &claims.fam, &next)?;

        let swapped = self
            .store
            .compare_and_swap(
                &rotation_key(&principal.id, &claims.fam),
                current.as_bytes(),
                Some(next.as_bytes()),
                self.config.refresh_ttl,
            )
            .await
            .map_err(AuthError::StoreUnavailable)?;
        if !swapped {
            tracing::warn!(user_id = %principal.id, "Refresh token replay rejected");
            return Err(AuthError::StaleToken);
        }

        tracing::debug!(user_id = %principal.id, "Rotated refresh token");
        Ok(pair)
    }

    /// End the session family of `refresh_token` (logout).
    ///
    /// A superseded token cannot end a family that has moved on.
    pub async fn revoke(&self, refresh_token: &str) -> AuthResult<Principal> {
        let claims = self.decode(refresh_token, TokenType::Refresh)?;
        let current = claims.rot.as_deref().ok_or(AuthError::Malformed)?;
        let principal = principal_from(&claims)?;

        let removed = self
            .store
            .compare_and_swap(
                &rotation_key(&principal.id, &claims.fam),
                current.as_bytes(),
                None,
                self.config.refresh_ttl,
            )
            .await
            .map_err(AuthError::StoreUnavailable)?;
        if !removed {
            return Err(AuthError::StaleToken);
        }
        Ok(principal)
    }

    /// End every session family of a user; returns how many were live
    pub async fn revoke_all(&self, user_id: &UserId) -> AuthResult<u64> {
        let removed = self
            .store
            .delete_prefix(&format!("{ROTATION_NAMESPACE}{user_id}:"))
            .await
            .map_err(AuthError::StoreUnavailable)?;
        tracing::info!(user_id = %user_id, families = removed, "Revoked all sessions");
        Ok(removed)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn claims(
        &self,
        principal: &Principal,
        typ: TokenType,
        now: i64,
        family: &str,
        marker: Option<&str>,
    ) -> Claims {
        let ttl = match typ {
            TokenType::Access => self.config.access_ttl_secs(),
            TokenType::Refresh => self.config.refresh_ttl_secs(),
        };
        Claims {
            sub: principal.id.to_string(),
            role: principal.role,
            iat: now,
            exp: now + ttl,
            iss: self.config.issuer.clone(),
            typ,
            fam: family.to_string(),
            rot: marker.map(str::to_string),
        }
    }

    fn sign_pair(&self, principal: &Principal, family: &str, marker: &str) -> AuthResult<TokenPair> {
        let now = self.clock.now_secs();
        let access = self.claims(principal, TokenType::Access, now, family, None);
        let refresh = self.claims(principal, TokenType::Refresh, now, family, Some(marker));

        let access_token = encode(&self.header, &access, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let refresh_token = encode(&self.header, &refresh, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            principal: principal_from(&access)?,
            expires_in: self.config.access_ttl.as_secs(),
        })
    }

    fn decode(&self, token: &str, expected: TokenType) -> AuthResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(map_jwt_error)?
            .claims;
        if claims.typ != expected {
            return Err(AuthError::Malformed);
        }
        if claims.exp <= self.clock.now_secs() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

fn rotation_key(user_id: &UserId, family: &str) -> String {
    format!("{ROTATION_NAMESPACE}{user_id}:{family}")
}

fn principal_from(claims: &Claims) -> AuthResult<Principal> {
    let id = claims.sub.parse::<UserId>().map_err(|_| AuthError::Malformed)?;
    let issued_at = DateTime::<Utc>::from_timestamp(claims.iat, 0).ok_or(AuthError::Malformed)?;
    Ok(Principal {
        id,
        role: claims.role,
        issued_at,
    })
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::clock::ManualClock;
    use platform::kv::MemoryStore;

    fn engine() -> (TokenEngine<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let engine =
            TokenEngine::new(TokenConfig::with_random_secret(), store.clone(), clock).unwrap();
        (engine, store)
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let config = TokenConfig {
            secret: b"secret".to_vec(),
            ..TokenConfig::default()
        };
        assert!(matches!(
            TokenEngine::new(config, store, clock),
            Err(TokenConfigError::PlaceholderSecret)
        ));
    }

    #[tokio::test]
    async fn test_issue_stores_marker_per_family() {
        let (engine, store) = engine();
        let principal = Principal::new(UserId::new(), Default::default());

        engine.issue(&principal).await.unwrap();
        engine.issue(&principal).await.unwrap();

        // two logins, two families
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_tokens_are_not_interchangeable() {
        let (engine, _) = engine();
        let pair = engine
            .issue(&Principal::new(UserId::new(), Default::default()))
            .await
            .unwrap();

        assert!(matches!(
            engine.verify_access(&pair.refresh_token),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            engine.rotate(&pair.access_token).await,
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.verify_access("not.a.jwt"),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(engine.verify_access(""), Err(AuthError::Malformed)));
    }
}
