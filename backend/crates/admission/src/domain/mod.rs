//! Domain Layer
//!
//! Identities, token claims, route descriptions and the credential contract.

pub mod claims;
pub mod credential;
pub mod principal;
pub mod route;

// Re-exports
pub use claims::{Claims, TokenType};
pub use credential::{CredentialLookupError, CredentialStore, PrincipalRecord};
pub use principal::{Principal, Role};
pub use route::{AccessLevel, CachePolicy, Identity, RouteClass, RouteSpec};
