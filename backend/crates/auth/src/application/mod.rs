//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod credentials;
pub mod passwords;
pub mod profile;
pub mod refresh;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod users;

// Re-exports
pub use config::AccountConfig;
pub use credentials::AccountCredentials;
pub use passwords::Passwords;
pub use profile::{Profile, ProfileUseCase, UpdateProfileInput};
pub use refresh::RefreshUseCase;
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use users::UsersUseCase;
