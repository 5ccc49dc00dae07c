//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Key-value store contract with Redis and in-memory backends
//! - Injectable clock
//! - Cryptographic utilities (random tokens)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Client IP resolution behind proxies
//! - Fixed-window arithmetic for rate limiting

pub mod client;
pub mod clock;
pub mod crypto;
pub mod kv;
pub mod password;
pub mod rate_limit;
