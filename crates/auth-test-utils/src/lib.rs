//! # Auth Test Utilities
//!
//! Shared test utilities for the auth service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed HMAC secret, seeded Ed25519 keys)
//! - Test data builders (`TestTokenBuilder`)
//! - Server test harness (`TestAuthServer` backed by in-memory stores)
//! - Fixed test IDs
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestAuthServer::spawn().await?;
//!     let registered = server.register("Acme", "a@acme.com", "pw123").await?;
//!
//!     registered
//!         .tokens
//!         .access_token
//!         .assert_valid_jwt()
//!         .assert_token_type(TokenType::Access);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

pub use assertions::*;
pub use common::jwt::TokenType;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
