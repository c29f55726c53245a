//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for
//! user passwords, JWT signing secrets and private key material.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct that derives `Debug` over a secret gets safe logging behavior for
//! free. Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginRequest {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let req = LoginRequest {
//!     email: "a@acme.com".to_string(),
//!     password: SecretString::from("pw123"),
//! };
//!
//! // Debug output shows the email but not the password
//! println!("{:?}", req);
//!
//! let password: &str = req.password.expose_secret();
//! # assert_eq!(password, "pw123");
//! ```
//!
//! Use `SecretString` for passwords and bearer tokens arriving in request
//! bodies; use `SecretBox<Vec<u8>>` for decoded signing keys.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
