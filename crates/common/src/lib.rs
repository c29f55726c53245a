//! Common utilities and types shared across the recruitment auth crates.

#![warn(clippy::pedantic)]

/// Module for strongly typed identifiers
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limit, clock skew, token type)
pub mod jwt;
