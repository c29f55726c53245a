//! Auth Service Library
//!
//! Multi-tenant authentication for the recruitment platform: organization
//! registration, email/password login, and rotating access/refresh tokens.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Password hashing and token signing
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication and HTTP metrics
//! - `models` - Data models and wire types
//! - `observability` - Metrics and log-correlation helpers
//! - `repositories` - User storage and session revocation stores
//! - `routes` - Router construction
//! - `services` - Business logic layer

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
