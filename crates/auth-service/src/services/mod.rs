pub mod cleanup_service;
pub mod token_service;
pub mod validation;

pub use token_service::{TokenService, TokenSettings};
