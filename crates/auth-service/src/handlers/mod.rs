pub mod auth_handler;
pub mod health_handler;

pub use auth_handler::{
    handle_login, handle_logout, handle_me, handle_organization, handle_refresh, handle_register,
};
pub use health_handler::{health_check, metrics_handler, readiness_check};
