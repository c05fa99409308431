//! Login/registration guard for the Coffee Selection storefront: per-client
//! attempt limiting and form input validation, usable in-process or through
//! the `/guard` JSON endpoints.

pub mod api_types;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod i18n;
pub mod state;
