//! Client-side session core for the recipe box app.
//!
//! ARCHITECTURE
//! ============
//! backend notifications -> `services::session::AuthController` ->
//! `state::auth::AuthStore` -> `routes` (navigation) and readers.
//! Accounts, recipes and profiles live in the backend-as-a-service; this
//! crate only keeps local state consistent with it.

pub mod backend;
pub mod config;
pub mod model;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
