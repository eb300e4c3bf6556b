//! Client-side state containers.
//!
//! DESIGN
//! ======
//! Each container has a defined initial value and a closed set of synchronous
//! mutations. They are injected into the session controller and the router
//! guard instead of living in globals. Mutations never span an `.await`, so
//! readers never observe a half-applied update.

pub mod auth;
pub mod query_cache;
pub mod ui;
