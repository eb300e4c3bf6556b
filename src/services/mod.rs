//! Auth services used by the screens and the CLI.
//!
//! ARCHITECTURE
//! ============
//! `session` owns the session lifecycle against the backend; `validation`
//! holds the form checks that run before any of it is called.

pub mod session;
pub mod validation;

pub use session::{AuthController, ControllerHandle};
