//! Backend-as-a-service adapter: identity provider plus profile data store.
//!
//! DESIGN
//! ======
//! The session controller depends only on the [`AuthBackend`] trait.
//! [`SupabaseBackend`] is the HTTP implementation; tests inject a scripted
//! fake through the same seam.

pub mod events;
pub mod supabase;
pub mod types;

pub use events::{SessionBroadcaster, SessionChange, Subscription};
pub use supabase::SupabaseBackend;
pub use types::{AuthBackend, BackendError, SignUpResponse};
