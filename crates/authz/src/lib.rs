//! Authentication and authorization primitives for shelf.
//!
//! Nothing in here knows about HTTP: the session gate in `shelf-http` asks
//! the [`AccessPolicy`] what a path needs, resolves the caller through the
//! [`SessionStore`], and checks passwords against the [`CredentialStore`].

pub mod credentials;
pub mod policy;
pub mod principal;
pub mod session;

pub use credentials::{CredentialError, CredentialStore};
pub use policy::{Access, AccessPolicy, Decision};
pub use principal::{Principal, Role};
pub use session::SessionStore;
