//! Value Objects
//!
//! Immutable, self-validating types with no identity.

mod endpoint;
mod hosts_patch;
mod secret_token;

pub use endpoint::{Endpoint, ServerUrl};
pub use hosts_patch::HostsPatchSet;
pub use secret_token::SecretToken;
