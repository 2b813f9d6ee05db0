//! Authentication bridge between browser sessions and backend bearer tokens.

pub mod bridge;
pub mod principal;
pub mod token;

pub use bridge::{AuthBridge, AuthError, Registration};
pub use principal::{Principal, UserProfile};
