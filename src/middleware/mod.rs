//! Request guards layered onto route groups.

pub mod csrf;
pub mod login;
