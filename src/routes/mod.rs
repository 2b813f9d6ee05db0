//! HTTP route handlers.

pub mod dashboard;
pub mod fallback;
pub mod health;
pub mod login;
pub mod logout;
pub mod page;
pub mod proxy;
pub mod register;
