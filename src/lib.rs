//! Account creation, sign-in and navigation state for the Talent Vault front end.
//!
//! The form types in [`forms`] hold per-field validation sessions and drive an
//! [`identity::IdentityProvider`]. [`routes`] serves the same behaviour over HTTP.

pub mod config;
pub mod errors;
pub mod forms;
pub mod identity;
pub mod logging;
pub mod nav;
pub mod routes;
pub mod security;
pub mod session;
pub mod validation;
