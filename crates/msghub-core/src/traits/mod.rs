//! Collaborator traits defined in `msghub-core` and implemented by other crates.

pub mod auth;

pub use auth::{PrincipalResolver, TokenDecoder};
