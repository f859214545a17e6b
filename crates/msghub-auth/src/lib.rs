//! # msghub-auth
//!
//! Authentication collaborators for the message hub.
//!
//! ## Modules
//!
//! - `jwt`: JWT claims, HS256 decoding (implements `TokenDecoder`) and issuing
//! - `principal`: `PrincipalResolver` implementations: roles taken from the
//!   token itself, or from an in-memory principal directory

pub mod jwt;
pub mod principal;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use principal::{ClaimsPrincipalResolver, InMemoryPrincipalDirectory};
