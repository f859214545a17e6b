//! # msghub-core
//!
//! Core crate for the message hub. Contains configuration schemas,
//! identity and principal types, the authentication collaborator traits,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other msghub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
