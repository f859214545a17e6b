//! Shared types exchanged between the hub and its collaborators.

pub mod identity;

pub use identity::{ANONYMOUS_IDENTITY, ANONYMOUS_ROLE, IdentityClaim, Principal};
