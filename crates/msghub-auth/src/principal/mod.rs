//! `PrincipalResolver` implementations.

pub mod claims;
pub mod directory;

pub use claims::ClaimsPrincipalResolver;
pub use directory::InMemoryPrincipalDirectory;
