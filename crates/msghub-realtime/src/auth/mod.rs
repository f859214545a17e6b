//! In-band authentication linking.

pub mod linker;

pub use linker::{AuthenticationLinker, LinkOutcome};
