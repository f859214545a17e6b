//! Target-set resolution for broadcast, identity, and role sends.

pub mod host;
pub mod resolver;

pub use host::LocalHost;
pub use resolver::TargetResolver;
