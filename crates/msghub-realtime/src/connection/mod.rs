//! Connection handles, the transport seam, and the live connection registry.

pub mod handle;
pub mod identity;
pub mod registry;
pub mod transport;

pub use handle::{ConnectionHandle, ConnectionId, DeliveryOutcome, SessionAttributes, SessionIdentity};
pub use identity::IdentityIndex;
pub use registry::ConnectionRegistry;
pub use transport::{ChannelTransport, Transport, TransportError};
