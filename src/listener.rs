//! Default inbound listener.

use std::sync::Arc;

use async_trait::async_trait;

use msghub_core::result::AppResult;
use msghub_realtime::connection::SessionIdentity;
use msghub_realtime::{ConnectionHandle, HubListener, HubMessage};

/// Logs every inbound message with its provenance.
#[derive(Debug, Default)]
pub struct TracingListener;

#[async_trait]
impl HubListener for TracingListener {
    async fn on_message(
        &self,
        connection: Arc<ConnectionHandle>,
        identity: Option<Arc<SessionIdentity>>,
        message: HubMessage,
    ) -> AppResult<()> {
        tracing::info!(
            conn_id = %connection.id(),
            origin = %connection.origin_address(),
            identity = ?identity.as_ref().map(|i| i.principal.name.as_str()),
            kind = ?message.kind,
            topic = ?message.topic,
            "Inbound message"
        );
        Ok(())
    }
}
