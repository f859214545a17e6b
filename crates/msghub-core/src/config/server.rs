//! WebSocket server configuration.

use serde::{Deserialize, Serialize};

/// Bind address and endpoint path for the WebSocket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the WebSocket upgrade endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Outbound buffer per connection (messages queued for the socket writer).
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl ServerConfig {
    /// Returns `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_outbound_buffer() -> usize {
    256
}
