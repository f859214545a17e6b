//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use msghub_auth::ClaimsPrincipalResolver;
use msghub_core::config::HubConfig;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::traits::TokenDecoder;
use msghub_core::types::IdentityClaim;
use msghub_realtime::connection::TransportError;
use msghub_realtime::targeting::LocalHost;
use msghub_realtime::{ConnectionHandle, HubMessage, MessageHub, Transport};

/// Non-loopback address the test hub treats as one of its own interfaces.
pub const LOCAL_INTERFACE: &str = "192.168.50.7";

/// Address of a different machine.
pub const REMOTE_HOST: &str = "10.9.9.9";

/// How a [`RecordingTransport`] reacts to a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Record the frame.
    None,
    /// Return an I/O error.
    Error,
    /// Panic inside `send_text`.
    Panic,
}

/// Observable state shared between a transport and its test.
#[derive(Debug)]
pub struct TransportProbe {
    received: Mutex<Vec<String>>,
    open: AtomicBool,
    mode: Mutex<FailureMode>,
    attempts: AtomicUsize,
}

impl TransportProbe {
    /// Frames recorded so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("probe lock").clone()
    }

    /// Frames recorded so far, decoded.
    pub fn messages(&self) -> Vec<HubMessage> {
        self.received()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("valid frame"))
            .collect()
    }

    /// Topics of the frames recorded so far.
    pub fn topics(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| m.topic)
            .collect()
    }

    /// Number of `send_text` calls, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Mark the transport closed.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Change how later sends behave.
    pub fn set_mode(&self, mode: FailureMode) {
        *self.mode.lock().expect("probe lock") = mode;
    }
}

/// In-memory transport that records every frame.
#[derive(Debug)]
pub struct RecordingTransport {
    id: String,
    origin: String,
    probe: Arc<TransportProbe>,
}

impl RecordingTransport {
    /// Creates a transport and the probe observing it.
    pub fn new(id: &str, origin: &str, mode: FailureMode) -> (Self, Arc<TransportProbe>) {
        let probe = Arc::new(TransportProbe {
            received: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            mode: Mutex::new(mode),
            attempts: AtomicUsize::new(0),
        });
        let transport = Self {
            id: id.to_string(),
            origin: origin.to_string(),
            probe: probe.clone(),
        };
        (transport, probe)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn origin_address(&self) -> &str {
        &self.origin
    }

    fn is_open(&self) -> bool {
        self.probe.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, payload: &str) -> Result<(), TransportError> {
        self.probe.attempts.fetch_add(1, Ordering::SeqCst);
        let mode = *self.probe.mode.lock().expect("probe lock");
        match mode {
            FailureMode::None => {
                self.probe
                    .received
                    .lock()
                    .expect("probe lock")
                    .push(payload.to_string());
                Ok(())
            }
            FailureMode::Error => Err(TransportError::Io("injected failure".to_string())),
            FailureMode::Panic => panic!("injected transport panic"),
        }
    }
}

/// A connection opened against a test hub.
///
/// Owns the only strong reference to the handle; dropping it without
/// [`TestClient::disconnect`] simulates a connection that vanished.
pub struct TestClient {
    pub handle: Arc<ConnectionHandle>,
    pub probe: Arc<TransportProbe>,
}

impl TestClient {
    /// Opens a connection on `hub`.
    pub fn connect(hub: &MessageHub, id: &str, origin: &str) -> Self {
        Self::connect_with(hub, id, origin, FailureMode::None)
    }

    /// Opens a connection whose transport behaves per `mode`.
    pub fn connect_with(hub: &MessageHub, id: &str, origin: &str, mode: FailureMode) -> Self {
        let (transport, probe) = RecordingTransport::new(id, origin, mode);
        let handle = ConnectionHandle::new(transport);
        hub.on_connection_opened(&handle);
        Self { handle, probe }
    }

    /// Connection id.
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    /// Sends an in-band authentication message.
    pub async fn authenticate(&self, hub: &MessageHub, token: &str) {
        let raw = serde_json::to_string(&HubMessage::authentication(token)).expect("encode");
        hub.on_inbound_message(&self.handle, &raw).await;
    }

    /// Sends a raw inbound frame.
    pub async fn inbound(&self, hub: &MessageHub, raw: &str) {
        hub.on_inbound_message(&self.handle, raw).await;
    }

    /// Closes the connection through the transport lifecycle hook.
    pub fn disconnect(&self, hub: &MessageHub) {
        self.probe.close();
        hub.on_connection_closed(&self.handle);
    }
}

/// Token decoder for tests.
///
/// Tokens are `subject` or `subject:ROLE,ROLE`. A `~` prefix yields an
/// expired claim, `invalid` fails decoding, and a blank token carries no
/// identity. A trailing `:` grants an empty role set.
#[derive(Debug, Default)]
pub struct StaticTokenDecoder;

#[async_trait]
impl TokenDecoder for StaticTokenDecoder {
    async fn decode(&self, token: &str) -> AppResult<Option<IdentityClaim>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        if token == "invalid" {
            return Err(AppError::authentication("Invalid token"));
        }

        let now = Utc::now().timestamp();
        let (token, expires_at) = match token.strip_prefix('~') {
            Some(rest) => (rest, now - 60),
            None => (token, now + 3600),
        };
        let (subject, roles) = match token.split_once(':') {
            Some((subject, roles)) => (
                subject,
                roles
                    .split(',')
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect::<BTreeSet<_>>(),
            ),
            None => (token, BTreeSet::new()),
        };

        Ok(Some(IdentityClaim {
            subject: subject.to_string(),
            roles,
            issued_at: now,
            expires_at,
            token_id: None,
        }))
    }

    fn is_expired(&self, claim: &IdentityClaim) -> bool {
        claim.is_expired_at(Utc::now().timestamp())
    }
}

/// Hub settings with short timeouts.
pub fn test_config() -> HubConfig {
    HubConfig {
        queue_capacity: 16,
        enqueue_timeout_ms: 200,
        poll_timeout_ms: 50,
        max_workers: 4,
        worker_backlog: 64,
        shutdown_grace_ms: 500,
        discover_local_addresses: false,
        ..HubConfig::default()
    }
}

/// The host identity used by test hubs.
pub fn test_local_host() -> LocalHost {
    let ip: IpAddr = LOCAL_INTERFACE.parse().expect("ip");
    LocalHost::new([ip])
}

/// Builds a hub that is not started yet.
pub fn hub_with(config: HubConfig) -> Arc<MessageHub> {
    Arc::new(MessageHub::with_local_host(
        config,
        Arc::new(StaticTokenDecoder),
        Arc::new(ClaimsPrincipalResolver::new()),
        test_local_host(),
    ))
}

/// Builds and starts a hub with [`test_config`].
pub fn started_hub() -> Arc<MessageHub> {
    let hub = hub_with(test_config());
    hub.start();
    hub
}

/// Polls `condition` until it holds or `within` elapses.
pub async fn eventually<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Default wait for asynchronous delivery.
pub const DELIVERY_WAIT: Duration = Duration::from_secs(2);

/// Short settle period used to assert that nothing else arrives.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
