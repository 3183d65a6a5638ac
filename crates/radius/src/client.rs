//! UDP client for RADIUS accounting exchanges.

use crate::codec::{
    verify_response, AccountingRequest, CodecError, RequestContext, MAX_PACKET_LEN,
};
use async_trait::async_trait;
use radacct_core::{AccountingSender, Ack, SendError};
use radacct_types::AccountingEvent;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::net::UdpSocket;
use tracing::debug;

/// Configuration for the accounting client.
#[derive(Debug, Clone)]
pub struct RadiusClientConfig {
    /// Accounting server address.
    pub server: SocketAddr,

    /// Shared secret used for authenticators.
    pub secret: Vec<u8>,

    /// Per-run attribute values.
    pub context: RequestContext,
}

impl RadiusClientConfig {
    /// Create a configuration for the given server and secret.
    pub fn new(server: SocketAddr, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            server,
            secret: secret.into(),
            context: RequestContext::default(),
        }
    }

    /// Set the Acct-Session-Id prefix.
    pub fn with_session_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.context.session_id_prefix = prefix.into();
        self
    }

    /// Set the Called-Station-Id.
    pub fn with_called_station_id(mut self, id: impl Into<String>) -> Self {
        self.context.called_station_id = id.into();
        self
    }
}

/// Sends each accounting event as one Accounting-Request over UDP.
///
/// Every exchange uses its own ephemeral socket so concurrent workers never
/// see each other's replies. The client makes no deadline of its own; the
/// caller wraps [`AccountingSender::send`] in one.
pub struct RadiusAccountingClient {
    config: RadiusClientConfig,
    next_identifier: AtomicU8,
}

impl RadiusAccountingClient {
    pub fn new(config: RadiusClientConfig) -> Self {
        Self {
            config,
            next_identifier: AtomicU8::new(0),
        }
    }

    pub fn config(&self) -> &RadiusClientConfig {
        &self.config
    }

    fn bind_addr(&self) -> SocketAddr {
        if self.config.server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        }
    }
}

#[async_trait]
impl AccountingSender for RadiusAccountingClient {
    async fn send(&self, event: &AccountingEvent) -> Result<Ack, SendError> {
        let identifier = self.next_identifier.fetch_add(1, Ordering::Relaxed);
        let request = AccountingRequest::from_event(event, &self.config.context)
            .encode(identifier, &self.config.secret)
            .map_err(protocol_error)?;

        let socket = UdpSocket::bind(self.bind_addr()).await?;
        socket.connect(self.config.server).await?;
        socket.send(&request.bytes).await?;

        let mut buf = [0u8; MAX_PACKET_LEN];
        loop {
            let len = socket.recv(&mut buf).await?;
            match verify_response(&buf[..len], &request, &self.config.secret) {
                Ok(()) => return Ok(Ack),
                Err(CodecError::IdentifierMismatch { expected, actual }) => {
                    // Late reply to someone else's request; keep waiting for ours.
                    debug!(expected, actual, "Ignoring response with foreign identifier");
                }
                Err(e) => return Err(protocol_error(e)),
            }
        }
    }
}

fn protocol_error(e: CodecError) -> SendError {
    SendError::Protocol(e.to_string())
}
