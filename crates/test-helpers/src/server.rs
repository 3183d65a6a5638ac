//! Loopback RADIUS accounting responder.

use parking_lot::Mutex;
use radacct_radius::codec::{attr, encode_response, verify_request, Attribute, MAX_PACKET_LEN};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One verified Accounting-Request as the responder saw it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub identifier: u8,
    pub attributes: Vec<Attribute>,
}

impl ReceivedRequest {
    fn find(&self, kind: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    pub fn status_type(&self) -> Option<u32> {
        self.find(attr::ACCT_STATUS_TYPE)?.as_integer()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.find(attr::ACCT_SESSION_ID)?.as_str()
    }

    pub fn input_octets(&self) -> Option<u32> {
        self.find(attr::ACCT_INPUT_OCTETS)?.as_integer()
    }

    pub fn session_time(&self) -> Option<u32> {
        self.find(attr::ACCT_SESSION_TIME)?.as_integer()
    }

    pub fn framed_ip(&self) -> Option<Ipv4Addr> {
        let bytes: [u8; 4] = self.find(attr::FRAMED_IP_ADDRESS)?.value.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(bytes))
    }
}

/// UDP responder on 127.0.0.1 that acknowledges every correctly signed
/// Accounting-Request and records it.
///
/// Requests that fail verification are logged and left unanswered, which the
/// client sees as a timeout. The responder task stops when this is dropped.
pub struct LocalAccountingServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    rejected: Arc<Mutex<usize>>,
    task: JoinHandle<()>,
}

impl LocalAccountingServer {
    /// Bind an ephemeral port and start answering.
    pub async fn start(secret: impl Into<Vec<u8>>) -> io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let secret = secret.into();
        let received = Arc::new(Mutex::new(Vec::new()));
        let rejected = Arc::new(Mutex::new(0));

        let task = tokio::spawn(serve(
            socket,
            secret,
            Arc::clone(&received),
            Arc::clone(&rejected),
        ));

        Ok(Self {
            addr,
            received,
            rejected,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests acknowledged so far, in arrival order.
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().clone()
    }

    /// Datagrams dropped for failing verification.
    pub fn rejected(&self) -> usize {
        *self.rejected.lock()
    }
}

impl Drop for LocalAccountingServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: UdpSocket,
    secret: Vec<u8>,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    rejected: Arc<Mutex<usize>>,
) {
    let mut buf = [0u8; MAX_PACKET_LEN];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Responder receive failed");
                continue;
            }
        };

        let request = verify_request(&buf[..len], &secret).and_then(|packet| {
            let attributes = packet.attributes()?;
            Ok((packet.identifier, packet.authenticator, attributes))
        });

        let (identifier, authenticator, attributes) = match request {
            Ok(r) => r,
            Err(e) => {
                warn!(%peer, error = %e, "Dropping invalid accounting request");
                *rejected.lock() += 1;
                continue;
            }
        };

        received.lock().push(ReceivedRequest {
            identifier,
            attributes,
        });

        let reply = encode_response(identifier, &authenticator, &secret);
        if let Err(e) = socket.send_to(&reply, peer).await {
            warn!(%peer, error = %e, "Responder send failed");
        } else {
            debug!(%peer, identifier, "Acknowledged accounting request");
        }
    }
}
