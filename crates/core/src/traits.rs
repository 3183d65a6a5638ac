//! The accounting-send capability.

use async_trait::async_trait;
use radacct_types::AccountingEvent;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Positive acknowledgement from the accounting server.
///
/// The dispatch core does not interpret the response beyond success, so
/// this carries nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ack;

/// Failure of a single send attempt.
///
/// Never fatal to the run: the worker logs it, counts it, and moves on to
/// the next event in its lane.
#[derive(Debug, Error)]
pub enum SendError {
    /// No answer before the per-send deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Socket-level failure (bind, send, receive).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The server answered with something that is not a valid acknowledgement.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Coarse classification of [`SendError`] used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendErrorKind {
    Timeout,
    Transport,
    Protocol,
}

impl SendError {
    pub fn kind(&self) -> SendErrorKind {
        match self {
            SendError::Timeout(_) => SendErrorKind::Timeout,
            SendError::Transport(_) => SendErrorKind::Transport,
            SendError::Protocol(_) => SendErrorKind::Protocol,
        }
    }
}

/// Sends one accounting event to the target server.
///
/// Implementations perform exactly one attempt. Retries, if wanted, belong in
/// a wrapper implementing this same trait.
///
/// # Example
///
/// ```ignore
/// struct Discard;
///
/// #[async_trait]
/// impl AccountingSender for Discard {
///     async fn send(&self, _event: &AccountingEvent) -> Result<Ack, SendError> {
///         Ok(Ack)
///     }
/// }
/// ```
#[async_trait]
pub trait AccountingSender: Send + Sync {
    /// Send `event` and wait for the server's verdict.
    async fn send(&self, event: &AccountingEvent) -> Result<Ack, SendError>;
}

#[async_trait]
impl<S: AccountingSender + ?Sized> AccountingSender for Arc<S> {
    async fn send(&self, event: &AccountingEvent) -> Result<Ack, SendError> {
        (**self).send(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radacct_types::{HardwareAddress, Round, StatusKind};
    use std::net::Ipv4Addr;

    struct Reject;

    #[async_trait]
    impl AccountingSender for Reject {
        async fn send(&self, _event: &AccountingEvent) -> Result<Ack, SendError> {
            Err(SendError::Protocol("rejected".into()))
        }
    }

    fn event() -> AccountingEvent {
        AccountingEvent {
            status: StatusKind::Start,
            hardware_address: HardwareAddress::new(1).unwrap(),
            network_address: Ipv4Addr::new(10, 0, 0, 1),
            bytes_in: 1000,
            bytes_out: 2000,
            round: Round::FIRST,
        }
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            SendError::Timeout(Duration::from_secs(5)).kind(),
            SendErrorKind::Timeout
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(SendError::from(io).kind(), SendErrorKind::Transport);
        assert_eq!(
            SendError::Protocol("bad".into()).kind(),
            SendErrorKind::Protocol
        );
    }

    #[tokio::test]
    async fn test_arc_sender_delegates() {
        let sender: Arc<dyn AccountingSender> = Arc::new(Reject);
        let result = sender.send(&event()).await;
        assert!(matches!(result, Err(SendError::Protocol(_))));
    }
}
