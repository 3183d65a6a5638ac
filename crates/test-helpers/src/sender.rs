//! In-process senders with scripted outcomes.

use async_trait::async_trait;
use parking_lot::Mutex;
use radacct_core::{AccountingSender, Ack, SendError, SendErrorKind};
use radacct_types::AccountingEvent;
use std::io;
use std::time::Duration;

/// What a [`ScriptedSender`] does with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Acknowledge immediately.
    Ack,
    /// Fail with an error of the given kind.
    Fail(SendErrorKind),
    /// Never answer. The caller's deadline has to fire.
    Stall,
}

type Script = Box<dyn Fn(&AccountingEvent) -> Outcome + Send + Sync>;

/// Sender whose verdict per event comes from a closure.
///
/// Every event it is handed is recorded in arrival order, whatever the
/// outcome, so tests can check exactly what the pool delivered.
pub struct ScriptedSender {
    script: Script,
    delay: Option<Duration>,
    attempts: Mutex<Vec<AccountingEvent>>,
    acked: Mutex<Vec<AccountingEvent>>,
}

impl ScriptedSender {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&AccountingEvent) -> Outcome + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: None,
            attempts: Mutex::new(Vec::new()),
            acked: Mutex::new(Vec::new()),
        }
    }

    /// A sender that acknowledges everything.
    pub fn always_ack() -> Self {
        Self::new(|_| Outcome::Ack)
    }

    /// Sleep this long before every verdict.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every event handed to `send`, in arrival order.
    pub fn attempts(&self) -> Vec<AccountingEvent> {
        self.attempts.lock().clone()
    }

    /// Events that were acknowledged.
    pub fn acked(&self) -> Vec<AccountingEvent> {
        self.acked.lock().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[async_trait]
impl AccountingSender for ScriptedSender {
    async fn send(&self, event: &AccountingEvent) -> Result<Ack, SendError> {
        self.attempts.lock().push(event.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match (self.script)(event) {
            Outcome::Ack => {
                self.acked.lock().push(event.clone());
                Ok(Ack)
            }
            Outcome::Fail(kind) => Err(scripted_error(kind)),
            Outcome::Stall => std::future::pending().await,
        }
    }
}

fn scripted_error(kind: SendErrorKind) -> SendError {
    match kind {
        SendErrorKind::Timeout => SendError::Timeout(Duration::ZERO),
        SendErrorKind::Transport => SendError::Transport(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "scripted transport failure",
        )),
        SendErrorKind::Protocol => SendError::Protocol("scripted protocol failure".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radacct_types::{HardwareAddress, Round, StatusKind};
    use std::net::Ipv4Addr;

    fn event(status: StatusKind) -> AccountingEvent {
        AccountingEvent {
            status,
            hardware_address: HardwareAddress::new(0xa0_00_00_00_00_01).unwrap(),
            network_address: Ipv4Addr::new(10, 0, 0, 1),
            bytes_in: 1000,
            bytes_out: 2000,
            round: Round::FIRST,
        }
    }

    #[tokio::test]
    async fn test_script_decides_outcome() {
        let sender = ScriptedSender::new(|e| match e.status {
            StatusKind::Stop => Outcome::Fail(SendErrorKind::Protocol),
            _ => Outcome::Ack,
        });

        assert!(sender.send(&event(StatusKind::Start)).await.is_ok());
        let err = sender.send(&event(StatusKind::Stop)).await.unwrap_err();
        assert_eq!(err.kind(), SendErrorKind::Protocol);

        assert_eq!(sender.attempt_count(), 2);
        assert_eq!(sender.acked().len(), 1);
    }

    #[tokio::test]
    async fn test_stall_never_resolves() {
        let sender = ScriptedSender::new(|_| Outcome::Stall);
        let result =
            tokio::time::timeout(Duration::from_millis(20), sender.send(&event(StatusKind::Start)))
                .await;
        assert!(result.is_err());
        assert_eq!(sender.attempt_count(), 1);
    }
}
