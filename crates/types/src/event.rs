//! Accounting events emitted by the timeline generator.

use crate::{HardwareAddress, Round};
use std::fmt;
use std::net::Ipv4Addr;

/// Position of an event within a session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Start,
    InterimUpdate,
    Stop,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Start => write!(f, "Start"),
            StatusKind::InterimUpdate => write!(f, "Interim-Update"),
            StatusKind::Stop => write!(f, "Stop"),
        }
    }
}

/// A single accounting report for one endpoint in one round.
///
/// Created once by the timeline generator and consumed once by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingEvent {
    /// Lifecycle position.
    pub status: StatusKind,

    /// Hardware address of the owning endpoint.
    pub hardware_address: HardwareAddress,

    /// Network address of the owning endpoint.
    pub network_address: Ipv4Addr,

    /// Cumulative input octets (round × per-session increment).
    pub bytes_in: u64,

    /// Cumulative output octets (round × per-session increment).
    pub bytes_out: u64,

    /// Round that produced this event.
    pub round: Round,
}

impl AccountingEvent {
    /// Session time reported to the server. Equal to the round number.
    pub fn session_elapsed(&self) -> u32 {
        self.round.get()
    }
}

impl fmt::Display for AccountingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ip:{} mac:{} in:{} out:{} time:{}",
            self.status,
            self.network_address,
            self.hardware_address,
            self.bytes_in,
            self.bytes_out,
            self.session_elapsed()
        )
    }
}
