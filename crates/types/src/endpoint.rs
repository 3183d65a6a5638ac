//! Simulated accounting endpoint.

use crate::HardwareAddress;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Every session needs at least a Start and a Stop.
pub const MIN_SESSION_COUNT: u32 = 2;

/// Errors constructing an endpoint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("session count {0} is below the minimum of {MIN_SESSION_COUNT}")]
    SessionCountTooSmall(u32),

    #[error("per-session byte increment must be positive")]
    ZeroByteIncrement,
}

/// One simulated network client with its own session usage pattern.
///
/// Immutable once built; the timeline generator only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    hardware_address: HardwareAddress,
    network_address: Ipv4Addr,
    bytes_in_per_session: u64,
    bytes_out_per_session: u64,
    session_count: u32,
}

impl Endpoint {
    /// Create an endpoint, rejecting session counts below 2 and zero increments.
    pub fn new(
        hardware_address: HardwareAddress,
        network_address: Ipv4Addr,
        bytes_in_per_session: u64,
        bytes_out_per_session: u64,
        session_count: u32,
    ) -> Result<Self, EndpointError> {
        if session_count < MIN_SESSION_COUNT {
            return Err(EndpointError::SessionCountTooSmall(session_count));
        }
        if bytes_in_per_session == 0 || bytes_out_per_session == 0 {
            return Err(EndpointError::ZeroByteIncrement);
        }

        Ok(Self {
            hardware_address,
            network_address,
            bytes_in_per_session,
            bytes_out_per_session,
            session_count,
        })
    }

    pub fn hardware_address(&self) -> HardwareAddress {
        self.hardware_address
    }

    pub fn network_address(&self) -> Ipv4Addr {
        self.network_address
    }

    pub fn bytes_in_per_session(&self) -> u64 {
        self.bytes_in_per_session
    }

    pub fn bytes_out_per_session(&self) -> u64 {
        self.bytes_out_per_session
    }

    /// Number of accounting events this endpoint emits (Start + interims + Stop).
    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    /// Number of Interim-Update events between Start and Stop.
    pub fn interim_count(&self) -> u32 {
        self.session_count - MIN_SESSION_COUNT
    }
}
