//! Core types for radacct.
//!
//! Plain data shared by every other crate: simulated endpoints, the
//! accounting events they emit, and the identifiers used to schedule them.

mod endpoint;
mod event;
mod identifiers;

pub use endpoint::{Endpoint, EndpointError, MIN_SESSION_COUNT};
pub use event::{AccountingEvent, StatusKind};
pub use identifiers::{HardwareAddress, LaneId, Round};
