//! Test helpers for radacct.
//!
//! - [`ScriptedSender`]: in-process [`AccountingSender`](radacct_core::AccountingSender)
//!   whose outcome per event is decided by a closure
//! - [`LocalAccountingServer`]: loopback UDP responder that verifies and
//!   acknowledges real RADIUS Accounting-Requests

pub mod sender;
pub mod server;

pub use sender::{Outcome, ScriptedSender};
pub use server::{LocalAccountingServer, ReceivedRequest};
