//! Core abstractions for radacct.
//!
//! The dispatch engine never touches the wire. It hands each
//! [`AccountingEvent`](radacct_types::AccountingEvent) to an
//! [`AccountingSender`] and only looks at whether the result was an
//! [`Ack`] or a [`SendError`].

mod traits;

pub use traits::{Ack, AccountingSender, SendError, SendErrorKind};
