//! RADIUS accounting transport for radacct.
//!
//! Encodes [`AccountingEvent`](radacct_types::AccountingEvent)s as RFC 2866
//! Accounting-Request packets and exchanges them with a server over UDP.
//!
//! - [`codec`]: packet layout, authenticators, response verification
//! - [`client`]: [`RadiusAccountingClient`], the production
//!   [`AccountingSender`](radacct_core::AccountingSender)

pub mod client;
pub mod codec;

pub use client::{RadiusAccountingClient, RadiusClientConfig};
pub use codec::{
    encode_response, parse_packet, verify_request, verify_response, AccountingRequest, Attribute,
    CodecError, EncodedRequest, Packet, RequestContext,
};
