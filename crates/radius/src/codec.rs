//! RADIUS accounting packet encoding and decoding.
//!
//! # Wire Format
//!
//! ```text
//! [code: u8][identifier: u8][length: u16 BE][authenticator: 16 bytes][attributes...]
//! attribute = [type: u8][length: u8][value: length - 2 bytes]
//! ```
//!
//! Request Authenticator (RFC 2866 §3):
//! `MD5(code + identifier + length + 16 zero octets + attributes + secret)`.
//!
//! Response Authenticator (RFC 2866 §4):
//! `MD5(code + identifier + length + request authenticator + attributes + secret)`.

use bytes::{BufMut, BytesMut};
use md5::{Digest, Md5};
use radacct_types::{AccountingEvent, StatusKind};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Accounting-Request packet code.
pub const CODE_ACCOUNTING_REQUEST: u8 = 4;

/// Accounting-Response packet code.
pub const CODE_ACCOUNTING_RESPONSE: u8 = 5;

/// Code, identifier, length and authenticator.
pub const HEADER_LEN: usize = 20;

/// Largest packet allowed on the wire.
pub const MAX_PACKET_LEN: usize = 4096;

const AUTHENTICATOR_LEN: usize = 16;
const MAX_ATTRIBUTE_VALUE_LEN: usize = 253;

/// Attribute type numbers used by accounting requests.
pub mod attr {
    pub const USER_NAME: u8 = 1;
    pub const FRAMED_IP_ADDRESS: u8 = 8;
    pub const CALLED_STATION_ID: u8 = 30;
    pub const CALLING_STATION_ID: u8 = 31;
    pub const ACCT_STATUS_TYPE: u8 = 40;
    pub const ACCT_INPUT_OCTETS: u8 = 42;
    pub const ACCT_OUTPUT_OCTETS: u8 = 43;
    pub const ACCT_SESSION_ID: u8 = 44;
    pub const ACCT_SESSION_TIME: u8 = 46;
    pub const ACCT_INPUT_GIGAWORDS: u8 = 52;
    pub const ACCT_OUTPUT_GIGAWORDS: u8 = 53;
}

/// Prefix of the User-Name attribute; the hardware address follows it.
pub const USER_NAME_PREFIX: &str = "UserOF-";

/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Message too short: {0} bytes")]
    MessageTooShort(usize),

    #[error("Length field {declared} does not fit datagram of {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Packet of {0} bytes exceeds the {MAX_PACKET_LEN} byte limit")]
    PacketTooLong(usize),

    #[error("Attribute {kind} value of {len} bytes is too long")]
    AttributeTooLong { kind: u8, len: usize },

    #[error("Malformed attribute at offset {0}")]
    MalformedAttribute(usize),

    #[error("Unexpected packet code {0}")]
    UnexpectedCode(u8),

    #[error("Identifier mismatch: expected {expected}, got {actual}")]
    IdentifierMismatch { expected: u8, actual: u8 },

    #[error("Authenticator verification failed")]
    BadAuthenticator,
}

/// Acct-Status-Type value for a lifecycle position.
pub fn status_type_value(status: StatusKind) -> u32 {
    match status {
        StatusKind::Start => 1,
        StatusKind::Stop => 2,
        StatusKind::InterimUpdate => 3,
    }
}

/// A single type-length-value attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: u8,
    pub value: Vec<u8>,
}

impl Attribute {
    pub fn string(kind: u8, value: &str) -> Self {
        Self {
            kind,
            value: value.as_bytes().to_vec(),
        }
    }

    pub fn integer(kind: u8, value: u32) -> Self {
        Self {
            kind,
            value: value.to_be_bytes().to_vec(),
        }
    }

    pub fn ipv4(kind: u8, value: Ipv4Addr) -> Self {
        Self {
            kind,
            value: value.octets().to_vec(),
        }
    }

    /// Interpret the value as a 32-bit big-endian integer.
    pub fn as_integer(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Interpret the value as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Per-run values carried by every request that no event knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Prepended to the hardware address to form Acct-Session-Id.
    pub session_id_prefix: String,

    /// Called-Station-Id sent with every request.
    pub called_station_id: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            session_id_prefix: "acct-tester-".to_string(),
            called_station_id: "02:00:00:00:00:01".to_string(),
        }
    }
}

/// An Accounting-Request before identifier and authenticator are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingRequest {
    attributes: Vec<Attribute>,
}

/// Wire bytes of a request plus what is needed to check its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub identifier: u8,
    pub authenticator: [u8; AUTHENTICATOR_LEN],
    pub bytes: Vec<u8>,
}

impl AccountingRequest {
    /// Build the attribute list for one accounting event.
    ///
    /// Counters above 32 bits spill into the Gigawords attributes.
    pub fn from_event(event: &AccountingEvent, context: &RequestContext) -> Self {
        let mac = event.hardware_address.to_string();
        let (in_giga, in_octets) = split_counter(event.bytes_in);
        let (out_giga, out_octets) = split_counter(event.bytes_out);

        let mut attributes = vec![
            Attribute::integer(attr::ACCT_STATUS_TYPE, status_type_value(event.status)),
            Attribute::string(
                attr::ACCT_SESSION_ID,
                &format!("{}{}", context.session_id_prefix, mac),
            ),
            Attribute::integer(attr::ACCT_INPUT_OCTETS, in_octets),
            Attribute::integer(attr::ACCT_OUTPUT_OCTETS, out_octets),
        ];
        if in_giga > 0 {
            attributes.push(Attribute::integer(attr::ACCT_INPUT_GIGAWORDS, in_giga));
        }
        if out_giga > 0 {
            attributes.push(Attribute::integer(attr::ACCT_OUTPUT_GIGAWORDS, out_giga));
        }
        attributes.extend([
            Attribute::integer(attr::ACCT_SESSION_TIME, event.session_elapsed()),
            Attribute::string(attr::USER_NAME, &format!("{USER_NAME_PREFIX}{mac}")),
            Attribute::string(attr::CALLED_STATION_ID, &context.called_station_id),
            Attribute::ipv4(attr::FRAMED_IP_ADDRESS, event.network_address),
            Attribute::string(attr::CALLING_STATION_ID, &mac),
        ]);

        Self { attributes }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Serialize with the given identifier and sign with the shared secret.
    pub fn encode(&self, identifier: u8, secret: &[u8]) -> Result<EncodedRequest, CodecError> {
        let attributes = encode_attributes(&self.attributes)?;
        let length = HEADER_LEN + attributes.len();
        if length > MAX_PACKET_LEN {
            return Err(CodecError::PacketTooLong(length));
        }

        let header = header_prefix(CODE_ACCOUNTING_REQUEST, identifier, length);
        let authenticator = compute_authenticator(
            &header,
            &[0u8; AUTHENTICATOR_LEN],
            &attributes,
            secret,
        );

        let mut buf = BytesMut::with_capacity(length);
        buf.put_slice(&header);
        buf.put_slice(&authenticator);
        buf.put_slice(&attributes);

        Ok(EncodedRequest {
            identifier,
            authenticator,
            bytes: buf.to_vec(),
        })
    }
}

/// Borrowed view of a received packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<'a> {
    pub code: u8,
    pub identifier: u8,
    pub authenticator: [u8; AUTHENTICATOR_LEN],
    attribute_bytes: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Decode the attribute section.
    pub fn attributes(&self) -> Result<Vec<Attribute>, CodecError> {
        let mut attributes = Vec::new();
        let mut offset = 0;
        let data = self.attribute_bytes;

        while offset < data.len() {
            if offset + 2 > data.len() {
                return Err(CodecError::MalformedAttribute(HEADER_LEN + offset));
            }
            let kind = data[offset];
            let len = data[offset + 1] as usize;
            if len < 2 || offset + len > data.len() {
                return Err(CodecError::MalformedAttribute(HEADER_LEN + offset));
            }
            attributes.push(Attribute {
                kind,
                value: data[offset + 2..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(attributes)
    }

    /// First attribute of the given type.
    pub fn attribute(&self, kind: u8) -> Result<Option<Attribute>, CodecError> {
        Ok(self.attributes()?.into_iter().find(|a| a.kind == kind))
    }

    fn length(&self) -> usize {
        HEADER_LEN + self.attribute_bytes.len()
    }
}

/// Parse the header of a datagram. Octets past the Length field are ignored.
pub fn parse_packet(data: &[u8]) -> Result<Packet<'_>, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::MessageTooShort(data.len()));
    }

    let declared = u16::from_be_bytes([data[2], data[3]]) as usize;
    if declared < HEADER_LEN || declared > data.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: data.len(),
        });
    }
    if declared > MAX_PACKET_LEN {
        return Err(CodecError::PacketTooLong(declared));
    }

    let mut authenticator = [0u8; AUTHENTICATOR_LEN];
    authenticator.copy_from_slice(&data[4..HEADER_LEN]);

    Ok(Packet {
        code: data[0],
        identifier: data[1],
        authenticator,
        attribute_bytes: &data[HEADER_LEN..declared],
    })
}

/// Check that `data` is an Accounting-Request signed with `secret`.
///
/// Used by the server side (the test responder).
pub fn verify_request<'a>(data: &'a [u8], secret: &[u8]) -> Result<Packet<'a>, CodecError> {
    let packet = parse_packet(data)?;
    if packet.code != CODE_ACCOUNTING_REQUEST {
        return Err(CodecError::UnexpectedCode(packet.code));
    }

    let header = header_prefix(packet.code, packet.identifier, packet.length());
    let expected = compute_authenticator(
        &header,
        &[0u8; AUTHENTICATOR_LEN],
        packet.attribute_bytes,
        secret,
    );
    if expected != packet.authenticator {
        return Err(CodecError::BadAuthenticator);
    }

    Ok(packet)
}

/// Check that `data` is the Accounting-Response to `request`.
pub fn verify_response(
    data: &[u8],
    request: &EncodedRequest,
    secret: &[u8],
) -> Result<(), CodecError> {
    let packet = parse_packet(data)?;
    if packet.code != CODE_ACCOUNTING_RESPONSE {
        return Err(CodecError::UnexpectedCode(packet.code));
    }
    if packet.identifier != request.identifier {
        return Err(CodecError::IdentifierMismatch {
            expected: request.identifier,
            actual: packet.identifier,
        });
    }

    let header = header_prefix(packet.code, packet.identifier, packet.length());
    let expected = compute_authenticator(
        &header,
        &request.authenticator,
        packet.attribute_bytes,
        secret,
    );
    if expected != packet.authenticator {
        return Err(CodecError::BadAuthenticator);
    }

    Ok(())
}

/// Build an attribute-less Accounting-Response to a request.
pub fn encode_response(
    identifier: u8,
    request_authenticator: &[u8; AUTHENTICATOR_LEN],
    secret: &[u8],
) -> Vec<u8> {
    let header = header_prefix(CODE_ACCOUNTING_RESPONSE, identifier, HEADER_LEN);
    let authenticator = compute_authenticator(&header, request_authenticator, &[], secret);

    let mut buf = BytesMut::with_capacity(HEADER_LEN);
    buf.put_slice(&header);
    buf.put_slice(&authenticator);
    buf.to_vec()
}

fn split_counter(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, (value & 0xffff_ffff) as u32)
}

fn header_prefix(code: u8, identifier: u8, length: usize) -> [u8; 4] {
    let len = (length as u16).to_be_bytes();
    [code, identifier, len[0], len[1]]
}

fn encode_attributes(attributes: &[Attribute]) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::new();
    for attribute in attributes {
        let len = attribute.value.len();
        if len > MAX_ATTRIBUTE_VALUE_LEN {
            return Err(CodecError::AttributeTooLong {
                kind: attribute.kind,
                len,
            });
        }
        buf.put_u8(attribute.kind);
        buf.put_u8((len + 2) as u8);
        buf.put_slice(&attribute.value);
    }
    Ok(buf.to_vec())
}

fn compute_authenticator(
    header: &[u8; 4],
    middle: &[u8; AUTHENTICATOR_LEN],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; AUTHENTICATOR_LEN] {
    let mut hasher = Md5::new();
    hasher.update(header);
    hasher.update(middle);
    hasher.update(attributes);
    hasher.update(secret);
    hasher.finalize().into()
}
