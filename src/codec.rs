// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// Every PDU implements Encodable/Decodable; the Frame enum ties them together
// and the PduRegistry maps command ids to decoders. Decoders only ever see the
// body of one complete frame, so a malformed body never desynchronizes the
// byte stream. Only a bad length prefix does that.

use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandId, CommandStatus, DeliverSm,
    DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse,
    Tlv, Unbind, UnbindResponse, tags,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer, validating the declared length
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id = CommandId::from(buf.get_u32());
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        check_command_length(command_length)?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id.into());
        buf.put_u32(self.command_status.into());
        buf.put_u32(self.sequence_number);
    }

    /// Length of the body that follows this header
    pub fn body_length(&self) -> usize {
        self.command_length as usize - Self::SIZE
    }
}

fn check_command_length(command_length: u32) -> Result<(), CodecError> {
    if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
        return Err(CodecError::InvalidPduLength {
            length: command_length,
            min: PduHeader::SIZE as u32,
            max: MAX_PDU_SIZE,
        });
    }
    Ok(())
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU, header included, to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without keeping the encoding
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Convert this PDU to bytes ready for the wire
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from its body. `buf` holds exactly the body bytes.
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' is {actual} octets, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Required field '{0}' is empty")]
    MissingField(&'static str),

    #[error("Field '{field}' has no null terminator within {max} octets")]
    MissingTerminator { field: &'static str, max: usize },

    #[error("PDU body ends inside field '{field}'")]
    Truncated { field: &'static str },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("Optional parameter {0:#06x} is not an SMPP v3.4 tag")]
    UnexpectedTlv(u16),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Character {0:?} has no GSM 7-bit representation")]
    UnencodableCharacter(char),

    #[error("Message needs {segments} segments, at most {max} can be concatenated")]
    MessageTooLong { segments: usize, max: usize },

    #[error("PDU body declared {declared} octets but {consumed} were decoded")]
    LengthMismatch { declared: usize, consumed: usize },
}

impl CodecError {
    /// True when the length prefix itself is bad, so frame boundaries can no
    /// longer be trusted.
    pub fn is_desync(&self) -> bool {
        matches!(self, CodecError::InvalidPduLength { .. })
    }

    /// Convert codec errors to appropriate SMPP command_status codes
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } | CodecError::LengthMismatch { .. } => {
                CommandStatus::InvalidCommandLength
            }
            CodecError::UnexpectedCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr_ton" => CommandStatus::InvalidSourceAddressTon,
                "source_addr_npi" => CommandStatus::InvalidSourceAddressNpi,
                "dest_addr_ton" => CommandStatus::InvalidDestinationAddressTon,
                "dest_addr_npi" => CommandStatus::InvalidDestinationAddressNpi,
                other => field_status(other),
            },
            CodecError::FieldTooLong { field, .. }
            | CodecError::MissingTerminator { field, .. }
            | CodecError::Utf8Error { field, .. }
            | CodecError::MissingField(field) => field_status(field),
            CodecError::Truncated { field } => match *field {
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::InvalidCommandLength,
            },
            CodecError::TlvError(_) => CommandStatus::InvalidParameterLength,
            CodecError::UnexpectedTlv(_) => CommandStatus::OptionalParameterNotAllowed,
            _ => CommandStatus::SystemError,
        }
    }
}

fn field_status(field: &str) -> CommandStatus {
    match field {
        "source_addr" => CommandStatus::InvalidSourceAddress,
        "destination_addr" => CommandStatus::InvalidDestinationAddress,
        "short_message" => CommandStatus::InvalidMsgLength,
        "system_id" => CommandStatus::InvalidSystemId,
        "password" => CommandStatus::InvalidPassword,
        "system_type" => CommandStatus::InvalidSystemTypeField,
        "service_type" => CommandStatus::InvalidServiceType,
        "message_id" => CommandStatus::InvalidMessageId,
        "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
        "validity_period" => CommandStatus::InvalidExpiryTime,
        _ => CommandStatus::SystemError,
    }
}

/// Writes a complete PDU: header, body produced by `body`, and the final
/// command_length patched in once the body size is known.
pub fn encode_pdu<F>(
    buf: &mut BytesMut,
    command_id: CommandId,
    command_status: CommandStatus,
    sequence_number: u32,
    body: F,
) -> Result<(), CodecError>
where
    F: FnOnce(&mut BytesMut) -> Result<(), CodecError>,
{
    let start = buf.len();
    PduHeader {
        command_length: 0,
        command_id,
        command_status,
        sequence_number,
    }
    .encode(buf);

    body(buf)?;

    let length = buf.len() - start;
    if length > MAX_PDU_SIZE as usize {
        buf.truncate(start);
        return Err(CodecError::FieldTooLong {
            field: "command_length",
            max: MAX_PDU_SIZE as usize,
            actual: length,
        });
    }
    buf[start..start + 4].copy_from_slice(&(length as u32).to_be_bytes());
    Ok(())
}

/// Decodes a variable length C-Octet String of at most `max_len` octets,
/// terminator included.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let window = &buf.chunk()[..buf.remaining().min(max_len)];
    let end = window
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::MissingTerminator {
            field: field_name,
            max: max_len,
        })?;

    let value = window[..end].to_vec();
    buf.advance(end + 1);

    String::from_utf8(value).map_err(|e| CodecError::Utf8Error {
        field: field_name,
        source: e,
    })
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Truncated { field });
    }
    Ok(buf.get_u8())
}

/// Decode `len` raw octets
pub fn decode_bytes(
    buf: &mut Cursor<&[u8]>,
    len: usize,
    field: &'static str,
) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Truncated { field });
    }
    Ok(buf.copy_to_bytes(len))
}

/// Encodes a C-Octet String. `max_len` counts the null terminator, as the
/// SMPP field tables do.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    if bytes.len() >= max_len {
        return Err(CodecError::FieldTooLong {
            field,
            max: max_len - 1,
            actual: bytes.len(),
        });
    }
    if bytes.contains(&0) {
        return Err(CodecError::FieldValidation {
            field,
            reason: "embedded null octet".to_string(),
        });
    }

    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// Generic frame type that can hold any PDU this session speaks
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    // Bind PDUs
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Session management PDUs
    Unbind(Unbind),
    UnbindResp(UnbindResponse),

    GenericNack(GenericNack),

    // For unknown PDUs (forward compatibility)
    Unknown { header: PduHeader, body: Bytes },
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
    allow_unknown_tlvs: bool,
}

impl PduRegistry {
    /// Create a new registry with the transceiver session PDUs registered.
    /// Vendor-specific optional parameters are tolerated.
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
            allow_unknown_tlvs: true,
        };

        registry.register_pdu::<BindTransceiver, _>(Frame::BindTransceiver);
        registry.register_pdu::<BindTransceiverResponse, _>(Frame::BindTransceiverResp);

        // Boxed: the short message PDUs are the largest variants by far
        registry.register_pdu::<SubmitSm, _>(|pdu| Frame::SubmitSm(Box::new(pdu)));
        registry.register_pdu::<SubmitSmResponse, _>(Frame::SubmitSmResp);
        registry.register_pdu::<DeliverSm, _>(|pdu| Frame::DeliverSm(Box::new(pdu)));
        registry.register_pdu::<DeliverSmResponse, _>(Frame::DeliverSmResp);

        registry.register_pdu::<EnquireLink, _>(Frame::EnquireLink);
        registry.register_pdu::<EnquireLinkResponse, _>(Frame::EnquireLinkResp);
        registry.register_pdu::<Unbind, _>(Frame::Unbind);
        registry.register_pdu::<UnbindResponse, _>(Frame::UnbindResp);
        registry.register_pdu::<GenericNack, _>(Frame::GenericNack);

        registry
    }

    /// Whether optional parameters outside the SMPP v3.4 tag set are kept
    /// (`true`) or reject the PDU with [`CodecError::UnexpectedTlv`].
    pub fn with_unknown_tlvs(mut self, allow: bool) -> Self {
        self.allow_unknown_tlvs = allow;
        self
    }

    pub fn allows_unknown_tlvs(&self) -> bool {
        self.allow_unknown_tlvs
    }

    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let command_id = T::command_id();
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(command_id, decoder);
    }

    /// Decode a PDU given its header and a cursor over exactly its body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        let declared = header.body_length();

        let Some(decoder) = self.decoders.get(&header.command_id) else {
            let body = decode_bytes(buf, declared, "body")?;
            tracing::debug!(
                command_id = ?header.command_id,
                sequence_number = header.sequence_number,
                "unknown PDU kept as opaque data"
            );
            return Ok(Frame::Unknown { header, body });
        };

        let frame = decoder(header, buf)?;

        if buf.has_remaining() {
            return Err(CodecError::LengthMismatch {
                declared,
                consumed: declared.saturating_sub(buf.remaining()),
            });
        }

        if !self.allow_unknown_tlvs {
            if let Some(tlv) = frame.tlvs().iter().find(|t| !tags::is_standard(t.tag)) {
                return Err(CodecError::UnexpectedTlv(tlv.tag));
            }
        }

        Ok(frame)
    }

    /// Decodes the first complete frame in `bytes`, returning it together
    /// with the number of octets it occupied.
    pub fn decode_frame(&self, bytes: &[u8]) -> Result<(Frame, usize), CodecError> {
        let length = Frame::check(bytes)?;

        let mut cursor = Cursor::new(&bytes[..length]);
        let header = PduHeader::decode(&mut cursor)?;
        let mut body = Cursor::new(&bytes[PduHeader::SIZE..length]);
        let frame = self.decode_pdu(header, &mut body)?;

        Ok((frame, length))
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }

    /// Get all registered command_ids
    pub fn registered_commands(&self) -> Vec<CommandId> {
        self.decoders.keys().copied().collect()
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::BindTransceiver(_) => CommandId::BindTransceiver,
            Frame::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Frame::SubmitSm(_) => CommandId::SubmitSm,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Frame::DeliverSm(_) => CommandId::DeliverSm,
            Frame::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::GenericNack(_) => CommandId::GenericNack,
            Frame::Unknown { header, .. } => header.command_id,
        }
    }

    pub fn command_status(&self) -> CommandStatus {
        match self {
            Frame::BindTransceiver(pdu) => pdu.command_status,
            Frame::BindTransceiverResp(pdu) => pdu.command_status,
            Frame::SubmitSm(pdu) => pdu.command_status,
            Frame::SubmitSmResp(pdu) => pdu.command_status,
            Frame::DeliverSm(pdu) => pdu.command_status,
            Frame::DeliverSmResp(pdu) => pdu.command_status,
            Frame::EnquireLink(pdu) => pdu.command_status,
            Frame::EnquireLinkResp(pdu) => pdu.command_status,
            Frame::Unbind(pdu) => pdu.command_status,
            Frame::UnbindResp(pdu) => pdu.command_status,
            Frame::GenericNack(pdu) => pdu.command_status,
            Frame::Unknown { header, .. } => header.command_status,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::BindTransceiver(pdu) => pdu.sequence_number,
            Frame::BindTransceiverResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown { header, .. } => header.sequence_number,
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Optional parameters carried by this frame
    pub fn tlvs(&self) -> &[Tlv] {
        match self {
            Frame::BindTransceiverResp(pdu) => &pdu.tlvs,
            Frame::SubmitSm(pdu) => &pdu.tlvs,
            Frame::DeliverSm(pdu) => &pdu.tlvs,
            _ => &[],
        }
    }

    /// Returns the length of the first frame in `buf` once it is fully
    /// buffered, `Incomplete` while more bytes are needed.
    pub fn check(buf: &[u8]) -> Result<usize, CodecError> {
        if buf.len() < 4 {
            return Err(CodecError::Incomplete);
        }

        let command_length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        check_command_length(command_length)?;

        if buf.len() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Decodes the first complete frame in `bytes` with the default
    /// (tolerant) registry.
    pub fn decode(bytes: &[u8]) -> Result<(Frame, usize), CodecError> {
        static REGISTRY: OnceLock<PduRegistry> = OnceLock::new();
        REGISTRY.get_or_init(PduRegistry::new).decode_frame(bytes)
    }
}

impl Encodable for Frame {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Frame::BindTransceiver(pdu) => pdu.encode(buf),
            Frame::BindTransceiverResp(pdu) => pdu.encode(buf),
            Frame::SubmitSm(pdu) => pdu.encode(buf),
            Frame::SubmitSmResp(pdu) => pdu.encode(buf),
            Frame::DeliverSm(pdu) => pdu.encode(buf),
            Frame::DeliverSmResp(pdu) => pdu.encode(buf),
            Frame::EnquireLink(pdu) => pdu.encode(buf),
            Frame::EnquireLinkResp(pdu) => pdu.encode(buf),
            Frame::Unbind(pdu) => pdu.encode(buf),
            Frame::UnbindResp(pdu) => pdu.encode(buf),
            Frame::GenericNack(pdu) => pdu.encode(buf),
            Frame::Unknown { header, body } => encode_pdu(
                buf,
                header.command_id,
                header.command_status,
                header.sequence_number,
                |buf| {
                    buf.put_slice(body);
                    Ok(())
                },
            ),
        }
    }
}
