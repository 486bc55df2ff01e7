use crate::codec::{
    decode_cstring, encode_cstring, encode_pdu, CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{
    tags, CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// deliver_sm is issued by the SMSC to send a message to an ESME. It carries
/// both mobile originated messages and SMSC delivery receipts; the
/// esm_class message type tells them apart.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    /// Unused for deliver_sm, always NULL
    pub schedule_delivery_time: String,
    /// Unused for deliver_sm, always NULL
    pub validity_period: String,
    pub registered_delivery: u8,
    /// Unused for deliver_sm, always NULL
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    /// For delivery receipts, the free-text "id:... sub:... stat:..." report
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);

impl DeliverSm {
    fn validate(&self) -> Result<(), CodecError> {
        if self.destination_addr.is_empty() {
            return Err(CodecError::MissingField("destination_addr"));
        }
        // Long payloads travel in message_payload with an empty short_message
        if !self.short_message.is_empty() && self.tlv(tags::MESSAGE_PAYLOAD).is_some() {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: "must be empty when message_payload is present".to_string(),
            });
        }
        Ok(())
    }

    fn payload(&self) -> &[u8] {
        if self.short_message.is_empty() {
            self.tlv(tags::MESSAGE_PAYLOAD)
                .map(|tlv| tlv.value.as_ref())
                .unwrap_or_default()
        } else {
            &self.short_message
        }
    }

    /// Returns true if this deliver_sm is an SMSC delivery receipt
    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class.is_delivery_receipt()
    }

    /// The message payload without any User Data Header. Falls back to the
    /// message_payload TLV when short_message is empty.
    pub fn user_data(&self) -> &[u8] {
        let data = self.payload();

        if !self.esm_class.has_udhi() {
            return data;
        }
        match data.first() {
            Some(&udh_length) => data.get(usize::from(udh_length) + 1..).unwrap_or(&[]),
            None => data,
        }
    }

    /// Decodes the payload text according to data_coding. GSM default text
    /// is expected unpacked, as SMSCs deliver it.
    pub fn text(&self) -> String {
        self.data_coding.decode_text(self.user_data())
    }

    /// Like [`DeliverSm::text`], for GSM default text packed the way this
    /// crate's `submit_sm` segments carry it. Fill bits after a UDH are
    /// worked out from the header length.
    pub fn packed_text(&self) -> String {
        let fill_bits = match self.payload().first() {
            Some(&udh_length) if self.esm_class.has_udhi() => {
                let header_bits = (usize::from(udh_length) + 1) * 8;
                (7 - header_bits % 7) % 7
            }
            _ => 0,
        };
        self.data_coding
            .decode_packed_text(self.user_data(), fill_bits)
    }

    /// SMSC message id from the receipted_message_id TLV, when the SMSC sends one
    pub fn receipted_message_id(&self) -> Option<&str> {
        self.tlv(tags::RECEIPTED_MESSAGE_ID)
            .and_then(Tlv::as_cstring)
    }

    /// message_state TLV of a delivery receipt (2 = DELIVERED, 5 = UNDELIVERABLE, ...)
    pub fn message_state(&self) -> Option<u8> {
        self.tlv(tags::MESSAGE_STATE).and_then(Tlv::as_u8)
    }
}

/// deliver_sm_resp. message_id is unused and sent as a single NULL octet.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self::error(sequence_number, CommandStatus::Ok)
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::DeliverSmResp,
            self.command_status,
            self.sequence_number,
            |buf| encode_cstring(buf, &self.message_id, 65, "message_id"),
        )
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = if buf.has_remaining() {
            decode_cstring(buf, 65, "message_id")?
        } else {
            String::new()
        };

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}
