use crate::codec::{
    decode_cstring, encode_cstring, encode_pdu, CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, Tlv, TypeOfNumber,
};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// This operation is used by an ESME to submit a short message to the SMSC for onward
/// transmission to a specified short message entity (SME).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.11 service_type: SMS application service associated with the
    ///        message. Empty selects the SMSC default.
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    /// 5.2.8 source_addr: up to 20 characters
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    /// 5.2.9 destination_addr: up to 20 characters, required
    pub destination_addr: String,
    /// 5.2.12 esm_class: message mode, type and the UDHI flag
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    /// 5.2.15 schedule_delivery_time: absolute or relative time format, empty
    ///        for immediate delivery
    pub schedule_delivery_time: String,
    /// 5.2.16 validity_period: empty selects the SMSC default expiry
    pub validity_period: String,
    /// 5.2.17 registered_delivery: bit 0 requests an SMSC delivery receipt
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    /// 5.2.22 short_message: up to 254 octets of user data, UDH included
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);

impl SubmitSm {
    /// registered_delivery value asking for a receipt on final delivery outcome
    pub const RECEIPT_REQUESTED: u8 = 0x01;

    fn validate(&self) -> Result<(), CodecError> {
        if self.destination_addr.is_empty() {
            return Err(CodecError::MissingField("destination_addr"));
        }
        Ok(())
    }
}

/// submit_sm_resp. message_id is the SMSC's reference for later receipts;
/// the body is omitted when the submit was rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::SubmitSmResp,
            self.command_status,
            self.sequence_number,
            |buf| {
                if !self.command_status.is_ok() && self.message_id.is_empty() {
                    return Ok(());
                }
                encode_cstring(buf, &self.message_id, 65, "message_id")
            },
        )
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;
    use crate::datatypes::tags;

    fn sample() -> SubmitSm {
        SubmitSm::new(2, "Sender", "447700900123", Bytes::from_static(b"Hello"))
            .source_addr_ton(TypeOfNumber::Alphanumeric)
            .dest_addr_ton(TypeOfNumber::International)
            .dest_addr_npi(NumericPlanIndicator::Isdn)
            .registered_delivery(SubmitSm::RECEIPT_REQUESTED)
    }

    #[test]
    fn submit_sm_wire_layout() {
        let bytes = sample().to_bytes().unwrap();

        let mut expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x00, // command_length (patched below)
            0x00, 0x00, 0x00, 0x04, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x02, // sequence_number
            0x00, // service_type
            0x05, 0x00, // source_addr_ton, source_addr_npi
        ];
        expected.extend_from_slice(b"Sender\0");
        expected.extend_from_slice(&[0x01, 0x01]); // dest_addr_ton, dest_addr_npi
        expected.extend_from_slice(b"447700900123\0");
        expected.extend_from_slice(&[
            0x00, // esm_class
            0x00, // protocol_id
            0x00, // priority_flag
            0x00, // schedule_delivery_time
            0x00, // validity_period
            0x01, // registered_delivery
            0x00, // replace_if_present_flag
            0x00, // data_coding
            0x00, // sm_default_msg_id
            0x05, // sm_length
        ]);
        expected.extend_from_slice(b"Hello");
        let length = expected.len() as u32;
        expected[..4].copy_from_slice(&length.to_be_bytes());

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_roundtrip_with_optional_parameters() {
        for tlvs in [
            vec![],
            vec![Tlv::from_u16(tags::USER_MESSAGE_REFERENCE, 77)],
            vec![
                Tlv::from_u16(tags::SAR_MSG_REF_NUM, 0x0102),
                Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, 3),
                Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, 1),
                Tlv::new(0x1400, Bytes::from_static(b"vendor")),
            ],
        ] {
            let original = sample().tlvs(tlvs);
            let bytes = original.to_bytes().unwrap();
            let (frame, consumed) = Frame::decode(&bytes).unwrap();

            assert_eq!(consumed, bytes.len());
            assert_eq!(frame, Frame::SubmitSm(Box::new(original)));
        }
    }

    #[test]
    fn submit_sm_requires_destination() {
        let pdu = SubmitSm::new(1, "src", "", Bytes::new());
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::MissingField("destination_addr"))
        ));
    }

    #[test]
    fn submit_sm_limits() {
        let pdu = SubmitSm::new(1, "1".repeat(21), "123", Bytes::new());
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldTooLong {
                field: "source_addr",
                max: 20,
                actual: 21
            })
        ));

        let pdu = SubmitSm::new(1, "src", "123", vec![0u8; 255]);
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldTooLong {
                field: "short_message",
                max: 254,
                ..
            })
        ));
    }

    #[test]
    fn submit_sm_truncated_short_message() {
        let mut bytes = sample().to_bytes().unwrap().to_vec();
        // Drop the last two octets of the message and fix the length prefix
        bytes.truncate(bytes.len() - 2);
        let length = bytes.len() as u32;
        bytes[..4].copy_from_slice(&length.to_be_bytes());

        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                field: "short_message"
            }
        ));
        assert_eq!(err.to_command_status(), CommandStatus::InvalidMsgLength);
    }

    #[test]
    fn strict_registry_rejects_vendor_tlvs() {
        use crate::codec::PduRegistry;

        let pdu = sample().tlvs(vec![Tlv::new(0x1400, Bytes::from_static(b"x"))]);
        let bytes = pdu.to_bytes().unwrap();

        let strict = PduRegistry::new().with_unknown_tlvs(false);
        assert!(matches!(
            strict.decode_frame(&bytes),
            Err(CodecError::UnexpectedTlv(0x1400))
        ));
        assert!(PduRegistry::new().decode_frame(&bytes).is_ok());
    }

    #[test]
    fn submit_sm_resp_roundtrip() {
        let ok = SubmitSmResponse::new(9, "0A1B2C3D");
        let (frame, _) = Frame::decode(&ok.to_bytes().unwrap()).unwrap();
        assert_eq!(frame, Frame::SubmitSmResp(ok));

        let rejected = SubmitSmResponse::error(10, CommandStatus::ThrottlingError);
        let bytes = rejected.to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);
        let (frame, _) = Frame::decode(&bytes).unwrap();
        assert_eq!(frame, Frame::SubmitSmResp(rejected));
    }
}
