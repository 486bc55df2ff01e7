use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// An SMPP optional parameter in Tag-Length-Value form.
///
/// Unknown tags are kept verbatim so that vendor extensions survive a
/// decode/encode cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written as the Length field on the wire.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn from_u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    pub fn from_u16(tag: u16, value: u16) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    /// A C-octet string value, null terminated on the wire
    pub fn from_cstring(tag: u16, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Self::new(tag, bytes)
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self.value.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self.value.as_ref() {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    /// The value read as a C-octet string, without its terminator
    pub fn as_cstring(&self) -> Option<&str> {
        let end = self
            .value
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.value.len());
        std::str::from_utf8(&self.value[..end]).ok()
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| CodecError::FieldTooLong {
            field: "tlv_value",
            max: u16::MAX as usize,
            actual: self.value.len(),
        })?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::TlvError(format!(
                "{} trailing bytes cannot hold a TLV header",
                buf.remaining()
            )));
        }

        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "TLV {tag:#06x} declares {length} bytes, only {} remain",
                buf.remaining()
            )));
        }

        Ok(Self {
            tag,
            value: buf.copy_to_bytes(length),
        })
    }
}

/// Decodes every optional parameter up to the end of the PDU body
pub fn decode_tlvs(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
    let mut tlvs = Vec::new();
    while buf.has_remaining() {
        tlvs.push(Tlv::decode(buf)?);
    }
    Ok(tlvs)
}

pub fn encode_tlvs(tlvs: &[Tlv], buf: &mut BytesMut) -> Result<(), CodecError> {
    for tlv in tlvs {
        tlv.encode(buf)?;
    }
    Ok(())
}

/// SMPP v3.4 optional parameter tags (section 5.3.2)
pub mod tags {
    pub const DEST_ADDR_SUBUNIT: u16 = 0x0005;
    pub const DEST_NETWORK_TYPE: u16 = 0x0006;
    pub const DEST_BEARER_TYPE: u16 = 0x0007;
    pub const DEST_TELEMATICS_ID: u16 = 0x0008;
    pub const SOURCE_ADDR_SUBUNIT: u16 = 0x000D;
    pub const SOURCE_NETWORK_TYPE: u16 = 0x000E;
    pub const SOURCE_BEARER_TYPE: u16 = 0x000F;
    pub const SOURCE_TELEMATICS_ID: u16 = 0x0010;
    pub const QOS_TIME_TO_LIVE: u16 = 0x0017;
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const ADDITIONAL_STATUS_INFO_TEXT: u16 = 0x001D;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MS_MSG_WAIT_FACILITIES: u16 = 0x0030;
    pub const PRIVACY_INDICATOR: u16 = 0x0201;
    pub const SOURCE_SUBADDRESS: u16 = 0x0202;
    pub const DEST_SUBADDRESS: u16 = 0x0203;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const USER_RESPONSE_CODE: u16 = 0x0205;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const LANGUAGE_INDICATOR: u16 = 0x020D;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const CALLBACK_NUM_PRES_IND: u16 = 0x0302;
    pub const CALLBACK_NUM_ATAG: u16 = 0x0303;
    pub const NUMBER_OF_MESSAGES: u16 = 0x0304;
    pub const CALLBACK_NUM: u16 = 0x0381;
    pub const DPF_RESULT: u16 = 0x0420;
    pub const SET_DPF: u16 = 0x0421;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;
    pub const DISPLAY_TIME: u16 = 0x1201;
    pub const SMS_SIGNAL: u16 = 0x1203;
    pub const MS_VALIDITY: u16 = 0x1204;
    pub const ALERT_ON_MESSAGE_DELIVERY: u16 = 0x130C;
    pub const ITS_REPLY_TYPE: u16 = 0x1380;
    pub const ITS_SESSION_INFO: u16 = 0x1383;

    const STANDARD: &[u16] = &[
        DEST_ADDR_SUBUNIT,
        DEST_NETWORK_TYPE,
        DEST_BEARER_TYPE,
        DEST_TELEMATICS_ID,
        SOURCE_ADDR_SUBUNIT,
        SOURCE_NETWORK_TYPE,
        SOURCE_BEARER_TYPE,
        SOURCE_TELEMATICS_ID,
        QOS_TIME_TO_LIVE,
        PAYLOAD_TYPE,
        ADDITIONAL_STATUS_INFO_TEXT,
        RECEIPTED_MESSAGE_ID,
        MS_MSG_WAIT_FACILITIES,
        PRIVACY_INDICATOR,
        SOURCE_SUBADDRESS,
        DEST_SUBADDRESS,
        USER_MESSAGE_REFERENCE,
        USER_RESPONSE_CODE,
        SOURCE_PORT,
        DESTINATION_PORT,
        SAR_MSG_REF_NUM,
        LANGUAGE_INDICATOR,
        SAR_TOTAL_SEGMENTS,
        SAR_SEGMENT_SEQNUM,
        SC_INTERFACE_VERSION,
        CALLBACK_NUM_PRES_IND,
        CALLBACK_NUM_ATAG,
        NUMBER_OF_MESSAGES,
        CALLBACK_NUM,
        DPF_RESULT,
        SET_DPF,
        MS_AVAILABILITY_STATUS,
        NETWORK_ERROR_CODE,
        MESSAGE_PAYLOAD,
        DELIVERY_FAILURE_REASON,
        MORE_MESSAGES_TO_SEND,
        MESSAGE_STATE,
        USSD_SERVICE_OP,
        DISPLAY_TIME,
        SMS_SIGNAL,
        MS_VALIDITY,
        ALERT_ON_MESSAGE_DELIVERY,
        ITS_REPLY_TYPE,
        ITS_SESSION_INFO,
    ];

    /// Returns true for tags defined by SMPP v3.4 itself (not vendor extensions)
    pub fn is_standard(tag: u16) -> bool {
        STANDARD.contains(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlv_wire_format() {
        let tlv = Tlv::from_u16(tags::SAR_MSG_REF_NUM, 0x1234);
        let mut buf = BytesMut::new();
        tlv.encode(&mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x02, 0x0C, 0x00, 0x02, 0x12, 0x34]);
        assert_eq!(tlv.encoded_size(), 6);
    }

    #[test]
    fn truncated_tlv_is_rejected() {
        let data: &[u8] = &[0x00, 0x1E, 0x00, 0x05, b'a', b'b'];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Tlv::decode(&mut cursor),
            Err(CodecError::TlvError(_))
        ));
    }

    #[test]
    fn typed_accessors() {
        assert_eq!(Tlv::from_u8(tags::MESSAGE_STATE, 2).as_u8(), Some(2));
        assert_eq!(Tlv::from_u16(tags::SOURCE_PORT, 9200).as_u16(), Some(9200));
        assert_eq!(
            Tlv::from_cstring(tags::RECEIPTED_MESSAGE_ID, "abc").as_cstring(),
            Some("abc")
        );
        assert_eq!(Tlv::from_u8(tags::MESSAGE_STATE, 2).as_u16(), None);
    }

    #[test]
    fn vendor_tags_are_not_standard() {
        assert!(tags::is_standard(tags::MESSAGE_PAYLOAD));
        assert!(!tags::is_standard(0x1400));
        assert!(!tags::is_standard(0x3FFF));
    }
}
