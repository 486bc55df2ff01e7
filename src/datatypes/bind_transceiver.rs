use crate::codec::{
    decode_cstring, decode_u8, encode_cstring, encode_pdu, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    decode_tlvs, encode_tlvs, tags, CommandId, CommandStatus, InterfaceVersion,
    NumericPlanIndicator, Tlv, TypeOfNumber,
};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// BindTransceiver is used to bind a transceiver ESME to the SMSC.
/// A transceiver ESME can both send and receive messages through a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.1 system_id: identifies the ESME requesting to bind. Up to 15
    ///       characters plus the null terminator.
    pub system_id: String,

    /// 5.2.2 password: up to 8 characters. An empty password is sent as a
    ///       single NULL octet.
    pub password: String,

    /// 5.2.3 system_type: categorizes the ESME, e.g. "VMS" or "OTA". Up to
    ///       12 characters.
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served via this session.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es).
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: SME addresses serviced by the ESME. Up to 40 characters.
    pub address_range: String,
}

impl BindTransceiver {
    pub fn new(
        sequence_number: u32,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_address_range(mut self, address_range: impl Into<String>) -> Self {
        self.address_range = address_range.into();
        self
    }
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.system_id.is_empty() {
            return Err(CodecError::MissingField("system_id"));
        }

        encode_pdu(
            buf,
            CommandId::BindTransceiver,
            self.command_status,
            self.sequence_number,
            |buf| {
                encode_cstring(buf, &self.system_id, 16, "system_id")?;
                encode_cstring(buf, &self.password, 9, "password")?;
                encode_cstring(buf, &self.system_type, 13, "system_type")?;
                buf.put_u8(self.interface_version as u8);
                buf.put_u8(self.addr_ton as u8);
                buf.put_u8(self.addr_npi as u8);
                encode_cstring(buf, &self.address_range, 41, "address_range")
            },
        )
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(buf, 16, "system_id")?;
        let password = decode_cstring(buf, 9, "password")?;
        let system_type = decode_cstring(buf, 13, "system_type")?;

        let version = decode_u8(buf, "interface_version")?;
        let interface_version =
            InterfaceVersion::try_from(version).map_err(|_| CodecError::FieldValidation {
                field: "interface_version",
                reason: format!("unsupported interface version {version:#04x}"),
            })?;

        let ton = decode_u8(buf, "addr_ton")?;
        let addr_ton = TypeOfNumber::try_from(ton).map_err(|_| CodecError::FieldValidation {
            field: "addr_ton",
            reason: format!("invalid type of number {ton:#04x}"),
        })?;

        let npi = decode_u8(buf, "addr_npi")?;
        let addr_npi =
            NumericPlanIndicator::try_from(npi).map_err(|_| CodecError::FieldValidation {
                field: "addr_npi",
                reason: format!("invalid numbering plan {npi:#04x}"),
            })?;

        let address_range = decode_cstring(buf, 41, "address_range")?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

/// bind_transceiver_resp. The SMSC omits the body when the bind is rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// SMSC identifier
    pub system_id: String,
    pub tlvs: Vec<Tlv>,
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, system_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            tlvs: Vec::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            system_id: String::new(),
            tlvs: Vec::new(),
        }
    }

    /// SMPP version the SMSC reports through the sc_interface_version TLV
    pub fn sc_interface_version(&self) -> Option<InterfaceVersion> {
        self.tlvs
            .iter()
            .find(|tlv| tlv.tag == tags::SC_INTERFACE_VERSION)
            .and_then(Tlv::as_u8)
            .and_then(|v| InterfaceVersion::try_from(v).ok())
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::BindTransceiverResp,
            self.command_status,
            self.sequence_number,
            |buf| {
                if !self.command_status.is_ok() && self.system_id.is_empty() && self.tlvs.is_empty()
                {
                    return Ok(());
                }
                encode_cstring(buf, &self.system_id, 16, "system_id")?;
                encode_tlvs(&self.tlvs, buf)
            },
        )
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let (system_id, tlvs) = if buf.has_remaining() {
            (decode_cstring(buf, 16, "system_id")?, decode_tlvs(buf)?)
        } else {
            (String::new(), Vec::new())
        };

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            tlvs,
        })
    }
}
