// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Includes macros for header-only PDUs, the shared short message body, and builder setters

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
///
/// Any body bytes left behind are reported by the registry as a length mismatch.
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                _buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                <Self as $crate::codec::Decodable>::validate_header(&header)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::encode_pdu(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |_| Ok(()),
                )
            }

            fn encoded_size(&self) -> usize {
                $crate::codec::PduHeader::SIZE
            }
        }
    };
}

/// Macro for generating constructor methods for header-only PDUs
///
/// # Generated code
/// - `new(sequence_number: u32)` - Creates PDU with Ok status
/// - `error(sequence_number: u32, status: CommandStatus)` - Creates PDU with error status
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Codec implementation plus constructors for header-only PDUs
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

/// Macro for the codec of submit_sm and deliver_sm, which share one body
/// layout (SMPP v3.4 sections 4.4.1 and 4.6.1).
///
/// The PDU type must provide `fn validate(&self) -> Result<(), CodecError>`,
/// which runs before anything is written.
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            /// A PDU with SMPP defaults for every field not given here
            pub fn new(
                sequence_number: u32,
                source_addr: impl Into<String>,
                destination_addr: impl Into<String>,
                short_message: impl Into<bytes::Bytes>,
            ) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    service_type: String::new(),
                    source_addr_ton: Default::default(),
                    source_addr_npi: Default::default(),
                    source_addr: source_addr.into(),
                    dest_addr_ton: Default::default(),
                    dest_addr_npi: Default::default(),
                    destination_addr: destination_addr.into(),
                    esm_class: Default::default(),
                    protocol_id: 0,
                    priority_flag: 0,
                    schedule_delivery_time: String::new(),
                    validity_period: String::new(),
                    registered_delivery: 0,
                    replace_if_present_flag: 0,
                    data_coding: Default::default(),
                    sm_default_msg_id: 0,
                    short_message: short_message.into(),
                    tlvs: Vec::new(),
                }
            }

            $crate::macros::builder_setters! {
                service_type: String,
                source_addr_ton: $crate::datatypes::TypeOfNumber,
                source_addr_npi: $crate::datatypes::NumericPlanIndicator,
                dest_addr_ton: $crate::datatypes::TypeOfNumber,
                dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
                esm_class: $crate::datatypes::EsmClass,
                protocol_id: u8,
                priority_flag: u8,
                registered_delivery: u8,
                data_coding: $crate::datatypes::DataCoding,
                tlvs: Vec<$crate::datatypes::Tlv>,
            }

            /// Looks up an optional parameter by tag
            pub fn tlv(&self, tag: u16) -> Option<&$crate::datatypes::Tlv> {
                self.tlvs.iter().find(|tlv| tlv.tag == tag)
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::{encode_cstring, CodecError};

                self.validate()?;

                let sm_length = u8::try_from(self.short_message.len())
                    .ok()
                    .filter(|len| *len <= $crate::datatypes::MAX_SHORT_MESSAGE_LEN)
                    .ok_or(CodecError::FieldTooLong {
                        field: "short_message",
                        max: $crate::datatypes::MAX_SHORT_MESSAGE_LEN as usize,
                        actual: self.short_message.len(),
                    })?;

                $crate::codec::encode_pdu(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |buf| {
                        encode_cstring(buf, &self.service_type, 6, "service_type")?;
                        buf.put_u8(self.source_addr_ton as u8);
                        buf.put_u8(self.source_addr_npi as u8);
                        encode_cstring(buf, &self.source_addr, 21, "source_addr")?;
                        buf.put_u8(self.dest_addr_ton as u8);
                        buf.put_u8(self.dest_addr_npi as u8);
                        encode_cstring(buf, &self.destination_addr, 21, "destination_addr")?;
                        buf.put_u8(self.esm_class.to_byte());
                        buf.put_u8(self.protocol_id);
                        buf.put_u8(self.priority_flag);
                        encode_cstring(
                            buf,
                            &self.schedule_delivery_time,
                            17,
                            "schedule_delivery_time",
                        )?;
                        encode_cstring(buf, &self.validity_period, 17, "validity_period")?;
                        buf.put_u8(self.registered_delivery);
                        buf.put_u8(self.replace_if_present_flag);
                        buf.put_u8(self.data_coding.to_byte());
                        buf.put_u8(self.sm_default_msg_id);
                        buf.put_u8(sm_length);
                        buf.put_slice(&self.short_message);
                        $crate::datatypes::encode_tlvs(&self.tlvs, buf)
                    },
                )
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_bytes, decode_cstring, decode_u8, CodecError};
                use $crate::datatypes::{NumericPlanIndicator, TypeOfNumber};

                fn ton(value: u8, field: &'static str) -> Result<TypeOfNumber, CodecError> {
                    TypeOfNumber::try_from(value).map_err(|_| CodecError::FieldValidation {
                        field,
                        reason: format!("invalid type of number {value:#04x}"),
                    })
                }

                fn npi(value: u8, field: &'static str) -> Result<NumericPlanIndicator, CodecError> {
                    NumericPlanIndicator::try_from(value).map_err(|_| {
                        CodecError::FieldValidation {
                            field,
                            reason: format!("invalid numbering plan {value:#04x}"),
                        }
                    })
                }

                <Self as $crate::codec::Decodable>::validate_header(&header)?;

                let service_type = decode_cstring(buf, 6, "service_type")?;
                let source_addr_ton = ton(decode_u8(buf, "source_addr_ton")?, "source_addr_ton")?;
                let source_addr_npi = npi(decode_u8(buf, "source_addr_npi")?, "source_addr_npi")?;
                let source_addr = decode_cstring(buf, 21, "source_addr")?;
                let dest_addr_ton = ton(decode_u8(buf, "dest_addr_ton")?, "dest_addr_ton")?;
                let dest_addr_npi = npi(decode_u8(buf, "dest_addr_npi")?, "dest_addr_npi")?;
                let destination_addr = decode_cstring(buf, 21, "destination_addr")?;
                let esm_class = decode_u8(buf, "esm_class")?.into();
                let protocol_id = decode_u8(buf, "protocol_id")?;
                let priority_flag = decode_u8(buf, "priority_flag")?;
                let schedule_delivery_time = decode_cstring(buf, 17, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, 17, "validity_period")?;
                let registered_delivery = decode_u8(buf, "registered_delivery")?;
                let replace_if_present_flag = decode_u8(buf, "replace_if_present_flag")?;
                let data_coding = decode_u8(buf, "data_coding")?.into();
                let sm_default_msg_id = decode_u8(buf, "sm_default_msg_id")?;
                let sm_length = decode_u8(buf, "sm_length")?;
                let short_message = decode_bytes(buf, sm_length as usize, "short_message")?;
                let tlvs = $crate::datatypes::decode_tlvs(buf)?;

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    tlvs,
                })
            }
        }
    };
}

/// Macro for generating builder setter methods
///
/// For each `field: Type` pair, generates a method named after the field
/// that sets it and returns self for chaining.
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

// Make macros available to the rest of the crate
pub(crate) use {
    builder_setters, impl_complete_header_only_pdu, impl_header_only_constructors,
    impl_header_only_pdu, impl_short_message_pdu,
};
