use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_complete_header_only_pdu;

/// GenericNack is used to acknowledge the receipt of a PDU when the receiving
/// entity cannot process the PDU due to errors such as invalid command_id,
/// invalid command_length, or a malformed body.
///
/// The generic_nack PDU has no message body. Its sequence_number is that of
/// the offending PDU, or 0 if it could not be determined.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    /// The command_status field indicates the reason for the generic_nack
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(GenericNack, CommandId::GenericNack);

impl GenericNack {
    /// Creates a GenericNack for an invalid command ID error
    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::error(sequence_number, CommandStatus::InvalidCommandId)
    }

    /// Creates a GenericNack for a system error
    pub fn system_error(sequence_number: u32) -> Self {
        Self::error(sequence_number, CommandStatus::SystemError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};

    #[test]
    fn generic_nack_carries_status_and_sequence() {
        let bytes = GenericNack::invalid_command_id(456).to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x00, 0x00, 0x10, // command_length
                0x80, 0x00, 0x00, 0x00, // command_id
                0x00, 0x00, 0x00, 0x03, // command_status (ESME_RINVCMDID)
                0x00, 0x00, 0x01, 0xC8, // sequence_number
            ]
        );

        let (frame, _) = Frame::decode(&bytes).unwrap();
        assert_eq!(frame, Frame::GenericNack(GenericNack::invalid_command_id(456)));
    }
}
