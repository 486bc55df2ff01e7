use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_complete_header_only_pdu;

/// enquire_link PDU (Section 4.11.1) - Keep-alive message
///
/// The enquire_link operation is used to provide a confidence check of the
/// communication path between an ESME and an SMSC. On receipt of this request,
/// the recipient should respond with an enquire_link_resp.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

/// enquire_link_resp PDU (Section 4.11.2) - Keep-alive response
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn enquire_link_response_keeps_status() {
        let original = EnquireLinkResponse::error(123, CommandStatus::SystemError);
        let bytes = original.to_bytes().unwrap();
        assert_eq!(original.encoded_size(), 16);

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = EnquireLinkResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn enquire_link_rejects_other_command_ids() {
        let bytes = EnquireLinkResponse::new(5).to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();

        assert!(EnquireLink::decode(header, &mut cursor).is_err());
    }
}
