// ABOUTME: Extracts the SMSC message id from the free-text body of a delivery receipt
// ABOUTME: Lenient "first token, first colon" parse of the de-facto id:... sub:... stat:... format

use crate::datatypes::DeliverSm;
use thiserror::Error;

/// Why a delivery receipt body could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error("Malformed receipt: body is not valid text")]
    NotText,

    #[error("Malformed receipt: body is empty")]
    Empty,

    #[error("Malformed receipt: expected id:<value>, found {0:?}")]
    MissingId(String),
}

/// Returns the message id from a receipt body such as
/// `id:Smsc2108 sub:001 dlvrd:001 ... stat:DELIVRD err:000 text:...`.
///
/// Only the first whitespace-delimited token is examined. It must be
/// `id:<value>` (key case-insensitive) with a non-empty value; the rest
/// of the body is ignored because field order varies between SMSCs.
///
/// ```rust
/// use smpp_session::receipt::extract_message_id;
///
/// let id = extract_message_id(b"id:Smsc2108 sub:1 dlvrd:1 stat:DELIVRD").unwrap();
/// assert_eq!(id, "Smsc2108");
/// ```
pub fn extract_message_id(short_message: &[u8]) -> Result<String, ReceiptError> {
    let text = std::str::from_utf8(short_message).map_err(|_| ReceiptError::NotText)?;
    let token = text.split_whitespace().next().ok_or(ReceiptError::Empty)?;

    match token.split_once(':') {
        Some((key, value)) if key.eq_ignore_ascii_case("id") && !value.is_empty() => {
            Ok(value.to_string())
        }
        _ => Err(ReceiptError::MissingId(token.to_string())),
    }
}

/// A delivery receipt reduced to what this client needs from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// The SMSC's id for the message, as assigned in submit_sm_resp
    pub message_id: String,
}

impl DeliveryReceipt {
    pub fn parse(short_message: &[u8]) -> Result<Self, ReceiptError> {
        extract_message_id(short_message).map(|message_id| Self { message_id })
    }

    /// Parses the receipt carried by `pdu`, preferring the body text and
    /// falling back to the receipted_message_id TLV.
    pub fn from_deliver_sm(pdu: &DeliverSm) -> Result<Self, ReceiptError> {
        match Self::parse(pdu.user_data()) {
            Ok(receipt) => Ok(receipt),
            Err(err) => pdu
                .receipted_message_id()
                .filter(|id| !id.is_empty())
                .map(|id| Self {
                    message_id: id.to_string(),
                })
                .ok_or(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{tags, EsmClass, Tlv};
    use bytes::Bytes;

    #[test]
    fn extracts_id_from_standard_receipt() {
        let body = b"id:Smsc2108 sub:1 dlvrd:1 submit date:2410161200 done date:2410161201 stat:DELIVRD err:0 text:hi";
        assert_eq!(extract_message_id(body).unwrap(), "Smsc2108");
    }

    #[test]
    fn only_the_first_colon_splits() {
        assert_eq!(extract_message_id(b"id:a:b:c stat:DELIVRD").unwrap(), "a:b:c");
    }

    #[test]
    fn key_is_case_insensitive_and_whitespace_is_skipped() {
        assert_eq!(extract_message_id(b"  \tID:0042 stat:DELIVRD").unwrap(), "0042");
    }

    #[test]
    fn malformed_receipts() {
        assert_eq!(extract_message_id(b""), Err(ReceiptError::Empty));
        assert_eq!(extract_message_id(b"   "), Err(ReceiptError::Empty));
        assert_eq!(extract_message_id(&[0xFF, 0xFE]), Err(ReceiptError::NotText));
        assert_eq!(
            extract_message_id(b"stat:DELIVRD id:123"),
            Err(ReceiptError::MissingId("stat:DELIVRD".to_string()))
        );
        assert_eq!(
            extract_message_id(b"id: sub:1"),
            Err(ReceiptError::MissingId("id:".to_string()))
        );
        assert_eq!(
            extract_message_id(b"Smsc2108"),
            Err(ReceiptError::MissingId("Smsc2108".to_string()))
        );
    }

    #[test]
    fn receipt_from_deliver_sm_falls_back_to_tlv() {
        let pdu = DeliverSm::new(1, "123", "456", Bytes::from_static(b"stat:DELIVRD"))
            .esm_class(EsmClass::delivery_receipt())
            .tlvs(vec![Tlv::from_cstring(tags::RECEIPTED_MESSAGE_ID, "ABC")]);
        assert_eq!(DeliveryReceipt::from_deliver_sm(&pdu).unwrap().message_id, "ABC");

        let pdu = DeliverSm::new(1, "123", "456", Bytes::from_static(b"id:XYZ stat:DELIVRD"))
            .esm_class(EsmClass::delivery_receipt());
        assert_eq!(DeliveryReceipt::from_deliver_sm(&pdu).unwrap().message_id, "XYZ");

        let pdu = DeliverSm::new(1, "123", "456", Bytes::from_static(b"garbage"));
        assert!(DeliveryReceipt::from_deliver_sm(&pdu).is_err());
    }
}
