// ABOUTME: SMPP esm_class bitfield with the message type and UDHI flags this client uses
// ABOUTME: Distinguishes delivery receipts from ordinary deliver_sm and flags concatenated payloads

use std::fmt;

/// ESM class octet: bits 1-0 messaging mode, bits 5-2 message type,
/// bits 7-6 GSM network features (UDHI, reply path).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EsmClass(u8);

impl EsmClass {
    const MESSAGE_TYPE_MASK: u8 = 0b0011_1100;
    const DELIVERY_RECEIPT: u8 = 0b0000_0100;
    const UDHI: u8 = 0b0100_0000;
    const REPLY_PATH: u8 = 0b1000_0000;

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Marks the short message as starting with a User Data Header
    pub fn with_udhi(self) -> Self {
        Self(self.0 | Self::UDHI)
    }

    /// Message type for an SMSC delivery receipt (deliver_sm only)
    pub fn delivery_receipt() -> Self {
        Self(Self::DELIVERY_RECEIPT)
    }

    pub fn has_udhi(&self) -> bool {
        self.0 & Self::UDHI != 0
    }

    pub fn has_reply_path(&self) -> bool {
        self.0 & Self::REPLY_PATH != 0
    }

    /// Returns true if the message type bits mark an SMSC delivery receipt
    pub fn is_delivery_receipt(&self) -> bool {
        self.0 & Self::MESSAGE_TYPE_MASK == Self::DELIVERY_RECEIPT
    }

    pub fn to_byte(&self) -> u8 {
        self.0
    }
}

impl fmt::Debug for EsmClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EsmClass(0x{:02X})", self.0)
    }
}

impl From<u8> for EsmClass {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<EsmClass> for u8 {
    fn from(esm_class: EsmClass) -> Self {
        esm_class.0
    }
}
