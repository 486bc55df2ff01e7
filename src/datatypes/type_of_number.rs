use num_enum::TryFromPrimitive;

/// Type of Number (TON) of an SME address.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0x00,
    International = 0x01,
    National = 0x02,
    NetworkSpecific = 0x03,
    SubscriberNumber = 0x04,
    Alphanumeric = 0x05,
    Abbreviated = 0x06,
}

impl Default for TypeOfNumber {
    fn default() -> Self {
        TypeOfNumber::Unknown
    }
}
