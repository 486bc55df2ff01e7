// ABOUTME: Strongly-typed SMPP data coding scheme with text decoding for inbound messages
// ABOUTME: Maps the data_coding octet to the character sets this client produces and consumes

use crate::gsm;
use std::fmt;

/// Data coding scheme of a short message's user data
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet (GSM 7-bit)
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII encoding
    Ascii,
    /// 8-bit binary data (no encoding)
    Binary,
    /// Latin-1 (ISO-8859-1) character set
    Latin1,
    /// UCS-2 (ISO/IEC-10646) Unicode encoding
    Ucs2,
    /// Any other data coding value, carried through unchanged
    Custom(u8),
}

impl DataCoding {
    /// Creates a DataCoding from the raw wire value
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 => DataCoding::Binary,
            0x03 => DataCoding::Latin1,
            0x08 => DataCoding::Ucs2,
            _ => DataCoding::Custom(value),
        }
    }

    /// Returns the raw u8 value for wire protocol
    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::Latin1 => 0x03,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Custom(value) => *value,
        }
    }

    /// Returns true if this encoding supports Unicode characters
    pub fn is_unicode(&self) -> bool {
        matches!(self, DataCoding::Ucs2)
    }

    /// Returns the character set name for this encoding
    pub fn charset_name(&self) -> &'static str {
        match self {
            DataCoding::SmscDefault => "GSM 7-bit Default",
            DataCoding::Ascii => "ASCII/IA5",
            DataCoding::Binary => "Binary",
            DataCoding::Latin1 => "ISO-8859-1",
            DataCoding::Ucs2 => "UCS-2",
            DataCoding::Custom(_) => "Custom/Reserved",
        }
    }

    /// Decodes user data (without any UDH) received in this coding.
    ///
    /// GSM default text is read unpacked, one septet per octet, which is how
    /// SMSCs deliver it. Packed text, the layout `submit_sm` segments are
    /// sent in, goes through [`DataCoding::decode_packed_text`]. Binary and
    /// unknown codings fall back to lossy UTF-8.
    pub fn decode_text(&self, data: &[u8]) -> String {
        match self {
            DataCoding::SmscDefault => gsm::decode_septets(data),
            DataCoding::Latin1 => data.iter().map(|&b| char::from(b)).collect(),
            DataCoding::Ucs2 => {
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            DataCoding::Ascii | DataCoding::Binary | DataCoding::Custom(_) => {
                String::from_utf8_lossy(data).into_owned()
            }
        }
    }

    /// Decodes GSM default text packed eight septets to seven octets, after
    /// `fill_bits` of padding. Every other coding decodes as in
    /// [`DataCoding::decode_text`].
    ///
    /// When the octets hold room for exactly one more septet and it is zero,
    /// it is taken as padding, so a trailing '@' in that position is lost.
    pub fn decode_packed_text(&self, packed: &[u8], fill_bits: usize) -> String {
        if *self != DataCoding::SmscDefault {
            return self.decode_text(packed);
        }

        let bits = (packed.len() * 8).saturating_sub(fill_bits);
        let mut septets = gsm::unpack_septets(packed, fill_bits, bits / 7);
        if bits % 7 == 0 && septets.last() == Some(&0) {
            septets.pop();
        }
        gsm::decode_septets(&septets)
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.charset_name())
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataCoding(0x{:02X} {})", self.to_byte(), self.charset_name())
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        Self::from_byte(value)
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_coding_basic_types() {
        assert_eq!(DataCoding::SmscDefault.to_byte(), 0x00);
        assert_eq!(DataCoding::Ascii.to_byte(), 0x01);
        assert_eq!(DataCoding::Binary.to_byte(), 0x02);
        assert_eq!(DataCoding::Ucs2.to_byte(), 0x08);
    }

    #[test]
    fn test_data_coding_from_byte() {
        assert_eq!(DataCoding::from_byte(0x00), DataCoding::SmscDefault);
        assert_eq!(DataCoding::from_byte(0x08), DataCoding::Ucs2);
        assert_eq!(DataCoding::from_byte(0xF0), DataCoding::Custom(0xF0));
        assert_eq!(DataCoding::from(0xF0u8).to_byte(), 0xF0);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(DataCoding::Ucs2.decode_text(&[0x04, 0x1F, 0x00, 0x21]), "П!");
        assert_eq!(DataCoding::Latin1.decode_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
        assert_eq!(
            DataCoding::SmscDefault.decode_text(&[0x48, 0x69, 0x00]),
            "Hi@"
        );
    }

    #[test]
    fn test_decode_packed_text() {
        let septets = gsm::to_septets("Hello!!").unwrap();
        let packed = gsm::pack_septets(&septets, 0);
        assert_eq!(packed.len(), 7);
        // Seven octets could hold an eighth septet; the zero padding is dropped
        assert_eq!(DataCoding::SmscDefault.decode_packed_text(&packed, 0), "Hello!!");

        let septets = gsm::to_septets("12345678").unwrap();
        let packed = gsm::pack_septets(&septets, 0);
        assert_eq!(DataCoding::SmscDefault.decode_packed_text(&packed, 0), "12345678");

        let septets = gsm::to_septets("after header").unwrap();
        let packed = gsm::pack_septets(&septets, 1);
        assert_eq!(DataCoding::SmscDefault.decode_packed_text(&packed, 1), "after header");

        // Packed bytes read as unpacked septets come out garbled
        assert_ne!(DataCoding::SmscDefault.decode_text(&packed), "after header");
        assert_eq!(DataCoding::Ucs2.decode_packed_text(&[0x00, 0x41], 1), "A");
    }

    #[test]
    fn test_data_coding_display() {
        assert_eq!(format!("{}", DataCoding::SmscDefault), "GSM 7-bit Default");
        assert_eq!(format!("{}", DataCoding::Ucs2), "UCS-2");
    }
}
