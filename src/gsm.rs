// ABOUTME: GSM 03.38 default alphabet and extension table with 7-bit septet packing
// ABOUTME: Used by the segmenter for outbound text and by DeliverSm for inbound text

/// Escape septet that prefixes every extension table character
pub const ESCAPE: u8 = 0x1B;

/// Default alphabet, indexed by septet value. 0x1B is the escape to the
/// extension table and never maps to a character on its own.
const DEFAULT_ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension table: (character, septet following the escape)
const EXTENSION_TABLE: [(char, u8); 10] = [
    ('\u{0C}', 0x0A), // form feed
    ('^', 0x14),
    ('{', 0x28),
    ('}', 0x29),
    ('\\', 0x2F),
    ('[', 0x3C),
    ('~', 0x3D),
    (']', 0x3E),
    ('|', 0x40),
    ('€', 0x65),
];

/// Septets for a single character: one for the default alphabet, two
/// (escape + code) for the extension table, `None` if unrepresentable.
pub fn char_to_septets(c: char) -> Option<([u8; 2], usize)> {
    if c != '\u{1B}' {
        if let Some(pos) = DEFAULT_ALPHABET.iter().position(|&g| g == c) {
            return Some(([pos as u8, 0], 1));
        }
    }
    EXTENSION_TABLE
        .iter()
        .find(|(g, _)| *g == c)
        .map(|&(_, code)| ([ESCAPE, code], 2))
}

/// Returns true if every character of `text` is in the GSM 7-bit alphabet
pub fn is_representable(text: &str) -> bool {
    text.chars().all(|c| char_to_septets(c).is_some())
}

/// Returns the first character that has no GSM 7-bit representation
pub fn first_unrepresentable(text: &str) -> Option<char> {
    text.chars().find(|&c| char_to_septets(c).is_none())
}

/// Number of septets `text` occupies, or `None` if it is not representable
pub fn septet_count(text: &str) -> Option<usize> {
    text.chars()
        .map(|c| char_to_septets(c).map(|(_, n)| n))
        .sum()
}

/// Maps `text` to unpacked septets (one septet per octet)
pub fn to_septets(text: &str) -> Option<Vec<u8>> {
    let mut septets = Vec::with_capacity(text.len());
    for c in text.chars() {
        let (pair, n) = char_to_septets(c)?;
        septets.extend_from_slice(&pair[..n]);
    }
    Some(septets)
}

/// Packs septets into octets, LSB first, leaving `fill_bits` zero bits at the
/// start of the first octet. Fill bits align the text on a septet boundary
/// when it follows a User Data Header.
pub fn pack_septets(septets: &[u8], fill_bits: usize) -> Vec<u8> {
    let total_bits = fill_bits + septets.len() * 7;
    let mut packed = vec![0u8; total_bits.div_ceil(8)];

    for (i, &septet) in septets.iter().enumerate() {
        let bit = fill_bits + i * 7;
        let (index, shift) = (bit / 8, bit % 8);
        let value = u16::from(septet & 0x7F) << shift;

        packed[index] |= value as u8;
        if value > 0xFF {
            packed[index + 1] |= (value >> 8) as u8;
        }
    }

    packed
}

/// Unpacks `count` septets from `packed`, skipping `fill_bits` leading bits
pub fn unpack_septets(packed: &[u8], fill_bits: usize, count: usize) -> Vec<u8> {
    (0..count)
        .map_while(|i| {
            let bit = fill_bits + i * 7;
            let (index, shift) = (bit / 8, bit % 8);
            let low = u16::from(*packed.get(index)?);
            let high = packed.get(index + 1).map_or(0, |&b| u16::from(b));
            Some((((high << 8 | low) >> shift) & 0x7F) as u8)
        })
        .collect()
}

/// Decodes unpacked septets (one per octet) into text. Unknown extension
/// codes decode as a space, per GSM 03.38.
pub fn decode_septets(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter().map(|s| s & 0x7F);

    while let Some(septet) = iter.next() {
        if septet == ESCAPE {
            let code = iter.next().unwrap_or(ESCAPE);
            let c = EXTENSION_TABLE
                .iter()
                .find(|(_, e)| *e == code)
                .map_or(' ', |&(c, _)| c);
            text.push(c);
        } else {
            text.push(DEFAULT_ALPHABET[septet as usize]);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representable_text() {
        assert!(is_representable("Hello World @ £5 {ok}"));
        assert!(is_representable(""));
        assert!(!is_representable("Привет"));
        assert_eq!(first_unrepresentable("abc😀d"), Some('😀'));
    }

    #[test]
    fn extension_characters_take_two_septets() {
        assert_eq!(septet_count("abc"), Some(3));
        assert_eq!(septet_count("€[]"), Some(6));
        assert_eq!(septet_count("ж"), None);
        assert_eq!(to_septets("a€").unwrap(), vec![0x61, ESCAPE, 0x65]);
    }

    #[test]
    fn packs_well_known_vector() {
        let septets = to_septets("hellohello").unwrap();
        let packed = pack_septets(&septets, 0);
        assert_eq!(
            packed,
            vec![0xE8, 0x32, 0x9B, 0xFD, 0x46, 0x97, 0xD9, 0xEC, 0x37]
        );
    }

    #[test]
    fn full_message_packs_into_140_octets() {
        let septets = vec![0x41; 160];
        assert_eq!(pack_septets(&septets, 0).len(), 140);

        // 6 octet UDH + 1 fill bit + 153 septets
        let packed = pack_septets(&septets[..153], 1);
        assert_eq!(packed.len(), 134);
        assert_eq!(packed[0] & 0x01, 0);
    }

    #[test]
    fn unpack_reverses_pack_with_fill_bits() {
        let septets = to_septets("Concatenated {text}").unwrap();
        let packed = pack_septets(&septets, 1);
        assert_eq!(unpack_septets(&packed, 1, septets.len()), septets);
    }

    #[test]
    fn decodes_default_and_extension_septets() {
        let septets = to_septets("Price: 5€ [x]").unwrap();
        assert_eq!(decode_septets(&septets), "Price: 5€ [x]");
    }
}
