// ABOUTME: Splits outbound text into short_message-sized segments with concatenation UDHs
// ABOUTME: Picks GSM 7-bit packing when the text allows it and falls back to UCS-2 otherwise

use crate::codec::CodecError;
use crate::datatypes::{DataCoding, EsmClass};
use crate::gsm;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// Septets that fit one unconcatenated GSM 7-bit message
pub const GSM7_SINGLE: usize = 160;
/// Septets per part once 6 octets go to the concatenation header
pub const GSM7_CONCAT: usize = 153;
/// UCS-2 code units in one unconcatenated message
pub const UCS2_SINGLE: usize = 70;
/// UCS-2 code units per concatenated part
pub const UCS2_CONCAT: usize = 67;
/// A one-octet part count limits concatenation to 255 parts
pub const MAX_SEGMENTS: usize = 255;

/// Requested character set for outbound text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetEncoding {
    /// GSM 7-bit when every character is representable, UCS-2 otherwise
    #[default]
    Auto,
    /// GSM 7-bit or fail with `UnencodableCharacter`
    Gsm7,
    Ucs2,
}

/// 3GPP TS 23.040 concatenation information element (IEI 0x00, 8-bit reference)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatHeader {
    pub reference: u8,
    pub total: u8,
    /// 1-based position of this part
    pub index: u8,
}

impl ConcatHeader {
    /// Encoded User Data Header length, including the UDHL octet
    pub const LEN: usize = 6;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [0x05, 0x00, 0x03, self.reference, self.total, self.index]
    }

    /// Reads a concatenation header from the start of a short_message
    pub fn parse(short_message: &[u8]) -> Option<Self> {
        match short_message {
            [0x05, 0x00, 0x03, reference, total, index, ..] => Some(Self {
                reference: *reference,
                total: *total,
                index: *index,
            }),
            _ => None,
        }
    }
}

/// One physical part of a message, ready to go into a submit_sm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSegment {
    /// Wire-ready short_message: UDH (when concatenated) followed by the
    /// encoded text
    pub payload: Bytes,
    pub data_coding: DataCoding,
    pub header: Option<ConcatHeader>,
    /// Characters carried, counted in septets (GSM) or code units (UCS-2)
    pub units: usize,
}

impl MessageSegment {
    /// esm_class for a submit_sm carrying this part
    pub fn esm_class(&self) -> EsmClass {
        match self.header {
            Some(_) => EsmClass::default().with_udhi(),
            None => EsmClass::default(),
        }
    }

    pub fn is_concatenated(&self) -> bool {
        self.header.is_some()
    }
}

/// Result of segmenting one logical message; parts are in send order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedMessage {
    pub segments: Vec<MessageSegment>,
    pub data_coding: DataCoding,
    pub esm_class: EsmClass,
}

impl SegmentedMessage {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageSegment> {
        self.segments.iter()
    }
}

impl IntoIterator for SegmentedMessage {
    type Item = MessageSegment;
    type IntoIter = std::vec::IntoIter<MessageSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

/// Splits text into segments, handing out one reference number per
/// concatenated message.
#[derive(Debug, Default)]
pub struct Segmenter {
    reference: AtomicU8,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts reference numbers at `reference`, e.g. to avoid reuse across reconnects
    pub fn with_initial_reference(reference: u8) -> Self {
        Self {
            reference: AtomicU8::new(reference),
        }
    }

    fn next_reference(&self) -> u8 {
        self.reference.fetch_add(1, Ordering::Relaxed)
    }

    pub fn segment(&self, text: &str, target: TargetEncoding) -> Result<SegmentedMessage, CodecError> {
        let use_gsm = match target {
            TargetEncoding::Gsm7 => {
                if let Some(c) = gsm::first_unrepresentable(text) {
                    return Err(CodecError::UnencodableCharacter(c));
                }
                true
            }
            TargetEncoding::Ucs2 => false,
            TargetEncoding::Auto => gsm::is_representable(text),
        };

        let message = if use_gsm {
            self.segment_gsm(text)?
        } else {
            self.segment_ucs2(text)?
        };

        debug!(
            chars = text.chars().count(),
            segments = message.len(),
            data_coding = ?message.data_coding,
            "Message segmented"
        );
        Ok(message)
    }

    fn segment_gsm(&self, text: &str) -> Result<SegmentedMessage, CodecError> {
        // Each chunk is whole characters, so an escape pair never straddles two parts
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut total = 0;
        for c in text.chars() {
            let (pair, n) = gsm::char_to_septets(c).ok_or(CodecError::UnencodableCharacter(c))?;
            total += n;
            push_unit(&mut chunks, &pair[..n], GSM7_CONCAT);
        }

        if total <= GSM7_SINGLE {
            let septets: Vec<u8> = chunks.concat();
            let segment = MessageSegment {
                payload: Bytes::from(gsm::pack_septets(&septets, 0)),
                data_coding: DataCoding::SmscDefault,
                header: None,
                units: septets.len(),
            };
            return Ok(single(segment));
        }

        // One fill bit after the 6-octet UDH puts the text on a septet boundary
        self.concatenate(chunks, DataCoding::SmscDefault, |septets| {
            gsm::pack_septets(septets, 1)
        })
    }

    fn segment_ucs2(&self, text: &str) -> Result<SegmentedMessage, CodecError> {
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut total = 0;
        let mut units = [0u16; 2];
        for c in text.chars() {
            // Surrogate pairs stay together in one part
            let encoded = c.encode_utf16(&mut units);
            let bytes: Vec<u8> = encoded.iter().flat_map(|u| u.to_be_bytes()).collect();
            total += encoded.len();
            push_unit(&mut chunks, &bytes, UCS2_CONCAT * 2);
        }

        if total <= UCS2_SINGLE {
            let bytes: Vec<u8> = chunks.concat();
            let segment = MessageSegment {
                units: bytes.len() / 2,
                payload: Bytes::from(bytes),
                data_coding: DataCoding::Ucs2,
                header: None,
            };
            return Ok(single(segment));
        }

        let mut message = self.concatenate(chunks, DataCoding::Ucs2, |bytes| bytes.to_vec())?;
        for segment in &mut message.segments {
            segment.units /= 2;
        }
        Ok(message)
    }

    fn concatenate(
        &self,
        chunks: Vec<Vec<u8>>,
        data_coding: DataCoding,
        encode: impl Fn(&[u8]) -> Vec<u8>,
    ) -> Result<SegmentedMessage, CodecError> {
        let total = u8::try_from(chunks.len()).map_err(|_| CodecError::MessageTooLong {
            segments: chunks.len(),
            max: MAX_SEGMENTS,
        })?;
        let reference = self.next_reference();

        let segments = chunks
            .iter()
            .zip(1..=total)
            .map(|(chunk, index)| {
                let header = ConcatHeader {
                    reference,
                    total,
                    index,
                };
                let encoded = encode(chunk);
                let mut payload = BytesMut::with_capacity(ConcatHeader::LEN + encoded.len());
                payload.put_slice(&header.to_bytes());
                payload.put_slice(&encoded);

                MessageSegment {
                    payload: payload.freeze(),
                    data_coding,
                    header: Some(header),
                    units: chunk.len(),
                }
            })
            .collect();

        Ok(SegmentedMessage {
            segments,
            data_coding,
            esm_class: EsmClass::default().with_udhi(),
        })
    }
}

/// Appends one character's encoding to the last chunk, opening a new chunk
/// when it would not fit in `budget`.
fn push_unit(chunks: &mut Vec<Vec<u8>>, unit: &[u8], budget: usize) {
    match chunks.last_mut() {
        Some(chunk) if chunk.len() + unit.len() <= budget => chunk.extend_from_slice(unit),
        _ => chunks.push(unit.to_vec()),
    }
}

fn single(segment: MessageSegment) -> SegmentedMessage {
    SegmentedMessage {
        data_coding: segment.data_coding,
        esm_class: EsmClass::default(),
        segments: vec![segment],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::with_initial_reference(42)
    }

    #[test]
    fn empty_text_is_one_empty_segment() {
        let message = segmenter().segment("", TargetEncoding::Auto).unwrap();
        assert_eq!(message.len(), 1);
        assert!(message.segments[0].payload.is_empty());
        assert_eq!(message.segments[0].header, None);
        assert_eq!(message.data_coding, DataCoding::SmscDefault);
    }

    #[test]
    fn exactly_160_gsm_chars_fit_one_segment() {
        let text = "a".repeat(160);
        let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();

        assert_eq!(message.len(), 1);
        let segment = &message.segments[0];
        assert_eq!(segment.header, None);
        assert_eq!(segment.units, 160);
        assert_eq!(segment.payload.len(), 140);
        assert!(!message.esm_class.has_udhi());
    }

    #[test]
    fn two_hundred_gsm_chars_split_153_47() {
        let text = "x".repeat(200);
        let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();

        assert_eq!(message.len(), 2);
        assert!(message.esm_class.has_udhi());
        assert_eq!(message.data_coding, DataCoding::SmscDefault);

        let units: Vec<usize> = message.iter().map(|s| s.units).collect();
        assert_eq!(units, [153, 47]);

        let headers: Vec<ConcatHeader> = message.iter().filter_map(|s| s.header).collect();
        assert_eq!(
            headers,
            [
                ConcatHeader { reference: 42, total: 2, index: 1 },
                ConcatHeader { reference: 42, total: 2, index: 2 },
            ]
        );

        // 6-octet UDH + 153 septets with one fill bit
        assert_eq!(message.segments[0].payload.len(), 140);
        assert_eq!(&message.segments[0].payload[..6], &[0x05, 0x00, 0x03, 42, 2, 1]);
        assert!(message.iter().all(|s| s.esm_class().has_udhi()));
    }

    #[test]
    fn concatenated_segment_count_is_ceiling() {
        for len in [161, 306, 307, 1000] {
            let text = "z".repeat(len);
            let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();
            assert_eq!(message.len(), len.div_ceil(GSM7_CONCAT), "length {len}");

            for (i, segment) in message.iter().enumerate() {
                let header = segment.header.unwrap();
                assert_eq!(usize::from(header.index), i + 1);
                assert_eq!(usize::from(header.total), message.len());
            }
        }
    }

    #[test]
    fn packed_text_survives_unpacking() {
        let text = format!("{}{}", "Hello world ".repeat(14), "tail");
        let message = segmenter().segment(&text, TargetEncoding::Gsm7).unwrap();

        let decoded: String = message
            .iter()
            .map(|s| {
                let septets = gsm::unpack_septets(&s.payload[ConcatHeader::LEN..], 1, s.units);
                gsm::decode_septets(&septets)
            })
            .collect();
        assert_eq!(decoded, text);
    }

    #[test]
    fn escape_pairs_are_not_split() {
        // 152 plain septets then a two-septet euro sign
        let text = format!("{}€{}", "a".repeat(152), "b".repeat(20));
        let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();

        assert_eq!(message.len(), 2);
        assert_eq!(message.segments[0].units, 152);
        assert_eq!(message.segments[1].units, 22);
    }

    #[test]
    fn non_gsm_text_uses_ucs2() {
        let text = "Привет";
        let message = segmenter().segment(text, TargetEncoding::Auto).unwrap();

        assert_eq!(message.len(), 1);
        assert_eq!(message.data_coding, DataCoding::Ucs2);
        assert_eq!(message.segments[0].units, 6);
        assert_eq!(&message.segments[0].payload[..2], &[0x04, 0x1F]);
    }

    #[test]
    fn ucs2_budgets() {
        let text = "ж".repeat(70);
        assert_eq!(segmenter().segment(&text, TargetEncoding::Auto).unwrap().len(), 1);

        let text = "ж".repeat(71);
        let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();
        let units: Vec<usize> = message.iter().map(|s| s.units).collect();
        assert_eq!(units, [67, 4]);
        assert_eq!(message.segments[0].payload.len(), 6 + 134);
    }

    #[test]
    fn surrogate_pairs_are_not_split() {
        let text = format!("{}😀{}", "ж".repeat(66), "ж".repeat(10));
        let message = segmenter().segment(&text, TargetEncoding::Auto).unwrap();

        let units: Vec<usize> = message.iter().map(|s| s.units).collect();
        assert_eq!(units, [66, 12]);
    }

    #[test]
    fn forced_encodings() {
        assert!(matches!(
            segmenter().segment("日本", TargetEncoding::Gsm7),
            Err(CodecError::UnencodableCharacter('日'))
        ));

        let message = segmenter().segment("plain", TargetEncoding::Ucs2).unwrap();
        assert_eq!(message.data_coding, DataCoding::Ucs2);
        assert_eq!(message.segments[0].payload.len(), 10);
    }

    #[test]
    fn too_many_parts_is_rejected() {
        let text = "y".repeat(GSM7_CONCAT * MAX_SEGMENTS + 1);
        assert!(matches!(
            segmenter().segment(&text, TargetEncoding::Auto),
            Err(CodecError::MessageTooLong { segments: 256, max: 255 })
        ));
    }

    #[test]
    fn references_differ_between_messages() {
        let segmenter = segmenter();
        let text = "q".repeat(200);
        let a = segmenter.segment(&text, TargetEncoding::Auto).unwrap();
        let b = segmenter.segment(&text, TargetEncoding::Auto).unwrap();
        assert_ne!(
            a.segments[0].header.unwrap().reference,
            b.segments[0].header.unwrap().reference
        );
    }

    #[test]
    fn concat_header_parse() {
        let header = ConcatHeader { reference: 7, total: 3, index: 2 };
        assert_eq!(ConcatHeader::parse(&header.to_bytes()), Some(header));
        assert_eq!(ConcatHeader::parse(b"plain"), None);
    }
}
