//! SBE-style fixed-layout wire encode/decode, grounded on
//! `examples/original_source/shijim/sbe/decoder.py` and
//! `examples/original_source/shijim/sbe/schema.py`.
//!
//! All multi-byte integers are little-endian. The header is always the
//! first 8 bytes of a slot payload; everything after it is
//! template-specific fixed fields followed by zero or more repeating
//! groups, each introduced by a [`GroupHeader`].

use crate::error::RingError;
use rust_decimal::Decimal;

/// Null sentinel for [`Decimal64`] mantissa, matching the schema's
/// "absent" encoding.
pub const DECIMAL64_NULL: i64 = i64::MAX;

/// 8-byte message header: `{block_length, template_id, schema_id,
/// version}`, all `u16` little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbeHeader {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

impl SbeHeader {
    pub const ENCODED_LENGTH: usize = 8;

    /// Heartbeat slots carry `template_id == 0` (spec §4.6: "the reader
    /// skips slots whose template id marks them as a heartbeat filler").
    pub fn is_heartbeat(&self) -> bool {
        self.template_id == 0
    }
}

/// A 9-byte fixed-point composite: `mantissa: i64` scaled by `10^exponent`.
/// `mantissa == i64::MAX` encodes a null/absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal64 {
    pub mantissa: i64,
    pub exponent: i8,
}

impl Decimal64 {
    pub const ENCODED_LENGTH: usize = 9;
    pub const NULL: Decimal64 = Decimal64 { mantissa: DECIMAL64_NULL, exponent: 0 };

    pub fn is_null(&self) -> bool {
        self.mantissa == DECIMAL64_NULL
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.is_null() {
            return None;
        }
        let scale = (-(self.exponent as i32)).max(0) as u32;
        Some(Decimal::new(self.mantissa, scale))
    }

    pub fn from_decimal(value: Option<Decimal>) -> Decimal64 {
        match value {
            None => Decimal64::NULL,
            Some(d) => {
                let scale = d.scale();
                let mantissa = d.mantissa() as i64;
                Decimal64 { mantissa, exponent: -(scale as i8) }
            }
        }
    }
}

/// 4-byte repeating-group header: `{block_size: u16, num_in_group: u16}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHeader {
    pub block_size: u16,
    pub num_in_group: u16,
}

impl GroupHeader {
    pub const ENCODED_LENGTH: usize = 4;
}

/// Cursor-based reader over a slot payload (or any SBE-encoded buffer).
#[derive(Debug)]
pub struct SbeDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SbeDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], RingError> {
        if self.remaining() < n {
            return Err(RingError::BufferUnderflow {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_header(&mut self) -> Result<SbeHeader, RingError> {
        let bytes = self.take(SbeHeader::ENCODED_LENGTH)?;
        Ok(SbeHeader {
            block_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            template_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            schema_id: u16::from_le_bytes([bytes[4], bytes[5]]),
            version: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn read_group_header(&mut self) -> Result<GroupHeader, RingError> {
        let bytes = self.take(GroupHeader::ENCODED_LENGTH)?;
        Ok(GroupHeader {
            block_size: u16::from_le_bytes([bytes[0], bytes[1]]),
            num_in_group: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Carve out one repeated-group element: exactly `block_size` bytes,
    /// returned as its own [`SbeDecoder`]. A template-specific decode
    /// routine reading fields from the returned decoder can never read
    /// past its own element into the next one, even if it doesn't
    /// consume the element fully.
    pub fn group_sub_decoder(&mut self, block_size: u16) -> Result<SbeDecoder<'a>, RingError> {
        let bytes = self.take(block_size as usize)?;
        Ok(SbeDecoder::new(bytes))
    }

    /// Read a repeated group's header and every element's bounded
    /// sub-decoder in one call, per spec §4.6: "group iteration yields a
    /// sub-decoder restricted to the declared block size."
    pub fn read_group(&mut self) -> Result<(GroupHeader, Vec<SbeDecoder<'a>>), RingError> {
        let header = self.read_group_header()?;
        let mut elements = Vec::with_capacity(header.num_in_group as usize);
        for _ in 0..header.num_in_group {
            elements.push(self.group_sub_decoder(header.block_size)?);
        }
        Ok((header, elements))
    }

    pub fn read_decimal64(&mut self) -> Result<Decimal64, RingError> {
        let bytes = self.take(Decimal64::ENCODED_LENGTH)?;
        let mantissa = i64::from_le_bytes(bytes[0..8].try_into().expect("8 bytes"));
        let exponent = bytes[8] as i8;
        Ok(Decimal64 { mantissa, exponent })
    }

    pub fn read_i64(&mut self) -> Result<i64, RingError> {
        let bytes = self.take(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    pub fn read_u32(&mut self) -> Result<u32, RingError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    pub fn read_u16(&mut self) -> Result<u16, RingError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().expect("2 bytes")))
    }

    pub fn read_u8(&mut self) -> Result<u8, RingError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_fixed_str(&mut self, len: usize) -> Result<String, RingError> {
        let bytes = self.take(len)?;
        let trimmed = bytes.split(|&b| b == 0).next().unwrap_or(&[]);
        Ok(String::from_utf8_lossy(trimmed).into_owned())
    }
}

/// Append-only writer building an SBE-encoded buffer.
#[derive(Debug, Default)]
pub struct SbeEncoder {
    buf: Vec<u8>,
}

impl SbeEncoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_header(&mut self, header: SbeHeader) {
        self.buf.extend_from_slice(&header.block_length.to_le_bytes());
        self.buf.extend_from_slice(&header.template_id.to_le_bytes());
        self.buf.extend_from_slice(&header.schema_id.to_le_bytes());
        self.buf.extend_from_slice(&header.version.to_le_bytes());
    }

    pub fn write_group_header(&mut self, header: GroupHeader) {
        self.buf.extend_from_slice(&header.block_size.to_le_bytes());
        self.buf.extend_from_slice(&header.num_in_group.to_le_bytes());
    }

    pub fn write_decimal64(&mut self, value: Decimal64) {
        self.buf.extend_from_slice(&value.mantissa.to_le_bytes());
        self.buf.push(value.exponent as u8);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_fixed_str(&mut self, value: &str, len: usize) {
        let bytes = value.as_bytes();
        let n = bytes.len().min(len);
        self.buf.extend_from_slice(&bytes[..n]);
        self.buf.resize(self.buf.len() + (len - n), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn header_round_trips() {
        let header = SbeHeader { block_length: 40, template_id: 7, schema_id: 1, version: 2 };
        let mut enc = SbeEncoder::new();
        enc.write_header(header);
        let bytes = enc.into_bytes();
        let mut dec = SbeDecoder::new(&bytes);
        assert_eq!(dec.read_header().unwrap(), header);
    }

    #[test]
    fn decimal64_round_trips_non_null() {
        let value = Decimal64::from_decimal(Some(dec!(123.45)));
        let mut enc = SbeEncoder::new();
        enc.write_decimal64(value);
        let bytes = enc.into_bytes();
        let mut dec = SbeDecoder::new(&bytes);
        let decoded = dec.read_decimal64().unwrap();
        assert_eq!(decoded.to_decimal().unwrap(), dec!(123.45));
    }

    #[test]
    fn decimal64_null_sentinel_round_trips() {
        let value = Decimal64::from_decimal(None);
        assert!(value.is_null());
        let mut enc = SbeEncoder::new();
        enc.write_decimal64(value);
        let bytes = enc.into_bytes();
        let mut dec = SbeDecoder::new(&bytes);
        assert!(dec.read_decimal64().unwrap().to_decimal().is_none());
    }

    #[test]
    fn buffer_underflow_is_reported_not_panicked() {
        let bytes = [0u8; 3];
        let mut dec = SbeDecoder::new(&bytes);
        let err = dec.read_header().unwrap_err();
        assert!(matches!(err, RingError::BufferUnderflow { .. }));
    }

    #[test]
    fn template_id_zero_marks_heartbeat() {
        let header = SbeHeader { block_length: 0, template_id: 0, schema_id: 0, version: 0 };
        assert!(header.is_heartbeat());
    }

    #[test]
    fn fixed_str_strips_trailing_nul_padding() {
        let mut enc = SbeEncoder::new();
        enc.write_fixed_str("2330", 8);
        let bytes = enc.into_bytes();
        let mut dec = SbeDecoder::new(&bytes);
        assert_eq!(dec.read_fixed_str(8).unwrap(), "2330");
    }

    #[test]
    fn read_group_yields_one_sub_decoder_per_element() {
        // Two elements, each a single u32 price level, block_size=4.
        let mut enc = SbeEncoder::new();
        enc.write_group_header(GroupHeader { block_size: 4, num_in_group: 2 });
        enc.write_u32(101);
        enc.write_u32(102);
        let bytes = enc.into_bytes();

        let mut dec = SbeDecoder::new(&bytes);
        let (header, mut elements) = dec.read_group().unwrap();
        assert_eq!(header.num_in_group, 2);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].read_u32().unwrap(), 101);
        assert_eq!(elements[1].read_u32().unwrap(), 102);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn group_sub_decoder_is_bounded_to_block_size() {
        // block_size=4 but only 2 bytes actually consumed per element;
        // the sub-decoder must not see the next element's bytes.
        let mut enc = SbeEncoder::new();
        enc.write_u16(7);
        enc.write_u16(0); // padding within the 4-byte block
        enc.write_u16(8);
        enc.write_u16(0);
        let bytes = enc.into_bytes();

        let mut dec = SbeDecoder::new(&bytes);
        let mut first = dec.group_sub_decoder(4).unwrap();
        assert_eq!(first.read_u16().unwrap(), 7);
        assert_eq!(first.remaining(), 2);
        assert!(first.read_u32().is_err());

        let mut second = dec.group_sub_decoder(4).unwrap();
        assert_eq!(second.read_u16().unwrap(), 8);
    }
}
