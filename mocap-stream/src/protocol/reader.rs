//! Bounds-checked little-endian cursor over a packet payload

use crate::error::{Error, Result};

/// Longest 7-bit encoded length prefix (covers a full u32)
const MAX_VARINT_BYTES: usize = 5;

/// Zero-copy reader over a payload slice
///
/// Every read checks the remaining length first and reports
/// [`Error::Truncated`] instead of panicking.
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Current offset from the start of the payload
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consume `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian IEEE-754 f32
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read a non-negative little-endian i32 count
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| Error::NegativeCount(count))
    }

    /// Read a 7-bit variable-length unsigned integer
    ///
    /// Low 7 bits first; the high bit of each byte marks continuation.
    pub fn read_varint(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7F) as u32;
            // Fifth byte may only contribute the top 4 bits of a u32
            if i == MAX_VARINT_BYTES - 1 && bits > 0x0F {
                return Err(Error::InvalidString("length prefix overflows u32"));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::InvalidString("length prefix longer than 5 bytes"))
    }

    /// Read a string prefixed with its 7-bit encoded UTF-8 byte length
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidString("not valid UTF-8"))
    }
}
