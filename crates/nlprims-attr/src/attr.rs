use bytes::Buf;
use nlprims_frame::{align, ATTR_HEADER_LEN};

use crate::error::{AttrError, Result};
use crate::parser::Attrs;

/// Type flag: the payload is itself an attribute stream.
pub const NESTED: u16 = 1 << 15;

/// Type flag: the payload is in network byte order.
pub const NET_BYTEORDER: u16 = 1 << 14;

/// Mask selecting the type id from the raw type field.
pub const TYPE_MASK: u16 = !(NESTED | NET_BYTEORDER);

/// An unvalidated attribute position inside a stream.
#[derive(Debug, Clone, Copy)]
pub struct RawAttr<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> RawAttr<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::at(buf, 0)
    }

    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared length field, if the 2 bytes are inside the buffer.
    pub fn declared_len(&self) -> Option<u16> {
        let end = self.offset.checked_add(2)?;
        let mut field = self.buf.get(self.offset..end)?;
        Some(field.get_u16_ne())
    }

    /// Check that a complete attribute starts here.
    ///
    /// Same rule as [`nlprims_frame::RawMessage::ok`], applied to the
    /// attribute header.
    pub fn ok(&self, remaining: isize) -> bool {
        let Ok(remaining) = usize::try_from(remaining) else {
            return false;
        };
        if remaining < ATTR_HEADER_LEN {
            return false;
        }
        let Some(len) = self.declared_len() else {
            return false;
        };
        let len = len as usize;
        len >= ATTR_HEADER_LEN
            && len <= remaining
            && self
                .offset
                .checked_add(len)
                .is_some_and(|end| end <= self.buf.len())
    }

    /// Step over this attribute, decrementing `remaining` by its aligned length.
    pub fn next(&self, remaining: &mut isize) -> RawAttr<'a> {
        let step = align(self.declared_len().unwrap_or(0) as usize);
        // `step` is at most align(u16::MAX).
        *remaining = remaining.saturating_sub(step as isize);
        Self {
            buf: self.buf,
            offset: self.offset.saturating_add(step),
        }
    }

    /// Validated view of the attribute at this position.
    pub fn get(&self, remaining: isize) -> Option<Attr<'a>> {
        if !self.ok(remaining) {
            return None;
        }
        let end = self.offset + self.declared_len()? as usize;
        Attr::from_exact(self.buf.get(self.offset..end)?)
    }
}

/// A complete attribute: header plus `len - 4` bytes of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    raw_type: u16,
    buf: &'a [u8],
}

impl<'a> Attr<'a> {
    /// Parse the first attribute of `buf`.
    pub fn parse(buf: &'a [u8]) -> Option<Self> {
        RawAttr::new(buf).get(isize::try_from(buf.len()).unwrap_or(isize::MAX))
    }

    fn from_exact(buf: &'a [u8]) -> Option<Self> {
        let mut field = buf.get(2..ATTR_HEADER_LEN)?;
        Some(Self {
            raw_type: field.get_u16_ne(),
            buf,
        })
    }

    /// Type id with the flag bits masked off.
    pub fn attr_type(&self) -> u16 {
        self.raw_type & TYPE_MASK
    }

    /// Type field as stored, flags included.
    pub fn raw_type(&self) -> u16 {
        self.raw_type
    }

    pub fn is_nested(&self) -> bool {
        self.raw_type & NESTED != 0
    }

    pub fn is_net_byteorder(&self) -> bool {
        self.raw_type & NET_BYTEORDER != 0
    }

    /// Declared length, header included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn payload_len(&self) -> usize {
        self.buf.len() - ATTR_HEADER_LEN
    }

    pub fn payload(&self) -> &'a [u8] {
        self.buf.get(ATTR_HEADER_LEN..).unwrap_or_default()
    }

    /// Attributes nested in this attribute's payload.
    pub fn nested(&self) -> Attrs<'a> {
        Attrs::new(self.payload())
    }

    pub fn get_u8(&self) -> Result<u8> {
        self.fixed::<1>().map(|b| b[0])
    }

    pub fn get_u16(&self) -> Result<u16> {
        self.fixed().map(u16::from_ne_bytes)
    }

    pub fn get_u32(&self) -> Result<u32> {
        self.fixed().map(u32::from_ne_bytes)
    }

    /// Payloads are only 4-byte aligned, so the value is copied out rather
    /// than read in place.
    pub fn get_u64(&self) -> Result<u64> {
        self.fixed().map(u64::from_ne_bytes)
    }

    pub fn get_be16(&self) -> Result<u16> {
        self.fixed().map(u16::from_be_bytes)
    }

    pub fn get_be32(&self) -> Result<u32> {
        self.fixed().map(u32::from_be_bytes)
    }

    pub fn get_be64(&self) -> Result<u64> {
        self.fixed().map(u64::from_be_bytes)
    }

    /// Raw payload bytes.
    pub fn get_bytes(&self) -> &'a [u8] {
        self.payload()
    }

    /// Payload up to the first NUL (or the whole payload if there is none).
    pub fn get_str(&self) -> Result<&'a str> {
        let payload = self.payload();
        let end = payload
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(payload.len());
        std::str::from_utf8(&payload[..end]).map_err(|_| AttrError::InvalidUtf8 {
            attr_type: self.attr_type(),
        })
    }

    /// Raw attribute bytes, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        self.payload()
            .get(..N)
            .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
            .ok_or(AttrError::TooShort {
                attr_type: self.attr_type(),
                len: self.payload_len(),
                expected: N,
            })
    }
}
