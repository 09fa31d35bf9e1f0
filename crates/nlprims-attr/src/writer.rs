use bytes::BufMut;
use nlprims_frame::{FrameError, MessageBuilder, ATTR_HEADER_LEN};

use crate::attr::{NESTED, NET_BYTEORDER};
use crate::error::{AttrError, Result};

const MAX_ATTR_LEN: usize = u16::MAX as usize;

/// An attribute opened by [`AttrWriter::nest_start`] whose length is not yet set.
#[must_use = "a nest must be closed with nest_end or nest_cancel"]
#[derive(Debug)]
pub struct Nest {
    attr_type: u16,
    offset: usize,
}

impl Nest {
    /// Offset of the nest header, relative to the message start.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Appends attributes to the tail of a message under construction.
///
/// Each append grows the message's declared length by the aligned size of the
/// attribute. Capacity comes from the underlying buffer, so the only failure
/// is a length that does not fit its field.
pub trait AttrWriter {
    /// Append an attribute whose `len`-byte payload is written by `fill`.
    ///
    /// `fill` receives a zeroed slice of exactly `len` bytes.
    fn put_with<F>(&mut self, attr_type: u16, len: usize, fill: F) -> Result<()>
    where
        F: FnOnce(&mut [u8]);

    /// Open a nested attribute. Children appended until the matching
    /// [`AttrWriter::nest_end`] become its payload.
    fn nest_start(&mut self, attr_type: u16) -> Result<Nest>;

    /// Close a nest, setting its length to everything written since it opened.
    fn nest_end(&mut self, nest: Nest) -> Result<()>;

    /// Discard a nest and everything written since it opened.
    fn nest_cancel(&mut self, nest: Nest) -> Result<()>;

    fn put(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        self.put_with(attr_type, data.len(), |dst| dst.copy_from_slice(data))
    }

    fn put_u8(&mut self, attr_type: u16, value: u8) -> Result<()> {
        self.put(attr_type, &[value])
    }

    fn put_u16(&mut self, attr_type: u16, value: u16) -> Result<()> {
        self.put(attr_type, &value.to_ne_bytes())
    }

    fn put_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.put(attr_type, &value.to_ne_bytes())
    }

    fn put_u64(&mut self, attr_type: u16, value: u64) -> Result<()> {
        self.put(attr_type, &value.to_ne_bytes())
    }

    /// Big-endian value; sets the network-byte-order flag.
    fn put_be16(&mut self, attr_type: u16, value: u16) -> Result<()> {
        self.put(attr_type | NET_BYTEORDER, &value.to_be_bytes())
    }

    fn put_be32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.put(attr_type | NET_BYTEORDER, &value.to_be_bytes())
    }

    fn put_be64(&mut self, attr_type: u16, value: u64) -> Result<()> {
        self.put(attr_type | NET_BYTEORDER, &value.to_be_bytes())
    }

    /// Zero-length attribute whose presence is the value.
    fn put_flag(&mut self, attr_type: u16) -> Result<()> {
        self.put(attr_type, &[])
    }

    /// String without a terminator.
    fn put_str(&mut self, attr_type: u16, value: &str) -> Result<()> {
        self.put(attr_type, value.as_bytes())
    }

    /// String followed by a NUL terminator.
    fn put_strz(&mut self, attr_type: u16, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.put_with(attr_type, bytes.len() + 1, |dst| {
            dst[..bytes.len()].copy_from_slice(bytes);
            dst[bytes.len()] = 0;
        })
    }
}

impl AttrWriter for MessageBuilder<'_> {
    fn put_with<F>(&mut self, attr_type: u16, len: usize, fill: F) -> Result<()>
    where
        F: FnOnce(&mut [u8]),
    {
        let total = ATTR_HEADER_LEN.saturating_add(len);
        if total > MAX_ATTR_LEN {
            return Err(AttrError::TooLarge {
                attr_type,
                size: total,
                max: MAX_ATTR_LEN,
            });
        }

        let (mut header, payload) = self.extend(total)?.split_at_mut(ATTR_HEADER_LEN);
        header.put_u16_ne(total as u16);
        header.put_u16_ne(attr_type);
        fill(payload);
        Ok(())
    }

    fn nest_start(&mut self, attr_type: u16) -> Result<Nest> {
        let offset = self.payload_tail();
        // Length is patched by nest_end.
        let mut header = self.extend(ATTR_HEADER_LEN)?;
        header.put_u16_ne(0);
        header.put_u16_ne(attr_type | NESTED);
        Ok(Nest { attr_type, offset })
    }

    fn nest_end(&mut self, nest: Nest) -> Result<()> {
        let tail = self.payload_tail();
        let size = tail
            .checked_sub(nest.offset)
            .filter(|size| *size >= ATTR_HEADER_LEN)
            .ok_or(FrameError::OutOfRange {
                offset: nest.offset,
                len: tail,
            })?;
        if size > MAX_ATTR_LEN {
            return Err(AttrError::TooLarge {
                attr_type: nest.attr_type,
                size,
                max: MAX_ATTR_LEN,
            });
        }
        self.patch(nest.offset, &(size as u16).to_ne_bytes())?;
        Ok(())
    }

    fn nest_cancel(&mut self, nest: Nest) -> Result<()> {
        self.truncate(nest.offset)?;
        Ok(())
    }
}
