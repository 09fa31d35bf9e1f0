use bytes::{BufMut, BytesMut};

use crate::align::{align, HEADER_LEN};
use crate::error::{FrameError, Result};
use crate::message::{Message, MessageHeader};

const MAX_MESSAGE_LEN: usize = u32::MAX as usize;

/// Builds one message at the tail of a caller-owned buffer.
///
/// The declared length field always equals the bytes written so far, and
/// every append is padded to the alignment boundary. Several builders used one
/// after another on the same buffer produce a batch of messages that
/// [`crate::Messages`] iterates in order.
#[derive(Debug)]
pub struct MessageBuilder<'a> {
    buf: &'a mut BytesMut,
    start: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start a new message with a zeroed header.
    ///
    /// The buffer is padded first if a previous message left it unaligned.
    pub fn put_header(buf: &'a mut BytesMut) -> Self {
        let start = align(buf.len());
        buf.resize(start, 0);
        buf.reserve(HEADER_LEN);
        MessageHeader {
            len: HEADER_LEN as u32,
            ..MessageHeader::default()
        }
        .encode(&mut *buf);
        Self { buf, start }
    }

    /// Set the message type.
    pub fn set_type(&mut self, msg_type: u16) -> &mut Self {
        self.write_field(4, &msg_type.to_ne_bytes());
        self
    }

    /// Set the flags bitmask.
    pub fn set_flags(&mut self, flags: u16) -> &mut Self {
        self.write_field(6, &flags.to_ne_bytes());
        self
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) -> &mut Self {
        self.write_field(8, &seq.to_ne_bytes());
        self
    }

    /// Set the port id.
    pub fn set_port_id(&mut self, port_id: u32) -> &mut Self {
        self.write_field(12, &port_id.to_ne_bytes());
        self
    }

    /// Current header.
    pub fn header(&self) -> MessageHeader {
        MessageHeader::read(self.as_bytes()).unwrap_or_default()
    }

    /// Declared length, always aligned while building.
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn payload_len(&self) -> usize {
        self.len() - HEADER_LEN
    }

    /// Offset, relative to the message start, where the next append lands.
    pub fn payload_tail(&self) -> usize {
        self.len()
    }

    /// Offset of this message inside the underlying buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Append a zeroed `size`-byte subsystem header after the current end.
    ///
    /// Must precede any attribute.
    pub fn put_extra_header(&mut self, size: usize) -> Result<&mut [u8]> {
        self.extend(size)
    }

    /// Append `len` zeroed bytes plus padding and grow the declared length.
    ///
    /// Returns the unpadded `len`-byte region for the caller to fill.
    pub fn extend(&mut self, len: usize) -> Result<&mut [u8]> {
        let padded = align(len);
        let new_len = self.len().saturating_add(padded);
        if new_len > MAX_MESSAGE_LEN {
            return Err(FrameError::MessageTooLarge {
                size: new_len,
                max: MAX_MESSAGE_LEN,
            });
        }

        let at = self.buf.len();
        self.buf.put_bytes(0, padded);
        self.set_len(new_len);
        Ok(&mut self.buf[at..at + len])
    }

    /// Overwrite bytes at `offset` (relative to the message start).
    pub fn patch(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let len = self.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= len)
            .ok_or(FrameError::OutOfRange { offset, len })?;
        self.as_mut_bytes()[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Drop everything after the first `len` bytes of the message.
    ///
    /// `len` must be aligned and cover at least the header.
    pub fn truncate(&mut self, len: usize) -> Result<()> {
        if len < HEADER_LEN || len > self.len() || len != align(len) {
            return Err(FrameError::OutOfRange {
                offset: len,
                len: self.len(),
            });
        }
        self.buf.truncate(self.start + len);
        self.set_len(len);
        Ok(())
    }

    /// Message bytes, ready for the transport.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf[self.start..]
    }

    /// Payload bytes written so far (extra header and attributes).
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.start + HEADER_LEN..]
    }

    /// Read-only view of the message built so far.
    pub fn as_message(&self) -> Option<Message<'_>> {
        Message::parse(self.as_bytes())
    }

    fn set_len(&mut self, len: usize) {
        // Callers bound `len` by MAX_MESSAGE_LEN.
        self.write_field(0, &(len as u32).to_ne_bytes());
    }

    fn write_field(&mut self, offset: usize, bytes: &[u8]) {
        let at = self.start + offset;
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }
}
