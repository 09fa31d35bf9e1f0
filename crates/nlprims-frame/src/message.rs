use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::align::{align, HEADER_LEN};
use crate::msgtype;

/// Fixed message header.
///
/// Wire format (host byte order):
/// ```text
/// ┌────────────┬───────────┬───────────┬────────────┬─────────────┐
/// │ Length     │ Type      │ Flags     │ Sequence   │ Port ID     │
/// │ (4B)       │ (2B)      │ (2B)      │ (4B)       │ (4B)        │
/// └────────────┴───────────┴───────────┴────────────┴─────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Header + payload, in bytes, without trailing padding.
    pub len: u32,
    /// Message type. Values below [`msgtype::MIN_TYPE`] are control types.
    pub msg_type: u16,
    /// Flags bitmask, see [`crate::flags`].
    pub flags: u16,
    /// Sequence number used for reply correlation.
    pub seq: u32,
    /// Sender or recipient port id.
    pub port_id: u32,
}

impl MessageHeader {
    /// Decode a header from the first [`HEADER_LEN`] bytes of `src`.
    ///
    /// Returns `None` if `src` is too short.
    pub fn read(src: &[u8]) -> Option<Self> {
        let mut src = src.get(..HEADER_LEN)?;
        Some(Self {
            len: src.get_u32_ne(),
            msg_type: src.get_u16_ne(),
            flags: src.get_u16_ne(),
            seq: src.get_u32_ne(),
            port_id: src.get_u32_ne(),
        })
    }

    /// Encode the header into `dst`.
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_ne(self.len);
        dst.put_u16_ne(self.msg_type);
        dst.put_u16_ne(self.flags);
        dst.put_u32_ne(self.seq);
        dst.put_u32_ne(self.port_id);
    }
}

/// An unvalidated message position inside a receive buffer.
///
/// This is the low-level cursor behind [`Messages`]. Nothing is read past the
/// header until [`RawMessage::ok`] has accepted the position.
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> RawMessage<'a> {
    /// Position at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::at(buf, 0)
    }

    /// Position at `offset` bytes into `buf`.
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    /// Byte offset of this position within the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared length field, if the 4 bytes are inside the buffer.
    pub fn declared_len(&self) -> Option<u32> {
        let end = self.offset.checked_add(4)?;
        let mut src = self.buf.get(self.offset..end)?;
        Some(src.get_u32_ne())
    }

    /// Check that a complete message starts here.
    ///
    /// `remaining` is the caller's count of bytes left in the stream. It is
    /// signed because [`RawMessage::next`] drives it negative when the last
    /// message's padding runs past the end of the buffer.
    pub fn ok(&self, remaining: isize) -> bool {
        let Ok(remaining) = usize::try_from(remaining) else {
            return false;
        };
        if remaining < HEADER_LEN {
            return false;
        }
        let Some(len) = self.declared_len() else {
            return false;
        };
        let len = len as usize;
        len >= HEADER_LEN
            && len <= remaining
            && self
                .offset
                .checked_add(len)
                .is_some_and(|end| end <= self.buf.len())
    }

    /// Step over this message.
    ///
    /// Decrements `remaining` by the aligned declared length. Only meaningful
    /// after [`RawMessage::ok`] returned true; re-check `ok` on the result.
    pub fn next(&self, remaining: &mut isize) -> RawMessage<'a> {
        let step = align(self.declared_len().unwrap_or(0) as usize);
        *remaining = remaining.saturating_sub(isize::try_from(step).unwrap_or(isize::MAX));
        Self {
            buf: self.buf,
            offset: self.offset.saturating_add(step),
        }
    }

    /// Validated view of the message at this position.
    pub fn get(&self, remaining: isize) -> Option<Message<'a>> {
        if !self.ok(remaining) {
            return None;
        }
        let end = self.offset + self.declared_len()? as usize;
        Message::from_exact(self.buf.get(self.offset..end)?)
    }
}

/// A complete message whose declared length fits its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    header: MessageHeader,
    buf: &'a [u8],
}

impl<'a> Message<'a> {
    /// Parse the first message of `buf`.
    ///
    /// Returns `None` if `buf` does not start with a complete message.
    pub fn parse(buf: &'a [u8]) -> Option<Self> {
        RawMessage::new(buf).get(isize::try_from(buf.len()).unwrap_or(isize::MAX))
    }

    /// `buf` must be exactly the declared length.
    fn from_exact(buf: &'a [u8]) -> Option<Self> {
        let header = MessageHeader::read(buf)?;
        if header.len as usize != buf.len() {
            return None;
        }
        Some(Self { header, buf })
    }

    /// Decoded header.
    pub fn header(&self) -> MessageHeader {
        self.header
    }

    /// Declared length (header + payload, unpadded).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Payload length.
    pub fn payload_len(&self) -> usize {
        self.buf.len() - HEADER_LEN
    }

    pub fn msg_type(&self) -> u16 {
        self.header.msg_type
    }

    pub fn flags(&self) -> u16 {
        self.header.flags
    }

    pub fn seq(&self) -> u32 {
        self.header.seq
    }

    pub fn port_id(&self) -> u32 {
        self.header.port_id
    }

    /// Returns true for protocol control messages.
    pub fn is_control(&self) -> bool {
        msgtype::is_control(self.header.msg_type)
    }

    /// Everything after the header.
    pub fn payload(&self) -> &'a [u8] {
        self.buf.get(HEADER_LEN..).unwrap_or_default()
    }

    /// Payload after skipping an `offset`-byte extra header (aligned).
    ///
    /// Returns `None` if the extra header does not fit.
    pub fn payload_at_offset(&self, offset: usize) -> Option<&'a [u8]> {
        self.payload().get(align(offset)..)
    }

    /// Offset of the first byte after this message, relative to its start.
    pub fn payload_tail(&self) -> usize {
        align(self.buf.len())
    }

    /// Sequence check. Zero on either side matches anything.
    pub fn seq_ok(&self, expected: u32) -> bool {
        self.header.seq == 0 || expected == 0 || self.header.seq == expected
    }

    /// Port id check. Zero on either side matches anything.
    pub fn port_id_ok(&self, expected: u32) -> bool {
        self.header.port_id == 0 || expected == 0 || self.header.port_id == expected
    }

    /// Raw bytes of the message, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }
}

/// Iterator over the messages of one receive buffer.
///
/// Stops at the first position that does not hold a complete message.
/// [`Messages::remaining`] tells a caller whether bytes were left over.
#[derive(Debug, Clone)]
pub struct Messages<'a> {
    cursor: RawMessage<'a>,
    remaining: isize,
}

impl<'a> Messages<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: RawMessage::new(buf),
            remaining: isize::try_from(buf.len()).unwrap_or(isize::MAX),
        }
    }

    /// Bytes not yet consumed. Zero after a well-formed, padded stream;
    /// negative when the final message was not padded.
    pub fn remaining(&self) -> isize {
        self.remaining
    }

    /// Offset of the next position to be examined.
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = Message<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(msg) = self.cursor.get(self.remaining) else {
            if self.remaining > 0 {
                trace!(
                    offset = self.cursor.offset(),
                    remaining = self.remaining,
                    "message stream ended before buffer end"
                );
            }
            return None;
        };
        self.cursor = self.cursor.next(&mut self.remaining);
        Some(msg)
    }
}
