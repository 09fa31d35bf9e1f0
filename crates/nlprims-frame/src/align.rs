//! Alignment arithmetic shared by messages and attributes.

/// Alignment boundary for message and attribute starts.
pub const ALIGNTO: usize = 4;

/// Message header: len (4) + type (2) + flags (2) + seq (4) + port id (4).
pub const HEADER_LEN: usize = align(16);

/// Attribute header: len (2) + type (2).
pub const ATTR_HEADER_LEN: usize = align(4);

/// Round `len` up to the next multiple of [`ALIGNTO`].
///
/// Saturates instead of overflowing for lengths within 3 of `usize::MAX`.
pub const fn align(len: usize) -> usize {
    len.saturating_add(ALIGNTO - 1) & !(ALIGNTO - 1)
}

/// Size of a message carrying `payload_len` bytes of payload (unpadded).
pub const fn message_size(payload_len: usize) -> usize {
    payload_len + HEADER_LEN
}

/// Size of a message carrying `payload_len` bytes, padded to the boundary.
pub const fn message_aligned_size(payload_len: usize) -> usize {
    align(message_size(payload_len))
}
