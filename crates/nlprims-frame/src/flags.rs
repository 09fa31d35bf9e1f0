//! Standard message header flag bits.

/// The message is a request.
pub const REQUEST: u16 = 0x01;

/// Part of a multi-part reply terminated by a `DONE` message.
pub const MULTI: u16 = 0x02;

/// Ask the peer for an acknowledgement (an error report with code 0).
pub const ACK: u16 = 0x04;

/// Echo this request back.
pub const ECHO: u16 = 0x08;

// Modifiers for GET requests.

/// Return the complete table instead of a single entry.
pub const ROOT: u16 = 0x100;

/// Return all entries matching the criteria in the payload.
pub const MATCH: u16 = 0x200;

/// Atomic GET.
pub const ATOMIC: u16 = 0x400;

/// Dump request: `ROOT | MATCH`.
pub const DUMP: u16 = ROOT | MATCH;

// Modifiers for NEW requests.

/// Override an existing entry.
pub const REPLACE: u16 = 0x100;

/// Do not touch the entry if it exists.
pub const EXCL: u16 = 0x200;

/// Create the entry if it does not exist.
pub const CREATE: u16 = 0x400;

/// Add to the end of a list.
pub const APPEND: u16 = 0x800;

// Flags carried by ERROR messages.

/// The echoed request was cut down to its header.
pub const CAPPED: u16 = 0x100;

/// Extended acknowledgement attributes follow the echoed request.
pub const ACK_TLVS: u16 = 0x200;
