//! Reserved control message types.
//!
//! Types below [`MIN_TYPE`] are protocol-level signaling.
//! Types from [`MIN_TYPE`] upward carry subsystem data.

/// Nothing. Ignored by receivers.
pub const NOOP: u16 = 1;

/// Error report (or acknowledgement when the embedded code is 0).
pub const ERROR: u16 = 2;

/// End of a multi-part reply.
pub const DONE: u16 = 3;

/// Data was lost.
pub const OVERRUN: u16 = 4;

/// First data message type.
pub const MIN_TYPE: u16 = 0x10;

/// Returns a human-readable name for a message type.
pub fn type_name(msg_type: u16) -> &'static str {
    match msg_type {
        NOOP => "NOOP",
        ERROR => "ERROR",
        DONE => "DONE",
        OVERRUN => "OVERRUN",
        0 | 5..=0x0f => "RESERVED",
        _ => "DATA",
    }
}

/// Returns true if the type is in the control range.
pub fn is_control(msg_type: u16) -> bool {
    msg_type < MIN_TYPE
}
