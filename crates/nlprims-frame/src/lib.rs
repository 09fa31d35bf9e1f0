//! Netlink-style message framing.
//!
//! This is the lowest layer of nlprims. Every message starts with a fixed
//! 16-byte header:
//! - A 4-byte total length (header + payload, unpadded)
//! - A 2-byte message type
//! - A 2-byte flags bitmask
//! - A 4-byte sequence number
//! - A 4-byte port id (sender/recipient)
//!
//! All fields are host byte order. Messages inside one receive buffer start on
//! 4-byte boundaries. Reading never panics on malformed input: iteration just
//! stops at the first message that does not fit.

pub mod align;
pub mod builder;
pub mod error;
pub mod flags;
pub mod flow;
pub mod message;
pub mod msgtype;

pub use align::{align, message_aligned_size, message_size, ALIGNTO, ATTR_HEADER_LEN, HEADER_LEN};
pub use builder::MessageBuilder;
pub use error::{FrameError, Result};
pub use flow::Flow;
pub use message::{Message, MessageHeader, Messages, RawMessage};
pub use msgtype::{DONE, ERROR, MIN_TYPE, NOOP, OVERRUN};
