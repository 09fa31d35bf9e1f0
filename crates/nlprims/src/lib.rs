//! Netlink-style message framing, TLV attributes and reply dispatch.
//!
//! nlprims builds and parses the message format used by Linux netlink and
//! similar kernel/user-space request/reply protocols: a fixed 16-byte header
//! per message, batched into 4-byte aligned buffers, with payloads made of
//! type-length-value attributes that can nest.
//!
//! # Crate Structure
//!
//! - [`frame`]: message headers, builders and buffer iteration
//! - [`attr`]: attribute encoding, parsing and validation
//! - [`dispatch`]: reply correlation and control-message handling (behind
//!   the default `dispatch` feature)
//!
//! Nothing here opens sockets. Callers own the transport and hand complete
//! receive buffers to the parsers.

/// Re-export frame types.
pub mod frame {
    pub use nlprims_frame::*;
}

/// Re-export attribute types.
pub mod attr {
    pub use nlprims_attr::*;
}

/// Re-export dispatch types (requires `dispatch` feature).
#[cfg(feature = "dispatch")]
pub mod dispatch {
    pub use nlprims_dispatch::*;
}
