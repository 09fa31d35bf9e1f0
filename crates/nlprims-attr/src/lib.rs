//! TLV attributes carried in nlprims message payloads.
//!
//! Every attribute is a 4-byte header (length, type) followed by its payload,
//! with the next attribute starting on a 4-byte boundary. The two high bits of
//! the type field are flags (nested, network byte order); the low 14 bits are
//! the type id.
//!
//! - [`Attr`] / [`Attrs`] read attributes out of a received message
//! - [`AttrWriter`] appends attributes to a [`nlprims_frame::MessageBuilder`]
//! - [`validate`] checks a payload against an [`AttrDataType`]
//! - [`Parser`] walks a stream under a caller-chosen [`ParseConfig`]

pub mod attr;
pub mod config;
pub mod error;
pub mod parser;
pub mod table;
pub mod validator;
pub mod writer;

pub use attr::{Attr, RawAttr, NESTED, NET_BYTEORDER, TYPE_MASK};
pub use config::{ParseConfig, UnsupportedPolicy};
pub use error::{AttrError, Result};
pub use parser::{parse, parse_nested, parse_stream, Attrs, Parser};
pub use table::AttrTable;
pub use validator::{type_valid, validate, validate_policy, validate_with_len, AttrDataType};
pub use writer::{AttrWriter, Nest};
