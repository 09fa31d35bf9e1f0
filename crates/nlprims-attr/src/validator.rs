use nlprims_frame::ATTR_HEADER_LEN;
use serde::{Deserialize, Serialize};

use crate::attr::Attr;
use crate::error::{AttrError, Result};

/// Semantic payload types an attribute can be validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrDataType {
    Unspec,
    U8,
    U16,
    U32,
    U64,
    String,
    Flag,
    Msecs,
    Nested,
    NestedCompat,
    NulString,
    Binary,
}

impl AttrDataType {
    /// Exact payload size implied by the type, or 0 when the type does not
    /// fix one.
    pub const fn expected_len(self) -> usize {
        match self {
            AttrDataType::U8 => 1,
            AttrDataType::U16 => 2,
            AttrDataType::U32 => 4,
            AttrDataType::U64 | AttrDataType::Msecs => 8,
            _ => 0,
        }
    }
}

/// Check `attr` against `data_type` before trusting its payload.
pub fn validate(attr: &Attr<'_>, data_type: AttrDataType) -> Result<()> {
    check_len(attr, data_type, data_type.expected_len())
}

/// Like [`validate`] with an explicit expected payload size, for types whose
/// size the type tag does not imply (e.g. a fixed-size binary struct).
pub fn validate_with_len(attr: &Attr<'_>, data_type: AttrDataType, expected: usize) -> Result<()> {
    check_len(attr, data_type, expected)
}

/// Reject type ids above `max_type`.
///
/// Callers usually skip such attributes rather than fail: newer peers add
/// types that older code does not know.
pub fn type_valid(attr: &Attr<'_>, max_type: u16) -> Result<()> {
    if attr.attr_type() > max_type {
        return Err(AttrError::Unsupported {
            attr_type: attr.attr_type(),
            max_type,
        });
    }
    Ok(())
}

/// Validate `attr` against the entry for its type id in `policy`.
///
/// Types with no entry (or beyond the table) pass unchecked.
pub fn validate_policy(attr: &Attr<'_>, policy: &[Option<AttrDataType>]) -> Result<()> {
    match policy.get(attr.attr_type() as usize) {
        Some(Some(data_type)) => validate(attr, *data_type),
        _ => Ok(()),
    }
}

fn check_len(attr: &Attr<'_>, data_type: AttrDataType, expected: usize) -> Result<()> {
    let attr_type = attr.attr_type();
    let len = attr.payload_len();
    let too_short = |expected| AttrError::TooShort {
        attr_type,
        len,
        expected,
    };

    if len < expected {
        return Err(too_short(expected));
    }

    match data_type {
        AttrDataType::Flag if len > 0 => {
            return Err(AttrError::TooLong {
                attr_type,
                len,
                max: 0,
            });
        }
        AttrDataType::String | AttrDataType::NulString if len == 0 => {
            return Err(too_short(1));
        }
        AttrDataType::NulString if attr.payload().last() != Some(&0) => {
            return Err(AttrError::Malformed {
                attr_type,
                reason: "missing NUL terminator",
            });
        }
        AttrDataType::Nested if len > 0 && len < ATTR_HEADER_LEN => {
            return Err(too_short(ATTR_HEADER_LEN));
        }
        _ => {}
    }

    if expected > 0 && len > expected {
        return Err(AttrError::TooLong {
            attr_type,
            len,
            max: expected,
        });
    }

    Ok(())
}
