use nlprims_frame::FrameError;

/// Errors that can occur while encoding, validating or parsing attributes.
#[derive(Debug, thiserror::Error)]
pub enum AttrError {
    /// The payload is shorter than its type requires.
    #[error("attribute {attr_type} payload too short ({len} bytes, expected {expected})")]
    TooShort {
        attr_type: u16,
        len: usize,
        expected: usize,
    },

    /// The payload is longer than its type allows.
    #[error("attribute {attr_type} payload too long ({len} bytes, max {max})")]
    TooLong {
        attr_type: u16,
        len: usize,
        max: usize,
    },

    /// The payload has the right size but bad content.
    #[error("attribute {attr_type} malformed: {reason}")]
    Malformed {
        attr_type: u16,
        reason: &'static str,
    },

    /// The type id is above the highest type the caller understands.
    #[error("attribute type {attr_type} unsupported (max {max_type})")]
    Unsupported { attr_type: u16, max_type: u16 },

    /// The attribute does not fit the 16-bit length field.
    #[error("attribute {attr_type} too large ({size} bytes, max {max})")]
    TooLarge {
        attr_type: u16,
        size: usize,
        max: usize,
    },

    /// A string payload is not valid UTF-8.
    #[error("attribute {attr_type} payload is not valid UTF-8")]
    InvalidUtf8 { attr_type: u16 },

    /// Bytes were left over after the last complete attribute.
    #[error("attribute stream truncated ({remaining} bytes left over)")]
    Truncated { remaining: isize },

    /// The enclosing message could not grow.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl AttrError {
    /// System error code for handlers that report failures as [`nlprims_frame::Flow::Error`].
    pub fn errno(&self) -> u32 {
        let code = match self {
            AttrError::TooShort { .. } | AttrError::TooLong { .. } => libc::ERANGE,
            AttrError::Malformed { .. } | AttrError::InvalidUtf8 { .. } => libc::EINVAL,
            AttrError::Unsupported { .. } => libc::EOPNOTSUPP,
            AttrError::TooLarge { .. } | AttrError::Frame(_) => libc::EMSGSIZE,
            AttrError::Truncated { .. } => libc::EBADMSG,
        };
        code.unsigned_abs()
    }
}

pub type Result<T> = std::result::Result<T, AttrError>;
