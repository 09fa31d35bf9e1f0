use std::io;

/// Errors that end a dispatch run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A message carried a port id other than the expected one.
    #[error("port id mismatch: expected {expected}, got {got}")]
    PortIdMismatch { expected: u32, got: u32 },

    /// A message carried a sequence number other than the expected one.
    #[error("sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: u32, got: u32 },

    /// An ERROR message too short to hold an error report.
    #[error("malformed error report: {len} payload bytes, need {need}")]
    Malformed { len: usize, need: usize },

    /// The peer answered with a nonzero error report.
    #[error("peer reported error {code}: {}", describe(*code))]
    Remote { code: u32 },

    /// A callback returned [`nlprims_frame::Flow::Error`].
    #[error("handler failed with error {code}")]
    Handler { code: u32 },

    /// Handlers can only be registered for control types.
    #[error("message type {0:#x} is not a control type")]
    NotControl(u16),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] nlprims_frame::FrameError),

    /// Attribute-level error.
    #[error("attribute error: {0}")]
    Attr(#[from] nlprims_attr::AttrError),
}

impl DispatchError {
    /// The positive system error code for this failure.
    pub fn code(&self) -> u32 {
        match self {
            DispatchError::PortIdMismatch { .. } | DispatchError::NotControl(_) => {
                libc::EINVAL.unsigned_abs()
            }
            DispatchError::SequenceMismatch { .. } => libc::EILSEQ.unsigned_abs(),
            DispatchError::Malformed { .. } => libc::EBADMSG.unsigned_abs(),
            DispatchError::Remote { code } | DispatchError::Handler { code } => *code,
            DispatchError::Frame(_) => libc::EMSGSIZE.unsigned_abs(),
            DispatchError::Attr(err) => err.errno(),
        }
    }
}

impl From<DispatchError> for io::Error {
    fn from(err: DispatchError) -> Self {
        match i32::try_from(err.code()) {
            Ok(raw) => io::Error::from_raw_os_error(raw),
            Err(_) => io::Error::other(err),
        }
    }
}

fn describe(code: u32) -> String {
    match i32::try_from(code) {
        Ok(raw) => io::Error::from_raw_os_error(raw).to_string(),
        Err(_) => "unknown error".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
