/// Errors that can occur while building messages.
///
/// Reading never produces these: a malformed receive buffer simply ends
/// iteration early.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message would exceed the 32-bit length field.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An offset into the message under construction is out of range.
    #[error("offset {offset} out of range for message of {len} bytes")]
    OutOfRange { offset: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
