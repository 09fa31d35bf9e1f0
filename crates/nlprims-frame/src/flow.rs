/// Verdict returned by message and attribute callbacks.
///
/// Iteration continues only on [`Flow::Continue`]. Once a callback returns
/// [`Flow::Stop`] or [`Flow::Error`] no further callback is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Stop successfully.
    Stop,
    /// Stop with a system error code. Zero is not an error code; the
    /// dispatcher reports it as `EINVAL`.
    Error(u32),
}

impl Flow {
    /// Returns true for [`Flow::Continue`].
    pub fn is_continue(self) -> bool {
        matches!(self, Flow::Continue)
    }
}
