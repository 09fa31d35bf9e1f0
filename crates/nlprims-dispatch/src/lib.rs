//! Reply dispatch for nlprims.
//!
//! A [`Dispatcher`] walks one receive buffer of replies, rejects messages
//! that do not belong to the outstanding request and routes the rest: data
//! messages to the caller's callback, control messages to built-in or
//! caller-registered handlers. Error reports become typed errors carrying a
//! positive system error code.

pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;

pub use config::DispatchConfig;
pub use control::{ErrorReport, ExtAck, ERROR_REPORT_LEN, EXT_ACK_MSG, EXT_ACK_OFFS};
pub use dispatcher::{run, Completion, ControlHandler, Dispatcher};
pub use error::{DispatchError, Result};
