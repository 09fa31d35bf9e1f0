use nlprims_attr::{AttrTable, AttrWriter};
use nlprims_frame::{flags, msgtype, Message, MessageBuilder, MessageHeader, HEADER_LEN};
use tracing::debug;

use crate::dispatcher::Step;
use crate::error::{DispatchError, Result};

/// Payload size of an ERROR message: a 4-byte error code followed by the
/// header of the request it answers.
pub const ERROR_REPORT_LEN: usize = 4 + HEADER_LEN;

/// Extended ack attribute: human-readable error message (NUL-terminated).
pub const EXT_ACK_MSG: u16 = 1;
/// Extended ack attribute: offset of the offending attribute in the request.
pub const EXT_ACK_OFFS: u16 = 2;

/// Decoded payload of an ERROR message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReport {
    /// Zero for an acknowledgement, otherwise an error code. Peers commonly
    /// send it negated.
    pub error: i32,
    /// Header of the request being answered.
    pub request: MessageHeader,
}

/// Extended acknowledgement details attached to an error report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtAck<'a> {
    pub message: Option<&'a str>,
    pub offset: Option<u32>,
}

impl ErrorReport {
    /// Decode the report carried by `msg`, or `None` if the payload is too
    /// short to hold one.
    pub fn parse(msg: &Message<'_>) -> Option<Self> {
        let payload = msg.payload().get(..ERROR_REPORT_LEN)?;
        let (code, request) = payload.split_at(4);
        Some(Self {
            error: i32::from_ne_bytes(code.try_into().ok()?),
            request: MessageHeader::read(request)?,
        })
    }

    /// The error as a positive system error code, whichever sign was sent.
    pub fn code(&self) -> u32 {
        self.error.unsigned_abs()
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Turn `msg` into an ERROR message answering `request` with `error`.
    pub fn put(
        msg: &mut MessageBuilder<'_>,
        error: i32,
        request: &MessageHeader,
    ) -> Result<()> {
        msg.set_type(msgtype::ERROR);
        let dst = msg.put_extra_header(ERROR_REPORT_LEN)?;
        let (code, mut tail) = dst.split_at_mut(4);
        code.copy_from_slice(&error.to_ne_bytes());
        request.encode(&mut tail);
        Ok(())
    }

    /// Append extended ack attributes to an error report built by
    /// [`ErrorReport::put`] and flag them with `ACK_TLVS`.
    ///
    /// Attributes go at the current tail, so an uncapped report must already
    /// hold the echoed request payload.
    pub fn put_ext_ack(msg: &mut MessageBuilder<'_>, ext: &ExtAck<'_>) -> Result<()> {
        if let Some(message) = ext.message {
            msg.put_strz(EXT_ACK_MSG, message)?;
        }
        if let Some(offset) = ext.offset {
            msg.put_u32(EXT_ACK_OFFS, offset)?;
        }
        let with_tlvs = msg.header().flags | flags::ACK_TLVS;
        msg.set_flags(with_tlvs);
        Ok(())
    }

    /// Extended ack attributes of `msg`, when its flags announce them.
    ///
    /// Unless the report is capped, the attributes follow the full echoed
    /// request rather than just its header.
    pub fn ext_ack<'a>(msg: &Message<'a>) -> Option<ExtAck<'a>> {
        if msg.flags() & flags::ACK_TLVS == 0 {
            return None;
        }
        let report = Self::parse(msg)?;
        let mut offset = ERROR_REPORT_LEN;
        if msg.flags() & flags::CAPPED == 0 {
            offset += (report.request.len as usize).saturating_sub(HEADER_LEN);
        }

        let table = AttrTable::parse(msg, offset, EXT_ACK_OFFS);
        Some(ExtAck {
            message: table.get(EXT_ACK_MSG).and_then(|a| a.get_str().ok()),
            offset: table.get(EXT_ACK_OFFS).and_then(|a| a.get_u32().ok()),
        })
    }
}

/// Built-in handling for control messages without a registered handler.
///
/// NOOP, OVERRUN and unknown control types are ignored. DONE ends the run.
/// ERROR ends it too: successfully for an acknowledgement, with the peer's
/// code otherwise.
pub(crate) fn default_handler(msg: &Message<'_>) -> Step {
    match msg.msg_type() {
        msgtype::ERROR => error_report(msg),
        msgtype::DONE => Step::Stop,
        _ => Step::Continue,
    }
}

fn error_report(msg: &Message<'_>) -> Step {
    let Some(report) = ErrorReport::parse(msg) else {
        return Step::Fail(DispatchError::Malformed {
            len: msg.payload_len(),
            need: ERROR_REPORT_LEN,
        });
    };
    if report.is_ack() {
        return Step::Stop;
    }

    if let Some(ext) = ErrorReport::ext_ack(msg) {
        debug!(
            code = report.code(),
            ext_message = ext.message,
            offset = ext.offset,
            "peer attached extended ack"
        );
    }
    Step::Fail(DispatchError::Remote {
        code: report.code(),
    })
}
