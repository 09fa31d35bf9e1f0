use std::collections::HashMap;
use std::fmt;

use nlprims_frame::{msgtype, Flow, Message, Messages};
use tracing::{debug, trace, warn};

use crate::config::DispatchConfig;
use crate::control;
use crate::error::{DispatchError, Result};

/// Caller-supplied handler for one control message type.
pub type ControlHandler<'h> = Box<dyn FnMut(&Message<'_>) -> Flow + 'h>;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A handler (or a DONE/ack) ended the reply; later messages were not
    /// visited.
    Stopped,
    /// Every complete message was visited; more replies may follow.
    Drained,
}

/// Outcome of handling one message.
pub(crate) enum Step {
    Continue,
    Stop,
    Fail(DispatchError),
}

impl From<Flow> for Step {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Continue => Step::Continue,
            Flow::Stop => Step::Stop,
            Flow::Error(0) => Step::Fail(DispatchError::Handler {
                code: libc::EINVAL.unsigned_abs(),
            }),
            Flow::Error(code) => Step::Fail(DispatchError::Handler { code }),
        }
    }
}

/// Walks a receive buffer of replies, checks their correlation and routes
/// each one to a data callback or a control handler.
///
/// Control types without a registered handler get the built-in handling:
/// DONE and acknowledgements end the run, error reports fail it, NOOP and
/// OVERRUN are ignored.
pub struct Dispatcher<'h> {
    config: DispatchConfig,
    controls: HashMap<u16, ControlHandler<'h>>,
}

impl<'h> Dispatcher<'h> {
    /// Expect replies to `seq` from `port_id`. Zero accepts any value.
    pub fn new(seq: u32, port_id: u32) -> Self {
        Self::with_config(DispatchConfig { seq, port_id })
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            config,
            controls: HashMap::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Replace the built-in handling of control type `msg_type`.
    pub fn on_control<F>(&mut self, msg_type: u16, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&Message<'_>) -> Flow + 'h,
    {
        if !msgtype::is_control(msg_type) {
            return Err(DispatchError::NotControl(msg_type));
        }
        self.controls.insert(msg_type, Box::new(handler));
        Ok(self)
    }

    /// Dispatch every message in `buf`, handing data messages to `data`.
    ///
    /// Messages are visited in order until one ends the run. A truncated
    /// trailing message ends iteration like the end of the buffer.
    pub fn run<F>(&mut self, buf: &[u8], mut data: F) -> Result<Completion>
    where
        F: FnMut(&Message<'_>) -> Flow,
    {
        let mut messages = Messages::new(buf);
        for msg in messages.by_ref() {
            trace!(
                msg_type = msg.msg_type(),
                kind = msgtype::type_name(msg.msg_type()),
                flags = msg.flags(),
                seq = msg.seq(),
                len = msg.len(),
                "dispatching message"
            );
            match self.step(&msg, &mut data) {
                Step::Continue => {}
                Step::Stop => {
                    debug!(msg_type = msg.msg_type(), seq = msg.seq(), "dispatch stopped");
                    return Ok(Completion::Stopped);
                }
                Step::Fail(err) => {
                    debug!(msg_type = msg.msg_type(), error = %err, "dispatch failed");
                    return Err(err);
                }
            }
        }

        debug!(remaining = messages.remaining(), "dispatch drained buffer");
        Ok(Completion::Drained)
    }

    /// Dispatch a reply that carries no data of interest, such as the
    /// acknowledgement of a change request. Data messages are ignored.
    pub fn run_ack(&mut self, buf: &[u8]) -> Result<Completion> {
        self.run(buf, |_| Flow::Continue)
    }

    fn step<F>(&mut self, msg: &Message<'_>, data: &mut F) -> Step
    where
        F: FnMut(&Message<'_>) -> Flow,
    {
        if !msg.port_id_ok(self.config.port_id) {
            warn!(
                expected = self.config.port_id,
                got = msg.port_id(),
                "reply from unexpected port"
            );
            return Step::Fail(DispatchError::PortIdMismatch {
                expected: self.config.port_id,
                got: msg.port_id(),
            });
        }
        if !msg.seq_ok(self.config.seq) {
            warn!(
                expected = self.config.seq,
                got = msg.seq(),
                "reply with unexpected sequence number"
            );
            return Step::Fail(DispatchError::SequenceMismatch {
                expected: self.config.seq,
                got: msg.seq(),
            });
        }

        if !msg.is_control() {
            return data(msg).into();
        }
        match self.controls.get_mut(&msg.msg_type()) {
            Some(handler) => handler(msg).into(),
            None => control::default_handler(msg),
        }
    }
}

impl fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<_> = self.controls.keys().copied().collect();
        overrides.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("overrides", &overrides)
            .finish()
    }
}

/// One-shot [`Dispatcher::run`] with the built-in control handling.
pub fn run<F>(buf: &[u8], seq: u32, port_id: u32, data: F) -> Result<Completion>
where
    F: FnMut(&Message<'_>) -> Flow,
{
    Dispatcher::new(seq, port_id).run(buf, data)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use nlprims_frame::{flags, MessageBuilder, MessageHeader};

    use super::*;
    use crate::control::ErrorReport;

    const SEQ: u32 = 100;
    const PORT: u32 = 4242;

    fn put(buf: &mut BytesMut, msg_type: u16, seq: u32, port_id: u32) {
        MessageBuilder::put_header(buf)
            .set_type(msg_type)
            .set_seq(seq)
            .set_port_id(port_id);
    }

    fn put_data(buf: &mut BytesMut, value: u32) {
        let mut msg = MessageBuilder::put_header(buf);
        msg.set_type(0x10).set_seq(SEQ).set_port_id(PORT);
        msg.put_extra_header(4)
            .unwrap()
            .copy_from_slice(&value.to_ne_bytes());
    }

    fn put_error(buf: &mut BytesMut, error: i32) {
        let request = MessageHeader {
            len: 16,
            msg_type: 0x10,
            flags: flags::REQUEST | flags::ACK,
            seq: SEQ,
            port_id: 0,
        };
        let mut msg = MessageBuilder::put_header(buf);
        msg.set_seq(SEQ).set_port_id(PORT);
        ErrorReport::put(&mut msg, error, &request).unwrap();
    }

    fn value(msg: &Message<'_>) -> u32 {
        u32::from_ne_bytes(msg.payload()[..4].try_into().unwrap())
    }

    #[test]
    fn data_then_done_stops() {
        let mut buf = BytesMut::new();
        put_data(&mut buf, 1);
        put_data(&mut buf, 2);
        put(&mut buf, msgtype::DONE, SEQ, PORT);
        put_data(&mut buf, 3);

        let mut seen = Vec::new();
        let done = run(&buf, SEQ, PORT, |msg| {
            seen.push(value(msg));
            Flow::Continue
        })
        .unwrap();
        assert_eq!(done, Completion::Stopped);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn ack_stops() {
        let mut buf = BytesMut::new();
        put_error(&mut buf, 0);
        assert_eq!(
            Dispatcher::new(SEQ, PORT).run_ack(&buf).unwrap(),
            Completion::Stopped
        );
    }

    #[test]
    fn error_report_fails_with_positive_code() {
        for error in [-libc::ENOENT, libc::ENOENT] {
            let mut buf = BytesMut::new();
            put_error(&mut buf, error);
            let err = Dispatcher::new(SEQ, PORT).run_ack(&buf).unwrap_err();
            assert!(matches!(err, DispatchError::Remote { code } if code == libc::ENOENT as u32));
            assert_eq!(err.code(), libc::ENOENT as u32);
        }
    }

    #[test]
    fn sequence_mismatch_fails_before_callback() {
        let mut buf = BytesMut::new();
        put(&mut buf, 0x10, SEQ + 1, PORT);

        let mut called = false;
        let err = run(&buf, SEQ, PORT, |_| {
            called = true;
            Flow::Continue
        })
        .unwrap_err();
        assert!(!called);
        assert!(matches!(
            err,
            DispatchError::SequenceMismatch {
                expected: SEQ,
                got
            } if got == SEQ + 1
        ));
        assert_eq!(err.code(), libc::EILSEQ as u32);
    }

    #[test]
    fn port_id_checked_before_sequence() {
        let mut buf = BytesMut::new();
        put(&mut buf, 0x10, SEQ + 1, PORT + 1);
        let err = run(&buf, SEQ, PORT, |_| Flow::Continue).unwrap_err();
        assert!(matches!(err, DispatchError::PortIdMismatch { .. }));
        assert_eq!(err.code(), libc::EINVAL as u32);
    }

    #[test]
    fn zero_expectations_accept_anything() {
        let mut buf = BytesMut::new();
        put(&mut buf, 0x10, 1, 2);
        put(&mut buf, 0x11, 3, 4);

        let mut calls = 0;
        let done = run(&buf, 0, 0, |_| {
            calls += 1;
            Flow::Continue
        })
        .unwrap();
        assert_eq!(done, Completion::Drained);
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_in_message_matches_any_expectation() {
        let mut buf = BytesMut::new();
        put(&mut buf, 0x10, 0, 0);
        assert_eq!(
            run(&buf, SEQ, PORT, |_| Flow::Continue).unwrap(),
            Completion::Drained
        );
    }

    #[test]
    fn empty_buffer_drains() {
        assert_eq!(
            run(&[], SEQ, PORT, |_| Flow::Continue).unwrap(),
            Completion::Drained
        );
    }

    #[test]
    fn truncated_tail_is_not_visited() {
        let mut buf = BytesMut::new();
        put_data(&mut buf, 1);
        put_data(&mut buf, 2);
        let cut = buf.len() - 4;

        let mut seen = Vec::new();
        let done = run(&buf[..cut], SEQ, PORT, |msg| {
            seen.push(value(msg));
            Flow::Continue
        })
        .unwrap();
        assert_eq!(done, Completion::Drained);
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn data_callback_stop_and_error() {
        let mut buf = BytesMut::new();
        put_data(&mut buf, 1);
        put_data(&mut buf, 2);

        let mut calls = 0;
        let done = run(&buf, SEQ, PORT, |_| {
            calls += 1;
            Flow::Stop
        })
        .unwrap();
        assert_eq!(done, Completion::Stopped);
        assert_eq!(calls, 1);

        let err = run(&buf, SEQ, PORT, |_| Flow::Error(libc::EIO as u32)).unwrap_err();
        assert!(matches!(err, DispatchError::Handler { code } if code == libc::EIO as u32));
    }

    #[test]
    fn zero_error_code_still_fails() {
        let mut buf = BytesMut::new();
        put_data(&mut buf, 1);

        let err = run(&buf, 0, 0, |_| Flow::Error(0)).unwrap_err();
        assert!(matches!(err, DispatchError::Handler { code } if code == libc::EINVAL as u32));
        let io: std::io::Error = err.into();
        assert_eq!(io.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn noop_and_overrun_are_ignored() {
        let mut buf = BytesMut::new();
        put(&mut buf, msgtype::NOOP, SEQ, PORT);
        put(&mut buf, msgtype::OVERRUN, SEQ, PORT);
        put_data(&mut buf, 9);

        let mut seen = Vec::new();
        let done = run(&buf, SEQ, PORT, |msg| {
            seen.push(value(msg));
            Flow::Continue
        })
        .unwrap();
        assert_eq!(done, Completion::Drained);
        assert_eq!(seen, vec![9]);
    }

    #[test]
    fn override_replaces_builtin_handling() {
        let mut buf = BytesMut::new();
        put_data(&mut buf, 1);
        put(&mut buf, msgtype::DONE, SEQ, PORT);
        put_data(&mut buf, 2);
        put(&mut buf, msgtype::NOOP, SEQ, PORT);

        let mut dones = 0;
        let mut noops = 0;
        let mut seen = Vec::new();
        {
            let mut dispatcher = Dispatcher::new(SEQ, PORT);
            dispatcher
                .on_control(msgtype::DONE, |_| {
                    dones += 1;
                    Flow::Continue
                })
                .unwrap()
                .on_control(msgtype::NOOP, |_| {
                    noops += 1;
                    Flow::Error(libc::ECANCELED as u32)
                })
                .unwrap();

            let err = dispatcher
                .run(&buf, |msg| {
                    seen.push(value(msg));
                    Flow::Continue
                })
                .unwrap_err();
            assert!(matches!(err, DispatchError::Handler { .. }));
        }
        assert_eq!(dones, 1);
        assert_eq!(noops, 1);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn unregistered_types_keep_builtin_handling() {
        let mut buf = BytesMut::new();
        put_error(&mut buf, -libc::EACCES);

        let mut dispatcher = Dispatcher::new(SEQ, PORT);
        dispatcher
            .on_control(msgtype::DONE, |_| Flow::Continue)
            .unwrap();
        assert!(matches!(
            dispatcher.run_ack(&buf),
            Err(DispatchError::Remote { code }) if code == libc::EACCES as u32
        ));
    }

    #[test]
    fn data_types_cannot_be_overridden() {
        let mut dispatcher = Dispatcher::new(0, 0);
        assert!(matches!(
            dispatcher.on_control(msgtype::MIN_TYPE, |_| Flow::Continue),
            Err(DispatchError::NotControl(0x10))
        ));
    }

    #[test]
    fn malformed_error_report() {
        let mut buf = BytesMut::new();
        let mut msg = MessageBuilder::put_header(&mut buf);
        msg.set_type(msgtype::ERROR).set_seq(SEQ).set_port_id(PORT);
        msg.put_extra_header(8).unwrap();

        let err = Dispatcher::new(SEQ, PORT).run_ack(&buf).unwrap_err();
        assert!(matches!(err, DispatchError::Malformed { len: 8, need: 20 }));
        assert_eq!(err.code(), libc::EBADMSG as u32);
    }

    #[test]
    fn debug_lists_overrides() {
        let mut dispatcher = Dispatcher::new(1, 2);
        dispatcher
            .on_control(msgtype::OVERRUN, |_| Flow::Continue)
            .unwrap()
            .on_control(msgtype::NOOP, |_| Flow::Continue)
            .unwrap();
        let text = format!("{dispatcher:?}");
        assert!(text.contains("overrides: [1, 4]"), "{text}");
    }
}
