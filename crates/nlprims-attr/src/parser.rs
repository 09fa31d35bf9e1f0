use nlprims_frame::{align, Flow, Message};
use tracing::debug;

use crate::attr::{Attr, RawAttr};
use crate::config::{ParseConfig, UnsupportedPolicy};
use crate::error::{AttrError, Result};
use crate::validator::{type_valid, validate_policy};

/// Iterator over a TLV stream.
///
/// Ends at the first position that does not hold a complete attribute. Use
/// [`Attrs::remaining`] to tell a clean end from a truncated one.
#[derive(Debug, Clone)]
pub struct Attrs<'a> {
    cursor: RawAttr<'a>,
    remaining: isize,
}

impl<'a> Attrs<'a> {
    /// Iterate a raw attribute stream.
    pub fn new(stream: &'a [u8]) -> Self {
        Self {
            cursor: RawAttr::new(stream),
            remaining: isize::try_from(stream.len()).unwrap_or(isize::MAX),
        }
    }

    /// Iterate the attributes of `msg`, after an `offset`-byte extra header.
    pub fn from_message(msg: &Message<'a>, offset: usize) -> Self {
        let payload = msg.payload();
        let start = align(offset);
        let remaining = isize::try_from(payload.len())
            .unwrap_or(isize::MAX)
            .saturating_sub(isize::try_from(start).unwrap_or(isize::MAX));
        Self {
            cursor: RawAttr::at(payload, start),
            remaining,
        }
    }

    /// Stream bytes not yet consumed.
    pub fn remaining(&self) -> isize {
        self.remaining
    }
}

impl<'a> Iterator for Attrs<'a> {
    type Item = Attr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let attr = self.cursor.get(self.remaining)?;
        self.cursor = self.cursor.next(&mut self.remaining);
        Some(attr)
    }
}

/// Call `cb` for each attribute of `msg` after an `offset`-byte extra header.
///
/// Returns the first non-[`Flow::Continue`] verdict, or `Continue` when the
/// stream runs out. A truncated stream is not reported here; iterate with
/// [`Attrs`] or use a [`Parser`] with `reject_trailing` for that.
pub fn parse<'a, F>(msg: &Message<'a>, offset: usize, cb: F) -> Flow
where
    F: FnMut(&Attr<'a>) -> Flow,
{
    walk(Attrs::from_message(msg, offset), cb)
}

/// Call `cb` for each attribute nested in `attr`.
pub fn parse_nested<'a, F>(attr: &Attr<'a>, cb: F) -> Flow
where
    F: FnMut(&Attr<'a>) -> Flow,
{
    walk(attr.nested(), cb)
}

/// Call `cb` for each attribute of a raw stream.
pub fn parse_stream<'a, F>(stream: &'a [u8], cb: F) -> Flow
where
    F: FnMut(&Attr<'a>) -> Flow,
{
    walk(Attrs::new(stream), cb)
}

fn walk<'a, F>(attrs: Attrs<'a>, mut cb: F) -> Flow
where
    F: FnMut(&Attr<'a>) -> Flow,
{
    for attr in attrs {
        let verdict = cb(&attr);
        if !verdict.is_continue() {
            return verdict;
        }
    }
    Flow::Continue
}

/// Attribute parser with a caller-chosen policy for unknown types, per-type
/// validation and trailing bytes.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParseConfig,
}

impl Parser {
    /// Parser with default config: every type accepted, nothing validated.
    pub fn new() -> Self {
        Self::with_config(ParseConfig::default())
    }

    pub fn with_config(config: ParseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// [`parse`] under this parser's config.
    pub fn parse<'a, F>(&self, msg: &Message<'a>, offset: usize, cb: F) -> Result<Flow>
    where
        F: FnMut(&Attr<'a>) -> Flow,
    {
        self.walk(Attrs::from_message(msg, offset), cb)
    }

    /// [`parse_nested`] under this parser's config.
    pub fn parse_nested<'a, F>(&self, attr: &Attr<'a>, cb: F) -> Result<Flow>
    where
        F: FnMut(&Attr<'a>) -> Flow,
    {
        self.walk(attr.nested(), cb)
    }

    fn walk<'a, F>(&self, mut attrs: Attrs<'a>, mut cb: F) -> Result<Flow>
    where
        F: FnMut(&Attr<'a>) -> Flow,
    {
        for attr in attrs.by_ref() {
            if let Some(max_type) = self.config.max_type {
                if let Err(err) = type_valid(&attr, max_type) {
                    match self.config.unsupported {
                        UnsupportedPolicy::Skip => {
                            debug!(
                                attr_type = attr.attr_type(),
                                max_type, "skipping unsupported attribute"
                            );
                            continue;
                        }
                        UnsupportedPolicy::Abort => return Err(err),
                    }
                }
            }

            validate_policy(&attr, &self.config.policy)?;

            let verdict = cb(&attr);
            if !verdict.is_continue() {
                return Ok(verdict);
            }
        }

        if self.config.reject_trailing && attrs.remaining() > 0 {
            return Err(AttrError::Truncated {
                remaining: attrs.remaining(),
            });
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use nlprims_frame::{MessageBuilder, HEADER_LEN};

    use super::*;
    use crate::validator::AttrDataType;
    use crate::writer::AttrWriter;

    fn build(fill: impl FnOnce(&mut MessageBuilder<'_>)) -> BytesMut {
        let mut buf = BytesMut::new();
        let mut msg = MessageBuilder::put_header(&mut buf);
        msg.set_type(0x10);
        fill(&mut msg);
        buf
    }

    #[test]
    fn visits_each_attribute_once() {
        let buf = build(|msg| {
            msg.put_u8(1, 1).unwrap();
            msg.put_str(2, "abc").unwrap();
            msg.put_u64(3, 3).unwrap();
        });
        let msg = Message::parse(&buf).unwrap();

        let mut types = Vec::new();
        let verdict = parse(&msg, 0, |attr| {
            types.push(attr.attr_type());
            Flow::Continue
        });
        assert_eq!(verdict, Flow::Continue);
        assert_eq!(types, vec![1, 2, 3]);

        let mut attrs = Attrs::from_message(&msg, 0);
        assert_eq!(attrs.by_ref().count(), 3);
        assert_eq!(attrs.remaining(), 0);
    }

    #[test]
    fn stop_and_error_short_circuit() {
        let buf = build(|msg| {
            for ty in 1..=4 {
                msg.put_u32(ty, ty as u32).unwrap();
            }
        });
        let msg = Message::parse(&buf).unwrap();

        let mut calls = 0;
        let verdict = parse(&msg, 0, |attr| {
            calls += 1;
            if attr.attr_type() == 2 {
                Flow::Stop
            } else {
                Flow::Continue
            }
        });
        assert_eq!(verdict, Flow::Stop);
        assert_eq!(calls, 2);

        calls = 0;
        let verdict = parse(&msg, 0, |_| {
            calls += 1;
            Flow::Error(22)
        });
        assert_eq!(verdict, Flow::Error(22));
        assert_eq!(calls, 1);
    }

    #[test]
    fn skips_extra_header() {
        let buf = build(|msg| {
            msg.put_extra_header(6).unwrap().copy_from_slice(b"ZZZZZZ");
            msg.put_u16(4, 0x1234).unwrap();
        });
        let msg = Message::parse(&buf).unwrap();

        let mut seen = Vec::new();
        parse(&msg, 6, |attr| {
            seen.push(attr.get_u16().unwrap());
            Flow::Continue
        });
        assert_eq!(seen, vec![0x1234]);
    }

    #[test]
    fn offset_past_payload_yields_nothing() {
        let buf = build(|msg| msg.put_u8(1, 1).unwrap());
        let msg = Message::parse(&buf).unwrap();
        let mut attrs = Attrs::from_message(&msg, 64);
        assert!(attrs.next().is_none());
        assert!(attrs.remaining() < 0);
    }

    #[test]
    fn truncated_trailing_attribute_ends_silently() {
        let mut buf = build(|msg| {
            msg.put_u32(1, 1).unwrap();
            msg.put_u32(2, 2).unwrap();
        });
        // Second attribute claims 4 more bytes than exist.
        let second = HEADER_LEN + 8;
        buf[second..second + 2].copy_from_slice(&12u16.to_ne_bytes());
        let msg = Message::parse(&buf).unwrap();

        let mut calls = 0;
        assert_eq!(
            parse(&msg, 0, |_| {
                calls += 1;
                Flow::Continue
            }),
            Flow::Continue
        );
        assert_eq!(calls, 1);

        let strict = Parser::with_config(ParseConfig {
            reject_trailing: true,
            ..ParseConfig::default()
        });
        assert!(matches!(
            strict.parse(&msg, 0, |_| Flow::Continue),
            Err(AttrError::Truncated { remaining: 8 })
        ));
    }

    #[test]
    fn unsupported_types_skip_or_abort() {
        let buf = build(|msg| {
            msg.put_u8(1, 1).unwrap();
            msg.put_u8(30, 2).unwrap();
            msg.put_u8(2, 3).unwrap();
        });
        let msg = Message::parse(&buf).unwrap();

        let skip = Parser::with_config(ParseConfig {
            max_type: Some(5),
            ..ParseConfig::default()
        });
        let mut seen = Vec::new();
        let verdict = skip
            .parse(&msg, 0, |attr| {
                seen.push(attr.attr_type());
                Flow::Continue
            })
            .unwrap();
        assert_eq!(verdict, Flow::Continue);
        assert_eq!(seen, vec![1, 2]);

        let abort = Parser::with_config(ParseConfig {
            max_type: Some(5),
            unsupported: UnsupportedPolicy::Abort,
            ..ParseConfig::default()
        });
        assert!(matches!(
            abort.parse(&msg, 0, |_| Flow::Continue),
            Err(AttrError::Unsupported { attr_type: 30, .. })
        ));
    }

    #[test]
    fn policy_validates_before_callback() {
        let buf = build(|msg| {
            msg.put_u16(1, 1).unwrap();
        });
        let msg = Message::parse(&buf).unwrap();

        let parser = Parser::with_config(ParseConfig {
            policy: vec![None, Some(AttrDataType::U32)],
            ..ParseConfig::default()
        });
        let mut called = false;
        let result = parser.parse(&msg, 0, |_| {
            called = true;
            Flow::Continue
        });
        assert!(matches!(result, Err(AttrError::TooShort { .. })));
        assert!(!called);
    }

    #[test]
    fn nested_parse() {
        let buf = build(|msg| {
            let nest = msg.nest_start(7).unwrap();
            msg.put_u32(1, 10).unwrap();
            msg.put_u32(2, 20).unwrap();
            msg.nest_end(nest).unwrap();
        });
        let msg = Message::parse(&buf).unwrap();
        let outer = Attrs::from_message(&msg, 0).next().unwrap();

        let mut values = Vec::new();
        let verdict = Parser::new()
            .parse_nested(&outer, |attr| {
                values.push(attr.get_u32().unwrap());
                Flow::Continue
            })
            .unwrap();
        assert_eq!(verdict, Flow::Continue);
        assert_eq!(values, vec![10, 20]);
    }
}
