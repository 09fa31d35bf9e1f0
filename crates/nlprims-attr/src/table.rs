use nlprims_frame::Message;

use crate::attr::Attr;
use crate::parser::Attrs;

/// Attributes of one stream indexed by type id.
///
/// Built in a single pass; when a type repeats, the last occurrence wins.
/// Types above `max_type` are left out.
#[derive(Debug, Clone)]
pub struct AttrTable<'a> {
    slots: Vec<Option<Attr<'a>>>,
}

impl<'a> AttrTable<'a> {
    /// Index the attributes of `msg` after an `offset`-byte extra header.
    pub fn parse(msg: &Message<'a>, offset: usize, max_type: u16) -> Self {
        Self::from_attrs(Attrs::from_message(msg, offset), max_type)
    }

    /// Index the attributes nested in `attr`.
    pub fn parse_nested(attr: &Attr<'a>, max_type: u16) -> Self {
        Self::from_attrs(attr.nested(), max_type)
    }

    /// Index any attribute sequence.
    pub fn from_attrs(attrs: impl IntoIterator<Item = Attr<'a>>, max_type: u16) -> Self {
        let mut slots = vec![None; max_type as usize + 1];
        for attr in attrs {
            if let Some(slot) = slots.get_mut(attr.attr_type() as usize) {
                *slot = Some(attr);
            }
        }
        Self { slots }
    }

    /// Attribute of type `attr_type`, if present.
    pub fn get(&self, attr_type: u16) -> Option<Attr<'a>> {
        self.slots.get(attr_type as usize).copied().flatten()
    }

    pub fn contains(&self, attr_type: u16) -> bool {
        self.get(attr_type).is_some()
    }

    /// Highest type id the table can hold.
    pub fn max_type(&self) -> u16 {
        // The table always has max_type + 1 slots.
        (self.slots.len() - 1) as u16
    }

    /// Present attributes in type id order.
    pub fn iter(&self) -> impl Iterator<Item = Attr<'a>> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use nlprims_frame::MessageBuilder;

    use super::*;
    use crate::writer::AttrWriter;

    #[test]
    fn indexes_by_type_last_wins() {
        let mut buf = BytesMut::new();
        let mut msg = MessageBuilder::put_header(&mut buf);
        msg.set_type(0x10);
        msg.put_u32(3, 1).unwrap();
        msg.put_strz(1, "eth0").unwrap();
        msg.put_u32(3, 2).unwrap();
        msg.put_u8(9, 1).unwrap();

        let msg = Message::parse(&buf).unwrap();
        let table = AttrTable::parse(&msg, 0, 4);
        assert_eq!(table.max_type(), 4);
        assert_eq!(table.get(1).unwrap().get_str().unwrap(), "eth0");
        assert_eq!(table.get(3).unwrap().get_u32().unwrap(), 2);
        assert!(!table.contains(2));
        assert!(!table.contains(9));
        assert_eq!(
            table.iter().map(|a| a.attr_type()).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn nested_table() {
        let mut buf = BytesMut::new();
        let mut msg = MessageBuilder::put_header(&mut buf);
        let nest = msg.nest_start(1).unwrap();
        msg.put_u16(2, 0xabcd).unwrap();
        msg.nest_end(nest).unwrap();

        let msg = Message::parse(&buf).unwrap();
        let outer = AttrTable::parse(&msg, 0, 1);
        let inner = AttrTable::parse_nested(&outer.get(1).unwrap(), 2);
        assert_eq!(inner.get(2).unwrap().get_u16().unwrap(), 0xabcd);
    }
}
