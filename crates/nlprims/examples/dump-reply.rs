//! Build a dump request, fake a two-part reply and walk it with a dispatcher.
//!
//! Run with (optional log level argument):
//!   cargo run --example dump-reply -- trace

use bytes::BytesMut;
use nlprims::attr::{AttrTable, AttrWriter};
use nlprims::dispatch::Dispatcher;
use nlprims::frame::{flags, msgtype, Flow, MessageBuilder};
use tracing::level_filters::LevelFilter;

const GET_ADDR: u16 = 0x16;
const NEW_ADDR: u16 = 0x14;
const ADDR_LABEL: u16 = 3;
const ADDR_MAX: u16 = 3;

fn init_logging(level: &str) {
    let level = level.parse().unwrap_or(LevelFilter::DEBUG);
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&std::env::args().nth(1).unwrap_or_default());

    let seq = 1;
    let mut request = BytesMut::new();
    MessageBuilder::put_header(&mut request)
        .set_type(GET_ADDR)
        .set_flags(flags::REQUEST | flags::DUMP)
        .set_seq(seq);
    eprintln!("request: {:02x?}", &request[..]);

    let mut reply = BytesMut::new();
    for label in ["lo", "eth0"] {
        let mut msg = MessageBuilder::put_header(&mut reply);
        msg.set_type(NEW_ADDR).set_flags(flags::MULTI).set_seq(seq);
        msg.put_strz(ADDR_LABEL, label)?;
    }
    MessageBuilder::put_header(&mut reply)
        .set_type(msgtype::DONE)
        .set_seq(seq);

    let done = Dispatcher::new(seq, 0).run(&reply, |msg| {
        let table = AttrTable::parse(msg, 0, ADDR_MAX);
        if let Some(label) = table.get(ADDR_LABEL).and_then(|a| a.get_str().ok()) {
            println!("{label}");
        }
        Flow::Continue
    })?;
    eprintln!("finished: {done:?}");
    Ok(())
}
