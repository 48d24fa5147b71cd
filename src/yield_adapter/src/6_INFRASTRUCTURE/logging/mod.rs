//! Structured logging
//!
//! Core logic logs through `tracing`. On the canister a fmt subscriber is
//! installed whose writer hands each formatted line to `ic_cdk::api::print`,
//! so events show up in the replica log without timestamps or ANSI codes.

use std::io;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Buffers one formatted event and flushes it to `sink` on drop
pub struct LineWriter {
    buf: Vec<u8>,
    sink: fn(&str),
}

impl io::Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        (self.sink)(line.trim_end());
    }
}

#[derive(Clone, Copy)]
pub struct PrintWriter {
    sink: fn(&str),
}

impl PrintWriter {
    pub fn canister() -> Self {
        Self { sink: print_line }
    }
}

impl<'a> MakeWriter<'a> for PrintWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buf: Vec::new(),
            sink: self.sink,
        }
    }
}

fn print_line(line: &str) {
    ic_cdk::api::print(line);
}

/// Install the canister subscriber. Safe to call on every init/upgrade.
pub fn init_logging(max_level: Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(PrintWriter::canister())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(max_level)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        ic_cdk::println!("tracing subscriber already installed");
    }
}
