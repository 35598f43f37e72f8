//! Console logging
//!
//! Routes `tracing` output to the browser console, one console method per
//! level.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::LevelFilter;
use wasm_bindgen::JsValue;
use web_sys::console;

/// Install the console subscriber; later calls are ignored
pub fn init() {
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .with_writer(ConsoleWriter::default());

    let _ = tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(layer)
        .try_init();
}

#[derive(Clone, Copy, Debug, Default)]
struct ConsoleWriter {
    level: Option<Level>,
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        Self {
            level: Some(*meta.level()),
        }
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = JsValue::from_str(String::from_utf8_lossy(buf).trim_end());
        match self.level {
            Some(Level::ERROR) => console::error_1(&line),
            Some(Level::WARN) => console::warn_1(&line),
            Some(Level::INFO) => console::info_1(&line),
            _ => console::log_1(&line),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
