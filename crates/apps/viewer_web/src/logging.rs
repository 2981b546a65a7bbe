use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

type Sink = fn(&str);

fn console_log(line: &str) {
    web_sys::console::log_1(&JsValue::from_str(line));
}

fn console_warn(line: &str) {
    web_sys::console::warn_1(&JsValue::from_str(line));
}

fn console_error(line: &str) {
    web_sys::console::error_1(&JsValue::from_str(line));
}

/// Buffers one formatted event and hands it to the sink when flushed or
/// dropped.
pub struct LineWriter {
    buf: Vec<u8>,
    sink: Sink,
}

impl LineWriter {
    fn new(sink: Sink) -> Self {
        Self {
            buf: Vec::new(),
            sink,
        }
    }
}

impl io::Write for LineWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&self.buf);
        (self.sink)(line.trim_end());
        self.buf.clear();
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

/// Routes events to the console method matching their level.
#[derive(Clone, Copy)]
pub struct Console {
    log: Sink,
    warn: Sink,
    error: Sink,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            log: console_log,
            warn: console_warn,
            error: console_error,
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter::new(self.log)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let sink = match *meta.level() {
            Level::ERROR => self.error,
            Level::WARN => self.warn,
            _ => self.log,
        };
        LineWriter::new(sink)
    }
}

/// Installs a console subscriber unless the page already set one.
pub fn init(max_level: Level) {
    let installed = tracing_subscriber::fmt()
        .with_writer(Console::default())
        .with_max_level(max_level)
        .with_ansi(false)
        .without_time()
        .try_init();
    if installed.is_err() {
        tracing::debug!("keeping the existing tracing subscriber");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;

    use super::{Console, LineWriter};
    use pretty_assertions::assert_eq;
    use tracing_subscriber::fmt::MakeWriter;

    thread_local! {
        static LINES: RefCell<Vec<(&'static str, String)>> = const { RefCell::new(Vec::new()) };
    }

    fn record(kind: &'static str, line: &str) {
        LINES.with(|lines| lines.borrow_mut().push((kind, line.to_string())));
    }

    fn taken() -> Vec<(&'static str, String)> {
        LINES.with(|lines| std::mem::take(&mut *lines.borrow_mut()))
    }

    fn test_console() -> Console {
        Console {
            log: |line| record("log", line),
            warn: |line| record("warn", line),
            error: |line| record("error", line),
        }
    }

    #[test]
    fn writer_emits_one_line_per_event_on_drop() {
        let mut writer = LineWriter::new(|line| record("log", line));
        write!(writer, "DEBUG inspect::cluster: ").expect("write");
        writeln!(writer, "easing to cluster").expect("write");
        drop(writer);

        assert_eq!(
            taken(),
            vec![("log", "DEBUG inspect::cluster: easing to cluster".to_string())]
        );
    }

    #[test]
    fn empty_writer_emits_nothing() {
        drop(LineWriter::new(|line| record("log", line)));
        assert!(taken().is_empty());
    }

    #[test]
    fn events_route_by_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(test_console())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("lookup dropped");
            tracing::warn!("cursor unavailable");
            tracing::error!("mount failed");
            tracing::trace!("filtered out");
        });

        let kinds: Vec<&str> = taken().into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec!["log", "warn", "error"]);
    }

    #[test]
    fn plain_writer_uses_log() {
        let console = test_console();
        let mut writer = console.make_writer();
        writeln!(writer, "hello").expect("write");
        drop(writer);
        assert_eq!(taken(), vec![("log", "hello".to_string())]);
    }
}
