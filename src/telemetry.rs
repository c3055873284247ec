//! Connectionless, best-effort broadcast of formatted status lines, keyed
//! by channel tag (`TICKS`, `MARKERS`, `SYNC`, `BCDS`, `CARR`, `T500`,
//! `T600`). The engine treats this as an opaque sink function taking
//! `(channel, formatted string)`; nothing downstream of the engine is
//! assumed to be listening, and a send failure is logged once and
//! otherwise ignored.

use log::warn;

pub const CHANNEL_TICKS: &str = "TICKS";
pub const CHANNEL_MARKERS: &str = "MARKERS";
pub const CHANNEL_SYNC: &str = "SYNC";
pub const CHANNEL_BCDS: &str = "BCDS";
pub const CHANNEL_CARR: &str = "CARR";
pub const CHANNEL_T500: &str = "T500";
pub const CHANNEL_T600: &str = "T600";

/// A sink for one formatted telemetry line on one channel. Implementors
/// decide how (or whether) to deliver it; the engine never blocks on
/// delivery and never retries a failed send.
pub trait TelemetrySink {
    fn send(&mut self, channel: &str, message: &str);
}

/// A sink that drops everything. Used when no telemetry consumer is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn send(&mut self, _channel: &str, _message: &str) {}
}

/// A sink that forwards every line to the `log` crate at `debug` level,
/// tagged with its channel. Useful when a capture is driven from a
/// terminal without a dedicated telemetry consumer attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn send(&mut self, channel: &str, message: &str) {
        log::debug!("[{channel}] {message}");
    }
}

/// A sink over a connectionless datagram socket, or any other type that
/// exposes a `send_to`-shaped `FnMut(&[u8]) -> std::io::Result<usize>`.
/// A single failed send is logged and otherwise swallowed; the engine
/// keeps running regardless of whether anything is listening.
pub struct DatagramTelemetrySink<F> {
    send_fn: F,
    warned: bool,
}

impl<F> DatagramTelemetrySink<F>
where
    F: FnMut(&[u8]) -> std::io::Result<usize>,
{
    pub fn new(send_fn: F) -> Self {
        Self {
            send_fn,
            warned: false,
        }
    }
}

impl<F> TelemetrySink for DatagramTelemetrySink<F>
where
    F: FnMut(&[u8]) -> std::io::Result<usize>,
{
    fn send(&mut self, channel: &str, message: &str) {
        let line = format!("{channel} {message}\n");
        if let Err(err) = (self.send_fn)(line.as_bytes()) {
            if !self.warned {
                warn!("telemetry datagram send failed, continuing without it: {err}");
                self.warned = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.send(CHANNEL_TICKS, "tick 1");
    }

    #[test]
    fn test_datagram_sink_formats_channel_and_message() {
        let captured = Rc::new(RefCell::new(Vec::new()));
        let captured_clone = captured.clone();
        let mut sink = DatagramTelemetrySink::new(move |bytes: &[u8]| {
            captured_clone.borrow_mut().push(bytes.to_vec());
            Ok(bytes.len())
        });
        sink.send(CHANNEL_SYNC, "locked second=12");
        let sent = captured.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            String::from_utf8(sent[0].clone()).unwrap(),
            "SYNC locked second=12\n"
        );
    }

    #[test]
    fn test_datagram_sink_failure_does_not_panic_and_warns_once() {
        let mut sink = DatagramTelemetrySink::new(|_: &[u8]| {
            Err(std::io::Error::other("no listener"))
        });
        sink.send(CHANNEL_BCDS, "one");
        sink.send(CHANNEL_BCDS, "two");
        assert!(sink.warned);
    }
}
