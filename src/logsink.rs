//! Per-detector append-only log sinks: one human-readable record per
//! emitted event, with a fixed field order documented alongside each
//! stream. A sink that fails I/O logs the failure once and goes silent;
//! detection never stops because a log sink misbehaved.

use crate::events::{BcdPulseEvent, MarkerEvent, SymbolEvent, TickEvent};
use chrono::{DateTime, Utc};
use log::error;
use std::fmt::Write as _;
use std::io::Write as _;

const LOG_FORMAT_VERSION: u32 = 1;

/// A single append-only record stream for one detector's events.
///
/// The version-tagged header line and fixed field order are the on-disk
/// contract for this stream; consumers should not need to track the
/// engine's internal event types.
pub struct LogSink<W: std::io::Write> {
    writer: W,
    stream_name: &'static str,
    failed: bool,
}

impl<W: std::io::Write> LogSink<W> {
    pub fn new(mut writer: W, stream_name: &'static str) -> Self {
        let header = format!("# wwv-sync log v{LOG_FORMAT_VERSION} stream={stream_name}\n");
        if writer.write_all(header.as_bytes()).is_err() {
            error!("log sink '{stream_name}' failed writing its header; disabling");
            return Self {
                writer,
                stream_name,
                failed: true,
            };
        }
        Self {
            writer,
            stream_name,
            failed: false,
        }
    }

    fn write_record(&mut self, numeric_ms: f32, fields: &str) {
        if self.failed {
            return;
        }
        let wall_clock: DateTime<Utc> = Utc::now();
        let mut line = String::new();
        let _ = write!(line, "{},{numeric_ms:.3},{fields}\n", wall_clock.to_rfc3339());
        if self.writer.write_all(line.as_bytes()).is_err() {
            error!("log sink '{}' I/O failure; disabling this sink", self.stream_name);
            self.failed = true;
        }
    }

    /// Record order: `timestamp_iso8601,timestamp_ms,tick_number,trailing_edge_ms,interval_since_prev_ms,duration_ms,peak_energy,noise_floor,correlation_peak,correlation_ratio`
    pub fn log_tick(&mut self, event: &TickEvent) {
        let interval = event
            .interval_since_prev_ms
            .map(|v| v.to_string())
            .unwrap_or_default();
        let fields = format!(
            "{},{:.3},{interval},{:.3},{:.6},{:.6},{:.6},{:.6}",
            event.tick_number,
            event.trailing_edge_ms,
            event.duration_ms,
            event.peak_energy,
            event.noise_floor,
            event.correlation_peak,
            event.correlation_ratio,
        );
        self.write_record(event.trailing_edge_ms, &fields);
    }

    /// Record order: `timestamp_iso8601,timestamp_ms,trailing_edge_ms,duration_ms,peak_accumulated_energy,baseline`
    pub fn log_marker(&mut self, event: &MarkerEvent) {
        let fields = format!(
            "{:.3},{:.3},{:.6},{:.6}",
            event.trailing_edge_ms, event.duration_ms, event.peak_accumulated_energy, event.baseline
        );
        self.write_record(event.trailing_edge_ms, &fields);
    }

    /// Record order: `timestamp_iso8601,timestamp_ms,source,start_ms,duration_ms,peak_energy,baseline_or_noise_floor,snr_db`
    pub fn log_bcd_pulse(&mut self, event: &BcdPulseEvent) {
        let fields = format!(
            "{:?},{:.3},{:.3},{:.6},{:.6},{:.2}",
            event.source,
            event.start_ms,
            event.duration_ms,
            event.peak_energy,
            event.baseline_or_noise_floor,
            event.snr_db,
        );
        self.write_record(event.start_ms, &fields);
    }

    /// Record order: `timestamp_iso8601,timestamp_ms,symbol,second,duration_ms,confidence,source`
    pub fn log_symbol(&mut self, event: &SymbolEvent) {
        let fields = format!(
            "{:?},{},{:.3},{:.2},{:?}",
            event.symbol, event.second, event.duration_ms, event.confidence, event.source
        );
        self.write_record(event.timestamp_ms, &fields);
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BcdSource, Symbol, SymbolSource};

    #[test]
    fn test_header_is_written_once_with_version_tag() {
        let mut buf = Vec::new();
        {
            let _sink = LogSink::new(&mut buf, "TICKS");
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# wwv-sync log v1 stream=TICKS\n"));
    }

    #[test]
    fn test_tick_record_is_appended_after_header() {
        let mut buf = Vec::new();
        let mut sink = LogSink::new(&mut buf, "TICKS");
        sink.log_tick(&TickEvent {
            tick_number: 1,
            trailing_edge_ms: 1000.0,
            interval_since_prev_ms: None,
            duration_ms: 5.0,
            peak_energy: 0.5,
            noise_floor: 0.01,
            correlation_peak: 2.0,
            correlation_ratio: 10.0,
        });
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().contains(",1,"));
    }

    #[test]
    fn test_symbol_record_contains_symbol_and_source() {
        let mut buf = Vec::new();
        let mut sink = LogSink::new(&mut buf, "BCDS");
        sink.log_symbol(&SymbolEvent {
            symbol: Symbol::One,
            second: 3,
            timestamp_ms: 3000.0,
            duration_ms: 500.0,
            confidence: 1.0,
            source: SymbolSource::Both,
        });
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("One"));
        assert!(text.contains("Both"));
    }

    #[test]
    fn test_failed_sink_stops_writing_without_panicking() {
        struct FailingWriter;
        impl std::io::Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut sink = LogSink::new(FailingWriter, "TICKS");
        assert!(sink.is_failed());
        sink.log_bcd_pulse(&BcdPulseEvent {
            source: BcdSource::Time,
            start_ms: 0.0,
            duration_ms: 200.0,
            peak_energy: 1.0,
            baseline_or_noise_floor: 0.01,
            snr_db: 20.0,
        });
        assert!(sink.is_failed());
    }
}
