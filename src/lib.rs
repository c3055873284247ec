//! Streaming WWV/WWVH time-signal detection engine.
//!
//! Consumes a complex-baseband (I/Q) sample stream on two independent
//! feeds (detector-rate and display-rate, see [`manager`]) and recovers
//! an authoritative, confidence-weighted wall-clock time from the tick,
//! minute-marker, and 100 Hz BCD subcarrier signals.

pub mod config;
pub mod constants;
pub mod correlators;
pub mod detectors;
pub mod dsp;
pub mod error;
pub mod events;
pub mod logsink;
pub mod manager;
pub mod signal_processing;
pub mod sync;
pub mod telemetry;
pub mod types;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use events::{BcdPulseEvent, FrameTime, MarkerEvent, SymbolEvent, TickEvent, ToneMeasurement};
pub use manager::{DetectorManager, EngineEvent};
pub use types::{Millis, Sample, Station};
