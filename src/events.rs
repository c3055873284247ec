//! Event types emitted by detectors, correlators, and the sync state machine.
//!
//! Every event carries its own timestamp in milliseconds; timestamps are
//! monotonic non-decreasing per emitting detector (§3 invariant).

use crate::types::Millis;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub tick_number: u64,
    pub trailing_edge_ms: Millis,
    pub interval_since_prev_ms: Option<Millis>,
    pub duration_ms: Millis,
    pub peak_energy: f32,
    pub noise_floor: f32,
    pub correlation_peak: f32,
    pub correlation_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickMarkerEvent {
    pub leading_edge_ms: Millis,
    pub duration_ms: Millis,
    pub correlation_ratio: f32,
    pub interval_since_prev_ms: Option<Millis>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerEvent {
    pub trailing_edge_ms: Millis,
    pub duration_ms: Millis,
    pub peak_accumulated_energy: f32,
    pub baseline: f32,
}

/// Which detector(s) contributed to a BCD symbol classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcdSource {
    Time,
    Freq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BcdPulseEvent {
    pub source: BcdSource,
    pub start_ms: Millis,
    pub duration_ms: Millis,
    pub peak_energy: f32,
    pub baseline_or_noise_floor: f32,
    pub snr_db: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMeasurement {
    pub measured_hz: f32,
    pub offset_hz: f32,
    pub offset_ppm: f32,
    pub snr_db: f32,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Zero,
    One,
    PMarker,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSource {
    Time,
    Freq,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolEvent {
    pub symbol: Symbol,
    pub second: u8,
    pub timestamp_ms: Millis,
    pub duration_ms: Millis,
    pub confidence: f32,
    pub source: SymbolSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Searching,
    Acquiring,
    Locked,
    Recovering,
}

bitflags::bitflags! {
    /// Which evidence sources contributed to the current `FrameTime`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EvidenceMask: u8 {
        const TICK              = 0b0000_0001;
        const MARKER             = 0b0000_0010;
        const P_MARKER           = 0b0000_0100;
        const TICK_HOLE          = 0b0000_1000;
        const HOLE_THEN_MARKER   = 0b0001_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub current_second: u8,
    pub second_start_ms: Millis,
    pub confidence: f32,
    pub evidence_mask: EvidenceMask,
    pub state: SyncState,
}

impl FrameTime {
    pub fn initial() -> Self {
        Self {
            current_second: 0,
            second_start_ms: 0.0,
            confidence: 0.0,
            evidence_mask: EvidenceMask::empty(),
            state: SyncState::Searching,
        }
    }
}

/// Source of an installed timing epoch, as passed to `install_epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochSource {
    TickChain,
    Marker,
}
