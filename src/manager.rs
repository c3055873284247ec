//! Detector manager: owns every detector and correlator, routes events
//! between them, and enforces the detector-rate / display-rate feed
//! isolation (§3, §9): samples pushed on one feed never reach detectors
//! that live on the other.

use crate::config::EngineConfig;
use crate::correlators::{BcdWindower, MarkerCorrelator, TickCorrelator};
use crate::detectors::{BcdFreqDetector, BcdTimeDetector, MarkerDetector, TickDetector, TickDetectorEvent};
use crate::dsp::{FrameAccumulator, ToneTracker};
use crate::error::Result;
use crate::events::{BcdPulseEvent, FrameTime, SymbolEvent, ToneMeasurement};
use crate::sync::{EvidenceKind, SyncDetector};
use crate::types::{Millis, Station};

/// Every event the manager can surface to a caller from one call to
/// [`DetectorManager::push_detector_sample`].
#[derive(Debug, Clone, Copy)]
pub enum EngineEvent {
    Symbol(SymbolEvent),
    FrameTime(FrameTime),
}

/// Owns the full detection pipeline and both sample feeds. Construct once
/// per capture session; samples pushed on the detector feed never reach the
/// tone tracker, and samples pushed on the display feed never reach the
/// tick/marker/BCD detectors.
pub struct DetectorManager {
    tick: TickDetector,
    marker: MarkerDetector,
    bcd_time: BcdTimeDetector,
    bcd_freq: BcdFreqDetector,
    tone: ToneTracker,
    display_frame: FrameAccumulator,

    tick_chain: TickCorrelator,
    marker_correlator: MarkerCorrelator,
    bcd_window: BcdWindower,

    sync: SyncDetector,
    station: Station,

    detector_elapsed_ms: Millis,
    sample_period_detector_ms: Millis,
    events: Vec<EngineEvent>,
}

impl DetectorManager {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let station = config.audio.station;
        let detector_rate = config.audio.sample_rate_detector_hz;
        let display_rate = config.audio.sample_rate_display_hz;

        Ok(Self {
            tick: TickDetector::new(config.tick, station, detector_rate)?,
            marker: MarkerDetector::new(config.marker, station, detector_rate)?,
            bcd_time: BcdTimeDetector::new(config.bcd_time, detector_rate)?,
            bcd_freq: BcdFreqDetector::new(config.bcd_freq, detector_rate)?,
            tone: ToneTracker::new(crate::constants::BCD_FREQUENCY_HZ, display_rate, &config.tone)?,
            display_frame: FrameAccumulator::new(config.tone.frame_size),

            tick_chain: TickCorrelator::new(),
            marker_correlator: MarkerCorrelator::new(),
            bcd_window: BcdWindower::new(),

            sync: SyncDetector::new(config.sync),
            station,

            detector_elapsed_ms: 0.0,
            sample_period_detector_ms: 1000.0 / detector_rate,
            events: Vec::new(),
        })
    }

    pub fn frame_time(&self) -> FrameTime {
        self.sync.frame_time()
    }

    pub fn station(&self) -> Station {
        self.station
    }

    /// Feed one complex sample on the ~50 kHz detector-rate feed. Drains and
    /// returns any events this sample caused. Callbacks must not re-enter
    /// the engine; callers collect the returned events and act afterward.
    pub fn push_detector_sample(&mut self, i: f32, q: f32) -> Vec<EngineEvent> {
        self.detector_elapsed_ms += self.sample_period_detector_ms;
        self.events.clear();

        if let Some(tick_event) = self.tick.process_sample(i, q) {
            self.handle_tick_event(tick_event);
        }
        if let Some(marker_event) = self.marker.process_sample(i, q) {
            self.marker_correlator.on_fast_marker(marker_event);
        }
        if let Some(confirmed) = self.marker_correlator.on_slow_energy(
            self.detector_elapsed_ms,
            self.marker.last_accumulated_energy(),
            self.marker.threshold(),
        ) {
            let second = self.frame_time().current_second;
            self.sync
                .observe(EvidenceKind::Marker, confirmed.trailing_edge_ms, confirmed.trailing_edge_ms);
            self.sync
                .install_epoch(second, confirmed.trailing_edge_ms - confirmed.duration_ms);
        }
        self.marker_correlator.expire(self.detector_elapsed_ms);

        if let Some(pulse) = self.bcd_time.process_sample(i, q) {
            self.handle_bcd_pulse(pulse);
        }
        if let Some(pulse) = self.bcd_freq.process_sample(i, q) {
            self.handle_bcd_pulse(pulse);
        }

        if let Some(symbol) = self
            .bcd_window
            .poll(self.detector_elapsed_ms, self.sync.minute_anchor_ms())
        {
            self.events.push(EngineEvent::Symbol(symbol));
        }

        self.sync.tick(self.detector_elapsed_ms);
        self.events.push(EngineEvent::FrameTime(self.frame_time()));
        std::mem::take(&mut self.events)
    }

    /// Feed one complex sample on the ~12 kHz display-rate feed. This feed
    /// only reaches the tone tracker; it never touches tick/marker/BCD
    /// detector state, and vice versa. Returns a fresh tone measurement once
    /// per completed frame, and publishes its subcarrier noise floor as an
    /// advisory to the marker detector.
    pub fn push_display_sample(&mut self, i: f32, q: f32) -> Result<Option<ToneMeasurement>> {
        if !self.display_frame.push(i, q) {
            return Ok(None);
        }
        let measurement = self
            .tone
            .process_frame(self.display_frame.i_block(), self.display_frame.q_block())?;
        self.marker
            .set_subcarrier_noise_floor_advisory(self.tone.subcarrier_noise_floor());
        Ok(Some(measurement))
    }

    fn handle_tick_event(&mut self, event: TickDetectorEvent) {
        match event {
            TickDetectorEvent::Tick(tick) => {
                self.sync
                    .observe(EvidenceKind::Tick, tick.trailing_edge_ms, tick.trailing_edge_ms);
                if let Some((epoch_ms, _source, _confidence)) =
                    self.tick_chain.on_tick(tick.trailing_edge_ms)
                {
                    self.tick.install_epoch(epoch_ms);
                }
            }
            TickDetectorEvent::Marker(marker) => {
                let kind = if self.sync.last_tick_was_hole() {
                    EvidenceKind::HoleThenMarker
                } else {
                    EvidenceKind::Marker
                };
                self.sync
                    .observe(kind, marker.leading_edge_ms, marker.leading_edge_ms);
            }
        }
    }

    fn handle_bcd_pulse(&mut self, pulse: BcdPulseEvent) {
        let anchor = self.sync.minute_anchor_ms();
        self.bcd_window.on_bcd_pulse(pulse, anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_constructs_with_default_config() {
        let manager = DetectorManager::new(EngineConfig::default()).unwrap();
        assert_eq!(manager.frame_time().current_second, 0);
    }

    #[test]
    fn test_silence_yields_no_symbol_events_before_a_window_closes() {
        let mut manager = DetectorManager::new(EngineConfig::default()).unwrap();
        for _ in 0..1000 {
            let events = manager.push_detector_sample(0.0, 0.0);
            assert!(!events.iter().any(|e| matches!(e, EngineEvent::Symbol(_))));
        }
    }
}
