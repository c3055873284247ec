//! Minute-marker detector: FFT energy at the tick frequency integrated over
//! a ~1 s sliding window, with a self-tracking baseline.

use crate::config::MarkerConfig;
use crate::constants::*;
use crate::dsp::{Fft, FrameAccumulator, SlidingWindowAccumulator, Window};
use crate::error::Result;
use crate::events::MarkerEvent;
use crate::types::{Millis, Station};

#[derive(Debug, Clone, Copy)]
enum MarkerState {
    Idle,
    InMarker { start_ms: Millis, peak_accumulated_energy: f32 },
    Cooldown { until_ms: Millis },
}

pub struct MarkerDetector {
    config: MarkerConfig,
    station: Station,
    fft: Fft,
    frame: FrameAccumulator,
    sample_period_ms: Millis,
    window: SlidingWindowAccumulator,
    baseline: f32,
    state: MarkerState,
    elapsed_ms: Millis,
    rejected_count: u64,
    /// Advisory copy of the tone tracker's subcarrier noise floor. Written
    /// by the detector manager, never read back by the tone tracker; this
    /// detector tolerates staleness and never blocks waiting for an update.
    subcarrier_noise_floor_advisory: f32,
    last_accumulated_energy: f32,
}

impl MarkerDetector {
    pub fn new(config: MarkerConfig, station: Station, sample_rate_hz: f32) -> Result<Self> {
        let fft = Fft::new(config.frame_size, sample_rate_hz, Window::Hann)?;
        Ok(Self {
            frame: FrameAccumulator::new(config.frame_size),
            sample_period_ms: 1000.0 / sample_rate_hz,
            window: SlidingWindowAccumulator::new(config.window_frames),
            baseline: NOISE_FLOOR_MIN,
            state: MarkerState::Idle,
            elapsed_ms: 0.0,
            rejected_count: 0,
            subcarrier_noise_floor_advisory: NOISE_FLOOR_MIN,
            last_accumulated_energy: 0.0,
            config,
            station,
            fft,
        })
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// Receive a fresh copy of the tone tracker's subcarrier noise floor.
    /// Advisory only: a stale or never-updated value just falls back to this
    /// detector's own self-tracked baseline.
    pub fn set_subcarrier_noise_floor_advisory(&mut self, value: f32) {
        self.subcarrier_noise_floor_advisory = value.clamp(NOISE_FLOOR_MIN, NOISE_FLOOR_MAX);
    }

    fn effective_baseline(&self) -> f32 {
        self.baseline.max(self.subcarrier_noise_floor_advisory)
    }

    /// Windowed spectral energy from the most recent processed frame, used
    /// by the marker correlator as its slow-path cross-check.
    pub fn last_accumulated_energy(&self) -> f32 {
        self.last_accumulated_energy
    }

    /// Threshold the slow path should compare `last_accumulated_energy`
    /// against.
    pub fn threshold(&self) -> f32 {
        self.effective_baseline() * self.config.threshold_multiplier
    }

    pub fn process_sample(&mut self, i: f32, q: f32) -> Option<MarkerEvent> {
        self.elapsed_ms += self.sample_period_ms;
        if !self.frame.push(i, q) {
            return None;
        }
        let spectrum = self
            .fft
            .transform(&self.frame.i_block().to_vec(), &self.frame.q_block().to_vec())
            .ok()?;
        let frame_energy = self.fft.bucket_energy(
            &spectrum,
            self.station.tick_frequency_hz(),
            MARKER_BANDWIDTH_HZ,
        );
        let accumulated = self.window.push(frame_energy);
        self.last_accumulated_energy = accumulated;
        self.step(accumulated)
    }

    fn step(&mut self, accumulated: f32) -> Option<MarkerEvent> {
        match self.state {
            MarkerState::Idle => {
                let adapt_rate = if self.elapsed_ms < self.config.min_startup_ms {
                    self.config.warmup_adapt_rate
                } else {
                    self.config.noise_adapt_rate
                };
                self.baseline += adapt_rate * (accumulated - self.baseline);
                self.baseline = self.baseline.clamp(NOISE_FLOOR_MIN, NOISE_FLOOR_MAX);

                let threshold = self.effective_baseline() * self.config.threshold_multiplier;
                if self.elapsed_ms >= self.config.min_startup_ms && accumulated > threshold {
                    self.state = MarkerState::InMarker {
                        start_ms: self.elapsed_ms,
                        peak_accumulated_energy: accumulated,
                    };
                }
                None
            }
            MarkerState::InMarker {
                start_ms,
                mut peak_accumulated_energy,
            } => {
                peak_accumulated_energy = peak_accumulated_energy.max(accumulated);
                let duration_ms = self.elapsed_ms - start_ms;
                let threshold = self.effective_baseline() * self.config.threshold_multiplier;
                let forced = duration_ms >= self.config.max_duration_ms;

                if forced || accumulated <= threshold {
                    let result = if duration_ms >= self.config.min_duration_ms
                        && duration_ms <= self.config.max_duration_ms
                    {
                        Some(MarkerEvent {
                            trailing_edge_ms: self.elapsed_ms,
                            duration_ms,
                            peak_accumulated_energy,
                            baseline: self.baseline,
                        })
                    } else {
                        self.rejected_count += 1;
                        None
                    };
                    self.state = MarkerState::Cooldown {
                        until_ms: self.elapsed_ms + self.config.cooldown_ms,
                    };
                    result
                } else {
                    self.state = MarkerState::InMarker {
                        start_ms,
                        peak_accumulated_energy,
                    };
                    None
                }
            }
            MarkerState::Cooldown { until_ms } => {
                if self.elapsed_ms >= until_ms {
                    self.state = MarkerState::Idle;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_detector(sample_rate: f32) -> MarkerDetector {
        let mut config = MarkerConfig::default();
        config.min_startup_ms = 0.0; // exercise detection without a long lead-in in unit tests
        MarkerDetector::new(config, Station::Wwv, sample_rate).unwrap()
    }

    #[test]
    fn test_silence_produces_no_marker_events() {
        let sample_rate = 50_000.0;
        let mut detector = make_detector(sample_rate);
        for _ in 0..(detector.config.frame_size * 400) {
            assert!(detector.process_sample(0.0, 0.0).is_none());
        }
    }

    #[test]
    fn test_800ms_pulse_produces_one_marker_event() {
        let sample_rate = 50_000.0;
        let mut detector = make_detector(sample_rate);

        // Long idle lead-in so the baseline settles near the noise floor.
        for _ in 0..(detector.config.frame_size * 300) {
            detector.process_sample(0.0, 0.0);
        }

        let pulse_samples = (0.8 * sample_rate) as usize;
        let total = pulse_samples + (sample_rate as usize);
        let mut events = Vec::new();
        for n in 0..total {
            let in_pulse = n < pulse_samples;
            let (i, q) = if in_pulse {
                let t = n as f32 / sample_rate;
                let theta = 2.0 * std::f32::consts::PI * TICK_FREQUENCY_HZ_WWV * t;
                (theta.cos(), theta.sin())
            } else {
                (0.0, 0.0)
            };
            if let Some(ev) = detector.process_sample(i, q) {
                events.push(ev);
            }
        }

        assert_eq!(events.len(), 1, "expected exactly one marker event");
        assert!((events[0].duration_ms - 800.0).abs() < 50.0);
    }
}
