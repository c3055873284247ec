//! BCD frequency-domain detector: long-frame FFT narrowing in on the 100 Hz
//! subcarrier, using the same sliding-window accumulator as the marker
//! detector but with a hard duration timeout instead of a cooldown.

use crate::config::BcdFreqConfig;
use crate::constants::*;
use crate::dsp::{Fft, FrameAccumulator, SlidingWindowAccumulator, Window};
use crate::error::Result;
use crate::events::{BcdPulseEvent, BcdSource};
use crate::types::Millis;

#[derive(Debug, Clone, Copy)]
enum BcdFreqState {
    Idle,
    InPulse { start_ms: Millis, peak_accumulated_energy: f32 },
}

pub struct BcdFreqDetector {
    config: BcdFreqConfig,
    fft: Fft,
    frame: FrameAccumulator,
    sample_period_ms: Millis,
    window: SlidingWindowAccumulator,
    baseline: f32,
    state: BcdFreqState,
    elapsed_ms: Millis,
    rejected_count: u64,
}

impl BcdFreqDetector {
    pub fn new(config: BcdFreqConfig, sample_rate_hz: f32) -> Result<Self> {
        let fft = Fft::new(config.frame_size, sample_rate_hz, Window::Hann)?;
        Ok(Self {
            frame: FrameAccumulator::new(config.frame_size),
            sample_period_ms: 1000.0 / sample_rate_hz,
            window: SlidingWindowAccumulator::new(config.window_frames),
            baseline: NOISE_FLOOR_MIN,
            state: BcdFreqState::Idle,
            elapsed_ms: 0.0,
            rejected_count: 0,
            config,
            fft,
        })
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    pub fn process_sample(&mut self, i: f32, q: f32) -> Option<BcdPulseEvent> {
        self.elapsed_ms += self.sample_period_ms;
        if !self.frame.push(i, q) {
            return None;
        }
        let spectrum = self
            .fft
            .transform(&self.frame.i_block().to_vec(), &self.frame.q_block().to_vec())
            .ok()?;
        let frame_energy = self.fft.bucket_energy(&spectrum, BCD_FREQUENCY_HZ, BCD_BANDWIDTH_HZ);
        let accumulated = self.window.push(frame_energy);
        self.step(accumulated)
    }

    fn step(&mut self, accumulated: f32) -> Option<BcdPulseEvent> {
        match self.state {
            BcdFreqState::Idle => {
                self.baseline += self.config.noise_adapt_rate * (accumulated - self.baseline);
                self.baseline = self.baseline.clamp(NOISE_FLOOR_MIN, NOISE_FLOOR_MAX);

                let threshold = self.baseline * self.config.threshold_multiplier;
                if accumulated > threshold {
                    self.state = BcdFreqState::InPulse {
                        start_ms: self.elapsed_ms,
                        peak_accumulated_energy: accumulated,
                    };
                }
                None
            }
            BcdFreqState::InPulse {
                start_ms,
                mut peak_accumulated_energy,
            } => {
                peak_accumulated_energy = peak_accumulated_energy.max(accumulated);
                let duration_ms = self.elapsed_ms - start_ms;
                let threshold = self.baseline * self.config.threshold_multiplier;

                if duration_ms >= self.config.max_duration_ms {
                    self.baseline = accumulated.clamp(NOISE_FLOOR_MIN, NOISE_FLOOR_MAX);
                    self.rejected_count += 1;
                    self.state = BcdFreqState::Idle;
                    None
                } else if accumulated <= threshold {
                    let snr_db =
                        20.0 * (peak_accumulated_energy / (self.baseline + INTERPOLATION_EPSILON)).log10();
                    self.state = BcdFreqState::Idle;
                    Some(BcdPulseEvent {
                        source: BcdSource::Freq,
                        start_ms,
                        duration_ms,
                        peak_energy: peak_accumulated_energy,
                        baseline_or_noise_floor: self.baseline,
                        snr_db,
                    })
                } else {
                    self.state = BcdFreqState::InPulse {
                        start_ms,
                        peak_accumulated_energy,
                    };
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_500ms_pulse_produces_one_freq_bcd_event() {
        let sample_rate = 12_000.0;
        let mut detector = BcdFreqDetector::new(BcdFreqConfig::default(), sample_rate).unwrap();

        for _ in 0..(detector.config.frame_size * 20) {
            detector.process_sample(0.0, 0.0);
        }

        let pulse_samples = (0.5 * sample_rate) as usize;
        let total = pulse_samples + (sample_rate as usize) * 2;
        let mut events = Vec::new();
        for n in 0..total {
            let (i, q) = if n < pulse_samples {
                let t = n as f32 / sample_rate;
                let theta = 2.0 * std::f32::consts::PI * BCD_FREQUENCY_HZ * t;
                (theta.cos(), theta.sin())
            } else {
                (0.0, 0.0)
            };
            if let Some(ev) = detector.process_sample(i, q) {
                events.push(ev);
            }
        }

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, BcdSource::Freq);
    }

    #[test]
    fn test_timeout_resets_baseline_and_counts_rejected() {
        let sample_rate = 12_000.0;
        let mut detector = BcdFreqDetector::new(BcdFreqConfig::default(), sample_rate).unwrap();

        for _ in 0..(detector.config.frame_size * 20) {
            detector.process_sample(0.0, 0.0);
        }

        let total = (sample_rate as usize) * 3; // well past BCD_FREQ_MAX_DURATION_MS
        for n in 0..total {
            let t = n as f32 / sample_rate;
            let theta = 2.0 * std::f32::consts::PI * BCD_FREQUENCY_HZ * t;
            detector.process_sample(theta.cos(), theta.sin());
        }

        assert!(detector.rejected_count() >= 1);
    }
}
