//! BCD time-domain detector: short-frame FFT on the data channel for
//! precise millisecond edge timing of the 100 Hz subcarrier pulses.

use crate::config::BcdTimeConfig;
use crate::constants::*;
use crate::dsp::{Fft, FrameAccumulator, Window};
use crate::error::Result;
use crate::events::{BcdPulseEvent, BcdSource};
use crate::types::Millis;

#[derive(Debug, Clone, Copy)]
enum BcdTimeState {
    Warmup { frames_seen: usize },
    Idle,
    InPulse {
        start_ms: Millis,
        peak_energy: f32,
        low_streak: usize,
    },
    Cooldown { until_ms: Millis },
}

pub struct BcdTimeDetector {
    config: BcdTimeConfig,
    fft: Fft,
    frame: FrameAccumulator,
    sample_period_ms: Millis,
    state: BcdTimeState,
    elapsed_ms: Millis,
    noise_floor: f32,
    threshold_high: f32,
    threshold_low: f32,
    rejected_count: u64,
}

impl BcdTimeDetector {
    pub fn new(config: BcdTimeConfig, sample_rate_hz: f32) -> Result<Self> {
        let fft = Fft::new(config.frame_size, sample_rate_hz, Window::Hann)?;
        Ok(Self {
            frame: FrameAccumulator::new(config.frame_size),
            sample_period_ms: 1000.0 / sample_rate_hz,
            state: BcdTimeState::Warmup { frames_seen: 0 },
            elapsed_ms: 0.0,
            noise_floor: NOISE_FLOOR_MIN,
            threshold_high: NOISE_FLOOR_MIN * config.threshold_multiplier,
            threshold_low: NOISE_FLOOR_MIN * config.threshold_multiplier * HYSTERESIS_RATIO,
            rejected_count: 0,
            config,
            fft,
        })
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
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
        let energy = self.fft.bucket_energy(&spectrum, BCD_FREQUENCY_HZ, BCD_BANDWIDTH_HZ);
        self.step(energy)
    }

    fn step(&mut self, energy: f32) -> Option<BcdPulseEvent> {
        match self.state {
            BcdTimeState::Warmup { mut frames_seen } => {
                self.noise_floor += WARMUP_SYMMETRIC_ADAPT_RATE * (energy - self.noise_floor);
                self.clamp_noise_floor();
                frames_seen += 1;
                self.state = if frames_seen >= TICK_WARMUP_FRAMES {
                    BcdTimeState::Idle
                } else {
                    BcdTimeState::Warmup { frames_seen }
                };
                None
            }
            BcdTimeState::Idle => {
                if energy < self.noise_floor {
                    self.noise_floor += TICK_ADAPT_DOWN * (energy - self.noise_floor);
                } else {
                    self.noise_floor += TICK_ADAPT_UP * (energy - self.noise_floor);
                }
                self.clamp_noise_floor();
                self.threshold_high = self.noise_floor * self.config.threshold_multiplier;
                self.threshold_low = self.threshold_high * HYSTERESIS_RATIO;

                if energy > self.threshold_high {
                    self.state = BcdTimeState::InPulse {
                        start_ms: self.elapsed_ms,
                        peak_energy: energy,
                        low_streak: 0,
                    };
                }
                None
            }
            BcdTimeState::InPulse {
                start_ms,
                mut peak_energy,
                mut low_streak,
            } => {
                peak_energy = peak_energy.max(energy);
                if energy < self.threshold_low {
                    low_streak += 1;
                } else {
                    low_streak = 0;
                }

                if low_streak >= self.config.min_low_frames {
                    let result = self.classify_and_emit(start_ms, peak_energy);
                    self.state = BcdTimeState::Cooldown {
                        until_ms: self.elapsed_ms + self.config.cooldown_ms,
                    };
                    result
                } else {
                    self.state = BcdTimeState::InPulse {
                        start_ms,
                        peak_energy,
                        low_streak,
                    };
                    None
                }
            }
            BcdTimeState::Cooldown { until_ms } => {
                if self.elapsed_ms >= until_ms {
                    self.state = BcdTimeState::Idle;
                }
                None
            }
        }
    }

    fn clamp_noise_floor(&mut self) {
        self.noise_floor = self.noise_floor.clamp(NOISE_FLOOR_MIN, NOISE_FLOOR_MAX);
    }

    fn classify_and_emit(&mut self, start_ms: Millis, peak_energy: f32) -> Option<BcdPulseEvent> {
        let duration_ms = self.elapsed_ms - start_ms;
        if duration_ms >= self.config.min_duration_ms && duration_ms <= self.config.max_duration_ms {
            let snr_db = 20.0 * (peak_energy / (self.noise_floor + INTERPOLATION_EPSILON)).log10();
            Some(BcdPulseEvent {
                source: BcdSource::Time,
                start_ms,
                duration_ms,
                peak_energy,
                baseline_or_noise_floor: self.noise_floor,
                snr_db,
            })
        } else {
            self.rejected_count += 1;
            None
        }
    }
}
