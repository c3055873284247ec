//! Frequency-domain tone tracker: dual-sideband peak search with parabolic
//! interpolation, used to track the 0/500/600 Hz reference tones.

use crate::config::ToneConfig;
use crate::constants::{INTERPOLATION_EPSILON, TONE_NOISE_EXCLUSION_MARGIN_BINS};
use crate::dsp::fft::{Fft, Window};
use crate::error::Result;
use crate::events::ToneMeasurement;

/// Parabolic (quadratic) interpolation of a spectral peak from three
/// neighboring bin magnitudes `(alpha, beta, gamma)`, where `beta` is the
/// bin with the largest magnitude. Returns the fractional bin offset from
/// `beta`'s index.
pub fn parabolic_interpolate(alpha: f32, beta: f32, gamma: f32) -> f32 {
    let denom = alpha - 2.0 * beta + gamma;
    if denom.abs() > INTERPOLATION_EPSILON {
        0.5 * (alpha - gamma) / denom
    } else {
        0.0
    }
}

fn find_peak_bin(magnitudes: &[f32], center_bin: i32, half_width: i32) -> i32 {
    let n = magnitudes.len() as i32;
    let mut best_bin = center_bin.rem_euclid(n);
    let mut best_mag = magnitudes[best_bin as usize];
    for offset in -half_width..=half_width {
        let bin = (center_bin + offset).rem_euclid(n);
        if magnitudes[bin as usize] > best_mag {
            best_mag = magnitudes[bin as usize];
            best_bin = bin;
        }
    }
    best_bin
}

fn refine_peak(magnitudes: &[f32], peak_bin: i32) -> (f32, f32) {
    let n = magnitudes.len() as i32;
    let left = magnitudes[(peak_bin - 1).rem_euclid(n) as usize];
    let center = magnitudes[peak_bin as usize];
    let right = magnitudes[(peak_bin + 1).rem_euclid(n) as usize];
    let offset = parabolic_interpolate(left, center, right);
    (peak_bin as f32 + offset, center)
}

/// Tracks a single reference tone (nominally 0, 500, or 600 Hz).
pub struct ToneTracker {
    fft: Fft,
    nominal_hz: f32,
    search_half_width: i32,
    min_snr_db: f32,
    last_noise_floor: f32,
}

impl ToneTracker {
    pub fn new(nominal_hz: f32, sample_rate_hz: f32, config: &ToneConfig) -> Result<Self> {
        Ok(Self {
            fft: Fft::new(config.frame_size, sample_rate_hz, Window::Hann)?,
            nominal_hz,
            search_half_width: config.search_half_width_bins,
            min_snr_db: config.min_snr_db,
            last_noise_floor: 0.0,
        })
    }

    /// Noise floor from the most recent `process_frame` call. Published as
    /// an advisory value to the marker detector by the detector manager;
    /// this tracker never reads it back.
    pub fn subcarrier_noise_floor(&self) -> f32 {
        self.last_noise_floor
    }

    /// Process one frame on the data channel, returning a tone measurement.
    pub fn process_frame(&mut self, i_block: &[f32], q_block: &[f32]) -> Result<ToneMeasurement> {
        let spectrum = self.fft.transform(i_block, q_block)?;
        let magnitudes = Fft::magnitudes(&spectrum);
        let hz_per_bin = self.fft.hz_per_bin();
        let n = magnitudes.len() as i32;

        let center_bin = (self.nominal_hz / hz_per_bin).round() as i32;
        let usb_peak_bin = find_peak_bin(&magnitudes, center_bin, self.search_half_width);
        let lsb_peak_bin = find_peak_bin(&magnitudes, -center_bin, self.search_half_width);

        let (usb_frac_bin, usb_mag) = refine_peak(&magnitudes, usb_peak_bin);
        let (lsb_frac_bin, lsb_mag) = refine_peak(&magnitudes, lsb_peak_bin);

        let usb_hz = usb_frac_bin * hz_per_bin;
        let lsb_hz = -(lsb_frac_bin * hz_per_bin);
        let measured_hz = 0.5 * (usb_hz + lsb_hz);

        let exclusion = self.search_half_width + TONE_NOISE_EXCLUSION_MARGIN_BINS;
        let mut noise_sum = 0.0f32;
        let mut noise_count = 0usize;
        for (center, _) in [(center_bin, ()), (-center_bin, ())] {
            for bin in 0..n {
                let rel = (bin - center.rem_euclid(n) + n) % n;
                let rel_signed = if rel > n / 2 { rel - n } else { rel };
                if rel_signed.abs() > exclusion {
                    noise_sum += magnitudes[bin as usize];
                    noise_count += 1;
                }
            }
        }
        let noise_floor = if noise_count > 0 {
            noise_sum / noise_count as f32
        } else {
            0.0
        };
        self.last_noise_floor = noise_floor;

        let peak_mag = usb_mag.max(lsb_mag);
        let snr_db = 20.0 * (peak_mag / (noise_floor + 1e-10)).log10();
        let valid = snr_db >= self.min_snr_db;

        let offset_hz = measured_hz - self.nominal_hz;
        let offset_ppm = if self.nominal_hz.abs() > INTERPOLATION_EPSILON {
            offset_hz / self.nominal_hz * 1.0e6
        } else {
            0.0
        };

        Ok(ToneMeasurement {
            measured_hz,
            offset_hz,
            offset_ppm,
            snr_db,
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_parabolic_interpolation_matches_worked_formula() {
        // alpha=9.91, beta=10.0, gamma=9.73: the left neighbor is larger
        // than the right, so the quadratic fit shifts the peak toward the
        // left bin (negative offset).
        let offset = parabolic_interpolate(9.91, 10.0, 9.73);
        assert!(
            (offset - (-0.25)).abs() < 0.01,
            "offset {offset} should be close to -0.25 per the stated formula"
        );
    }

    #[test]
    fn test_parabolic_interpolation_symmetric_peak_is_zero() {
        let offset = parabolic_interpolate(5.0, 10.0, 5.0);
        assert!(offset.abs() < 1e-6);
    }

    #[test]
    fn test_tone_500hz_sine_with_noise() {
        let sample_rate = 12_000.0;
        let config = ToneConfig {
            frame_size: 2048,
            ..ToneConfig::default()
        };
        let mut tracker = ToneTracker::new(500.0, sample_rate, &config).unwrap();

        // Deterministic pseudo-noise (no external RNG dependency in this
        // unit test): a fixed low-amplitude secondary tone well away from
        // both the signal and its exclusion zone.
        let i_block: Vec<f32> = (0..config.frame_size)
            .map(|n| {
                let t = n as f32 / sample_rate;
                0.5 * (2.0 * PI * 500.0 * t).cos() + 0.01 * (2.0 * PI * 3333.0 * t).sin()
            })
            .collect();
        let q_block: Vec<f32> = (0..config.frame_size)
            .map(|n| {
                let t = n as f32 / sample_rate;
                0.5 * (2.0 * PI * 500.0 * t).sin() + 0.01 * (2.0 * PI * 3333.0 * t).cos()
            })
            .collect();

        let measurement = tracker.process_frame(&i_block, &q_block).unwrap();
        assert!(measurement.valid, "snr_db = {}", measurement.snr_db);
        assert!((measurement.measured_hz - 500.0).abs() < 1.0);
        assert!(measurement.snr_db >= 20.0);
    }

    #[test]
    fn test_carrier_zero_hz_case() {
        let sample_rate = 12_000.0;
        let config = ToneConfig {
            frame_size: 2048,
            ..ToneConfig::default()
        };
        let mut tracker = ToneTracker::new(0.0, sample_rate, &config).unwrap();

        let i_block = vec![1.0f32; config.frame_size];
        let q_block = vec![0.0f32; config.frame_size];

        let measurement = tracker.process_frame(&i_block, &q_block).unwrap();
        assert!(measurement.measured_hz.abs() < 5.0);
        assert_eq!(measurement.offset_ppm, 0.0);
    }
}
