//! Complex forward FFT with analysis windows, owned per detector instance.
//!
//! Each detector constructs its own [`Fft`]; no plan or scratch buffer is
//! shared between detectors (§5: "the FFT primitive is *not* shared").

use crate::error::{EngineError, Result};
use num_complex::Complex32;
use rustfft::FftPlanner;
use std::sync::Arc;

/// Analysis window applied to a block before transforming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Hann,
    BlackmanHarris4,
}

impl Window {
    fn coefficient(self, n: usize, size: usize) -> f32 {
        let two_pi = 2.0 * std::f32::consts::PI;
        let phase = two_pi * n as f32 / (size - 1) as f32;
        match self {
            Window::Hann => 0.5 - 0.5 * phase.cos(),
            Window::BlackmanHarris4 => {
                const A0: f32 = 0.35875;
                const A1: f32 = 0.48829;
                const A2: f32 = 0.14128;
                const A3: f32 = 0.01168;
                A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos() - A3 * (3.0 * phase).cos()
            }
        }
    }

    fn coefficients(self, size: usize) -> Vec<f32> {
        (0..size).map(|n| self.coefficient(n, size)).collect()
    }
}

/// A complex forward FFT of a fixed power-of-two size, with its window
/// coefficients precomputed at construction.
pub struct Fft {
    size: usize,
    plan: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    hz_per_bin: f32,
    scratch: Vec<Complex32>,
}

impl Fft {
    pub fn new(size: usize, sample_rate_hz: f32, window: Window) -> Result<Self> {
        if size == 0 || (size & (size - 1)) != 0 {
            return Err(EngineError::FftSizeNotPowerOfTwo(size));
        }
        let mut planner = FftPlanner::new();
        let plan = planner.plan_fft_forward(size);
        let scratch_len = plan.get_inplace_scratch_len();
        Ok(Self {
            size,
            plan,
            window: window.coefficients(size),
            hz_per_bin: sample_rate_hz / size as f32,
            scratch: vec![Complex32::ZERO; scratch_len],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn hz_per_bin(&self) -> f32 {
        self.hz_per_bin
    }

    /// Transform a windowed I/Q block of length `size`, returning the
    /// complex spectrum.
    pub fn transform(&mut self, i_block: &[f32], q_block: &[f32]) -> Result<Vec<Complex32>> {
        if i_block.len() != self.size || q_block.len() != self.size {
            return Err(EngineError::FftBlockLength {
                needed: self.size,
                available: i_block.len().min(q_block.len()),
            });
        }
        let mut buffer: Vec<Complex32> = (0..self.size)
            .map(|n| Complex32::new(i_block[n] * self.window[n], q_block[n] * self.window[n]))
            .collect();
        self.plan
            .process_with_scratch(&mut buffer, &mut self.scratch);
        Ok(buffer)
    }

    /// Magnitude spectrum: `sqrt(re^2 + im^2)` for each bin.
    pub fn magnitudes(spectrum: &[Complex32]) -> Vec<f32> {
        spectrum.iter().map(|c| c.norm()).collect()
    }

    /// Sum magnitudes over `±ceil(bandwidth_hz / hz_per_bin)` bins around
    /// `center_hz` and its mirrored negative-frequency bin, normalizing each
    /// magnitude by `size`.
    ///
    /// Bandwidth below one bin clamps to a single bin per side.
    pub fn bucket_energy(&self, spectrum: &[Complex32], center_hz: f32, bandwidth_hz: f32) -> f32 {
        let half_bins = ((bandwidth_hz / self.hz_per_bin).ceil() as i32).max(1);
        let center_bin = (center_hz / self.hz_per_bin).round() as i32;
        let n = self.size as i32;

        let mut energy = 0.0f32;
        for mirror in [center_bin, -center_bin] {
            for offset in -half_bins..=half_bins {
                let bin = (mirror + offset).rem_euclid(n);
                energy += spectrum[bin as usize].norm() / self.size as f32;
            }
        }
        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(Fft::new(300, 1000.0, Window::Hann).is_err());
    }

    #[test]
    fn test_rejects_wrong_length_block() {
        let mut fft = Fft::new(64, 1000.0, Window::Hann).unwrap();
        let short = vec![0.0; 32];
        assert!(fft.transform(&short, &short).is_err());
    }

    #[test]
    fn test_bucket_energy_finds_pure_tone() {
        let size = 256;
        let sample_rate = 8000.0;
        let tone_hz = 1000.0;
        let mut fft = Fft::new(size, sample_rate, Window::Hann).unwrap();

        let i_block: Vec<f32> = (0..size)
            .map(|n| (2.0 * PI * tone_hz * n as f32 / sample_rate).cos())
            .collect();
        let q_block: Vec<f32> = (0..size)
            .map(|n| (2.0 * PI * tone_hz * n as f32 / sample_rate).sin())
            .collect();

        let spectrum = fft.transform(&i_block, &q_block).unwrap();
        let on_tone = fft.bucket_energy(&spectrum, tone_hz, 50.0);
        let off_tone = fft.bucket_energy(&spectrum, tone_hz + 2000.0, 50.0);

        assert!(
            on_tone > off_tone * 10.0,
            "on-tone energy {on_tone} should dominate off-tone {off_tone}"
        );
    }

    #[test]
    fn test_hann_window_endpoints_near_zero() {
        let coeffs = Window::Hann.coefficients(64);
        assert!(coeffs[0] < 0.01);
        assert!(coeffs[63] < 0.01);
        assert!(coeffs[32] > 0.9);
    }

    #[test]
    fn test_blackman_harris_coefficients_sum_matches_definition() {
        let coeffs = Window::BlackmanHarris4.coefficients(8);
        // a0 - a1 + a2 - a3 at phase = pi (n = size/2 for even windows close to it)
        assert!(coeffs[0] < 0.01);
    }
}
