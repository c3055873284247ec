//! Channel filter bank: sync-band bandpass and data-band lowpass cascades.
//!
//! Two independent two-biquad cascades process each of I and Q:
//! - sync band: 4th-order Butterworth bandpass, 800-1400 Hz
//! - data band: 4th-order Butterworth lowpass, 0-150 Hz
//!
//! Coefficients are either designed from cutoff/rate at construction (via
//! `iir_filters`' Butterworth design + SOS conversion, the default) or
//! supplied directly as a precomputed second-order-section table through
//! [`BiquadSection::new`] / [`BiquadCascade::from_sections`].

use crate::error::{EngineError, Result};
use crate::signal_processing::filter::Filter;
use iir_filters::filter::{DirectForm2Transposed, Filter as IirFilter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::zpk2sos;

/// A single second-order section in direct-form II transposed form:
/// `y = b0*x + b1*x1 + b2*x2 - a1*y1 - a2*y2`.
#[derive(Debug, Clone, Copy)]
pub struct BiquadSection {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadSection {
    /// Build a section from an explicit, precomputed coefficient table.
    /// `a0` is implicitly 1 (normalized form), matching the spec's
    /// `(b0, b1, b2, 1, a1, a2)` storage layout.
    pub fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Filter for BiquadSection {
    fn process(&mut self, sample: f32) -> f32 {
        let y = self.b0 * sample + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = sample;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// A cascade of [`BiquadSection`]s, processed in series.
pub struct BiquadCascade {
    sections: Vec<BiquadSection>,
}

impl BiquadCascade {
    pub fn from_sections(sections: Vec<BiquadSection>) -> Self {
        Self { sections }
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

impl Filter for BiquadCascade {
    fn process(&mut self, sample: f32) -> f32 {
        self.sections.iter_mut().fold(sample, |s, section| section.process(s))
    }
}

/// Butterworth bandpass cascade designed at construction time from cutoff
/// frequencies and sample rate, used for the sync band (800-1400 Hz).
pub struct DesignedBandpass {
    filter: DirectForm2Transposed,
}

impl DesignedBandpass {
    pub fn new(low_hz: f32, high_hz: f32, sample_rate_hz: f32, order: usize) -> Result<Self> {
        let zpk = butter(
            order as u32,
            FilterType::BandPass(low_hz as f64, high_hz as f64),
            sample_rate_hz as f64,
        )
        .map_err(|e| EngineError::FilterDesign(format!("{e:?}")))?;
        let sos =
            zpk2sos(&zpk, None).map_err(|e| EngineError::FilterDesign(format!("{e:?}")))?;
        Ok(Self {
            filter: DirectForm2Transposed::new(&sos),
        })
    }
}

impl Filter for DesignedBandpass {
    fn process(&mut self, sample: f32) -> f32 {
        self.filter.filter(sample as f64) as f32
    }
}

/// Butterworth lowpass cascade designed at construction time, used for the
/// data band (0-150 Hz).
pub struct DesignedLowpass {
    filter: DirectForm2Transposed,
}

impl DesignedLowpass {
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32, order: usize) -> Result<Self> {
        let zpk = butter(
            order as u32,
            FilterType::LowPass(cutoff_hz as f64),
            sample_rate_hz as f64,
        )
        .map_err(|e| EngineError::FilterDesign(format!("{e:?}")))?;
        let sos =
            zpk2sos(&zpk, None).map_err(|e| EngineError::FilterDesign(format!("{e:?}")))?;
        Ok(Self {
            filter: DirectForm2Transposed::new(&sos),
        })
    }
}

impl Filter for DesignedLowpass {
    fn process(&mut self, sample: f32) -> f32 {
        self.filter.filter(sample as f64) as f32
    }
}

/// Owns the four filter instances (sync I/Q, data I/Q) that make up the
/// channel filter bank. No state is shared between the two bands or the
/// two components of a band.
pub struct ChannelFilterBank {
    sync_i: DesignedBandpass,
    sync_q: DesignedBandpass,
    data_i: DesignedLowpass,
    data_q: DesignedLowpass,
}

impl ChannelFilterBank {
    pub fn new(sample_rate_hz: f32) -> Result<Self> {
        Self::with_band_params(sample_rate_hz, 800.0, 1400.0, 4, 150.0, 4)
    }

    pub fn with_band_params(
        sample_rate_hz: f32,
        sync_low_hz: f32,
        sync_high_hz: f32,
        sync_order: usize,
        data_cutoff_hz: f32,
        data_order: usize,
    ) -> Result<Self> {
        Ok(Self {
            sync_i: DesignedBandpass::new(sync_low_hz, sync_high_hz, sample_rate_hz, sync_order)?,
            sync_q: DesignedBandpass::new(sync_low_hz, sync_high_hz, sample_rate_hz, sync_order)?,
            data_i: DesignedLowpass::new(data_cutoff_hz, sample_rate_hz, data_order)?,
            data_q: DesignedLowpass::new(data_cutoff_hz, sample_rate_hz, data_order)?,
        })
    }

    /// Filter one I/Q sample, returning `(sync_i, sync_q, data_i, data_q)`.
    pub fn process(&mut self, i: f32, q: f32) -> (f32, f32, f32, f32) {
        (
            self.sync_i.process(i),
            self.sync_q.process(q),
            self.data_i.process(i),
            self.data_q.process(q),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_biquad_section_matches_df2t_equation() {
        let mut section = BiquadSection::new(1.0, 0.0, 0.0, 0.0, 0.0);
        // Identity (b0=1, all else 0) should pass samples through unchanged.
        assert_eq!(section.process(0.5), 0.5);
        assert_eq!(section.process(-0.25), -0.25);
    }

    #[test]
    fn test_bandpass_design_succeeds() {
        assert!(DesignedBandpass::new(800.0, 1400.0, 50_000.0, 4).is_ok());
    }

    #[test]
    fn test_lowpass_design_succeeds() {
        assert!(DesignedLowpass::new(150.0, 50_000.0, 4).is_ok());
    }

    #[test]
    fn test_sync_band_passes_tick_tone_data_band_rejects_it() {
        let sample_rate = 50_000.0;
        let mut bank = ChannelFilterBank::new(sample_rate).unwrap();

        let n = 5000;
        let mut sync_energy = 0.0f32;
        let mut data_energy = 0.0f32;
        for k in 0..n {
            let t = k as f32 / sample_rate;
            let i = (2.0 * PI * 1000.0 * t).cos();
            let q = (2.0 * PI * 1000.0 * t).sin();
            let (si, sq, di, dq) = bank.process(i, q);
            if k > n / 2 {
                sync_energy += si * si + sq * sq;
                data_energy += di * di + dq * dq;
            }
        }
        assert!(
            sync_energy > data_energy * 10.0,
            "sync energy {sync_energy} should dominate data energy {data_energy} for a 1 kHz tone"
        );
    }

    #[test]
    fn test_cascade_reset_clears_state() {
        let mut cascade = BiquadCascade::from_sections(vec![BiquadSection::new(
            0.5, 0.5, 0.0, -0.2, 0.1,
        )]);
        cascade.process(1.0);
        cascade.process(1.0);
        cascade.reset();
        // After reset, feeding zero should yield zero (no residual state).
        assert_eq!(cascade.process(0.0), 0.0);
    }
}
