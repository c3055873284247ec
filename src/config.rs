//! Configuration for the WWV/WWVH detection engine.
//!
//! ## Sample rates
//!
//! Two independent feeds exist: the detector-rate feed (nominally 50 kHz)
//! driving the tick/marker/BCD detectors, and the lower-rate display feed
//! (nominally 12 kHz) driving the tone trackers. Configure both in
//! [`AudioConfig`].

use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::types::Station;

/// Top-level engine configuration, owning every detector/correlator config.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub tick: TickConfig,
    pub marker: MarkerConfig,
    pub bcd_time: BcdTimeConfig,
    pub bcd_freq: BcdFreqConfig,
    pub tone: ToneConfig,
    pub sync: SyncConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            tick: TickConfig::default(),
            marker: MarkerConfig::default(),
            bcd_time: BcdTimeConfig::default(),
            bcd_freq: BcdFreqConfig::default(),
            tone: ToneConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse an engine configuration from a TOML document.
    ///
    /// Acquisition and transport are external collaborators; this only
    /// covers the tunables a caller may want to persist alongside them.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str::<SerializedConfig>(text)
            .map(Into::into)
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Serde mirror of [`EngineConfig`] for TOML round-tripping; kept separate so
/// the hot-path config stays free of derive overhead on fields that never
/// need it (e.g. `Station`).
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize, Default)]
#[serde(default)]
struct SerializedConfig {
    sample_rate_detector_hz: Option<f32>,
    sample_rate_display_hz: Option<f32>,
}

impl From<SerializedConfig> for EngineConfig {
    fn from(s: SerializedConfig) -> Self {
        let mut config = EngineConfig::default();
        if let Some(hz) = s.sample_rate_detector_hz {
            config.audio.sample_rate_detector_hz = hz;
        }
        if let Some(hz) = s.sample_rate_display_hz {
            config.audio.sample_rate_display_hz = hz;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub station: Station,
    pub sample_rate_detector_hz: f32,
    pub sample_rate_display_hz: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            station: Station::Wwv,
            sample_rate_detector_hz: 50_000.0,
            sample_rate_display_hz: 12_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    pub frame_size: usize,
    pub threshold_multiplier: f32,
    pub min_duration_ms: f32,
    pub max_duration_ms: f32,
    pub marker_min_ms: f32,
    pub marker_max_ms: f32,
    pub marker_min_interval_ms: f32,
    pub corr_threshold_mult: f32,
    pub warmup_frames: usize,
    pub cooldown_ms: f32,
    pub correlation_decimation: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frame_size: 256,
            threshold_multiplier: TICK_THRESHOLD_MULTIPLIER_DEFAULT,
            min_duration_ms: TICK_MIN_DURATION_MS_DEFAULT,
            max_duration_ms: TICK_MAX_DURATION_MS,
            marker_min_ms: MARKER_MIN_DURATION_MS_CHECK,
            marker_max_ms: MARKER_MAX_DURATION_MS_CHECK,
            marker_min_interval_ms: MARKER_MIN_INTERVAL_MS,
            corr_threshold_mult: CORR_THRESHOLD_MULT,
            warmup_frames: TICK_WARMUP_FRAMES,
            cooldown_ms: TICK_COOLDOWN_MS,
            correlation_decimation: TICK_CORRELATION_DECIMATION,
        }
    }
}

impl TickConfig {
    /// Validated setter for the energy threshold multiplier (§6: `[1, 5]`).
    pub fn set_threshold_multiplier(&mut self, value: f32) -> Result<()> {
        validate_range(
            "tick.threshold_multiplier",
            value,
            TICK_THRESHOLD_MULTIPLIER_MIN,
            TICK_THRESHOLD_MULTIPLIER_MAX,
        )?;
        self.threshold_multiplier = value;
        Ok(())
    }

    /// Validated setter for the minimum tick duration (§6: `[1, 10]` ms).
    pub fn set_min_duration_ms(&mut self, value: f32) -> Result<()> {
        validate_range(
            "tick.min_duration_ms",
            value,
            TICK_MIN_DURATION_MS_MIN,
            TICK_MIN_DURATION_MS_MAX,
        )?;
        self.min_duration_ms = value;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MarkerConfig {
    pub frame_size: usize,
    pub window_frames: usize,
    pub threshold_multiplier: f32,
    pub noise_adapt_rate: f32,
    pub warmup_adapt_rate: f32,
    pub min_duration_ms: f32,
    pub max_duration_ms: f32,
    pub min_startup_ms: f32,
    pub cooldown_ms: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            frame_size: 256,
            window_frames: MARKER_WINDOW_FRAMES_DEFAULT,
            threshold_multiplier: MARKER_THRESHOLD_MULTIPLIER_DEFAULT,
            noise_adapt_rate: MARKER_BASELINE_ADAPT_RATE_DEFAULT,
            warmup_adapt_rate: MARKER_BASELINE_WARMUP_RATE,
            min_duration_ms: MARKER_MIN_DURATION_MS_DEFAULT,
            max_duration_ms: MARKER_MAX_DURATION_MS,
            min_startup_ms: MARKER_MIN_STARTUP_MS,
            cooldown_ms: MARKER_COOLDOWN_MS,
        }
    }
}

impl MarkerConfig {
    /// Validated setter for the marker energy threshold multiplier (§6: `[2, 5]`).
    pub fn set_threshold_multiplier(&mut self, value: f32) -> Result<()> {
        validate_range(
            "marker.threshold_multiplier",
            value,
            MARKER_THRESHOLD_MULTIPLIER_MIN,
            MARKER_THRESHOLD_MULTIPLIER_MAX,
        )?;
        self.threshold_multiplier = value;
        Ok(())
    }

    /// Validated setter for the baseline adaptation rate (§6: `[1e-4, 1e-2]`).
    pub fn set_noise_adapt_rate(&mut self, value: f32) -> Result<()> {
        validate_range(
            "marker.noise_adapt_rate",
            value,
            MARKER_BASELINE_ADAPT_RATE_MIN,
            MARKER_BASELINE_ADAPT_RATE_MAX,
        )?;
        self.noise_adapt_rate = value;
        Ok(())
    }

    /// Validated setter for the minimum marker duration (§6: `[300, 700]` ms).
    pub fn set_min_duration_ms(&mut self, value: f32) -> Result<()> {
        validate_range(
            "marker.min_duration_ms",
            value,
            MARKER_MIN_DURATION_MS_MIN,
            MARKER_MIN_DURATION_MS_MAX,
        )?;
        self.min_duration_ms = value;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BcdTimeConfig {
    pub frame_size: usize,
    pub threshold_multiplier: f32,
    pub min_duration_ms: f32,
    pub max_duration_ms: f32,
    pub min_low_frames: usize,
    pub cooldown_ms: f32,
}

impl Default for BcdTimeConfig {
    fn default() -> Self {
        Self {
            frame_size: 64,
            threshold_multiplier: 3.0,
            min_duration_ms: BCD_TIME_MIN_DURATION_MS,
            max_duration_ms: BCD_TIME_MAX_DURATION_MS,
            min_low_frames: BCD_TIME_MIN_LOW_FRAMES,
            cooldown_ms: BCD_TIME_COOLDOWN_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BcdFreqConfig {
    pub frame_size: usize,
    pub window_frames: usize,
    pub threshold_multiplier: f32,
    pub noise_adapt_rate: f32,
    pub max_duration_ms: f32,
}

impl Default for BcdFreqConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            window_frames: BCD_FREQ_WINDOW_FRAMES_DEFAULT,
            threshold_multiplier: 3.0,
            noise_adapt_rate: MARKER_BASELINE_ADAPT_RATE_DEFAULT,
            max_duration_ms: BCD_FREQ_MAX_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub frame_size: usize,
    pub search_half_width_bins: i32,
    pub min_snr_db: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            search_half_width_bins: TONE_SEARCH_HALF_WIDTH_BINS,
            min_snr_db: TONE_MIN_SNR_DB,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub lock_threshold: f32,
    pub recover_timeout_ms: f32,
    pub decay_normal: f32,
    pub decay_recovery: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lock_threshold: LOCK_THRESHOLD,
            recover_timeout_ms: RECOVER_TIMEOUT_MS,
            decay_normal: CONFIDENCE_DECAY_NORMAL,
            decay_recovery: CONFIDENCE_DECAY_RECOVERY,
        }
    }
}

fn validate_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::TunableOutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_within_bounds() {
        let config = EngineConfig::default();
        assert!(config.tick.threshold_multiplier >= TICK_THRESHOLD_MULTIPLIER_MIN);
        assert!(config.tick.threshold_multiplier <= TICK_THRESHOLD_MULTIPLIER_MAX);
    }

    #[test]
    fn test_tick_threshold_multiplier_rejects_out_of_range() {
        let mut tick = TickConfig::default();
        assert!(tick.set_threshold_multiplier(0.5).is_err());
        assert!(tick.set_threshold_multiplier(6.0).is_err());
        assert!(tick.set_threshold_multiplier(2.0).is_ok());
        assert_eq!(tick.threshold_multiplier, 2.0);
    }

    #[test]
    fn test_marker_noise_adapt_rate_rejects_out_of_range() {
        let mut marker = MarkerConfig::default();
        assert!(marker.set_noise_adapt_rate(1e-5).is_err());
        assert!(marker.set_noise_adapt_rate(1e-1).is_err());
        assert!(marker.set_noise_adapt_rate(1e-3).is_ok());
    }

    #[test]
    fn test_from_toml_overrides_sample_rate() {
        let config = EngineConfig::from_toml("sample_rate_detector_hz = 44100.0\n").unwrap();
        assert_eq!(config.audio.sample_rate_detector_hz, 44_100.0);
    }

    #[test]
    fn test_from_toml_empty_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(
            config.audio.sample_rate_detector_hz,
            AudioConfig::default().sample_rate_detector_hz
        );
    }
}
