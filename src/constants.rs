//! Numeric constants for signal processing stability and protocol timing.
//!
//! These constants define thresholds, epsilon values, and protocol timing
//! bounds used throughout the detection and correlation pipeline.

/// Epsilon for preventing division by zero in ratio/interpolation calculations.
pub const INTERPOLATION_EPSILON: f32 = 1e-10;

/// Epsilon below which a correlation noise floor is treated as zero.
pub const CORRELATION_FLOOR_EPSILON: f32 = 1e-10;

/// Clamp bounds for adaptive noise floors / baselines across detectors.
pub const NOISE_FLOOR_MIN: f32 = 1e-6;
pub const NOISE_FLOOR_MAX: f32 = 1.0;

/// Hysteresis ratio applied to `threshold_high` to derive `threshold_low`.
pub const HYSTERESIS_RATIO: f32 = 0.7;

/// Fast, symmetric noise-floor adaptation rate used only during the WARMUP
/// overlay of the tick and BCD time-domain detectors.
pub const WARMUP_SYMMETRIC_ADAPT_RATE: f32 = 0.2;

// --- Tick detector (4.4) ---

pub const TICK_FREQUENCY_HZ_WWV: f32 = 1000.0;
pub const TICK_FREQUENCY_HZ_WWVH: f32 = 1200.0;
pub const TICK_ENERGY_BANDWIDTH_HZ: f32 = 100.0;
pub const TICK_TEMPLATE_DURATION_MS: f32 = 5.0;
pub const TICK_CORRELATION_DECIMATION: usize = 8;
pub const TICK_WARMUP_FRAMES: usize = 50;
pub const TICK_THRESHOLD_MULTIPLIER_DEFAULT: f32 = 3.0;
pub const TICK_THRESHOLD_MULTIPLIER_MIN: f32 = 1.0;
pub const TICK_THRESHOLD_MULTIPLIER_MAX: f32 = 5.0;
pub const TICK_MIN_DURATION_MS_DEFAULT: f32 = 2.0;
pub const TICK_MIN_DURATION_MS_MIN: f32 = 1.0;
pub const TICK_MIN_DURATION_MS_MAX: f32 = 10.0;
pub const TICK_MAX_DURATION_MS: f32 = 50.0;
pub const TICK_GAP_ZONE_MS: f32 = 50.0;
pub const MARKER_MIN_DURATION_MS_CHECK: f32 = 600.0;
pub const MARKER_MAX_DURATION_MS_CHECK: f32 = 1500.0;
pub const MARKER_MIN_INTERVAL_MS: f32 = 55_000.0;
pub const CORR_THRESHOLD_MULT: f32 = 5.0;
pub const TICK_COOLDOWN_MS: f32 = 500.0;
pub const TICK_ADAPT_DOWN: f32 = 0.002;
pub const TICK_ADAPT_UP: f32 = 0.0002;
pub const GATE_WINDOW_MS: f32 = 100.0;
pub const GATE_RECOVERY_MS: f32 = 5_000.0;
pub const CORRELATION_NOISE_DECAY: f32 = 0.0005;

// --- Minute-marker detector (4.5) ---

pub const MARKER_BANDWIDTH_HZ: f32 = 50.0;
pub const MARKER_WINDOW_FRAMES_DEFAULT: usize = 100;
pub const MARKER_BASELINE_ADAPT_RATE_DEFAULT: f32 = 0.001;
pub const MARKER_BASELINE_ADAPT_RATE_MIN: f32 = 1e-4;
pub const MARKER_BASELINE_ADAPT_RATE_MAX: f32 = 1e-2;
pub const MARKER_BASELINE_WARMUP_RATE: f32 = 0.02;
pub const MARKER_THRESHOLD_MULTIPLIER_DEFAULT: f32 = 3.0;
pub const MARKER_THRESHOLD_MULTIPLIER_MIN: f32 = 2.0;
pub const MARKER_THRESHOLD_MULTIPLIER_MAX: f32 = 5.0;
pub const MARKER_MIN_STARTUP_MS: f32 = 10_000.0;
pub const MARKER_MAX_DURATION_MS: f32 = 5_000.0;
pub const MARKER_MIN_DURATION_MS_DEFAULT: f32 = 500.0;
pub const MARKER_MIN_DURATION_MS_MIN: f32 = 300.0;
pub const MARKER_MIN_DURATION_MS_MAX: f32 = 700.0;
pub const MARKER_COOLDOWN_MS: f32 = 30_000.0;

// --- BCD detectors (4.6 / 4.7) ---

pub const BCD_FREQUENCY_HZ: f32 = 100.0;
pub const BCD_BANDWIDTH_HZ: f32 = 20.0;
pub const BCD_TIME_MIN_DURATION_MS: f32 = 100.0;
pub const BCD_TIME_MAX_DURATION_MS: f32 = 900.0;
pub const BCD_TIME_MIN_LOW_FRAMES: usize = 3;
pub const BCD_TIME_COOLDOWN_MS: f32 = 200.0;
pub const BCD_FREQ_WINDOW_FRAMES_DEFAULT: usize = 20;
pub const BCD_FREQ_MAX_DURATION_MS: f32 = 2_000.0;

// --- Tone tracker (4.8) ---

pub const TONE_SEARCH_HALF_WIDTH_BINS: i32 = 10;
pub const TONE_NOISE_EXCLUSION_MARGIN_BINS: i32 = 5;
pub const TONE_MIN_SNR_DB: f32 = 10.0;

// --- Tick correlator (4.9) ---

pub const TICK_NOMINAL_INTERVAL_MS: f32 = 1000.0;
pub const TICK_CHAIN_BASE_TOLERANCE_MS: f32 = 15.0;
pub const TICK_CHAIN_MIN_LENGTH_FOR_EPOCH: usize = 5;
pub const TICK_CHAIN_MAX_MISSES: usize = 3;
pub const TICK_CHAIN_TOLERANCE_STD_MULT: f32 = 2.0;
pub const EPOCH_CONFIDENCE_THRESHOLD: f32 = 0.8;

// --- Marker correlator (4.10) ---

pub const MARKER_CONFIRM_WINDOW_MS: f32 = 500.0;

// --- BCD symbol windower (4.11) ---

pub const WINDOW_TOLERANCE_MS: f32 = 50.0;
pub const SYMBOL_NONE_MAX_MS: f32 = 100.0;
pub const SYMBOL_ZERO_MAX_MS: f32 = 350.0;
pub const SYMBOL_ONE_MAX_MS: f32 = 650.0;
pub const SYMBOL_MARKER_MAX_MS: f32 = 900.0;
pub const ENERGY_THRESHOLD_LOW: f32 = 0.001;
pub const TRACKING_INTERVAL_MIN_MS: f32 = 900.0;
pub const TRACKING_INTERVAL_MAX_MS: f32 = 1100.0;
pub const TRACKING_CONSECUTIVE_REQUIRED: usize = 3;

/// Seconds within a minute that are position markers (BCD frame delimiters).
pub const P_MARKER_SECONDS: [u8; 7] = [0, 9, 19, 29, 39, 49, 59];

// --- Sync detector (4.12) ---

pub const EVIDENCE_WEIGHT_TICK: f32 = 0.15;
pub const EVIDENCE_WEIGHT_MARKER: f32 = 0.45;
pub const EVIDENCE_WEIGHT_P_MARKER: f32 = 0.40;
pub const EVIDENCE_WEIGHT_TICK_HOLE: f32 = 0.20;
pub const EVIDENCE_WEIGHT_HOLE_THEN_MARKER: f32 = 0.65;

pub const EVIDENCE_TOLERANCE_TICK_MS: f32 = 10.0;
pub const EVIDENCE_TOLERANCE_MARKER_MS: f32 = 30.0;
pub const EVIDENCE_TOLERANCE_P_MARKER_MS: f32 = 30.0;
pub const EVIDENCE_TOLERANCE_TICK_HOLE_MS: f32 = 10.0;
pub const EVIDENCE_TOLERANCE_HOLE_THEN_MARKER_MS: f32 = 30.0;

pub const CONFIDENCE_DECAY_NORMAL: f32 = 0.01;
pub const CONFIDENCE_DECAY_RECOVERY: f32 = 0.05;
pub const LOCK_THRESHOLD: f32 = 0.8;
pub const RECOVER_TIMEOUT_MS: f32 = 90_000.0;
pub const SECONDS_PER_MINUTE: u8 = 60;

/// Filter-group-delay constant applied when deriving a tick-marker's leading
/// edge from its trailing edge. Station/rate dependent; treated here as a
/// configurable per-rate default.
pub const DEFAULT_FILTER_GROUP_DELAY_MS: f32 = 3.0;
