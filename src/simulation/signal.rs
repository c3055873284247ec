//! Synthetic WWV/WWVH complex-baseband test signal generation: tick
//! pulses, the 800 ms minute marker, and the 100 Hz BCD subcarrier.

use crate::constants::{BCD_FREQUENCY_HZ, P_MARKER_SECONDS, TICK_TEMPLATE_DURATION_MS};
use crate::events::Symbol;
use crate::types::{Sample, Station};
use std::f32::consts::PI;

/// Nominal pulse width, in milliseconds, for each BCD symbol kind. These
/// match the on-air WWV/WWVH pulse-width code: 200 ms for a zero, 500 ms
/// for a one, 800 ms for a position marker.
fn symbol_duration_ms(symbol: Symbol) -> f32 {
    match symbol {
        Symbol::Zero => 200.0,
        Symbol::One => 500.0,
        Symbol::PMarker => 800.0,
        Symbol::None => 0.0,
    }
}

/// Which seconds of the minute carry a tick, and whether that second's
/// tick is silent (the two seconds WWV/WWVH habitually omit for station
/// identification or the minute marker itself).
fn tick_is_silent(second: u8) -> bool {
    second == 29 || second == 59
}

/// One minute's worth of BCD symbols, second 0 through 59. By default this
/// places position markers at the seconds WWV/WWVH reserve for them and a
/// zero everywhere else; callers building targeted fixtures can substitute
/// their own table.
pub fn default_minute_symbols() -> [Symbol; 60] {
    let mut symbols = [Symbol::Zero; 60];
    for &second in P_MARKER_SECONDS.iter() {
        symbols[second as usize] = Symbol::PMarker;
    }
    symbols
}

/// Generate one minute of synthetic complex-baseband WWV/WWVH samples at
/// `sample_rate_hz`, starting at second 0. Returns interleaved I/Q pairs
/// as `Sample`s suitable for feeding directly to [`crate::manager::DetectorManager`].
///
/// `minute_symbols` supplies the pulse-width BCD symbol for each of the 60
/// seconds in the minute (see [`default_minute_symbols`] for a reasonable
/// default). Amplitudes are nominal (carrier = 1.0, subcarrier index =
/// `subcarrier_depth`); add noise afterward via [`super::noise::apply_noise`].
pub fn generate_minute(
    station: Station,
    sample_rate_hz: f32,
    minute_symbols: &[Symbol; 60],
    subcarrier_depth: f32,
) -> Vec<Sample> {
    let tick_hz = station.tick_frequency_hz();
    let samples_per_second = sample_rate_hz.round() as usize;
    let total_samples = samples_per_second * 60;
    let tick_duration_samples =
        ((TICK_TEMPLATE_DURATION_MS / 1000.0) * sample_rate_hz).round() as usize;
    let marker_duration_samples = ((800.0 / 1000.0) * sample_rate_hz).round() as usize;

    let mut out = Vec::with_capacity(total_samples);
    for n in 0..total_samples {
        let second = (n / samples_per_second) as u8;
        let offset_in_second = n % samples_per_second;
        let t = n as f32 / sample_rate_hz;

        let is_marker_second = second == 0;
        let carrier = if is_marker_second {
            if offset_in_second < marker_duration_samples {
                1.0
            } else {
                0.0
            }
        } else if tick_is_silent(second) {
            0.0
        } else if offset_in_second < tick_duration_samples {
            1.0
        } else {
            0.0
        };

        let tick_phase = 2.0 * PI * tick_hz * t;
        let tick_i = carrier * tick_phase.cos();
        let tick_q = carrier * tick_phase.sin();

        let symbol = minute_symbols[second as usize];
        let pulse_ms = symbol_duration_ms(symbol);
        let offset_ms = offset_in_second as f32 / sample_rate_hz * 1000.0;
        let subcarrier_on = offset_ms < pulse_ms;
        let subcarrier_amp = if subcarrier_on { subcarrier_depth } else { 0.0 };
        let subcarrier_phase = 2.0 * PI * BCD_FREQUENCY_HZ * t;
        let sub_i = subcarrier_amp * subcarrier_phase.cos();
        let sub_q = subcarrier_amp * subcarrier_phase.sin();

        out.push(Sample::new(tick_i + sub_i, tick_q + sub_q));
    }
    out
}

/// Split an interleaved-complex minute of samples into separate `i`/`q`
/// vectors, the shape most test and WAV-writing code wants.
pub fn split_iq(samples: &[Sample]) -> (Vec<f32>, Vec<f32>) {
    let i = samples.iter().map(|s| s.re).collect();
    let q = samples.iter().map(|s| s.im).collect();
    (i, q)
}
