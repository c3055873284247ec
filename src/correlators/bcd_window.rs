//! BCD symbol windower: accumulates BCD pulse events into per-second windows
//! anchored to the sync detector's minute anchor, and classifies each window
//! into a time-code symbol.

use crate::constants::*;
use crate::events::{BcdPulseEvent, BcdSource, Symbol, SymbolEvent, SymbolSource};
use crate::types::Millis;

#[derive(Default, Clone, Copy)]
struct SourceAccumulator {
    first_ms: Option<Millis>,
    last_ms: Option<Millis>,
    duration_sum: Millis,
    energy_sum: f32,
    count: u32,
}

impl SourceAccumulator {
    fn observe(&mut self, event: &BcdPulseEvent) {
        self.first_ms = Some(self.first_ms.map_or(event.start_ms, |f| f.min(event.start_ms)));
        self.last_ms = Some(self.last_ms.map_or(event.start_ms, |l| l.max(event.start_ms)));
        self.duration_sum += event.duration_ms;
        self.energy_sum += event.peak_energy;
        self.count += 1;
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Best estimate of the pulse's width: first-to-last span if this source
    /// reported more than once, otherwise its own reported duration.
    fn estimated_duration_ms(&self) -> Millis {
        match (self.first_ms, self.last_ms) {
            (Some(f), Some(l)) if self.count >= 2 => l - f,
            _ => self.duration_sum / self.count.max(1) as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    Acquiring,
    Tentative,
    Tracking,
}

/// Classifies accumulated time-domain and frequency-domain BCD pulse
/// observations into one [`SymbolEvent`] per second.
pub struct BcdWindower {
    current_second: u8,
    time_acc: SourceAccumulator,
    freq_acc: SourceAccumulator,
    state: WindowState,
    consecutive_good: usize,
}

impl Default for BcdWindower {
    fn default() -> Self {
        Self::new()
    }
}

impl BcdWindower {
    pub fn new() -> Self {
        Self {
            current_second: 0,
            time_acc: SourceAccumulator::default(),
            freq_acc: SourceAccumulator::default(),
            state: WindowState::Acquiring,
            consecutive_good: 0,
        }
    }

    /// Accumulate a pulse observation into the currently open window.
    /// `anchor_ms` is read via the sync detector's minute-anchor getter, not
    /// stored, to avoid a cyclic dependency between sync and the windower.
    pub fn on_bcd_pulse(&mut self, event: BcdPulseEvent, anchor_ms: Millis) {
        let window_second = Self::second_for(event.start_ms, anchor_ms);
        if window_second != self.current_second {
            return;
        }
        match event.source {
            BcdSource::Time => self.time_acc.observe(&event),
            BcdSource::Freq => self.freq_acc.observe(&event),
        }
    }

    fn second_for(timestamp_ms: Millis, anchor_ms: Millis) -> u8 {
        let elapsed = (timestamp_ms - anchor_ms).max(0.0);
        ((elapsed / 1000.0) as u64 % SECONDS_PER_MINUTE as u64) as u8
    }

    /// Close the current window once `now_ms` passes its boundary (with
    /// tolerance) and emit the classified symbol for it.
    pub fn poll(&mut self, now_ms: Millis, anchor_ms: Millis) -> Option<SymbolEvent> {
        let window_close_ms = anchor_ms + (self.current_second as f32 + 1.0) * 1000.0;
        if now_ms + WINDOW_TOLERANCE_MS < window_close_ms {
            return None;
        }

        let event = self.classify(anchor_ms);

        self.time_acc = SourceAccumulator::default();
        self.freq_acc = SourceAccumulator::default();
        self.current_second = (self.current_second + 1) % SECONDS_PER_MINUTE;

        Some(event)
    }

    fn classify(&mut self, anchor_ms: Millis) -> SymbolEvent {
        let second = self.current_second;
        let timestamp_ms = anchor_ms + second as f32 * 1000.0;

        let (duration_ms, source) = match (self.time_acc.is_empty(), self.freq_acc.is_empty()) {
            (false, false) => {
                let avg = 0.5
                    * (self.time_acc.estimated_duration_ms() + self.freq_acc.estimated_duration_ms());
                (avg, SymbolSource::Both)
            }
            (false, true) => (self.time_acc.estimated_duration_ms(), SymbolSource::Time),
            (true, false) => (self.freq_acc.estimated_duration_ms(), SymbolSource::Freq),
            (true, true) => (0.0, SymbolSource::None),
        };

        let is_marker_position = P_MARKER_SECONDS.contains(&second);
        let symbol = Self::classify_duration(duration_ms, is_marker_position);

        let quality_ok = match source {
            SymbolSource::Both | SymbolSource::Time | SymbolSource::Freq => {
                self.time_acc.energy_sum + self.freq_acc.energy_sum > ENERGY_THRESHOLD_LOW
            }
            SymbolSource::None => false,
        };

        let mut confidence = match source {
            SymbolSource::Both => 1.0,
            SymbolSource::Time | SymbolSource::Freq => 0.6,
            SymbolSource::None => 0.0,
        };
        if !quality_ok {
            confidence *= 0.5;
        }

        self.advance_state(symbol, source);

        SymbolEvent {
            symbol,
            second,
            timestamp_ms,
            duration_ms,
            confidence,
            source,
        }
    }

    fn classify_duration(duration_ms: Millis, is_marker_position: bool) -> Symbol {
        if duration_ms < SYMBOL_NONE_MAX_MS {
            Symbol::None
        } else if duration_ms < SYMBOL_ZERO_MAX_MS {
            Symbol::Zero
        } else if duration_ms < SYMBOL_ONE_MAX_MS {
            Symbol::One
        } else if duration_ms < SYMBOL_MARKER_MAX_MS {
            if is_marker_position {
                Symbol::PMarker
            } else {
                Symbol::One
            }
        } else {
            Symbol::None
        }
    }

    fn advance_state(&mut self, symbol: Symbol, source: SymbolSource) {
        let plausible = symbol != Symbol::None && source != SymbolSource::None;
        if plausible {
            self.consecutive_good += 1;
        } else {
            self.consecutive_good = 0;
        }

        self.state = match self.state {
            WindowState::Acquiring if self.consecutive_good >= 1 => WindowState::Tentative,
            WindowState::Tentative if self.consecutive_good >= TRACKING_CONSECUTIVE_REQUIRED => {
                WindowState::Tracking
            }
            WindowState::Tracking if !plausible => WindowState::Tentative,
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(source: BcdSource, start_ms: Millis, duration_ms: Millis) -> BcdPulseEvent {
        BcdPulseEvent {
            source,
            start_ms,
            duration_ms,
            peak_energy: 1.0,
            baseline_or_noise_floor: 0.01,
            snr_db: 20.0,
        }
    }

    #[test]
    fn test_single_source_200ms_pulse_classifies_as_zero() {
        let mut windower = BcdWindower::new();
        windower.on_bcd_pulse(pulse(BcdSource::Time, 100.0, 200.0), 0.0);
        let event = windower.poll(1_100.0, 0.0).expect("window should close");
        assert_eq!(event.symbol, Symbol::Zero);
        assert_eq!(event.source, SymbolSource::Time);
        assert!((event.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_both_sources_agree_on_one_with_full_confidence() {
        let mut windower = BcdWindower::new();
        windower.on_bcd_pulse(pulse(BcdSource::Time, 100.0, 500.0), 0.0);
        windower.on_bcd_pulse(pulse(BcdSource::Freq, 100.0, 500.0), 0.0);
        let event = windower.poll(1_100.0, 0.0).expect("window should close");
        assert_eq!(event.symbol, Symbol::One);
        assert_eq!(event.source, SymbolSource::Both);
        assert!((event.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_p_marker_only_recognized_at_marker_positions() {
        let mut windower = BcdWindower::new();
        windower.on_bcd_pulse(pulse(BcdSource::Time, 100.0, 800.0), 0.0);
        let event = windower.poll(1_100.0, 0.0).expect("window should close");
        // second 0 is a marker position.
        assert_eq!(event.symbol, Symbol::PMarker);
    }

    #[test]
    fn test_800ms_pulse_off_position_is_treated_as_one() {
        let mut windower = BcdWindower::new();
        // Advance to second 1, which is not a P-marker position.
        windower.poll(1_000.0, 0.0);
        windower.on_bcd_pulse(pulse(BcdSource::Time, 1_100.0, 800.0), 0.0);
        let event = windower.poll(2_100.0, 0.0).expect("window should close");
        assert_eq!(event.second, 1);
        assert_eq!(event.symbol, Symbol::One);
    }

    #[test]
    fn test_no_pulses_produces_none_symbol_with_zero_confidence() {
        let mut windower = BcdWindower::new();
        let event = windower.poll(1_100.0, 0.0).expect("window should close");
        assert_eq!(event.symbol, Symbol::None);
        assert_eq!(event.source, SymbolSource::None);
        assert_eq!(event.confidence, 0.0);
    }
}
