//! Marker correlator: cross-validates fast minute markers against a slow,
//! spectral confidence check before publishing them to the sync detector.

use crate::constants::MARKER_CONFIRM_WINDOW_MS;
use crate::events::MarkerEvent;
use crate::types::Millis;
use std::collections::VecDeque;

struct PendingMarker {
    event: MarkerEvent,
    deadline_ms: Millis,
}

/// Confirms a fast [`MarkerEvent`] against above-threshold slow-marker
/// spectral energy observed within a short window around it. The slow path
/// is the same windowed spectral energy the marker detector integrates
/// internally, sampled on every frame rather than only at pulse boundaries.
pub struct MarkerCorrelator {
    pending: Option<PendingMarker>,
    recent_slow_energy: VecDeque<(Millis, f32)>,
}

impl Default for MarkerCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerCorrelator {
    pub fn new() -> Self {
        Self {
            pending: None,
            recent_slow_energy: VecDeque::new(),
        }
    }

    pub fn on_fast_marker(&mut self, event: MarkerEvent) {
        self.pending = Some(PendingMarker {
            event,
            deadline_ms: event.trailing_edge_ms + MARKER_CONFIRM_WINDOW_MS,
        });
        // A slow-spectral sample seen just before the fast marker arrived
        // may already confirm it.
        self.try_confirm();
    }

    /// Record one slow-path spectral energy sample against a threshold and
    /// attempt to confirm the pending fast marker.
    pub fn on_slow_energy(&mut self, now_ms: Millis, energy: f32, threshold: f32) -> Option<MarkerEvent> {
        if energy > threshold {
            self.recent_slow_energy.push_back((now_ms, energy));
        }
        while let Some(&(t, _)) = self.recent_slow_energy.front() {
            if now_ms - t > MARKER_CONFIRM_WINDOW_MS * 2.0 {
                self.recent_slow_energy.pop_front();
            } else {
                break;
            }
        }
        self.try_confirm()
    }

    /// Drop a pending marker that aged out without slow-path confirmation.
    pub fn expire(&mut self, now_ms: Millis) {
        if let Some(pending) = &self.pending {
            if now_ms > pending.deadline_ms {
                self.pending = None;
            }
        }
    }

    fn try_confirm(&mut self) -> Option<MarkerEvent> {
        let pending = self.pending.as_ref()?;
        let confirmed = self
            .recent_slow_energy
            .iter()
            .any(|&(t, _)| (t - pending.event.trailing_edge_ms).abs() <= MARKER_CONFIRM_WINDOW_MS);
        if confirmed {
            let event = pending.event;
            self.pending = None;
            Some(event)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_marker(trailing_edge_ms: Millis) -> MarkerEvent {
        MarkerEvent {
            trailing_edge_ms,
            duration_ms: 800.0,
            peak_accumulated_energy: 1.0,
            baseline: 0.01,
        }
    }

    #[test]
    fn test_fast_marker_confirmed_by_slow_energy_in_window() {
        let mut correlator = MarkerCorrelator::new();
        correlator.on_fast_marker(fake_marker(60_000.0));
        assert!(correlator.on_slow_energy(60_100.0, 0.9, 0.5).is_some());
    }

    #[test]
    fn test_fast_marker_unconfirmed_without_slow_energy() {
        let mut correlator = MarkerCorrelator::new();
        correlator.on_fast_marker(fake_marker(60_000.0));
        assert!(correlator.on_slow_energy(60_100.0, 0.1, 0.5).is_none());
        correlator.expire(61_000.0);
        assert!(correlator.on_slow_energy(61_100.0, 0.9, 0.5).is_none());
    }
}
