//! Sync detector: fuses tick, marker, and tick-hole evidence into a single
//! confidence-weighted second-of-minute estimate via a four-state machine
//! (SEARCHING -> ACQUIRING -> LOCKED -> RECOVERING).

use crate::config::SyncConfig;
use crate::constants::*;
use crate::events::{EvidenceMask, FrameTime, SyncState};
use crate::types::Millis;

/// A single piece of corroborating (or contradicting) timing evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Tick,
    Marker,
    PMarker,
    TickHole,
    HoleThenMarker,
}

impl EvidenceKind {
    fn weight(self) -> f32 {
        match self {
            EvidenceKind::Tick => EVIDENCE_WEIGHT_TICK,
            EvidenceKind::Marker => EVIDENCE_WEIGHT_MARKER,
            EvidenceKind::PMarker => EVIDENCE_WEIGHT_P_MARKER,
            EvidenceKind::TickHole => EVIDENCE_WEIGHT_TICK_HOLE,
            EvidenceKind::HoleThenMarker => EVIDENCE_WEIGHT_HOLE_THEN_MARKER,
        }
    }

    fn tolerance_ms(self) -> f32 {
        match self {
            EvidenceKind::Tick => EVIDENCE_TOLERANCE_TICK_MS,
            EvidenceKind::Marker => EVIDENCE_TOLERANCE_MARKER_MS,
            EvidenceKind::PMarker => EVIDENCE_TOLERANCE_P_MARKER_MS,
            EvidenceKind::TickHole => EVIDENCE_TOLERANCE_TICK_HOLE_MS,
            EvidenceKind::HoleThenMarker => EVIDENCE_TOLERANCE_HOLE_THEN_MARKER_MS,
        }
    }

    fn mask_bit(self) -> EvidenceMask {
        match self {
            EvidenceKind::Tick => EvidenceMask::TICK,
            EvidenceKind::Marker => EvidenceMask::MARKER,
            EvidenceKind::PMarker => EvidenceMask::P_MARKER,
            EvidenceKind::TickHole => EvidenceMask::TICK_HOLE,
            EvidenceKind::HoleThenMarker => EvidenceMask::HOLE_THEN_MARKER,
        }
    }
}

/// Evidence-fusion timing estimator. Owns no detector state directly; it is
/// fed evidence by the detector manager as raw events arrive.
pub struct SyncDetector {
    config: SyncConfig,
    current_second: u8,
    second_start_ms: Millis,
    confidence: f32,
    evidence_mask: EvidenceMask,
    state: SyncState,
    last_evidence_ms: Option<Millis>,
    last_tick_was_hole: bool,
}

impl SyncDetector {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            current_second: 0,
            second_start_ms: 0.0,
            confidence: 0.0,
            evidence_mask: EvidenceMask::empty(),
            state: SyncState::Searching,
            last_evidence_ms: None,
            last_tick_was_hole: false,
        }
    }

    pub fn frame_time(&self) -> FrameTime {
        FrameTime {
            current_second: self.current_second,
            second_start_ms: self.second_start_ms,
            confidence: self.confidence,
            evidence_mask: self.evidence_mask,
            state: self.state,
        }
    }

    /// Epoch of second-zero for the minute currently in progress. Read by
    /// the BCD windower as a getter, never stored, to avoid a cyclic
    /// ownership dependency between sync and downstream consumers.
    pub fn minute_anchor_ms(&self) -> Millis {
        self.second_start_ms - self.current_second as f32 * 1000.0
    }

    /// Install a fresh per-second epoch, e.g. from the tick correlator or a
    /// confirmed minute marker. Resets the evidence mask for the new second.
    pub fn install_epoch(&mut self, second: u8, second_start_ms: Millis) {
        self.current_second = second % SECONDS_PER_MINUTE;
        self.second_start_ms = second_start_ms;
        self.evidence_mask = EvidenceMask::empty();
    }

    /// Record one piece of evidence observed at `timestamp_ms` against an
    /// `expected_ms` boundary. Evidence outside its tolerance window is
    /// dropped silently (it neither boosts nor decays confidence).
    pub fn observe(&mut self, kind: EvidenceKind, timestamp_ms: Millis, expected_ms: Millis) {
        if (timestamp_ms - expected_ms).abs() > kind.tolerance_ms() {
            self.last_tick_was_hole = matches!(kind, EvidenceKind::TickHole);
            return;
        }

        if self.state == SyncState::Searching {
            self.state = SyncState::Acquiring;
        }

        self.confidence = (self.confidence + kind.weight()).clamp(0.0, 1.0);
        self.evidence_mask |= kind.mask_bit();
        self.last_evidence_ms = Some(timestamp_ms);
        self.last_tick_was_hole = matches!(kind, EvidenceKind::TickHole);

        if self.confidence >= self.config.lock_threshold {
            self.state = SyncState::Locked;
        } else if self.state == SyncState::Recovering {
            self.state = SyncState::Acquiring;
        }
    }

    /// Whether the most recent tick observation was a hole (missed tick),
    /// used by the caller to decide whether a subsequent marker should be
    /// reported as plain [`EvidenceKind::Marker`] or
    /// [`EvidenceKind::HoleThenMarker`].
    pub fn last_tick_was_hole(&self) -> bool {
        self.last_tick_was_hole
    }

    /// Periodic housekeeping: decays confidence and drives the
    /// LOCKED/RECOVERING timeout. Should be called roughly once per second.
    pub fn tick(&mut self, now_ms: Millis) {
        let decay = match self.state {
            SyncState::Locked => self.config.decay_normal,
            SyncState::Recovering => self.config.decay_recovery,
            _ => 0.0,
        };
        self.confidence = (self.confidence - decay).max(0.0);

        match self.last_evidence_ms {
            Some(last) if now_ms - last > self.config.recover_timeout_ms => {
                if self.state == SyncState::Locked {
                    self.state = SyncState::Recovering;
                } else if self.state == SyncState::Recovering
                    && now_ms - last > 2.0 * self.config.recover_timeout_ms
                {
                    self.state = SyncState::Searching;
                    self.confidence = 0.0;
                }
            }
            None => {}
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_searching_moves_to_acquiring_on_first_evidence() {
        let mut sync = SyncDetector::new(SyncConfig::default());
        assert_eq!(sync.frame_time().state, SyncState::Searching);
        sync.observe(EvidenceKind::Tick, 1000.0, 1000.0);
        assert_eq!(sync.frame_time().state, SyncState::Acquiring);
    }

    #[test]
    fn test_repeated_marker_evidence_locks() {
        let mut sync = SyncDetector::new(SyncConfig::default());
        for n in 0..3 {
            let t = n as f32 * 60_000.0;
            sync.observe(EvidenceKind::Marker, t, t);
        }
        assert_eq!(sync.frame_time().state, SyncState::Locked);
        assert!(sync.frame_time().confidence >= LOCK_THRESHOLD);
    }

    #[test]
    fn test_evidence_outside_tolerance_is_ignored() {
        let mut sync = SyncDetector::new(SyncConfig::default());
        sync.observe(EvidenceKind::Tick, 1_500.0, 1_000.0);
        assert_eq!(sync.frame_time().confidence, 0.0);
        assert_eq!(sync.frame_time().state, SyncState::Searching);
    }

    #[test]
    fn test_long_silence_after_lock_enters_recovering() {
        let mut sync = SyncDetector::new(SyncConfig::default());
        for n in 0..3 {
            let t = n as f32 * 60_000.0;
            sync.observe(EvidenceKind::Marker, t, t);
        }
        assert_eq!(sync.frame_time().state, SyncState::Locked);
        sync.tick(120_000.0 + RECOVER_TIMEOUT_MS + 1.0);
        assert_eq!(sync.frame_time().state, SyncState::Recovering);
    }

    #[test]
    fn test_minute_anchor_tracks_installed_epoch() {
        let mut sync = SyncDetector::new(SyncConfig::default());
        sync.install_epoch(5, 65_000.0);
        assert_eq!(sync.minute_anchor_ms(), 60_000.0);
    }
}
