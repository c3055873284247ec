//! Tick-chain correlator: builds correlation chains from tick events and
//! derives a per-second epoch once a chain is long and consistent enough.

use crate::constants::*;
use crate::events::EpochSource;
use crate::types::Millis;
use rolling_stats::Stats;

#[derive(Debug, Clone)]
pub struct ChainStats {
    pub length: usize,
    pub start_ms: Millis,
    pub end_ms: Millis,
    pub min_interval_ms: Millis,
    pub max_interval_ms: Millis,
    pub mean_interval_ms: Millis,
    pub cumulative_drift_ms: Millis,
}

struct Chain {
    stats: Stats<f32>,
    length: usize,
    start_ms: Millis,
    end_ms: Millis,
    cumulative_drift_ms: Millis,
}

impl Chain {
    fn new(ts: Millis) -> Self {
        Self {
            stats: Stats::new(),
            length: 1,
            start_ms: ts,
            end_ms: ts,
            cumulative_drift_ms: 0.0,
        }
    }

    fn to_public(&self) -> ChainStats {
        ChainStats {
            length: self.length,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            min_interval_ms: self.stats.min,
            max_interval_ms: self.stats.max,
            mean_interval_ms: self.stats.mean,
            cumulative_drift_ms: self.cumulative_drift_ms,
        }
    }

    fn tolerance_ms(&self) -> f32 {
        TICK_CHAIN_BASE_TOLERANCE_MS + TICK_CHAIN_TOLERANCE_STD_MULT * self.stats.std_dev.abs()
    }

    fn expected_interval_ms(&self) -> f32 {
        if self.stats.count > 0 {
            self.stats.mean
        } else {
            TICK_NOMINAL_INTERVAL_MS
        }
    }

    fn confidence(&self) -> f32 {
        let length_factor = (self.length as f32 / (self.length as f32 + 5.0)).clamp(0.0, 1.0);
        let jitter = self.stats.std_dev.abs();
        let consistency = (1.0 - jitter / TICK_CHAIN_BASE_TOLERANCE_MS).clamp(0.0, 1.0);
        (length_factor * consistency).clamp(0.0, 1.0)
    }
}

/// Derives a per-second timing epoch from a running chain of tick intervals.
pub struct TickCorrelator {
    last_tick_ms: Option<Millis>,
    chain: Option<Chain>,
    predicted_next_ms: Option<Millis>,
    consecutive_misses: usize,
}

impl Default for TickCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCorrelator {
    pub fn new() -> Self {
        Self {
            last_tick_ms: None,
            chain: None,
            predicted_next_ms: None,
            consecutive_misses: 0,
        }
    }

    pub fn chain_stats(&self) -> Option<ChainStats> {
        self.chain.as_ref().map(Chain::to_public)
    }

    pub fn predicted_next_ms(&self) -> Option<Millis> {
        self.predicted_next_ms
    }

    /// Feed one tick's trailing-edge timestamp. Returns
    /// `(epoch_ms_mod_1000, source, confidence)` once the running chain
    /// crosses the epoch-confidence threshold.
    pub fn on_tick(&mut self, timestamp_ms: Millis) -> Option<(Millis, EpochSource, f32)> {
        match self.last_tick_ms {
            None => {
                self.chain = Some(Chain::new(timestamp_ms));
            }
            Some(prev) => {
                let interval = timestamp_ms - prev;
                let chain = self.chain.get_or_insert_with(|| Chain::new(prev));
                let tolerance = chain.tolerance_ms();
                let expected = chain.expected_interval_ms();

                if (interval - expected).abs() <= tolerance {
                    chain.stats.update(interval);
                    chain.length += 1;
                    chain.end_ms = timestamp_ms;
                    chain.cumulative_drift_ms += interval - TICK_NOMINAL_INTERVAL_MS;
                    self.consecutive_misses = 0;
                    self.predicted_next_ms = Some(timestamp_ms + chain.expected_interval_ms());
                } else {
                    self.consecutive_misses += 1;
                    if self.consecutive_misses > TICK_CHAIN_MAX_MISSES {
                        self.chain = Some(Chain::new(timestamp_ms));
                        self.predicted_next_ms = None;
                        self.consecutive_misses = 0;
                    }
                }
            }
        }
        self.last_tick_ms = Some(timestamp_ms);

        let chain = self.chain.as_ref()?;
        if chain.length < TICK_CHAIN_MIN_LENGTH_FOR_EPOCH {
            return None;
        }
        let confidence = chain.confidence();
        if confidence >= EPOCH_CONFIDENCE_THRESHOLD {
            Some((timestamp_ms.rem_euclid(1000.0), EpochSource::TickChain, confidence))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_tick_train_builds_a_confident_chain() {
        let mut correlator = TickCorrelator::new();
        let mut last_epoch = None;
        for n in 0..20u64 {
            let ts = n as f32 * 1000.0;
            if let Some(epoch) = correlator.on_tick(ts) {
                last_epoch = Some(epoch);
            }
        }
        let (_, source, confidence) = last_epoch.expect("epoch should have been published");
        assert_eq!(source, EpochSource::TickChain);
        assert!(confidence >= EPOCH_CONFIDENCE_THRESHOLD);
        assert_eq!(correlator.chain_stats().unwrap().length, 20);
    }

    #[test]
    fn test_large_gap_starts_a_new_chain() {
        let mut correlator = TickCorrelator::new();
        for n in 0..10u64 {
            correlator.on_tick(n as f32 * 1000.0);
        }
        // A sequence of wildly different intervals breaks the chain.
        correlator.on_tick(10_500.0);
        correlator.on_tick(30_000.0);
        correlator.on_tick(55_000.0);
        correlator.on_tick(90_000.0);
        assert!(correlator.chain_stats().unwrap().length < 10);
    }
}
