//! Fixed-delay IIR comb filter used to enhance periodic tick energy.

use crate::signal_processing::filter::Filter;

/// `y[n] = alpha*y[n-1] + (1-alpha)*(x[n] + x[n-D])/2`
///
/// The delay line may be heap-allocated by the filter itself, or supplied
/// by the caller for pre-sized reuse across many filter instances.
pub struct CombFilter {
    delay: Vec<f32>,
    pos: usize,
    alpha: f32,
    last_output: f32,
}

impl CombFilter {
    /// Allocate a fresh, zeroed delay line of `delay_samples` on the heap.
    pub fn new(delay_samples: usize, alpha: f32) -> Self {
        Self::with_buffer(vec![0.0; delay_samples.max(1)], alpha)
    }

    /// Use a caller-supplied buffer as the delay line. The buffer's current
    /// contents become the initial delay-line state; its length is the
    /// delay in samples.
    pub fn with_buffer(buffer: Vec<f32>, alpha: f32) -> Self {
        assert!(!buffer.is_empty(), "comb filter delay must be >= 1 sample");
        Self {
            delay: buffer,
            pos: 0,
            alpha,
            last_output: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.delay.iter_mut().for_each(|v| *v = 0.0);
        self.last_output = 0.0;
        self.pos = 0;
    }

    pub fn delay_samples(&self) -> usize {
        self.delay.len()
    }
}

impl Filter for CombFilter {
    fn process(&mut self, sample: f32) -> f32 {
        let delayed = self.delay[self.pos];
        let output = self.alpha * self.last_output + (1.0 - self.alpha) * (sample + delayed) / 2.0;
        self.delay[self.pos] = sample;
        self.pos = (self.pos + 1) % self.delay.len();
        self.last_output = output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_state() {
        let mut comb = CombFilter::new(4, 0.99);
        for _ in 0..20 {
            comb.process(1.0);
        }
        comb.reset();
        assert_eq!(comb.process(0.0), 0.0);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut comb = CombFilter::new(50, 0.99);
        for _ in 0..1000 {
            assert_eq!(comb.process(0.0), 0.0);
        }
    }

    #[test]
    fn test_periodic_tick_reinforced() {
        // A tick every D samples should build up larger steady-state output
        // than an isolated, non-repeating impulse of the same height.
        let d = 50;
        let mut comb = CombFilter::new(d, 0.9);
        let mut periodic_peak = 0.0f32;
        for n in 0..2000 {
            let x = if n % d == 0 { 1.0 } else { 0.0 };
            periodic_peak = periodic_peak.max(comb.process(x));
        }

        let mut comb2 = CombFilter::new(d, 0.9);
        let mut isolated_peak = 0.0f32;
        for n in 0..2000 {
            let x = if n == 1000 { 1.0 } else { 0.0 };
            isolated_peak = isolated_peak.max(comb2.process(x));
        }

        assert!(periodic_peak > isolated_peak);
    }

    #[test]
    fn test_with_buffer_constructor() {
        let mut comb = CombFilter::with_buffer(vec![0.0; 10], 0.99);
        assert_eq!(comb.delay_samples(), 10);
        comb.process(1.0);
    }
}
