//! Pulse detectors: one per physical signal component (tick, minute marker,
//! BCD time-domain, BCD frequency-domain). Each owns its FFT instance,
//! sample buffers, and adaptive state; none are shared.

pub mod bcd_freq;
pub mod bcd_time;
pub mod marker;
pub mod tick;

pub use bcd_freq::BcdFreqDetector;
pub use bcd_time::BcdTimeDetector;
pub use marker::MarkerDetector;
pub use tick::{TickDetector, TickDetectorEvent};
