//! Signal-processing primitives shared across detectors: FFT, biquad/comb
//! filters, and the frequency-domain tone tracker.
//!
//! Every detector owns its own instance of these types; nothing here is
//! shared or pooled across detectors.

pub mod biquad;
pub mod comb;
pub mod fft;
pub mod frame;
pub mod sliding_window;
pub mod tone;

pub use biquad::{BiquadCascade, BiquadSection, ChannelFilterBank, DesignedBandpass, DesignedLowpass};
pub use comb::CombFilter;
pub use fft::{Fft, Window};
pub use frame::FrameAccumulator;
pub use sliding_window::SlidingWindowAccumulator;
pub use tone::{ToneTracker, parabolic_interpolate};
