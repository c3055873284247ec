//! Synthetic WWV/WWVH I/Q capture generation, for test fixtures and the
//! `generate_wav` binary. Gated behind the `simulation` feature so a
//! production build never links `rand`.

mod noise;
mod signal;

pub use noise::{
    AdditiveNoiseConfig, FadingConfig, FadingType, ImpulseNoiseConfig, NoiseConfig, apply_noise,
    signal_power,
};
pub use signal::{default_minute_symbols, generate_minute, split_iq};
