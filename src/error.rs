use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum EngineError {
    #[error("FFT size must be a power of two, got {0}")]
    FftSizeNotPowerOfTwo(usize),

    #[error("FFT input block wrong length: need {needed}, have {available}")]
    FftBlockLength { needed: usize, available: usize },

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tunable {name} out of range: {value} not in [{min}, {max}]")]
    TunableOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Log sink I/O error: {0}")]
    LogSinkIo(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
