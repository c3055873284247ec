//! Noise and propagation-impairment models for synthetic WWV/WWVH
//! captures: additive white noise, Rayleigh/Rician fading, and impulsive
//! interference, all applied directly to a complex-baseband sample stream.

use crate::types::Sample;
use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f32::consts::PI;

#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub additive: Option<AdditiveNoiseConfig>,
    pub fading: Option<FadingConfig>,
    pub impulse: Option<ImpulseNoiseConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, snr_db: f32) -> Self {
        self.additive = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    pub fn with_fading(mut self, fading_type: FadingType, doppler_spread_hz: f32) -> Self {
        self.fading = Some(FadingConfig {
            fading_type,
            doppler_spread_hz,
        });
        self
    }

    pub fn with_impulse(mut self, rate_hz: f32, amplitude: f32, duration_samples: usize) -> Self {
        self.impulse = Some(ImpulseNoiseConfig {
            rate_hz,
            amplitude,
            duration_samples,
        });
        self
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f32,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FadingType {
    Rayleigh,
    Rician { k_factor: f32 },
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct FadingConfig {
    #[serde(flatten)]
    pub fading_type: FadingType,
    pub doppler_spread_hz: f32,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImpulseNoiseConfig {
    pub rate_hz: f32,
    pub amplitude: f32,
    pub duration_samples: usize,
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub fn signal_power(signal: &[Sample]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|s| s.norm_sqr()).sum::<f32>() / signal.len() as f32
}

fn apply_additive_noise(signal: &mut [Sample], config: &AdditiveNoiseConfig, rng: &mut ChaCha8Rng) {
    let sig_power = signal_power(signal);
    if sig_power == 0.0 {
        return;
    }

    let snr_linear = 10.0_f32.powf(config.snr_db / 10.0);
    // Split the target noise power evenly across I and Q so the complex
    // noise power matches the requested SNR.
    let noise_power_per_rail = sig_power / snr_linear / 2.0;
    let noise_std = noise_power_per_rail.sqrt();
    let normal = Normal::new(0.0, noise_std as f64).unwrap();

    for sample in signal.iter_mut() {
        sample.re += normal.sample(rng) as f32;
        sample.im += normal.sample(rng) as f32;
    }
}

fn apply_fading(signal: &mut [Sample], config: &FadingConfig, sample_rate: f32, rng: &mut ChaCha8Rng) {
    let n = signal.len();
    if n == 0 {
        return;
    }

    let normal = Normal::new(0.0, 1.0).unwrap();
    let fd = config.doppler_spread_hz;
    let mut fading_envelope = vec![1.0f32; n];

    if fd > 0.0 {
        let num_sinusoids = 16;
        let mut real_part = vec![0.0f32; n];
        let mut imag_part = vec![0.0f32; n];

        for _ in 0..num_sinusoids {
            let theta: f32 = rng.random::<f32>() * 2.0 * PI;
            let freq = fd * theta.cos();
            let phi: f32 = rng.random::<f32>() * 2.0 * PI;

            for (i, (real, imag)) in real_part.iter_mut().zip(imag_part.iter_mut()).enumerate() {
                let t = i as f32 / sample_rate;
                let phase = 2.0 * PI * freq * t + phi;
                *real += phase.cos();
                *imag += phase.sin();
            }
        }

        let scale = 1.0 / (num_sinusoids as f32).sqrt();
        for i in 0..n {
            real_part[i] *= scale;
            imag_part[i] *= scale;
        }

        match &config.fading_type {
            FadingType::Rayleigh => {
                for i in 0..n {
                    fading_envelope[i] =
                        (real_part[i] * real_part[i] + imag_part[i] * imag_part[i]).sqrt();
                }
            }
            FadingType::Rician { k_factor } => {
                let k = *k_factor;
                let los_amplitude = (k / (k + 1.0)).sqrt();
                let scatter_amplitude = (1.0 / (k + 1.0)).sqrt();

                for i in 0..n {
                    let real_total = los_amplitude + scatter_amplitude * real_part[i];
                    let imag_total = scatter_amplitude * imag_part[i];
                    fading_envelope[i] = (real_total * real_total + imag_total * imag_total).sqrt();
                }
            }
        }
    } else {
        match &config.fading_type {
            FadingType::Rayleigh => {
                let x: f32 = normal.sample(rng) as f32;
                let y: f32 = normal.sample(rng) as f32;
                let env = (x * x + y * y).sqrt();
                for val in fading_envelope.iter_mut() {
                    *val = env;
                }
            }
            FadingType::Rician { k_factor } => {
                let k = *k_factor;
                let los = (k / (k + 1.0)).sqrt();
                let scatter = (1.0 / (k + 1.0)).sqrt();
                let x: f32 = normal.sample(rng) as f32;
                let y: f32 = normal.sample(rng) as f32;
                let real = los + scatter * x;
                let imag = scatter * y;
                let env = (real * real + imag * imag).sqrt();
                for val in fading_envelope.iter_mut() {
                    *val = env;
                }
            }
        }
    }

    for (sample, &env) in signal.iter_mut().zip(fading_envelope.iter()) {
        sample.re *= env;
        sample.im *= env;
    }
}

fn apply_impulse_noise(
    signal: &mut [Sample],
    config: &ImpulseNoiseConfig,
    sample_rate: f32,
    rng: &mut ChaCha8Rng,
) {
    let n = signal.len();
    if n == 0 || config.rate_hz <= 0.0 {
        return;
    }

    let avg_samples_between_impulses = sample_rate / config.rate_hz;

    let mut pos = 0usize;
    loop {
        let interval = (rng.random::<f32>() * 2.0 * avg_samples_between_impulses) as usize;
        pos += interval.max(1);

        if pos >= n {
            break;
        }

        let phase: f32 = rng.random::<f32>() * 2.0 * PI;
        let end = (pos + config.duration_samples).min(n);

        for sample in signal[pos..end].iter_mut() {
            sample.re += config.amplitude * phase.cos();
            sample.im += config.amplitude * phase.sin();
        }
    }
}

/// Apply every configured impairment to a clean complex-baseband signal,
/// in propagation order: fading, then additive noise, then impulsive
/// interference.
pub fn apply_noise(clean_signal: &[Sample], config: &NoiseConfig, sample_rate: f32) -> Vec<Sample> {
    let mut signal = clean_signal.to_vec();
    let mut rng = create_rng(config.seed);

    if let Some(ref fading_config) = config.fading {
        apply_fading(&mut signal, fading_config, sample_rate, &mut rng);
    }

    if let Some(ref additive_config) = config.additive {
        apply_additive_noise(&mut signal, additive_config, &mut rng);
    }

    if let Some(ref impulse_config) = config.impulse {
        apply_impulse_noise(&mut signal, impulse_config, sample_rate, &mut rng);
    }

    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_tone(n: usize, freq_hz: f32, sample_rate: f32) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate;
                let phase = 2.0 * PI * freq_hz * t;
                Sample::new(phase.cos(), phase.sin())
            })
            .collect()
    }

    #[test]
    fn test_additive_noise_changes_signal() {
        let clean = clean_tone(1000, 500.0, 48000.0);
        let config = NoiseConfig {
            seed: Some(42),
            additive: Some(AdditiveNoiseConfig { snr_db: 10.0 }),
            ..Default::default()
        };

        let noisy = apply_noise(&clean, &config, 48000.0);

        assert_eq!(clean.len(), noisy.len());
        assert_ne!(clean, noisy);
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let clean = clean_tone(1000, 500.0, 48000.0);
        let config = NoiseConfig {
            seed: Some(12345),
            additive: Some(AdditiveNoiseConfig { snr_db: 20.0 }),
            ..Default::default()
        };

        let noisy1 = apply_noise(&clean, &config, 48000.0);
        let noisy2 = apply_noise(&clean, &config, 48000.0);

        assert_eq!(noisy1, noisy2);
    }

    #[test]
    fn test_fading_rayleigh_preserves_length_and_changes_signal() {
        let clean = clean_tone(10000, 500.0, 48000.0);
        let config = NoiseConfig {
            seed: Some(42),
            fading: Some(FadingConfig {
                fading_type: FadingType::Rayleigh,
                doppler_spread_hz: 10.0,
            }),
            ..Default::default()
        };

        let faded = apply_noise(&clean, &config, 48000.0);

        assert_eq!(clean.len(), faded.len());
        assert!(signal_power(&faded) > 0.0);
    }

    #[test]
    fn test_impulse_noise_adds_spikes() {
        let clean = vec![Sample::new(0.0, 0.0); 10000];
        let config = NoiseConfig {
            seed: Some(42),
            impulse: Some(ImpulseNoiseConfig {
                rate_hz: 100.0,
                amplitude: 1.0,
                duration_samples: 5,
            }),
            ..Default::default()
        };

        let noisy = apply_noise(&clean, &config, 48000.0);

        let spike_count = noisy.iter().filter(|s| s.norm() > 0.5).count();
        assert!(spike_count > 10);
        assert!(spike_count < 1000);
    }

    #[test]
    fn test_builder_pattern() {
        let config = NoiseConfig::default()
            .with_seed(42)
            .with_awgn(20.0)
            .with_fading(FadingType::Rayleigh, 5.0);

        assert_eq!(config.seed, Some(42));
        assert!(config.additive.is_some());
        assert!(config.fading.is_some());
    }
}
