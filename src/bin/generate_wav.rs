//! Generate a synthetic WWV/WWVH I/Q WAV capture for testing and
//! demonstration. Requires the `simulation` feature.

use anyhow::{Context, Result};
use clap::Parser;
use wwv_sync::simulation::{NoiseConfig, apply_noise, default_minute_symbols, generate_minute};
use wwv_sync::Station;

#[derive(Parser, Debug)]
#[command(name = "generate_wav", about = "Generate a synthetic WWV/WWVH I/Q capture")]
struct Args {
    /// Output WAV path.
    output: std::path::PathBuf,

    /// Station to synthesize.
    #[arg(long, value_enum, default_value = "wwv")]
    station: StationArg,

    /// Number of minutes of signal to generate.
    #[arg(long, default_value_t = 1)]
    minutes: usize,

    /// Sample rate of the generated capture.
    #[arg(long, default_value_t = 50_000.0)]
    sample_rate: f32,

    /// 100 Hz subcarrier modulation depth, 0.0-1.0.
    #[arg(long, default_value_t = 0.3)]
    subcarrier_depth: f32,

    /// Additive white Gaussian noise SNR, in dB. Omit for a clean capture.
    #[arg(long)]
    awgn_snr_db: Option<f32>,

    /// RNG seed for reproducible noise.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum StationArg {
    Wwv,
    Wwvh,
}

impl From<StationArg> for Station {
    fn from(value: StationArg) -> Self {
        match value {
            StationArg::Wwv => Station::Wwv,
            StationArg::Wwvh => Station::Wwvh,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let symbols = default_minute_symbols();
    let mut samples = Vec::new();
    for _ in 0..args.minutes {
        samples.extend(generate_minute(
            args.station.into(),
            args.sample_rate,
            &symbols,
            args.subcarrier_depth,
        ));
    }

    if let Some(snr_db) = args.awgn_snr_db {
        let noise_config = NoiseConfig::default().with_seed(args.seed).with_awgn(snr_db);
        samples = apply_noise(&samples, &noise_config, args.sample_rate);
    }

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: args.sample_rate as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(&args.output, spec).with_context(|| format!("creating {:?}", args.output))?;
    for sample in &samples {
        writer.write_sample(to_i16(sample.re))?;
        writer.write_sample(to_i16(sample.im))?;
    }
    writer.finalize()?;

    println!(
        "wrote {} minute(s) of {:?} at {} Hz to {:?}",
        args.minutes,
        Into::<Station>::into(args.station),
        args.sample_rate,
        args.output
    );
    Ok(())
}

fn to_i16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
