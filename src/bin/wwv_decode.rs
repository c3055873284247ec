//! Reference CLI: decode a recorded complex-baseband WAV capture and print
//! the recovered frame time and BCD symbol stream.

use anyhow::{Context, Result, bail};
use clap::Parser;
use wwv_sync::{DetectorManager, EngineConfig, EngineEvent, Station};

#[derive(Parser, Debug)]
#[command(name = "wwv_decode", about = "Decode a WWV/WWVH I/Q WAV capture")]
struct Args {
    /// Path to a stereo WAV file; left channel is I, right channel is Q.
    capture: std::path::PathBuf,

    /// Station the capture was tuned to.
    #[arg(long, value_enum, default_value = "wwv")]
    station: StationArg,

    /// Path to a TOML config overriding engine defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Decimation factor between the detector-rate feed and the file's
    /// sample rate: every Nth sample also feeds the display-rate tone
    /// tracker.
    #[arg(long, default_value_t = 4)]
    display_decimation: usize,
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

    let mut reader =
        hound::WavReader::open(&args.capture).with_context(|| format!("opening {:?}", args.capture))?;
    let spec = reader.spec();
    if spec.channels != 2 {
        bail!("expected a stereo (I/Q) WAV file, got {} channel(s)", spec.channels);
    }

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
            EngineConfig::from_toml(&text)?
        }
        None => EngineConfig::default(),
    };
    config.audio.station = args.station.into();
    config.audio.sample_rate_detector_hz = spec.sample_rate as f32;
    config.audio.sample_rate_display_hz = spec.sample_rate as f32 / args.display_decimation as f32;

    let mut manager = DetectorManager::new(config)?;

    if spec.sample_format != hound::SampleFormat::Int {
        bail!("only integer PCM WAV captures are supported, got {:?}", spec.sample_format);
    }
    let max_amplitude = (1i64 << (spec.bits_per_sample - 1)) as f32;

    let mut samples = reader.samples::<i32>();
    let mut frame_index: usize = 0;
    loop {
        let Some(left) = samples.next() else { break };
        let Some(right) = samples.next() else { break };
        let i = left? as f32 / max_amplitude;
        let q = right? as f32 / max_amplitude;

        for event in manager.push_detector_sample(i, q) {
            match event {
                EngineEvent::Symbol(symbol) => {
                    println!(
                        "second={:02} symbol={:?} confidence={:.2} source={:?}",
                        symbol.second, symbol.symbol, symbol.confidence, symbol.source
                    );
                }
                EngineEvent::FrameTime(frame_time) => {
                    if frame_index % spec.sample_rate as usize == 0 {
                        println!(
                            "t={:.1}s second={:02} state={:?} confidence={:.2}",
                            frame_index as f32 / spec.sample_rate as f32,
                            frame_time.current_second,
                            frame_time.state,
                            frame_time.confidence,
                        );
                    }
                }
            }
        }

        if frame_index % args.display_decimation == 0 {
            manager.push_display_sample(i, q)?;
        }
        frame_index += 1;
    }

    let final_time = manager.frame_time();
    println!(
        "final: second={:02} state={:?} confidence={:.2}",
        final_time.current_second, final_time.state, final_time.confidence
    );
    Ok(())
}
