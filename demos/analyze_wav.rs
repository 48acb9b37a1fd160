//! Example: Estimate source direction over a multichannel WAV recording
//!
//! Usage:
//!   cargo run --release --example analyze_wav -- [--json] [--parallel] [--config FILE] <file.wav>
//!
//! Notes:
//! - 6-channel files are read as ReSpeaker v2.0 captures (microphones on channels 2..=5).
//! - 4-channel files are read as the four microphones in ring order.
//! - `--config` takes a JSON `AnalysisConfig`; missing fields keep their defaults.

use std::env;
use stratum_doa::preprocessing::channel_mixer::signal_from_capture;
use stratum_doa::{analyze_doa, AnalysisConfig, CaptureLayout};

fn load_wav(path: &str) -> Result<(Vec<f32>, u16, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut parallel = false;
    let mut config_path: Option<String> = None;
    let mut path: Option<String> = None;

    while !args.is_empty() {
        let a = args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--parallel" => parallel = true,
            "--config" => {
                if args.is_empty() {
                    return Err("--config requires a value".into());
                }
                config_path = Some(args.remove(0));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_wav [--json] [--parallel] [--config FILE] <file.wav>\n\
                     \n\
                     --json       Emit one JSON object per estimate (JSONL)\n\
                     --parallel   Spread windows over all cores\n\
                     --config F   JSON analysis configuration\n"
                );
                return Ok(());
            }
            _ => path = Some(a),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide a WAV file path. Use --help for usage.");
        std::process::exit(2);
    };

    let mut config = match &config_path {
        Some(p) => serde_json::from_str::<AnalysisConfig>(&std::fs::read_to_string(p)?)?,
        None => AnalysisConfig::default(),
    };
    config.parallel |= parallel;

    let (samples, channels, sample_rate) = load_wav(&path)?;
    let layout = match channels {
        6 => CaptureLayout::RESPEAKER_V2,
        4 => CaptureLayout::MICS_ONLY,
        n => return Err(format!("Unsupported channel count {} (expected 4 or 6)", n).into()),
    };

    let signal = signal_from_capture(&samples, layout, sample_rate)?;
    let analysis = analyze_doa(&signal, config)?;

    if json {
        for estimate in &analysis.estimates {
            println!("{}", serde_json::to_string(estimate)?);
        }
        return Ok(());
    }

    println!(
        "{}: {:.2}s at {} Hz, {} windows ({} silent)",
        path,
        analysis.metadata.duration_seconds,
        analysis.metadata.sample_rate,
        analysis.metadata.windows.windows_total,
        analysis.metadata.windows.windows_silent
    );
    println!("{:>10}  {:>8}  {:>10}  {}", "Time (s)", "Angle", "Confidence", "Direction");
    for estimate in &analysis.estimates {
        println!(
            "{:>10.3}  {:>7.1}°  {:>10.2}  {}",
            estimate.timestamp_seconds, estimate.angle_degrees, estimate.confidence, estimate.direction
        );
    }
    println!(
        "Processing time: {:.2} ms",
        analysis.metadata.processing_time_ms
    );

    Ok(())
}
