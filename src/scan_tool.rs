use anyhow::Result;
use clap::Parser;
use log::info;

use spectrabar::analysis::{scan_wav, EngineConfig};

#[derive(Parser)]
#[command(name = "spectrabar-scan")]
#[command(about = "Run the spectrabar analysis pipeline over a WAV file")]
struct Args {
    /// WAV file to scan
    #[arg()]
    input_file: String,

    /// Write the full per-frame report as JSON
    #[arg(short, long)]
    output: Option<String>,

    /// Number of spectrum bands
    #[arg(long, default_value = "32")]
    bands: usize,

    /// Beat sensitivity threshold multiplier (0.5 - 3.0)
    #[arg(long, default_value = "1.3")]
    sensitivity: f32,

    /// Frames per analysis chunk (smaller = finer time resolution)
    #[arg(long, default_value = "1024")]
    chunk_frames: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Spectrabar scan tool");
    info!("Input file: {}", args.input_file);
    info!(
        "Bands: {}, sensitivity: {}, chunk: {} frames",
        args.bands, args.sensitivity, args.chunk_frames
    );

    let config = EngineConfig {
        num_bands: args.bands,
        beat_sensitivity: args.sensitivity,
        ..EngineConfig::default()
    };
    let report = scan_wav(&args.input_file, config, args.chunk_frames)?;

    info!("=== SCAN RESULTS ===");
    info!("Duration: {:.2} seconds", report.file_info.duration_seconds);
    info!("Total frames: {}", report.frames.len());
    info!("Frame rate: {:.2} Hz", report.file_info.frame_rate);
    info!("Total beats detected: {}", report.stats.total_beats);
    info!("Average BPM: {:.1}", report.stats.average_bpm);
    info!(
        "BPM range: {:.1} - {:.1}",
        report.stats.bpm_range.0, report.stats.bpm_range.1
    );
    info!("Peak band magnitude: {:.6}", report.stats.peak_band_magnitude);
    info!("Peak volume: {:.6}", report.stats.peak_volume);
    info!("Energy profile: {}", report.stats.energy_profile);

    if let Some(output) = &args.output {
        info!("Saving report to: {}", output);
        report.save_json(output)?;
        let size = std::fs::metadata(output)?.len();
        info!("Report saved ({:.1} KB)", size as f64 / 1024.0);
    }

    Ok(())
}
