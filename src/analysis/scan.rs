use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{AnalysisEngine, EngineConfig, SampleEncoding, SampleFormat};

/// Offline analysis of a whole WAV file through the same pipeline the live
/// capture path uses, one capture-sized chunk at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub file_info: FileInfo,
    /// One record per processed chunk.
    pub frames: Vec<FrameRecord>,
    pub stats: ScanStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
    /// Analysis frames per second at the chosen chunk size.
    pub frame_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Seconds from the start of the file.
    pub timestamp: f32,
    pub bands: Vec<f32>,
    pub target_max: f32,
    pub bpm: f32,
    /// True when this chunk registered a new beat.
    pub beat: bool,
    pub left_level: f32,
    pub right_level: f32,
    pub overall_volume: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub peak_band_magnitude: f32,
    pub peak_volume: f32,
    pub total_beats: u64,
    pub average_bpm: f32,
    pub bpm_range: (f32, f32),
    /// "Dynamic", "High", "Medium" or "Low".
    pub energy_profile: String,
}

impl ScanReport {
    /// Save the report as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Scan a WAV file and collect per-chunk analysis records plus summary
/// statistics. Chunks are fed to the engine through the same bytes+format
/// contract the capture boundary uses; a trailing partial chunk is dropped.
pub fn scan_wav<P: AsRef<Path>>(
    path: P,
    config: EngineConfig,
    chunk_frames: usize,
) -> Result<ScanReport> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let chunk_frames = chunk_frames.max(1);

    let mut reader = hound::WavReader::open(&path)
        .with_context(|| format!("failed to open {}", path_str))?;
    let spec = reader.spec();
    let channels = spec.channels;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };

    let total_frames = samples.len() / channels as usize;
    let duration_seconds = total_frames as f32 / spec.sample_rate as f32;
    let frame_rate = spec.sample_rate as f32 / chunk_frames as f32;
    info!(
        "loaded {} frames ({:.2}s) at {} Hz, {} channel(s)",
        total_frames, duration_seconds, spec.sample_rate, channels
    );

    let format = SampleFormat {
        sample_rate: spec.sample_rate,
        channels,
        encoding: SampleEncoding::F32,
    };
    let mut engine = AnalysisEngine::new(config);

    let mut frames = Vec::new();
    let mut stats = ScanStats::default();
    let mut bpm_low = f32::INFINITY;
    let mut bpm_high = f32::NEG_INFINITY;
    let mut previous_beats = 0u64;

    let samples_per_chunk = chunk_frames * channels as usize;
    let mut bytes = Vec::with_capacity(samples_per_chunk * 4);

    for (index, chunk) in samples.chunks_exact(samples_per_chunk).enumerate() {
        bytes.clear();
        for &sample in chunk {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        engine.on_audio_data(&bytes, &format);

        let snapshot = engine.snapshot();
        let timestamp = (index * chunk_frames) as f32 / spec.sample_rate as f32;
        let beat = snapshot.beat_count > previous_beats;
        previous_beats = snapshot.beat_count;

        for &band in snapshot.bands.iter() {
            stats.peak_band_magnitude = stats.peak_band_magnitude.max(band);
        }
        stats.peak_volume = stats.peak_volume.max(snapshot.overall_volume);
        if beat && snapshot.bpm > 0.0 {
            bpm_low = bpm_low.min(snapshot.bpm);
            bpm_high = bpm_high.max(snapshot.bpm);
        }

        frames.push(FrameRecord {
            timestamp,
            bands: snapshot.bands.clone(),
            target_max: snapshot.target_max,
            bpm: snapshot.bpm,
            beat,
            left_level: snapshot.left_level,
            right_level: snapshot.right_level,
            overall_volume: snapshot.overall_volume,
        });

        if frames.len() % 1000 == 0 {
            info!(
                "scanned {} frames ({:.1}s of {:.1}s)",
                frames.len(),
                timestamp,
                duration_seconds
            );
        }
    }

    stats.total_beats = previous_beats;
    let mut bpm_sum = 0.0f32;
    let mut bpm_count = 0usize;
    for frame in &frames {
        if frame.bpm > 0.0 {
            bpm_sum += frame.bpm;
            bpm_count += 1;
        }
    }
    if bpm_count > 0 {
        stats.average_bpm = bpm_sum / bpm_count as f32;
    }
    if bpm_low.is_finite() {
        stats.bpm_range = (bpm_low, bpm_high);
    }
    stats.energy_profile = classify_energy(&frames);

    info!(
        "scan complete: {} frames, {} beats, {:.1} BPM average",
        frames.len(),
        stats.total_beats,
        stats.average_bpm
    );

    Ok(ScanReport {
        file_info: FileInfo {
            filename: path_str,
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels,
            chunk_frames,
            frame_rate,
        },
        frames,
        stats,
    })
}

fn classify_energy(frames: &[FrameRecord]) -> String {
    if frames.is_empty() {
        return "Empty".to_string();
    }
    let average: f32 =
        frames.iter().map(|f| f.overall_volume).sum::<f32>() / frames.len() as f32;
    let variance: f32 = frames
        .iter()
        .map(|f| (f.overall_volume - average).powi(2))
        .sum::<f32>()
        / frames.len() as f32;

    if variance > 0.1 {
        "Dynamic"
    } else if average > 0.3 {
        "High"
    } else if average > 0.1 {
        "Medium"
    } else {
        "Low"
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44_100;

    /// 16-bit mono WAV: a quiet tone floor with a full-scale burst every
    /// 500ms (a 120 BPM click track).
    fn write_click_track(path: &Path, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (seconds * SAMPLE_RATE as f32) as usize;
        for i in 0..total {
            let t = i as f32 / SAMPLE_RATE as f32;
            let amplitude = if t % 0.5 < 0.025 { 0.9 } else { 0.05 };
            let sample = amplitude * (2.0 * PI * 440.0 * t).sin();
            writer.write_sample((sample * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn scan_config() -> EngineConfig {
        EngineConfig {
            transform_size: 2048,
            num_bands: 16,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn click_track_scan_finds_beats_near_120_bpm() {
        let path = std::env::temp_dir().join("spectrabar_click_track.wav");
        write_click_track(&path, 4.0);

        let report = scan_wav(&path, scan_config(), 1024).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(!report.frames.is_empty());
        assert_eq!(report.file_info.sample_rate, SAMPLE_RATE);
        assert!(
            report.stats.total_beats >= 4,
            "expected at least 4 beats, got {}",
            report.stats.total_beats
        );
        assert!(
            (report.stats.average_bpm - 120.0).abs() < 10.0,
            "average bpm {} too far from 120",
            report.stats.average_bpm
        );

        // Per-frame beat flags agree with the running total.
        let flagged = report.frames.iter().filter(|f| f.beat).count() as u64;
        assert_eq!(flagged, report.stats.total_beats);
    }

    #[test]
    fn report_round_trips_through_json() {
        let wav_path = std::env::temp_dir().join("spectrabar_roundtrip.wav");
        write_click_track(&wav_path, 1.0);

        let report = scan_wav(&wav_path, scan_config(), 1024).unwrap();
        std::fs::remove_file(&wav_path).ok();

        let json_path = std::env::temp_dir().join("spectrabar_roundtrip.json");
        report.save_json(&json_path).unwrap();
        let restored = ScanReport::load_json(&json_path).unwrap();
        std::fs::remove_file(&json_path).ok();

        assert_eq!(restored.frames.len(), report.frames.len());
        assert_eq!(restored.stats.total_beats, report.stats.total_beats);
        assert_eq!(restored.file_info.chunk_frames, 1024);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = scan_wav("/nonexistent/clip.wav", scan_config(), 1024);
        assert!(result.is_err());
    }
}
