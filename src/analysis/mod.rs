pub mod bands;
pub mod beat;
pub mod engine;
pub mod scan;
pub mod transform;
pub mod volume;

pub use bands::BandProcessor;
pub use beat::BeatDetector;
pub use engine::{AnalysisEngine, SnapshotHandle};
pub use scan::{scan_wav, ScanReport};
pub use transform::{fft_in_place, Direction};
pub use volume::VolumeAnalyzer;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// PCM encoding of one sample in a capture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian, scaled by 1/32768.
    I16,
    /// 32-bit float little-endian, used as-is.
    F32,
}

impl SampleEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::I16 => 2,
            SampleEncoding::F32 => 4,
        }
    }
}

/// Declared layout of a raw capture buffer, supplied by the capture boundary
/// alongside every delivered chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

/// Construction parameters for [`AnalysisEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Transform window length; must be a power of two.
    pub transform_size: usize,
    /// Initial number of spectrum bands.
    pub num_bands: usize,
    /// Initial beat threshold multiplier.
    pub beat_sensitivity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transform_size: 8192,
            num_bands: 32,
            beat_sensitivity: beat::DEFAULT_SENSITIVITY,
        }
    }
}

/// Live tuning values shared between the processing context and UI/input
/// contexts. Each value is a single atomic word, so the pipeline can never
/// observe a torn write; it reads them once at the top of a processing call.
#[derive(Debug)]
pub struct Tuning {
    num_bands: AtomicUsize,
    beat_sensitivity: AtomicU32,
    fullscreen: AtomicBool,
}

impl Tuning {
    pub fn new(num_bands: usize, beat_sensitivity: f32) -> Self {
        let tuning = Self {
            num_bands: AtomicUsize::new(num_bands.max(1)),
            beat_sensitivity: AtomicU32::new(beat::DEFAULT_SENSITIVITY.to_bits()),
            fullscreen: AtomicBool::new(false),
        };
        tuning.set_beat_sensitivity(beat_sensitivity);
        tuning
    }

    /// Zero is ignored; a band count never reaches the pipeline invalid.
    pub fn set_num_bands(&self, num_bands: usize) {
        if num_bands > 0 {
            self.num_bands.store(num_bands, Ordering::Relaxed);
        }
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands.load(Ordering::Relaxed)
    }

    /// Clamped to the supported range; non-finite values are ignored.
    pub fn set_beat_sensitivity(&self, sensitivity: f32) {
        if sensitivity.is_finite() {
            let clamped = sensitivity.clamp(beat::MIN_SENSITIVITY, beat::MAX_SENSITIVITY);
            self.beat_sensitivity.store(clamped.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn beat_sensitivity(&self) -> f32 {
        f32::from_bits(self.beat_sensitivity.load(Ordering::Relaxed))
    }

    /// Layout hint for the rendering collaborator; carried here so every
    /// consumer sees the same value.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.fullscreen.store(fullscreen, Ordering::Relaxed);
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::Relaxed)
    }
}

/// One immutable, fully computed result of the analysis pipeline for a single
/// processed buffer. Published once per pipeline run; consumers never see a
/// partially updated frame.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    /// Smoothed band magnitudes, band 0 lowest frequency.
    pub bands: Vec<f32>,
    /// Per-band peak-hold markers.
    pub band_peaks: Vec<f32>,
    /// Auto-gain reference magnitude, always above zero.
    pub target_max: f32,
    /// Smoothed tempo estimate; 0.0 before the first usable interval.
    pub bpm: f32,
    /// True for a few frames after each detected beat.
    pub beat_flash: bool,
    /// Monotonic count of beats since engine construction.
    pub beat_count: u64,
    pub left_level: f32,
    pub right_level: f32,
    pub left_peak_hold: f32,
    pub right_peak_hold: f32,
    pub overall_volume: f32,
    /// Copy of the engine's mono sample ring for oscilloscope-style
    /// consumers. Samples at `waveform_position..` followed by
    /// `..waveform_position` read oldest to newest.
    pub waveform: Vec<f32>,
    pub waveform_position: usize,
}

impl AnalysisSnapshot {
    /// All-zero snapshot, published until the first buffer is processed.
    pub fn empty(num_bands: usize, waveform_len: usize) -> Self {
        Self {
            bands: vec![0.0; num_bands],
            band_peaks: vec![0.0; num_bands],
            target_max: bands::MIN_MAGNITUDE,
            bpm: 0.0,
            beat_flash: false,
            beat_count: 0,
            left_level: 0.0,
            right_level: 0.0,
            left_peak_hold: 0.0,
            right_peak_hold: 0.0,
            overall_volume: 0.0,
            waveform: vec![0.0; waveform_len],
            waveform_position: 0,
        }
    }
}
