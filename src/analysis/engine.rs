use log::{debug, info, warn};
use num_complex::Complex;
use std::sync::{Arc, Mutex};

use super::transform::{fft_in_place, Direction};
use super::{
    AnalysisSnapshot, BandProcessor, BeatDetector, EngineConfig, SampleEncoding, SampleFormat,
    Tuning, VolumeAnalyzer,
};

/// Read-only subscription to the most recently published snapshot, for the
/// rendering context. Cheap to clone and safe to hold on another thread.
#[derive(Clone)]
pub struct SnapshotHandle {
    slot: Arc<Mutex<Arc<AnalysisSnapshot>>>,
}

impl SnapshotHandle {
    /// The latest complete snapshot. The lock is held only for the Arc clone.
    pub fn latest(&self) -> Arc<AnalysisSnapshot> {
        self.slot.lock().unwrap().clone()
    }
}

/// Owns the full analysis pipeline and turns raw capture buffers into
/// published [`AnalysisSnapshot`]s.
///
/// One producer context calls [`on_audio_data`](Self::on_audio_data)
/// synchronously per delivered buffer; rendering reads through
/// [`subscribe`](Self::subscribe) at its own cadence. The producer side never
/// blocks on the consumer.
pub struct AnalysisEngine {
    transform_size: usize,
    /// Mono sample ring, length `transform_size`.
    window: Vec<f32>,
    write_pos: usize,
    /// Reused transform working buffer; never exposed outside the engine.
    scratch: Vec<Complex<f32>>,
    bands: BandProcessor,
    beat: BeatDetector,
    volume: VolumeAnalyzer,
    tuning: Arc<Tuning>,
    latest: Arc<AnalysisSnapshot>,
    published: Arc<Mutex<Arc<AnalysisSnapshot>>>,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        let transform_size = if config.transform_size.is_power_of_two() && config.transform_size >= 2
        {
            config.transform_size
        } else {
            let rounded = config.transform_size.max(2).next_power_of_two();
            warn!(
                "transform size {} is not a power of two, using {}",
                config.transform_size, rounded
            );
            rounded
        };
        let num_bands = config.num_bands.max(1);

        info!(
            "analysis engine: transform size {}, {} bands, sensitivity {:.2}",
            transform_size, num_bands, config.beat_sensitivity
        );

        let initial = Arc::new(AnalysisSnapshot::empty(num_bands, transform_size));
        Self {
            transform_size,
            window: vec![0.0; transform_size],
            write_pos: 0,
            scratch: vec![Complex::new(0.0, 0.0); transform_size],
            bands: BandProcessor::new(num_bands),
            beat: BeatDetector::new(),
            volume: VolumeAnalyzer::new(),
            tuning: Arc::new(Tuning::new(num_bands, config.beat_sensitivity)),
            latest: initial.clone(),
            published: Arc::new(Mutex::new(initial)),
        }
    }

    /// Entry point for the capture boundary: one raw buffer per callback.
    ///
    /// Empty or malformed buffers are absorbed (the previous snapshot stays
    /// published); a trailing partial frame is dropped. Nothing here blocks,
    /// sleeps or errors outward.
    pub fn on_audio_data(&mut self, data: &[u8], format: &SampleFormat) {
        // Read tuning once so the whole run sees one consistent pair.
        let num_bands = self.tuning.num_bands();
        let sensitivity = self.tuning.beat_sensitivity();

        if data.is_empty() || format.sample_rate == 0 || format.channels == 0 {
            debug!("skipping unusable capture buffer ({} bytes)", data.len());
            return;
        }

        let channels = format.channels as usize;
        let bytes_per_sample = format.encoding.bytes_per_sample();
        let frame_bytes = channels * bytes_per_sample;
        let frames = data.len() / frame_bytes;
        if frames == 0 {
            return;
        }

        let mut max_left = 0.0f32;
        let mut max_right = 0.0f32;
        let mut max_overall = 0.0f32;
        let mut energy_sum = 0.0f64;

        for frame in 0..frames {
            let base = frame * frame_bytes;
            let mut sum = 0.0f32;
            for ch in 0..channels {
                let offset = base + ch * bytes_per_sample;
                let sample = match format.encoding {
                    SampleEncoding::I16 => {
                        i16::from_le_bytes([data[offset], data[offset + 1]]) as f32 / 32768.0
                    }
                    SampleEncoding::F32 => f32::from_le_bytes([
                        data[offset],
                        data[offset + 1],
                        data[offset + 2],
                        data[offset + 3],
                    ]),
                };
                // Non-finite input must never reach the pipeline.
                let sample = if sample.is_finite() { sample } else { 0.0 };

                let magnitude = sample.abs();
                if ch == 0 {
                    max_left = max_left.max(magnitude);
                }
                if ch == 1 {
                    max_right = max_right.max(magnitude);
                }
                max_overall = max_overall.max(magnitude);
                sum += sample;
            }

            let mono = sum / channels as f32;
            self.window[self.write_pos] = mono;
            self.write_pos = (self.write_pos + 1) % self.transform_size;
            energy_sum += f64::from(mono * mono);
        }
        if channels == 1 {
            max_right = max_left;
        }

        let energy = (energy_sum / frames as f64) as f32;
        let dt = frames as f32 / format.sample_rate as f32;

        // Chronological copy of the ring into the working buffer, oldest
        // sample first.
        for i in 0..self.transform_size {
            let index = (self.write_pos + i) % self.transform_size;
            self.scratch[i] = Complex::new(self.window[index], 0.0);
        }
        fft_in_place(&mut self.scratch, Direction::Forward);
        self.bands
            .process(&self.scratch, format.sample_rate as f32, num_bands);

        self.beat.set_sensitivity(sensitivity);
        self.beat.process_frame(energy, dt);
        self.volume.process_frame(max_left, max_right, max_overall);

        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = Arc::new(AnalysisSnapshot {
            bands: self.bands.smoothed().to_vec(),
            band_peaks: self.bands.peak_hold().to_vec(),
            target_max: self.bands.target_max(),
            bpm: self.beat.bpm(),
            beat_flash: self.beat.flash_active(),
            beat_count: self.beat.beat_count(),
            left_level: self.volume.left_level(),
            right_level: self.volume.right_level(),
            left_peak_hold: self.volume.left_peak_hold(),
            right_peak_hold: self.volume.right_peak_hold(),
            overall_volume: self.volume.overall(),
            waveform: self.window.clone(),
            waveform_position: self.write_pos,
        });
        self.latest = snapshot.clone();

        // The capture context must never wait on the renderer; if the slot is
        // busy this publish is dropped and the previous complete snapshot
        // stays visible.
        if let Ok(mut slot) = self.published.try_lock() {
            *slot = snapshot;
        }
    }

    /// Most recent snapshot, including one produced this call.
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        self.latest.clone()
    }

    /// Subscription handle for the rendering context.
    pub fn subscribe(&self) -> SnapshotHandle {
        SnapshotHandle {
            slot: self.published.clone(),
        }
    }

    /// Shared tuning handle for UI/input contexts.
    pub fn tuning(&self) -> Arc<Tuning> {
        self.tuning.clone()
    }

    pub fn set_num_bands(&self, num_bands: usize) {
        self.tuning.set_num_bands(num_bands);
    }

    pub fn set_beat_sensitivity(&self, sensitivity: f32) {
        self.tuning.set_beat_sensitivity(sensitivity);
    }

    /// Called by the renderer on ticks that carried no new audio, so the
    /// beat flash fades over a fixed number of visual frames.
    pub fn decay_beat_flash(&mut self) {
        self.beat.decay_flash();
    }
}
