use std::collections::VecDeque;

/// Frames of energy history kept for the rolling baseline.
const ENERGY_HISTORY_LEN: usize = 20;
/// Detection is suppressed until this much history has accumulated.
const WARMUP_LEN: usize = ENERGY_HISTORY_LEN / 2;
/// Absolute energy floor; near-silence never registers beats.
const MIN_BEAT_ENERGY: f32 = 0.01;
/// Hard refractory period between accepted beats (~240 BPM ceiling).
const REFRACTORY_SECS: f64 = 0.25;
/// Beat timestamps are retained only within this trailing window.
const TIMESTAMP_WINDOW_SECS: f64 = 8.0;
/// Tempo is estimated from at most this many trailing timestamps.
const TEMPO_TIMESTAMPS: usize = 9;
/// Inter-beat intervals outside this range are detection artifacts.
const MIN_INTERVAL_MS: f64 = 250.0;
const MAX_INTERVAL_MS: f64 = 2000.0;
/// Frames the beat flash stays lit for consumers.
const FLASH_FRAMES: u32 = 3;

pub const MIN_SENSITIVITY: f32 = 0.5;
pub const MAX_SENSITIVITY: f32 = 3.0;
pub const DEFAULT_SENSITIVITY: f32 = 1.3;

/// Threshold-crossing beat detector with rolling-average baseline and
/// inter-beat-interval tempo estimation.
///
/// Time is an internal clock advanced by the caller with each buffer's
/// duration, so the detector is deterministic and independent of wall-clock
/// scheduling.
pub struct BeatDetector {
    energy_history: VecDeque<f32>,
    beat_times: VecDeque<f64>,
    clock: f64,
    last_beat: Option<f64>,
    sensitivity: f32,
    bpm: f32,
    beat_count: u64,
    flash_frames: u32,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            energy_history: VecDeque::with_capacity(ENERGY_HISTORY_LEN),
            beat_times: VecDeque::new(),
            clock: 0.0,
            last_beat: None,
            sensitivity: DEFAULT_SENSITIVITY,
            bpm: 0.0,
            beat_count: 0,
            flash_frames: 0,
        }
    }

    /// Threshold multiplier over the rolling baseline, clamped to the
    /// supported range. Non-finite values are ignored.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        if sensitivity.is_finite() {
            self.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        }
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Consume one frame's energy value; `dt` is the duration of the audio
    /// buffer that produced it, in seconds.
    pub fn process_frame(&mut self, energy: f32, dt: f32) {
        if dt > 0.0 {
            self.clock += dt as f64;
        }

        self.energy_history.push_back(energy);
        if self.energy_history.len() > ENERGY_HISTORY_LEN {
            self.energy_history.pop_front();
        }
        if self.energy_history.len() < WARMUP_LEN {
            return;
        }

        // Baseline over everything except the sample under test, so a spike
        // cannot inflate its own threshold.
        let len = self.energy_history.len();
        let baseline: f32 =
            self.energy_history.iter().take(len - 1).sum::<f32>() / (len - 1) as f32;

        let refractory_clear = match self.last_beat {
            Some(t) => self.clock - t > REFRACTORY_SECS,
            None => true,
        };

        if energy > baseline * self.sensitivity && energy > MIN_BEAT_ENERGY && refractory_clear {
            self.register_beat();
        }
    }

    fn register_beat(&mut self) {
        self.last_beat = Some(self.clock);
        self.beat_times.push_back(self.clock);
        self.flash_frames = FLASH_FRAMES;
        self.beat_count += 1;

        while let Some(&oldest) = self.beat_times.front() {
            if self.clock - oldest > TIMESTAMP_WINDOW_SECS {
                self.beat_times.pop_front();
            } else {
                break;
            }
        }

        self.update_bpm();
    }

    fn update_bpm(&mut self) {
        let skip = self.beat_times.len().saturating_sub(TEMPO_TIMESTAMPS);

        let mut interval_sum = 0.0f64;
        let mut interval_count = 0u32;
        let mut previous: Option<f64> = None;
        for &timestamp in self.beat_times.iter().skip(skip) {
            if let Some(prev) = previous {
                let interval_ms = (timestamp - prev) * 1000.0;
                if (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval_ms) {
                    interval_sum += interval_ms;
                    interval_count += 1;
                }
            }
            previous = Some(timestamp);
        }

        if interval_count == 0 {
            return;
        }

        let fresh_bpm = (60_000.0 / (interval_sum / interval_count as f64)) as f32;
        self.bpm = if self.bpm > 0.0 {
            self.bpm * 0.8 + fresh_bpm * 0.2
        } else {
            fresh_bpm
        };
    }

    /// Burn down the flash counter on render ticks that carried no new audio.
    pub fn decay_flash(&mut self) {
        self.flash_frames = self.flash_frames.saturating_sub(1);
    }

    /// True for a few frames after each accepted beat.
    pub fn flash_active(&self) -> bool {
        self.flash_frames > 0
    }

    /// Smoothed tempo estimate; 0.0 until the first usable interval.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Total beats accepted since construction. Never resets.
    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}
