/// Frames a VU peak is held before the linear fall begins.
const HOLD_FRAMES: u32 = 30;
/// Linear fall applied to an expired VU peak each frame.
const HOLD_FALL_STEP: f32 = 0.02;
/// Geometric decay of the fast peak tracker (5% fall per frame).
const FAST_PEAK_DECAY: f32 = 0.95;

/// Loudness state for a single channel.
///
/// `level` is the smoothed meter body, `peak` a fast tracker that rises
/// instantly and falls geometrically, `peak_hold` the VU-style marker that
/// holds for a while before falling in fixed steps.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    level: f32,
    peak: f32,
    peak_hold: f32,
    hold_age: u32,
}

impl ChannelState {
    fn update(&mut self, peak_in: f32) {
        self.level = self.level * 0.7 + peak_in * 0.3;

        if peak_in > self.peak {
            self.peak = peak_in;
        } else {
            self.peak *= FAST_PEAK_DECAY;
        }

        if peak_in > self.peak_hold {
            self.peak_hold = peak_in;
            self.hold_age = 0;
        } else {
            self.hold_age += 1;
            if self.hold_age > HOLD_FRAMES {
                self.peak_hold = (self.peak_hold - HOLD_FALL_STEP).max(0.0);
            }
        }
    }
}

/// Per-channel VU-style loudness analyzer.
///
/// Inputs are per-buffer absolute sample peaks in [0, 1]; every exposed value
/// stays in [0, 1] by construction.
#[derive(Debug, Default)]
pub struct VolumeAnalyzer {
    left: ChannelState,
    right: ChannelState,
    overall: f32,
}

impl VolumeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_frame(&mut self, max_left: f32, max_right: f32, max_overall: f32) {
        self.left.update(max_left);
        self.right.update(max_right);
        self.overall = self.overall * 0.7 + max_overall * 0.3;
    }

    pub fn left_level(&self) -> f32 {
        self.left.level
    }

    pub fn right_level(&self) -> f32 {
        self.right.level
    }

    pub fn left_peak(&self) -> f32 {
        self.left.peak
    }

    pub fn right_peak(&self) -> f32 {
        self.right.peak
    }

    pub fn left_peak_hold(&self) -> f32 {
        self.left.peak_hold
    }

    pub fn right_peak_hold(&self) -> f32 {
        self.right.peak_hold
    }

    /// Smoothed loudness across both channels.
    pub fn overall(&self) -> f32 {
        self.overall
    }
}
