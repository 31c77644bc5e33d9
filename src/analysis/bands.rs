use log::debug;
use num_complex::Complex;

/// Low edge of the banded frequency range in Hz.
pub const MIN_FREQUENCY: f32 = 20.0;
/// High edge of the banded frequency range in Hz.
pub const MAX_FREQUENCY: f32 = 20_000.0;

/// Frames a band peak is held before it starts to fall.
const PEAK_HOLD_FRAMES: u32 = 20;
/// Geometric decay applied to an expired band peak each frame (8% fall).
const PEAK_DECAY: f32 = 0.92;
/// Floor for the auto-gain reference so consumers can divide by it safely.
pub const MIN_MAGNITUDE: f32 = 0.0001;

/// Maps transform output into logarithmically spaced magnitude bands with
/// smoothing, peak-hold and a slowly adapting auto-gain reference.
///
/// Band 0 is the lowest frequency. The per-band arrays are reallocated and
/// zeroed only when the requested band count changes; between calls the
/// values evolve incrementally so the display stays continuous.
pub struct BandProcessor {
    raw: Vec<f32>,
    smoothed: Vec<f32>,
    peak_hold: Vec<f32>,
    peak_age: Vec<u32>,
    max_ever: f32,
    target_max: f32,
}

impl BandProcessor {
    pub fn new(num_bands: usize) -> Self {
        Self {
            raw: vec![0.0; num_bands],
            smoothed: vec![0.0; num_bands],
            peak_hold: vec![0.0; num_bands],
            peak_age: vec![0; num_bands],
            max_ever: 0.0,
            target_max: 0.0,
        }
    }

    /// Fold one frame of transform output into the band state.
    ///
    /// `spectrum` is the full complex transform buffer; only bins below N/2
    /// carry non-redundant content and only those are read.
    pub fn process(&mut self, spectrum: &[Complex<f32>], sample_rate: f32, num_bands: usize) {
        if num_bands != self.smoothed.len() {
            debug!(
                "band count changed {} -> {}, resetting band state",
                self.smoothed.len(),
                num_bands
            );
            self.raw = vec![0.0; num_bands];
            self.smoothed = vec![0.0; num_bands];
            self.peak_hold = vec![0.0; num_bands];
            self.peak_age = vec![0; num_bands];
        }
        if num_bands == 0 || spectrum.len() < 2 || sample_rate <= 0.0 {
            return;
        }

        let n = spectrum.len() as f32;
        let half = spectrum.len() / 2;

        // The audible range is divided evenly in log-frequency, so each band
        // spans the same musical interval rather than the same Hz width.
        let log_min = MIN_FREQUENCY.ln();
        let log_span = MAX_FREQUENCY.ln() - log_min;

        for band in 0..num_bands {
            let freq_low = (log_min + log_span * band as f32 / num_bands as f32).exp();
            let freq_high = (log_min + log_span * (band + 1) as f32 / num_bands as f32).exp();
            let bin_low = (freq_low * n / sample_rate) as usize;
            let bin_high = ((freq_high * n / sample_rate) as usize).min(half);

            let magnitude = if bin_low < bin_high {
                let sum: f32 = spectrum[bin_low..bin_high].iter().map(|c| c.norm()).sum();
                sum / (bin_high - bin_low) as f32
            } else {
                0.0
            };
            self.raw[band] = magnitude;

            let smoothed = self.smoothed[band] * 0.7 + magnitude * 0.3;
            self.smoothed[band] = smoothed;

            if smoothed > self.peak_hold[band] {
                self.peak_hold[band] = smoothed;
                self.peak_age[band] = 0;
            } else {
                self.peak_age[band] += 1;
                if self.peak_age[band] > PEAK_HOLD_FRAMES {
                    self.peak_hold[band] *= PEAK_DECAY;
                }
            }

            if smoothed > self.max_ever {
                self.max_ever = smoothed;
            }
        }

        self.target_max = self.target_max * 0.95 + self.max_ever * 0.05;
    }

    /// Smoothed band magnitudes, band 0 lowest.
    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    /// Per-band peak-hold values.
    pub fn peak_hold(&self) -> &[f32] {
        &self.peak_hold
    }

    /// Unsmoothed magnitudes from the most recent frame.
    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Auto-gain reference magnitude, floored so division is always safe.
    pub fn target_max(&self) -> f32 {
        self.target_max.max(MIN_MAGNITUDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    /// Synthetic spectrum with one hot bin, everything else silent.
    fn spectrum_with_tone(n: usize, bin: usize, magnitude: f32) -> Vec<Complex<f32>> {
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); n];
        spectrum[bin] = Complex::new(magnitude, 0.0);
        spectrum
    }

    /// Band index whose log-spaced range contains the given frequency.
    fn band_for_frequency(freq: f32, num_bands: usize) -> usize {
        let position = (freq / MIN_FREQUENCY).ln() / (MAX_FREQUENCY / MIN_FREQUENCY).ln();
        ((position * num_bands as f32) as usize).min(num_bands - 1)
    }

    #[test]
    fn tone_lands_in_matching_band() {
        let n = 2048;
        let freq = 1000.0;
        let bin = (freq * n as f32 / SAMPLE_RATE) as usize;
        let spectrum = spectrum_with_tone(n, bin, 50.0);

        let mut processor = BandProcessor::new(16);
        processor.process(&spectrum, SAMPLE_RATE, 16);

        let loudest = processor
            .smoothed()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, band_for_frequency(freq, 16));
    }

    #[test]
    fn band_count_change_resets_state() {
        let n = 2048;
        let spectrum = spectrum_with_tone(n, 100, 10.0);

        let mut processor = BandProcessor::new(16);
        processor.process(&spectrum, SAMPLE_RATE, 16);
        assert!(processor.smoothed().iter().any(|&v| v > 0.0));
        let target_before = processor.target_max();

        // Shrinking the band count must reallocate and zero, but the
        // auto-gain reference carries over.
        let silence = vec![Complex::new(0.0f32, 0.0); n];
        processor.process(&silence, SAMPLE_RATE, 8);
        assert_eq!(processor.smoothed().len(), 8);
        assert_eq!(processor.peak_hold().len(), 8);
        assert!(processor.smoothed().iter().all(|&v| v == 0.0));
        assert!(processor.target_max() >= target_before * 0.9);
    }

    #[test]
    fn peak_hold_decays_after_hold_window() {
        let n = 2048;
        let freq = 1000.0;
        let bin = (freq * n as f32 / SAMPLE_RATE) as usize;
        let band = band_for_frequency(freq, 16);

        let mut processor = BandProcessor::new(16);
        processor.process(&spectrum_with_tone(n, bin, 50.0), SAMPLE_RATE, 16);
        let held = processor.peak_hold()[band];
        assert!(held > 0.0);

        // The hold survives 20 silent frames untouched.
        let silence = vec![Complex::new(0.0f32, 0.0); n];
        for _ in 0..20 {
            processor.process(&silence, SAMPLE_RATE, 16);
        }
        assert_eq!(processor.peak_hold()[band], held);

        // From frame 21 on it falls strictly, never below zero.
        let mut previous = held;
        for _ in 0..25 {
            processor.process(&silence, SAMPLE_RATE, 16);
            let current = processor.peak_hold()[band];
            assert!(current < previous);
            assert!(current >= 0.0);
            previous = current;
        }
    }

    #[test]
    fn bins_above_half_spectrum_are_ignored() {
        let n = 2048;
        // Energy only in the mirrored half must not register anywhere.
        let spectrum = spectrum_with_tone(n, n - 10, 100.0);

        let mut processor = BandProcessor::new(16);
        processor.process(&spectrum, SAMPLE_RATE, 16);
        assert!(processor.smoothed().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn target_max_is_floored_for_division() {
        let processor = BandProcessor::new(4);
        assert!(processor.target_max() >= MIN_MAGNITUDE);
    }
}
