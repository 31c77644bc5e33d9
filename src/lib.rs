//! Audio analysis engine for the Spectrabar terminal music visualizer.
//!
//! Turns raw interleaved PCM buffers into per-frame analysis snapshots:
//! log-spaced spectrum bands with smoothing and peak-hold, a beat/tempo
//! estimate, and VU-style channel loudness. The rendering, capture and
//! settings layers live outside this crate and consume the snapshots as
//! read-only data.

pub mod analysis;

pub use analysis::{
    AnalysisEngine, AnalysisSnapshot, EngineConfig, SampleEncoding, SampleFormat, SnapshotHandle,
};
