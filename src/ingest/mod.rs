//! Frame ingestion sources.
//!
//! This module provides sources for decoded RGB24 frames:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` source (tests, demo)
//!
//! All sources produce `Frame` instances with a 1-based, monotonically
//! increasing index. File sources loop: on end-of-stream they rewind and keep
//! producing frames with the index still increasing, so the sampling cadence
//! and evidence filenames stay unique across loops.
//!
//! An unopenable source is fatal at startup; nothing downstream is allocated
//! before the source connects.

mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{SourceConfig, SourceStats, VideoSource};
