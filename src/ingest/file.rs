//! Video source front door.
//!
//! `VideoSource` dispatches to a synthetic generator for `stub://` paths and
//! to the FFmpeg decoder for real files. Selection happens once at
//! construction; the frame loop only ever sees `next_frame`.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::{rgb24_len, Frame};

/// Configuration for a video source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Local file path or `stub://<name>` for the synthetic source.
    pub path: String,
    /// Processing size frames are scaled to.
    pub width: u32,
    pub height: u32,
    /// Playback pacing hint for the daemon loop (frames per second).
    pub target_fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 640,
            height: 480,
            target_fps: 10,
        }
    }
}

/// Video frame source.
pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl VideoSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "video ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::new(config)),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: SourceBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "video file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Connect to the source. Failure here is fatal for the session.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Capture the next frame. Blocks until one is available.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    /// Completed passes over the underlying file (0 for synthetic).
    pub loops_completed: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and the demo
// ----------------------------------------------------------------------------

struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    fn new(config: SourceConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("VideoSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels()?;
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
    }

    fn generate_synthetic_pixels(&mut self) -> Result<Vec<u8>> {
        let pixel_count = rgb24_len(self.config.width, self.config.height)?;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count * 7 + self.scene_state as u64) % 256) as u8;
        }
        Ok(pixels)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            loops_completed: 0,
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_source() -> VideoSource {
        let mut source = VideoSource::new(SourceConfig {
            path: "stub://line_a".to_string(),
            width: 64,
            height: 48,
            target_fps: 10,
        })
        .expect("stub source");
        source.connect().expect("connect");
        source
    }

    #[test]
    fn frame_index_starts_at_one_and_increments() {
        let mut source = stub_source();
        assert_eq!(source.next_frame().unwrap().index, 1);
        assert_eq!(source.next_frame().unwrap().index, 2);
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn synthetic_frames_vary_by_index() {
        let mut source = stub_source();
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_ne!(first.pixels, second.pixels);
    }

    #[test]
    fn rejects_url_schemes() {
        assert!(VideoSource::new(SourceConfig {
            path: "rtsp://cam/stream".to_string(),
            ..SourceConfig::default()
        })
        .is_err());
        assert!(VideoSource::new(SourceConfig {
            path: String::new(),
            ..SourceConfig::default()
        })
        .is_err());
    }
}
