//! Local video file source using FFmpeg.
//!
//! Decodes frames in-memory and scales them to the configured processing
//! size. On end-of-stream the source rewinds and keeps decoding; the frame
//! index keeps increasing across loops.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::{SourceConfig, SourceStats};
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    config: SourceConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    declared_frames: i64,
    frame_count: u64,
    frames_this_pass: u64,
    loops_completed: u64,
    eof_sent: bool,
    last_error: Option<String>,
}

enum ReadStep {
    Packet(ffmpeg::Packet),
    Skip,
    Eof,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: SourceConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video file '{}'", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let declared_frames = input_stream.frames();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            config.width,
            config.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            declared_frames,
            frame_count: 0,
            frames_this_pass: 0,
            loops_completed: 0,
            eof_sent: false,
            last_error: None,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        if self.declared_frames > 0 {
            log::info!(
                "VideoSource: connected to {} ({} frames, ffmpeg)",
                self.config.path,
                self.declared_frames
            );
        } else {
            log::info!("VideoSource: connected to {} (ffmpeg)", self.config.path);
        }
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let mut decoded = ffmpeg::frame::Video::empty();
        let mut rgb_frame = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.emit(&decoded, &mut rgb_frame);
            }

            if self.eof_sent {
                // Decoder fully drained. Rewind the file and keep going.
                if self.frames_this_pass == 0 {
                    self.last_error = Some("file contains no decodable frames".to_string());
                    return Err(anyhow!("video file contains no decodable frames"));
                }
                self.decoder.flush();
                self.input
                    .seek(i64::MIN, ..)
                    .context("rewind video file after end of stream")?;
                self.eof_sent = false;
                self.frames_this_pass = 0;
                self.loops_completed += 1;
                log::info!(
                    "VideoSource: end of file, restarting loop ({} completed)",
                    self.loops_completed
                );
                continue;
            }

            let step = {
                let mut packets = self.input.packets();
                match packets.next() {
                    Some((stream, packet)) if stream.index() == self.stream_index => {
                        ReadStep::Packet(packet)
                    }
                    Some(_) => ReadStep::Skip,
                    None => ReadStep::Eof,
                }
            };

            match step {
                ReadStep::Packet(packet) => {
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                ReadStep::Skip => {}
                ReadStep::Eof => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder at end of stream")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn emit(
        &mut self,
        decoded: &ffmpeg::frame::Video,
        rgb_frame: &mut ffmpeg::frame::Video,
    ) -> Result<Frame> {
        self.scaler
            .run(decoded, rgb_frame)
            .context("scale frame to RGB")?;
        let pixels = frame_to_pixels(rgb_frame)?;

        self.frame_count += 1;
        self.frames_this_pass += 1;

        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            loops_completed: self.loops_completed,
            path: self.config.path.clone(),
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<Vec<u8>> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    pack_rows(frame.data(0), frame.stride(0), width * 3, height)
}

/// Copy `height` rows of `row_bytes` out of a decoded plane, dropping any
/// stride padding. The plane may be over-allocated past the last row.
fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    if stride == row_bytes {
        return Ok(data
            .get(..row_bytes * height)
            .context("ffmpeg frame plane is shorter than expected")?
            .to_vec());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok(pixels)
}
