//! ffmpeg demuxer
//!
//! One ffmpeg child per sub-stream: the video child emits sampled JPEG
//! frames over image2pipe, the audio child emits raw s16le 16 kHz mono.
//! A stream with no audio track simply never yields audio packets; a
//! stream that never yields a video frame is treated as unreachable.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use super::{Demuxer, MediaConnection, MediaPacket};

/// 0.1 s of 16 kHz mono s16le
const AUDIO_CHUNK_BYTES: usize = 3200;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Demuxer spawning ffmpeg children per opened stream
pub struct FfmpegDemuxer {
    video_fps: u32,
}

impl FfmpegDemuxer {
    pub fn new(video_fps: u32) -> Self {
        Self { video_fps }
    }

    fn spawn_video(&self, address: &str) -> Result<Child> {
        Command::new("ffmpeg")
            .args(["-i", address])
            .args(["-vf", &format!("fps={}", self.video_fps)])
            .args(["-f", "image2pipe", "-vcodec", "mjpeg"])
            .args(["-loglevel", "error"])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::TransientIo)
    }

    fn spawn_audio(&self, address: &str) -> Result<Child> {
        Command::new("ffmpeg")
            .args(["-i", address])
            .arg("-vn")
            .args(["-f", "s16le", "-acodec", "pcm_s16le"])
            .args(["-ar", "16000", "-ac", "1"])
            .args(["-loglevel", "error"])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::TransientIo)
    }
}

#[async_trait]
impl Demuxer for FfmpegDemuxer {
    async fn open(&self, address: &str) -> Result<Box<dyn MediaConnection>> {
        let mut video_child = self.spawn_video(address)?;
        let video_stdout = video_child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("ffmpeg video stdout missing".to_string()))?;

        // Audio is best-effort: a spawn failure here only drops the modality
        let (audio_child, audio_stdout) = match self.spawn_audio(address) {
            Ok(mut child) => {
                let stdout = child.stdout.take();
                (Some(child), stdout)
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Audio demux unavailable");
                (None, None)
            }
        };

        tracing::info!(address = %address, fps = self.video_fps, "Demuxer opened");

        Ok(Box::new(FfmpegConnection {
            _video_child: video_child,
            _audio_child: audio_child,
            video_stdout: Some(video_stdout),
            audio_stdout,
            video_buf: Vec::new(),
            produced_frame: false,
        }))
    }
}

/// An open pair of ffmpeg children for one stream
struct FfmpegConnection {
    _video_child: Child,
    _audio_child: Option<Child>,
    video_stdout: Option<ChildStdout>,
    audio_stdout: Option<ChildStdout>,
    video_buf: Vec<u8>,
    produced_frame: bool,
}

#[async_trait]
impl MediaConnection for FfmpegConnection {
    async fn next_packet(&mut self) -> Result<Option<MediaPacket>> {
        let mut video_read = [0u8; 8192];
        let mut audio_read = [0u8; AUDIO_CHUNK_BYTES];

        loop {
            if let Some(frame) = extract_jpeg(&mut self.video_buf) {
                self.produced_frame = true;
                return Ok(Some(MediaPacket::VideoFrame(frame)));
            }

            let video_stdout = match self.video_stdout.as_mut() {
                Some(stdout) => stdout,
                None => return Ok(None),
            };

            tokio::select! {
                n = video_stdout.read(&mut video_read) => {
                    let n = n.map_err(Error::TransientIo)?;
                    if n == 0 {
                        self.video_stdout = None;
                        if !self.produced_frame {
                            return Err(Error::Unreachable(
                                "no video sub-stream in source".to_string(),
                            ));
                        }
                        return Ok(None);
                    }
                    self.video_buf.extend_from_slice(&video_read[..n]);
                }
                n = read_audio(&mut self.audio_stdout, &mut audio_read) => {
                    let n = n.map_err(Error::TransientIo)?;
                    if n == 0 {
                        // Source has no (more) audio; video continues alone
                        self.audio_stdout = None;
                        continue;
                    }
                    return Ok(Some(MediaPacket::AudioChunk(audio_read[..n].to_vec())));
                }
            }
        }
    }

    async fn close(&mut self) {
        // kill_on_drop handles the children; drop the pipes eagerly
        self.video_stdout = None;
        self.audio_stdout = None;
    }
}

/// Read from the audio pipe, or park forever when there is none so the
/// select only polls video
async fn read_audio(
    stdout: &mut Option<ChildStdout>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stdout.as_mut() {
        Some(stdout) => stdout.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Pop one complete JPEG (SOI..EOI) off the front of `buf`
fn extract_jpeg(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = buf.windows(2).position(|w| w == JPEG_SOI)?;
    let end = buf[start + 2..]
        .windows(2)
        .position(|w| w == JPEG_EOI)
        .map(|p| start + 2 + p + 2)?;

    let frame = buf[start..end].to_vec();
    buf.drain(..end);
    Some(frame)
}
