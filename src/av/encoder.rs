use crate::domain::rendition::Resolution;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use thiserror::Error;
use tokio::process::Command as TokioCommand;

/// Segment length handed to the encoder, in seconds.
pub const SEGMENT_SECONDS: u32 = 10;
pub const PLAYLIST_FILE: &str = "playlist.m3u8";
pub const SEGMENT_PATTERN: &str = "segment%03d.ts";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to start encoder for {resolution}: {source}")]
    Spawn {
        resolution: String,
        #[source]
        source: io::Error,
    },
    #[error("encoder failed for {resolution} ({status}): {stderr}")]
    Failed {
        resolution: String,
        status: String,
        stderr: String,
    },
    #[error("encoder for {0} did not produce a playlist")]
    MissingPlaylist(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeExecutor: Send + Sync {
    /// Encode `source` into an HLS rendition inside `output_dir`.
    async fn run_hls_encode(
        &self,
        source: &Path,
        resolution: &Resolution,
        output_dir: &Path,
    ) -> io::Result<Output>;
}

pub struct FfmpegExecutor {
    binary: String,
}

impl FfmpegExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// H.264/AAC, 10 second VOD segments numbered from 0, scaled to the rendition size.
pub fn hls_args(source: &Path, resolution: &Resolution, output_dir: &Path) -> Vec<OsString> {
    let scale = format!("scale={}:{}", resolution.width, resolution.height);
    let segment_time = SEGMENT_SECONDS.to_string();

    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), source.into()];
    for arg in [
        "-c:v",
        "libx264",
        "-c:a",
        "aac",
        "-vf",
        scale.as_str(),
        "-hls_time",
        segment_time.as_str(),
        "-hls_playlist_type",
        "vod",
        "-start_number",
        "0",
        "-hls_segment_filename",
    ] {
        args.push(arg.into());
    }
    args.push(output_dir.join(SEGMENT_PATTERN).into_os_string());
    args.push(output_dir.join(PLAYLIST_FILE).into_os_string());
    args
}

#[async_trait]
impl TranscodeExecutor for FfmpegExecutor {
    async fn run_hls_encode(
        &self,
        source: &Path,
        resolution: &Resolution,
        output_dir: &Path,
    ) -> io::Result<Output> {
        TokioCommand::new(&self.binary)
            .args(hls_args(source, resolution, output_dir))
            .kill_on_drop(true)
            .output()
            .await
    }
}

/// Runs one rendition encode and returns the path of its playlist.
pub async fn encode_rendition(
    executor: &dyn TranscodeExecutor,
    source: &Path,
    resolution: &Resolution,
    output_dir: &Path,
) -> Result<PathBuf, EncodeError> {
    let output = executor
        .run_hls_encode(source, resolution, output_dir)
        .await
        .map_err(|source| EncodeError::Spawn {
            resolution: resolution.name.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // ffmpeg prints the banner first; the cause is at the end.
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        return Err(EncodeError::Failed {
            resolution: resolution.name.clone(),
            status: output.status.to_string(),
            stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
        });
    }

    let playlist = output_dir.join(PLAYLIST_FILE);
    if !tokio::fs::try_exists(&playlist).await.unwrap_or(false) {
        return Err(EncodeError::MissingPlaylist(resolution.name.clone()));
    }
    Ok(playlist)
}
