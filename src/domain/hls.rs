use super::rendition::RenditionResult;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct MediaSegment {
    pub duration: f64,
    pub uri: String,
}

/// A rendition playlist as written by the encoder.
pub struct MediaPlaylist {
    pub target_duration: u64,
    pub media_sequence: u64,
    pub segments: Vec<MediaSegment>,
    pub end_list: bool,
    pub playlist_type: Option<String>,
}

impl MediaPlaylist {
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some("#EXTM3U") {
            return Err("playlist does not start with #EXTM3U".to_string());
        }

        let mut playlist = Self {
            target_duration: 0,
            media_sequence: 0,
            segments: Vec::new(),
            end_list: false,
            playlist_type: None,
        };
        let mut pending_duration: Option<f64> = None;

        for line in lines {
            if let Some(v) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
                playlist.target_duration = v
                    .parse()
                    .map_err(|_| format!("invalid target duration: {}", v))?;
            } else if let Some(v) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
                playlist.media_sequence = v
                    .parse()
                    .map_err(|_| format!("invalid media sequence: {}", v))?;
            } else if let Some(v) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
                playlist.playlist_type = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("#EXTINF:") {
                let duration = v.split(',').next().unwrap_or_default();
                pending_duration = Some(
                    duration
                        .parse()
                        .map_err(|_| format!("invalid segment duration: {}", duration))?,
                );
            } else if line == "#EXT-X-ENDLIST" {
                playlist.end_list = true;
            } else if !line.starts_with('#') {
                let duration = pending_duration
                    .take()
                    .ok_or_else(|| format!("segment {} has no #EXTINF", line))?;
                playlist.segments.push(MediaSegment {
                    duration,
                    uri: line.to_string(),
                });
            }
        }

        Ok(playlist)
    }

    pub fn segment_uris(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.uri.as_str())
    }
}

/// The adaptive index listing every rendition. Entries keep insertion order.
#[derive(Default)]
pub struct MasterPlaylist {
    pub variants: Vec<RenditionResult>,
}

impl MasterPlaylist {
    pub fn new(variants: Vec<RenditionResult>) -> Self {
        Self { variants }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        for v in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}",
                v.bandwidth, v.width, v.height
            ));
            if !v.codec_tag.is_empty() {
                out.push_str(&format!(",CODECS=\"{}\"", v.codec_tag));
            }
            out.push('\n');
            out.push_str(&v.playlist_location);
            out.push('\n');
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
