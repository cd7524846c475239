use crate::av::encoder::{encode_rendition, EncodeError, TranscodeExecutor, PLAYLIST_FILE};
use crate::domain::hls::{MasterPlaylist, MediaPlaylist};
use crate::domain::jobs::{JobStatus, StatusReport, TranscodeJob, TranscodedVideo};
use crate::domain::rendition::{sanitize_file_name, RenditionResult, Resolution};
use crate::ports::reporter::{Delivery, StatusReporter};
use crate::ports::storage::StoragePort;
use futures::future::try_join_all;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Blob metadata key holding the job identifier, set at upload time.
pub const UNIQUE_ID_KEY: &str = "uniqueId";
pub const MASTER_PLAYLIST: &str = "index.m3u8";

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("source {0} has no uniqueId metadata")]
    MissingUniqueId(String),
    #[error("storage error: {0}")]
    Storage(Box<dyn Error + Send + Sync>),
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("unreadable playlist {path}: {reason}")]
    Playlist { path: String, reason: String },
    #[error("status callback unreachable: {0}")]
    Report(Box<dyn Error + Send + Sync>),
}

/// Display name of a video, derived from its blob name.
pub fn video_name(blob_name: &str) -> String {
    let stem = Path::new(blob_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(blob_name);
    sanitize_file_name(stem)
}

/// Transcodes one source video into an HLS ladder and reports the outcome.
pub struct WorkerService<S, R> {
    source: S,
    output: S,
    reporter: R,
    executor: Arc<dyn TranscodeExecutor>,
    resolutions: Vec<Resolution>,
    work_dir: Option<PathBuf>,
}

impl<S, R> WorkerService<S, R>
where
    S: StoragePort,
    R: StatusReporter,
{
    pub fn new(
        source: S,
        output: S,
        reporter: R,
        executor: Arc<dyn TranscodeExecutor>,
        resolutions: Vec<Resolution>,
    ) -> Self {
        Self {
            source,
            output,
            reporter,
            executor,
            resolutions,
            work_dir: None,
        }
    }

    /// Parent directory for the per-job temporary workspace.
    pub fn with_work_dir(mut self, work_dir: Option<PathBuf>) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Runs the job and sends exactly one report. Only a report that never
    /// reached the callback is returned as an error; an error status from the
    /// callback is logged and the run still counts as done.
    pub async fn run(&self, blob_name: &str) -> Result<StatusReport, WorkerError> {
        let name = video_name(blob_name);

        let report = match self.resolve_job(blob_name).await {
            Err(e) => {
                error!(%blob_name, error = %e, "job rejected");
                StatusReport::failed(None, name, &e.to_string())
            }
            Ok(job) => match self.transcode(&job, &name).await {
                Ok(video) => {
                    info!(unique_id = %job.unique_id, url = %video.url, "transcode finished");
                    StatusReport::succeeded(job.unique_id, video)
                }
                Err(e) => {
                    error!(unique_id = %job.unique_id, error = %e, "transcode failed");
                    StatusReport::failed(Some(job.unique_id), name, &e.to_string())
                }
            },
        };

        match self.reporter.send(&report).await.map_err(WorkerError::Report)? {
            Delivery::Accepted => {}
            Delivery::Rejected { status, body } => {
                error!(status, %body, success = report.success, "status callback rejected the report");
            }
        }
        Ok(report)
    }

    async fn resolve_job(&self, blob_name: &str) -> Result<TranscodeJob, WorkerError> {
        let metadata = self
            .source
            .metadata(blob_name)
            .await
            .map_err(WorkerError::Storage)?;

        // S3 lowercases user metadata keys.
        let unique_id = metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(UNIQUE_ID_KEY))
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WorkerError::MissingUniqueId(blob_name.to_string()))?;

        Ok(TranscodeJob {
            unique_id,
            source_reference: blob_name.to_string(),
            target_resolutions: self.resolutions.clone(),
            status: JobStatus::Pending,
        })
    }

    async fn transcode(
        &self,
        job: &TranscodeJob,
        name: &str,
    ) -> Result<TranscodedVideo, WorkerError> {
        let workspace = match &self.work_dir {
            Some(dir) => tempfile::tempdir_in(dir)?,
            None => tempfile::tempdir()?,
        };
        let source_name = Path::new(&job.source_reference)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "source".into());
        let source_path = workspace.path().join(source_name);

        self.source
            .download(&job.source_reference, &source_path)
            .await
            .map_err(WorkerError::Storage)?;

        let job_number = rand::random::<u32>().to_string();
        info!(unique_id = %job.unique_id, %job_number, renditions = job.target_resolutions.len(), "encoding");

        let renditions = try_join_all(job.target_resolutions.iter().map(|resolution| {
            self.render(&source_path, workspace.path(), &job_number, resolution)
        }))
        .await?;

        let master = MasterPlaylist::new(renditions);
        let master_path = workspace.path().join(MASTER_PLAYLIST);
        master.write_to(&master_path).await?;

        let master_key = format!("{}/{}", job_number, MASTER_PLAYLIST);
        self.output
            .upload(&master_path, &master_key)
            .await
            .map_err(WorkerError::Storage)?;

        Ok(TranscodedVideo {
            name: name.to_string(),
            url: self.output.object_url(&master_key),
        })
    }

    /// Encodes one resolution and uploads its playlist and segments.
    async fn render(
        &self,
        source_path: &Path,
        workspace: &Path,
        job_number: &str,
        resolution: &Resolution,
    ) -> Result<RenditionResult, WorkerError> {
        let output_dir = workspace.join(&resolution.name);
        tokio::fs::create_dir_all(&output_dir).await?;

        let playlist_path =
            encode_rendition(self.executor.as_ref(), source_path, resolution, &output_dir).await?;
        let rendition = RenditionResult::for_resolution(resolution);

        let prefix = format!("{}/{}", job_number, resolution.name);
        self.upload_rendition(&playlist_path, &output_dir, &prefix)
            .await?;

        info!(resolution = %resolution.name, bandwidth = rendition.bandwidth, "rendition uploaded");
        Ok(rendition)
    }

    async fn upload_rendition(
        &self,
        playlist_path: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<(), WorkerError> {
        let content = tokio::fs::read_to_string(playlist_path).await?;
        let playlist = MediaPlaylist::parse(&content).map_err(|reason| WorkerError::Playlist {
            path: playlist_path.display().to_string(),
            reason,
        })?;

        // Segments first so the playlist never points at missing files.
        for uri in playlist.segment_uris() {
            self.output
                .upload(&output_dir.join(uri), &format!("{}/{}", prefix, uri))
                .await
                .map_err(WorkerError::Storage)?;
        }
        self.output
            .upload(playlist_path, &format!("{}/{}", prefix, PLAYLIST_FILE))
            .await
            .map_err(WorkerError::Storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rendition::default_ladder;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct FakeStore {
        metadata: HashMap<String, String>,
        uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl FakeStore {
        fn with_unique_id(id: &str) -> Self {
            Self {
                metadata: HashMap::from([("uniqueid".to_string(), id.to_string())]),
                ..Default::default()
            }
        }

        fn keys(&self) -> Vec<String> {
            self.uploads
                .lock()
                .unwrap()
                .iter()
                .map(|(k, _)| k.clone())
                .collect()
        }

        fn content(&self, suffix: &str) -> Option<String> {
            self.uploads
                .lock()
                .unwrap()
                .iter()
                .find(|(k, _)| k.ends_with(suffix))
                .map(|(_, v)| String::from_utf8_lossy(v).to_string())
        }
    }

    #[async_trait]
    impl StoragePort for FakeStore {
        async fn metadata(
            &self,
            _key: &str,
        ) -> Result<HashMap<String, String>, Box<dyn Error + Send + Sync>> {
            Ok(self.metadata.clone())
        }

        async fn download(
            &self,
            _key: &str,
            local_path: &Path,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            tokio::fs::write(local_path, b"source bytes").await?;
            Ok(())
        }

        async fn upload(
            &self,
            local_path: &Path,
            key: &str,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            let bytes = tokio::fs::read(local_path).await?;
            self.uploads.lock().unwrap().push((key.to_string(), bytes));
            Ok(())
        }

        fn object_url(&self, key: &str) -> String {
            format!("https://cdn.example.com/{}", key)
        }
    }

    #[derive(Clone)]
    struct FakeReporter {
        sent: Arc<Mutex<Vec<StatusReport>>>,
        answer: Delivery,
    }

    impl Default for FakeReporter {
        fn default() -> Self {
            Self::answering(Delivery::Accepted)
        }
    }

    impl FakeReporter {
        fn answering(answer: Delivery) -> Self {
            Self {
                sent: Arc::default(),
                answer,
            }
        }
    }

    #[async_trait]
    impl StatusReporter for FakeReporter {
        async fn send(
            &self,
            report: &StatusReport,
        ) -> Result<Delivery, Box<dyn Error + Send + Sync>> {
            self.sent.lock().unwrap().push(report.clone());
            Ok(self.answer.clone())
        }
    }

    /// Writes a two-segment rendition after a per-resolution delay.
    struct FakeEncoder {
        delays_ms: HashMap<String, u64>,
        failing: Option<String>,
    }

    impl FakeEncoder {
        fn ok() -> Self {
            Self {
                delays_ms: HashMap::new(),
                failing: None,
            }
        }
    }

    #[async_trait]
    impl TranscodeExecutor for FakeEncoder {
        async fn run_hls_encode(
            &self,
            _source: &Path,
            resolution: &Resolution,
            output_dir: &Path,
        ) -> io::Result<Output> {
            let delay = self.delays_ms.get(&resolution.name).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if self.failing.as_deref() == Some(resolution.name.as_str()) {
                return Ok(Output {
                    status: ExitStatus::from_raw(1 << 8),
                    stdout: Vec::new(),
                    stderr: b"Error while opening encoder".to_vec(),
                });
            }

            for segment in ["segment000.ts", "segment001.ts"] {
                tokio::fs::write(output_dir.join(segment), resolution.name.as_bytes()).await?;
            }
            tokio::fs::write(
                output_dir.join(PLAYLIST_FILE),
                "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:10.0,\nsegment000.ts\n#EXTINF:3.2,\nsegment001.ts\n#EXT-X-ENDLIST\n",
            )
            .await?;
            Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }

    fn worker(
        store: &FakeStore,
        reporter: &FakeReporter,
        encoder: FakeEncoder,
        resolutions: Vec<Resolution>,
    ) -> WorkerService<FakeStore, FakeReporter> {
        WorkerService::new(
            store.clone(),
            store.clone(),
            reporter.clone(),
            Arc::new(encoder),
            resolutions,
        )
    }

    #[tokio::test]
    async fn test_single_resolution_success() {
        let store = FakeStore::with_unique_id("U1");
        let reporter = FakeReporter::default();
        let service = worker(
            &store,
            &reporter,
            FakeEncoder::ok(),
            vec![Resolution::new("480p", 854, 480)],
        );

        let report = service.run("uploads/My Clip.mp4").await.unwrap();

        assert!(report.success);
        assert_eq!(report.data.unique_id.as_deref(), Some("U1"));
        assert_eq!(report.data.transcoded_video.name, "My_Clip");
        assert!(report.data.transcoded_video.url.ends_with("/index.m3u8"));
        assert_eq!(reporter.sent.lock().unwrap().len(), 1);

        let master = store.content("index.m3u8").unwrap();
        assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 1);
        assert!(master.contains("RESOLUTION=854x480"));

        let keys = store.keys();
        assert_eq!(keys.len(), 4);
        assert!(keys[0].ends_with("/480p/segment000.ts"));
        assert!(keys[1].ends_with("/480p/segment001.ts"));
        assert!(keys[2].ends_with("/480p/playlist.m3u8"));
        assert!(keys[3].ends_with("/index.m3u8"));
    }

    #[tokio::test]
    async fn test_one_failed_encode_fails_the_job() {
        let store = FakeStore::with_unique_id("U2");
        let reporter = FakeReporter::default();
        let encoder = FakeEncoder {
            delays_ms: HashMap::from([("720p".to_string(), 20)]),
            failing: Some("720p".to_string()),
        };
        let service = worker(
            &store,
            &reporter,
            encoder,
            vec![
                Resolution::new("360p", 640, 360),
                Resolution::new("480p", 854, 480),
                Resolution::new("720p", 1280, 720),
            ],
        );

        let report = service.run("clip.mp4").await.unwrap();

        assert!(!report.success);
        assert_eq!(report.data.unique_id.as_deref(), Some("U2"));
        assert!(report.message.starts_with("Transcoding failed: "));
        assert!(report.message.contains("720p"));
        assert_eq!(report.data.transcoded_video.url, "");
        assert!(!store.keys().iter().any(|k| k.ends_with("index.m3u8")));
        assert_eq!(reporter.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_unique_id_aborts_before_encoding() {
        let store = FakeStore::default();
        let reporter = FakeReporter::default();
        let service = worker(&store, &reporter, FakeEncoder::ok(), default_ladder());

        let report = service.run("clip.mp4").await.unwrap();

        assert!(!report.success);
        assert_eq!(report.data.unique_id, None);
        assert!(report.message.contains("uniqueId"));
        assert!(store.keys().is_empty());
        assert_eq!(reporter.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manifest_keeps_ladder_order_when_encodes_finish_out_of_order() {
        let store = FakeStore::with_unique_id("U3");
        let reporter = FakeReporter::default();
        let encoder = FakeEncoder {
            delays_ms: HashMap::from([
                ("360p".to_string(), 60),
                ("480p".to_string(), 40),
                ("720p".to_string(), 20),
                ("1080p".to_string(), 0),
            ]),
            failing: None,
        };
        let service = worker(&store, &reporter, encoder, default_ladder());

        let report = service.run("clip.mp4").await.unwrap();
        assert!(report.success);

        let master = store.content("index.m3u8").unwrap();
        let uris: Vec<&str> = master.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            uris,
            vec![
                "360p/playlist.m3u8",
                "480p/playlist.m3u8",
                "720p/playlist.m3u8",
                "1080p/playlist.m3u8"
            ]
        );
    }

    #[tokio::test]
    async fn test_report_delivery_failure_is_returned() {
        struct DownReporter;

        #[async_trait]
        impl StatusReporter for DownReporter {
            async fn send(&self, _: &StatusReport) -> Result<Delivery, Box<dyn Error + Send + Sync>> {
                Err("connection refused".into())
            }
        }

        let store = FakeStore::with_unique_id("U4");
        let service = WorkerService::new(
            store.clone(),
            store.clone(),
            DownReporter,
            Arc::new(FakeEncoder::ok()),
            vec![Resolution::new("360p", 640, 360)],
        );

        assert!(matches!(
            service.run("clip.mp4").await,
            Err(WorkerError::Report(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_report_still_finishes_the_run() {
        let store = FakeStore::default();
        let reporter = FakeReporter::answering(Delivery::Rejected {
            status: 400,
            body: r#"{"message":"invalid report: missing data.uniqueId"}"#.to_string(),
        });
        let service = worker(&store, &reporter, FakeEncoder::ok(), default_ladder());

        let report = service.run("clip.mp4").await.unwrap();

        assert!(!report.success);
        assert_eq!(report.data.unique_id, None);
        assert_eq!(reporter.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_from_callback_does_not_fail_a_finished_job() {
        let store = FakeStore::with_unique_id("U5");
        let reporter = FakeReporter::answering(Delivery::Rejected {
            status: 500,
            body: r#"{"message":"Internal server error"}"#.to_string(),
        });
        let service = worker(
            &store,
            &reporter,
            FakeEncoder::ok(),
            vec![Resolution::new("360p", 640, 360)],
        );

        let report = service.run("clip.mp4").await.unwrap();

        assert!(report.success);
        assert_eq!(reporter.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_video_name() {
        assert_eq!(video_name("uploads/My Holiday (2024).mov"), "My_Holiday_2024");
        assert_eq!(video_name("clip"), "clip");
    }
}
