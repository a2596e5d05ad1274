use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Url;
use tokio::{fs, io::AsyncWriteExt, process::Command};
use tracing::info;

use crate::{
    cache::{ensure_dir, unique_file_name},
    error::{LectureError, Result},
};

/// Fetches media from a video platform.
#[async_trait]
pub trait PlatformFetcher: Send + Sync {
    fn validate(&self, url: &str) -> bool;
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Fetches a plain remote file.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn download(&self, url: &str, dest_dir: &Path, name_prefix: &str) -> Result<PathBuf>;
}

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Accepts watch, shorts, embed, live and `youtu.be` links.
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let mut segments = parsed.path_segments().into_iter().flatten();

    if host == "youtu.be" {
        return segments.next().is_some_and(is_video_id);
    }
    if !YOUTUBE_HOSTS.contains(&host) {
        return false;
    }

    match segments.next() {
        Some("watch") => parsed
            .query_pairs()
            .any(|(key, value)| key == "v" && is_video_id(&value)),
        Some("shorts" | "embed" | "live" | "v") => segments.next().is_some_and(is_video_id),
        _ => false,
    }
}

/// Downloads platform videos with `yt-dlp`. `timeout` bounds the whole
/// run, so it has to cover a full-length lecture video.
pub struct YtDlpFetcher {
    program: PathBuf,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl PlatformFetcher for YtDlpFetcher {
    fn validate(&self, url: &str) -> bool {
        is_youtube_url(url)
    }

    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        if !self.validate(url) {
            return Err(LectureError::InvalidPlatformUrl {
                url: url.to_string(),
            });
        }
        ensure_dir(dest_dir).await?;

        let output_template = dest_dir.join(unique_file_name("youtube", ".%(ext)s"));
        let child = Command::new(&self.program)
            .arg(url)
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--extractor-args")
            .arg("youtube:player_client=android,web")
            .arg("-f")
            .arg("best")
            .arg("-o")
            .arg(&output_template)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| LectureError::DownloadFailed {
                url: url.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })??;

        if !output.status.success() {
            return Err(LectureError::DownloadFailed {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let stdout_str = String::from_utf8_lossy(output.stdout.as_slice());
        let filepath = stdout_str.lines().last().unwrap_or_default().trim();
        if filepath.is_empty() {
            return Err(LectureError::DownloadFailed {
                url: url.to_string(),
                reason: "yt-dlp did not report an output file".to_string(),
            });
        }

        info!(%url, path = filepath, "Platform video downloaded");
        Ok(PathBuf::from(filepath))
    }
}

/// Extension of the URL's last path segment, `.mp3` when there is none.
pub fn remote_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .and_then(|last| {
            Path::new(&last)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
        })
        .unwrap_or_else(|| ".mp3".to_string())
}

/// Streams remote files to disk with `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

/// `timeout` bounds connecting and each wait for more body bytes, not the
/// whole transfer. A slow but steady download runs to completion.
fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = client_builder(timeout).build()?;
        Ok(Self { client })
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<()> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = fs::File::create(path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn download(&self, url: &str, dest_dir: &Path, name_prefix: &str) -> Result<PathBuf> {
        ensure_dir(dest_dir).await?;
        let path = dest_dir.join(unique_file_name(name_prefix, &remote_extension(url)));

        if let Err(e) = self.stream_to(url, &path).await {
            let _ = fs::remove_file(&path).await;
            return Err(LectureError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            });
        }

        info!(%url, path = %path.display(), "Remote file downloaded");
        Ok(path)
    }
}
