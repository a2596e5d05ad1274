use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    fetch::{PlatformFetcher, RemoteFetcher},
    types::{InputKind, RawSources, ResolvedInput},
};

/// Picks the one input a run works from, fetching it when it is remote.
///
/// Precedence, first usable wins: local video, platform URL, local audio,
/// remote audio URL, local slides. A local file that is missing on disk or a
/// remote audio download that fails is logged and skipped. A platform URL
/// that is present ends the search: when it is invalid or its download
/// fails, nothing is resolved.
pub struct InputResolver {
    platform: Arc<dyn PlatformFetcher>,
    remote: Arc<dyn RemoteFetcher>,
    media_root: Option<PathBuf>,
}

impl InputResolver {
    pub fn new(platform: Arc<dyn PlatformFetcher>, remote: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            platform,
            remote,
            media_root: None,
        }
    }

    pub fn with_media_root(mut self, media_root: Option<PathBuf>) -> Self {
        self.media_root = media_root;
        self
    }

    /// Existing file for a local source, trying the raw path first and then
    /// the path under the media root.
    async fn local_file(&self, raw: Option<&str>) -> Option<PathBuf> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        let mut candidates = vec![PathBuf::from(raw)];
        if let Some(root) = &self.media_root {
            candidates.push(root.join(raw.trim_start_matches(['/', '\\'])));
        }

        for candidate in candidates {
            if fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                return Some(candidate);
            }
        }
        None
    }

    pub async fn resolve(&self, sources: &RawSources, scratch_dir: &Path) -> Option<ResolvedInput> {
        if let Some(path) = self.local_file(sources.video.as_deref()).await {
            info!(path = %path.display(), "Using local video file");
            return Some(local(InputKind::Video, path));
        }

        if let Some(url) = non_blank(sources.platform_url.as_deref()) {
            if !self.platform.validate(url) {
                warn!(%url, "Invalid video platform URL");
                return None;
            }
            return match self.platform.download(url, scratch_dir).await {
                Ok(path) => Some(fetched(InputKind::Video, path)),
                Err(e) => {
                    warn!(%url, error = %e, "Platform download failed");
                    None
                }
            };
        }

        if let Some(path) = self.local_file(sources.audio.as_deref()).await {
            info!(path = %path.display(), "Using local audio file");
            return Some(local(InputKind::Audio, path));
        }

        if let Some(url) = non_blank(sources.audio_url.as_deref()) {
            match self.remote.download(url, scratch_dir, "audio").await {
                Ok(path) => return Some(fetched(InputKind::Audio, path)),
                Err(e) => warn!(%url, error = %e, "Remote audio download failed"),
            }
        }

        if let Some(path) = self.local_file(sources.slides.as_deref()).await {
            info!(path = %path.display(), "Using local slide deck");
            return Some(local(InputKind::Slides, path));
        }

        warn!("No valid input found");
        None
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn local(kind: InputKind, path: PathBuf) -> ResolvedInput {
    ResolvedInput {
        kind,
        path,
        fetched: false,
    }
}

fn fetched(kind: InputKind, path: PathBuf) -> ResolvedInput {
    ResolvedInput {
        kind,
        path,
        fetched: true,
    }
}
