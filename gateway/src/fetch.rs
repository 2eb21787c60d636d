/// Media fetch orchestration: validate, resolve, download, stream.
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use mediagate_shared::errors::{GatewayError, GatewayResult};
use mediagate_shared::models::{DownloadRequest, PlatformHint, ResolvedSource};
use mediagate_shared::sanitize::sanitize_filename;

use crate::artifact::{ArtifactStream, TempArtifact};
use crate::downloader::MediaDownloader;
use crate::search::SearchResolver;

/// A successfully fetched media file, ready to stream.
///
/// The artifact rides inside `stream` and is unlinked when the stream
/// is dropped, wherever that happens.
#[derive(Debug)]
pub struct MediaPayload {
    pub stream: ArtifactStream,
    /// Sanitized attachment filename, extension included.
    pub filename: String,
    pub content_type: &'static str,
    pub size_bytes: Option<u64>,
}

/// The media fetch gateway.
///
/// Holds its collaborators and configuration explicitly; nothing here
/// reads ambient globals. One call to [`fetch_media`](Self::fetch_media)
/// services exactly one request and shares no mutable state with any
/// other call.
pub struct MediaGateway {
    scratch_dir: PathBuf,
    search: Arc<dyn SearchResolver>,
    downloader: Arc<dyn MediaDownloader>,
    fallback: Option<Arc<dyn MediaDownloader>>,
}

impl MediaGateway {
    pub fn new(
        scratch_dir: PathBuf,
        search: Arc<dyn SearchResolver>,
        downloader: Arc<dyn MediaDownloader>,
        fallback: Option<Arc<dyn MediaDownloader>>,
    ) -> Self {
        Self {
            scratch_dir,
            search,
            downloader,
            fallback,
        }
    }

    /// Fetch the requested media into a scoped artifact and return it
    /// as a stream.
    ///
    /// Steps run strictly in order: validate, resolve, allocate,
    /// download (one fallback attempt at most), verify, open. Failure
    /// anywhere drops the artifact, which unlinks anything the tool
    /// managed to write.
    pub async fn fetch_media(&self, request: &DownloadRequest) -> GatewayResult<MediaPayload> {
        let source = self.resolve(request).await?;

        let artifact = TempArtifact::allocate(&self.scratch_dir, request.kind.extension())
            .map_err(|e| GatewayError::DownloadFailed(format!("cannot allocate artifact: {e}")))?;

        self.download(&source.url, &artifact, request).await?;

        if !artifact.exists() {
            // Primary silent-failure signal: the tool exited clean but
            // left nothing behind.
            return Err(GatewayError::DownloadFailed(format!(
                "{} produced no output for {}",
                self.downloader.name(),
                source.url
            )));
        }

        let size_bytes = artifact.size_bytes();
        let filename = format!(
            "{}.{}",
            sanitize_filename(&source.title),
            request.kind.extension()
        );
        let content_type = request.kind.content_type();

        let stream = ArtifactStream::open(artifact)
            .await
            .map_err(|e| GatewayError::DownloadFailed(format!("cannot open artifact: {e}")))?;

        info!(
            "Fetched {} as {:?} ({} bytes)",
            source.url,
            filename,
            size_bytes.unwrap_or(0)
        );

        Ok(MediaPayload {
            stream,
            filename,
            content_type,
            size_bytes,
        })
    }

    /// Validate the locator and resolve it to a concrete source.
    async fn resolve(&self, request: &DownloadRequest) -> GatewayResult<ResolvedSource> {
        let locator = request.locator.trim();
        if locator.is_empty() {
            return Err(GatewayError::InvalidInput("empty locator".into()));
        }

        if let Some(url) = request.locator_url() {
            let host = url.host_str().unwrap_or("");
            if !request.platform.matches_host(host) {
                return Err(GatewayError::InvalidInput(format!(
                    "host {:?} does not match platform {}",
                    host, request.platform
                )));
            }
            let title = title_from_url(&url);
            return Ok(ResolvedSource {
                url: url.into(),
                title,
                duration_secs: None,
            });
        }

        // Free text only makes sense for generic requests; a platform
        // hint promises a URL on that platform's domain.
        if request.platform != PlatformHint::Generic {
            return Err(GatewayError::InvalidInput(format!(
                "expected a {} URL, got a search query",
                request.platform
            )));
        }

        let candidates = self.search.search(locator).await?;
        let first = candidates
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("no results for {locator:?}")))?;
        info!("Resolved {:?} to {} ({:?})", locator, first.url, first.title);
        Ok(first.into())
    }

    /// Run the external downloader, retrying once with the configured
    /// fallback tool. Single fallback, then fail; no further retries.
    async fn download(
        &self,
        url: &str,
        artifact: &TempArtifact,
        request: &DownloadRequest,
    ) -> GatewayResult<()> {
        match self
            .downloader
            .fetch(url, artifact.path(), request.kind)
            .await
        {
            Ok(()) => Ok(()),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        "{} failed for locator={:?} platform={}: {}; retrying with {}",
                        self.downloader.name(),
                        request.locator,
                        request.platform,
                        primary_err,
                        fallback.name()
                    );
                    fallback.fetch(url, artifact.path(), request.kind).await
                }
                None => {
                    warn!(
                        "{} failed for locator={:?} platform={}: {}",
                        self.downloader.name(),
                        request.locator,
                        request.platform,
                        primary_err
                    );
                    Err(primary_err)
                }
            },
        }
    }
}

/// Derive a display title from a direct URL: the last non-empty path
/// segment, or the host when the path is bare.
fn title_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| url.host_str().unwrap_or("media").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use mediagate_shared::models::{MediaKind, SearchCandidate};

    use crate::search::SearchResolver;

    /// Search stub returning a fixed candidate list.
    struct FixedSearch {
        candidates: Vec<SearchCandidate>,
        calls: AtomicUsize,
    }

    impl FixedSearch {
        fn new(candidates: Vec<SearchCandidate>) -> Arc<Self> {
            Arc::new(Self {
                candidates,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchResolver for FixedSearch {
        async fn search(&self, _query: &str) -> GatewayResult<Vec<SearchCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.candidates.clone())
        }
    }

    /// Downloader stub that either writes bytes to the output path or
    /// fails, recording every invocation.
    struct StubDownloader {
        succeed: bool,
        payload: &'static [u8],
        calls: AtomicUsize,
    }

    impl StubDownloader {
        fn succeeding(payload: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                succeed: true,
                payload,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                succeed: false,
                payload: b"",
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaDownloader for StubDownloader {
        fn name(&self) -> &str {
            "stub-downloader"
        }

        async fn fetch(&self, _url: &str, output: &Path, _kind: MediaKind) -> GatewayResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                std::fs::write(output, self.payload).unwrap();
                Ok(())
            } else {
                Err(GatewayError::DownloadFailed("stub tool exited with 1".into()))
            }
        }
    }

    fn candidate(url: &str, title: &str) -> SearchCandidate {
        SearchCandidate {
            url: url.into(),
            title: title.into(),
            duration_secs: Some(204),
        }
    }

    fn gateway(
        scratch: &TempDir,
        search: Arc<FixedSearch>,
        downloader: Arc<StubDownloader>,
        fallback: Option<Arc<StubDownloader>>,
    ) -> MediaGateway {
        MediaGateway::new(
            scratch.path().to_path_buf(),
            search,
            downloader,
            fallback.map(|f| f as Arc<dyn MediaDownloader>),
        )
    }

    #[tokio::test]
    async fn test_search_query_resolves_to_first_candidate() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![
            candidate("https://youtu.be/first", "Imagine Dragons - Believer"),
            candidate("https://youtu.be/second", "Believer (Live)"),
        ]);
        let downloader = StubDownloader::succeeding(b"mp3 bytes");
        let gw = gateway(&scratch, search.clone(), downloader.clone(), None);

        let request = DownloadRequest::new(
            "imagine-dragons-believer",
            MediaKind::Audio,
            PlatformHint::Generic,
        );
        let payload = gw.fetch_media(&request).await.unwrap();

        assert_eq!(search.call_count(), 1);
        assert_eq!(downloader.call_count(), 1);
        assert_eq!(payload.content_type, "audio/mpeg");
        assert_eq!(payload.filename, "Imagine Dragons - Believer.mp3");
        assert_eq!(payload.size_bytes, Some(9));
    }

    #[tokio::test]
    async fn test_artifact_removed_after_full_drain() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]);
        let downloader = StubDownloader::succeeding(b"bytes");
        let gw = gateway(&scratch, search, downloader, None);

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let payload = gw.fetch_media(&request).await.unwrap();

        let mut stream = payload.stream;
        while stream.next().await.is_some() {}
        drop(stream);

        let leftovers: Vec<_> = std::fs::read_dir(scratch.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "scratch dir must be empty after drain");
    }

    #[tokio::test]
    async fn test_mismatched_domain_never_invokes_downloader() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![]);
        let downloader = StubDownloader::succeeding(b"bytes");
        let gw = gateway(&scratch, search.clone(), downloader.clone(), None);

        let request = DownloadRequest::new(
            "https://example.com/video",
            MediaKind::Video,
            PlatformHint::Tiktok,
        );
        let err = gw.fetch_media(&request).await.unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(downloader.call_count(), 0);
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_locator_is_invalid_input() {
        let scratch = tempfile::tempdir().unwrap();
        let gw = gateway(
            &scratch,
            FixedSearch::new(vec![]),
            StubDownloader::succeeding(b""),
            None,
        );
        let request = DownloadRequest::new("   ", MediaKind::Audio, PlatformHint::Generic);
        let err = gw.fetch_media(&request).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn test_free_text_with_platform_hint_is_invalid_input() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]);
        let gw = gateway(&scratch, search.clone(), StubDownloader::succeeding(b""), None);

        let request =
            DownloadRequest::new("some song name", MediaKind::Video, PlatformHint::Youtube);
        let err = gw.fetch_media(&request).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_candidates_is_not_found() {
        let scratch = tempfile::tempdir().unwrap();
        let downloader = StubDownloader::succeeding(b"bytes");
        let gw = gateway(&scratch, FixedSearch::new(vec![]), downloader.clone(), None);

        let request = DownloadRequest::new(
            "zzzz_no_such_song_zzzz",
            MediaKind::Audio,
            PlatformHint::Generic,
        );
        let err = gw.fetch_media(&request).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(downloader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_downloader_cleans_up_and_reports() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]);
        let downloader = StubDownloader::failing();
        let gw = gateway(&scratch, search, downloader.clone(), None);

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let err = gw.fetch_media(&request).await.unwrap_err();

        assert_eq!(err.kind(), "download_failed");
        assert_eq!(downloader.call_count(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(scratch.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "no partial artifacts may remain");
    }

    #[tokio::test]
    async fn test_silent_tool_failure_is_download_failed() {
        // Tool "succeeds" but writes nothing: the existence check is
        // the primary failure signal.
        struct SilentDownloader;

        #[async_trait]
        impl MediaDownloader for SilentDownloader {
            fn name(&self) -> &str {
                "silent"
            }
            async fn fetch(&self, _u: &str, _o: &Path, _k: MediaKind) -> GatewayResult<()> {
                Ok(())
            }
        }

        let scratch = tempfile::tempdir().unwrap();
        let gw = MediaGateway::new(
            scratch.path().to_path_buf(),
            FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]),
            Arc::new(SilentDownloader),
            None,
        );
        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let err = gw.fetch_media(&request).await.unwrap_err();
        assert_eq!(err.kind(), "download_failed");
    }

    #[tokio::test]
    async fn test_fallback_runs_once_after_primary_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]);
        let primary = StubDownloader::failing();
        let fallback = StubDownloader::succeeding(b"rescued bytes");
        let gw = gateway(&scratch, search, primary.clone(), Some(fallback.clone()));

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let payload = gw.fetch_media(&request).await.unwrap();

        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1);
        assert_eq!(payload.size_bytes, Some(13));
    }

    #[tokio::test]
    async fn test_both_tools_failing_is_terminal() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]);
        let primary = StubDownloader::failing();
        let fallback = StubDownloader::failing();
        let gw = gateway(&scratch, search, primary.clone(), Some(fallback.clone()));

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let err = gw.fetch_media(&request).await.unwrap_err();

        assert_eq!(err.kind(), "download_failed");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1, "single fallback, no further retries");
    }

    #[tokio::test]
    async fn test_identical_requests_use_distinct_artifact_paths() {
        struct PathRecorder {
            paths: std::sync::Mutex<Vec<std::path::PathBuf>>,
        }

        #[async_trait]
        impl MediaDownloader for PathRecorder {
            fn name(&self) -> &str {
                "recorder"
            }
            async fn fetch(&self, _u: &str, output: &Path, _k: MediaKind) -> GatewayResult<()> {
                self.paths.lock().unwrap().push(output.to_path_buf());
                std::fs::write(output, b"x").unwrap();
                Ok(())
            }
        }

        let scratch = tempfile::tempdir().unwrap();
        let recorder = Arc::new(PathRecorder {
            paths: std::sync::Mutex::new(Vec::new()),
        });
        let gw = MediaGateway::new(
            scratch.path().to_path_buf(),
            FixedSearch::new(vec![candidate("https://youtu.be/x", "Song")]),
            recorder.clone(),
            None,
        );

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let a = gw.fetch_media(&request).await.unwrap();
        let b = gw.fetch_media(&request).await.unwrap();
        drop((a, b));

        let paths = recorder.paths.lock().unwrap();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
    }

    #[tokio::test]
    async fn test_direct_url_skips_search() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate("https://youtu.be/wrong", "Wrong")]);
        let downloader = StubDownloader::succeeding(b"video bytes");
        let gw = gateway(&scratch, search.clone(), downloader, None);

        let request = DownloadRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            MediaKind::Video,
            PlatformHint::Youtube,
        );
        let payload = gw.fetch_media(&request).await.unwrap();

        assert_eq!(search.call_count(), 0);
        assert_eq!(payload.content_type, "video/mp4");
        assert!(payload.filename.ends_with(".mp4"));
    }

    #[test]
    fn test_title_from_url() {
        let url = Url::parse("https://www.tiktok.com/@user/video/12345").unwrap();
        assert_eq!(title_from_url(&url), "12345");

        let bare = Url::parse("https://fb.watch/").unwrap();
        assert_eq!(title_from_url(&bare), "fb.watch");
    }

    #[tokio::test]
    async fn test_unsafe_title_is_sanitized_in_filename() {
        let scratch = tempfile::tempdir().unwrap();
        let search = FixedSearch::new(vec![candidate(
            "https://youtu.be/x",
            "Song: the \"remix\" / extended",
        )]);
        let gw = gateway(&scratch, search, StubDownloader::succeeding(b"x"), None);

        let request = DownloadRequest::new("song", MediaKind::Audio, PlatformHint::Generic);
        let payload = gw.fetch_media(&request).await.unwrap();
        assert_eq!(payload.filename, "Song the remix extended.mp3");
    }
}
