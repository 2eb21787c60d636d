/// Scoped temporary artifact lifecycle.
///
/// Every fetch writes the external tool's output to a path that is
/// unique for the lifetime of the process and owned by exactly one
/// request. Removal is tied to ownership: dropping the artifact (or
/// the stream wrapping it) unlinks the file, so completion, transfer
/// errors, and client disconnects all converge on the same cleanup.
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// A uniquely named temporary file slot under the scratch directory.
///
/// The file itself is created by the external downloader; this type
/// owns the path and guarantees at-most-once removal.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    armed: bool,
}

impl TempArtifact {
    /// Allocate a fresh artifact path under `dir`.
    ///
    /// The name combines the current unix-millis timestamp with a v4
    /// UUID, so two concurrent requests can never collide.
    pub fn allocate(dir: &Path, extension: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Utc::now().timestamp_millis();
        let discriminator = uuid::Uuid::new_v4().simple();
        let path = dir.join(format!("{stamp}-{discriminator}.{extension}"));
        debug!("Allocated artifact slot {}", path.display());
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the external tool actually produced a file here.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size of the produced file, if it exists.
    pub fn size_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Unlink the file now. Idempotent: a second call, or a file that
    /// was never created, is not an error.
    pub fn remove(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed artifact {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove artifact {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Byte stream over an artifact that owns the artifact.
///
/// Dropping the stream drops the artifact, which unlinks the file.
/// The HTTP layer hands this to the response body, so a client that
/// disconnects mid-transfer tears the file down the same way a fully
/// drained response does.
#[derive(Debug)]
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    _artifact: TempArtifact,
}

impl ArtifactStream {
    /// Open the artifact file for reading and take ownership of it.
    pub async fn open(artifact: TempArtifact) -> std::io::Result<Self> {
        let file = File::open(artifact.path()).await?;
        Ok(Self {
            inner: ReaderStream::new(file),
            _artifact: artifact,
        })
    }
}

impl Stream for ArtifactStream {
    type Item = std::io::Result<tokio_util::bytes::Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
