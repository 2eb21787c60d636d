/// External downloader invocation.
///
/// The actual fetch-and-encode work is delegated to a command-line
/// tool (yt-dlp by default). Arguments always go through the argv
/// array, never through a shell line. Success is ultimately signaled
/// by the output file existing; a non-zero exit is the secondary,
/// tool-specific signal and both map to `DownloadFailed`.
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use mediagate_shared::errors::{GatewayError, GatewayResult};
use mediagate_shared::models::MediaKind;

/// Cap on collaborator stderr carried into error messages.
const MAX_STDERR_CHARS: usize = 400;

/// Collaborator that fetches a media URL into a local file.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Tool name for logs and error text.
    fn name(&self) -> &str;

    /// Fetch `url` into `output` in the requested kind's format.
    /// Blocks its own task until the tool exits; no gateway timeout.
    async fn fetch(&self, url: &str, output: &Path, kind: MediaKind) -> GatewayResult<()>;
}

/// yt-dlp (or compatible) subprocess downloader.
pub struct YtDlpDownloader {
    bin: String,
}

impl YtDlpDownloader {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    fn name(&self) -> &str {
        &self.bin
    }

    async fn fetch(&self, url: &str, output: &Path, kind: MediaKind) -> GatewayResult<()> {
        let mut cmd = Command::new(&self.bin);
        match kind {
            MediaKind::Audio => {
                cmd.args(["-x", "--audio-format", "mp3"]);
            }
            MediaKind::Video => {
                cmd.args(["-f", "mp4"]);
            }
        }
        cmd.arg("--no-playlist").arg("-o").arg(output);
        // `--` stops option parsing before the untrusted URL
        cmd.arg("--").arg(url);

        debug!("Invoking {} for {} ({})", self.bin, url, kind);
        let result = cmd
            .output()
            .await
            .map_err(|e| GatewayError::DownloadFailed(format!("failed to spawn {}: {e}", self.bin)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(GatewayError::DownloadFailed(format!(
                "{} exited with {}: {}",
                self.bin, result.status, stderr
            )));
        }

        info!("{} finished for {}", self.bin, url);
        Ok(())
    }
}
