/// Core media fetch gateway for Mediagate.
///
/// Turns a locator (URL or free-text query) into a streamed media file:
/// resolve via the search collaborator, download via an external tool
/// into a scoped temporary artifact, stream the artifact out, and
/// remove it exactly once on every exit path.
pub mod artifact;
pub mod downloader;
pub mod fetch;
pub mod search;

pub use artifact::{ArtifactStream, TempArtifact};
pub use downloader::{MediaDownloader, YtDlpDownloader};
pub use fetch::{MediaGateway, MediaPayload};
pub use search::{HttpSearchResolver, SearchResolver};
