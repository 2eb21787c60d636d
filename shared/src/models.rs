/// Domain models shared across all Mediagate crates.
use serde::{Deserialize, Serialize};
use url::Url;

/// Target media kind for a fetch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// MIME type sent in the response Content-Type header.
    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// File extension for the artifact and the attachment filename.
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Platform the caller claims the locator belongs to.
///
/// Non-generic hints impose a host check on URL locators before any
/// external tool is invoked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlatformHint {
    Generic,
    Youtube,
    Tiktok,
    Facebook,
}

impl PlatformHint {
    /// Known host substrings for this platform. Empty for Generic.
    pub fn known_hosts(self) -> &'static [&'static str] {
        match self {
            PlatformHint::Generic => &[],
            PlatformHint::Youtube => &["youtube.com", "youtu.be"],
            PlatformHint::Tiktok => &["tiktok.com"],
            PlatformHint::Facebook => &["facebook.com", "fb.watch"],
        }
    }

    /// Whether a URL host satisfies this platform's domain check.
    /// Generic accepts any host.
    pub fn matches_host(self, host: &str) -> bool {
        let hosts = self.known_hosts();
        hosts.is_empty() || hosts.iter().any(|h| host.contains(h))
    }
}

impl std::fmt::Display for PlatformHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformHint::Generic => write!(f, "generic"),
            PlatformHint::Youtube => write!(f, "youtube"),
            PlatformHint::Tiktok => write!(f, "tiktok"),
            PlatformHint::Facebook => write!(f, "facebook"),
        }
    }
}

/// A single inbound fetch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// URL or free-text search query identifying the desired media.
    pub locator: String,
    pub kind: MediaKind,
    pub platform: PlatformHint,
}

impl DownloadRequest {
    pub fn new(locator: impl Into<String>, kind: MediaKind, platform: PlatformHint) -> Self {
        Self {
            locator: locator.into(),
            kind,
            platform,
        }
    }

    /// Parse the locator as a URL, if it is one. Free-text queries
    /// (no scheme) return None and go through search resolution.
    pub fn locator_url(&self) -> Option<Url> {
        let parsed = Url::parse(self.locator.trim()).ok()?;
        match parsed.scheme() {
            "http" | "https" => Some(parsed),
            _ => None,
        }
    }
}

/// One entry of the ordered candidate list returned by the search resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

/// A locator resolved to a concrete source. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub url: String,
    pub title: String,
    pub duration_secs: Option<u64>,
}

impl From<SearchCandidate> for ResolvedSource {
    fn from(c: SearchCandidate) -> Self {
        Self {
            url: c.url,
            title: c.title,
            duration_secs: c.duration_secs,
        }
    }
}
