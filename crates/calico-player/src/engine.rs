//! Streaming capability seam.
//!
//! Two ways of getting the live manifest to the speakers:
//!
//! ```text
//!   StreamEngine  (adaptive: parses the manifest, switches levels)
//!        └── emits MediaSignal + StreamSignal
//!   MediaSink     (native: hands the manifest URL to a player that
//!        │         understands the MIME type itself)
//!        └── emits MediaSignal only
//! ```
//!
//! Both report through one `mpsc::Sender<Signal>`; the player core
//! forwards every signal into its own event loop.

use async_trait::async_trait;
use calico_proto::config::EngineConfig;
use calico_proto::protocol::{LevelInfo, LevelSnapshot};
use tokio::sync::mpsc;

/// Media-element lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    LoadStart,
    CanPlay,
    Playing,
    Pause,
    Ended,
    /// Diagnostic detail from the sink.
    Error(String),
}

/// Adaptive-engine notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    /// Manifest loaded; the level list is known.
    ManifestParsed(LevelSnapshot),
    /// The level list changed after the manifest was parsed.
    LevelsUpdated(Vec<LevelInfo>),
    /// The active level changed (`AUTO_LEVEL` when the engine chooses).
    LevelSwitched { level: i32 },
    Error { details: String, fatal: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Media(MediaSignal),
    Stream(StreamSignal),
}

pub type SignalSender = mpsc::Sender<Signal>;

/// The adaptive-streaming capability.
#[async_trait]
pub trait StreamEngine: Send {
    fn name(&self) -> &'static str;

    /// Whether the capability exists on this system.
    fn is_supported(&self) -> bool;

    /// Load `manifest_url` and start playback.  Signals flow through
    /// `signals` until `shutdown`.
    async fn attach(
        &mut self,
        manifest_url: &str,
        options: &EngineConfig,
        volume: f32,
        signals: SignalSender,
    ) -> anyhow::Result<()>;

    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()>;

    async fn shutdown(&mut self);
}

/// A player that takes a source URL directly.
#[async_trait]
pub trait MediaSink: Send {
    fn name(&self) -> &'static str;

    fn can_play_type(&self, mime: &str) -> bool;

    async fn set_source(
        &mut self,
        url: &str,
        volume: f32,
        signals: SignalSender,
    ) -> anyhow::Result<()>;

    /// The source set by `set_source`, if any.
    fn source(&self) -> Option<&str>;

    async fn shutdown(&mut self);
}

/// MIME types of HLS manifests.
pub const HLS_MIME_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

pub fn is_hls_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    HLS_MIME_TYPES.iter().any(|m| *m == mime)
}
