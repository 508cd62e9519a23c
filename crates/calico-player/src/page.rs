//! PageState — everything the front-end shows, plus the transitions that
//! change it.
//!
//! Only `PlayerCore` owns a mutable `PageState`.  Every transition is a
//! plain method: it updates the state and returns the `Effect`s the core
//! must carry out (HTTP calls, timers).  Nothing in here touches the
//! network or the clock, so each handler can be driven with synthetic input.

use calico_proto::api::CoverImage;
use calico_proto::metadata::{album_display, MetadataPayload};
use calico_proto::protocol::{
    LevelSnapshot, RateRequest, RatingState, RecentTrack, Track, UserVote, Vote,
};
use calico_proto::quality::{self, QualityReport};
use tracing::{error, info, warn};

use crate::engine::{MediaSignal, StreamSignal};

pub const TITLE_LOADING: &str = "Loading track info...";
pub const ARTIST_LOADING: &str = "Loading...";
pub const TITLE_FAILED: &str = "Unable to load track info";
pub const RECENT_EMPTY: &str = "No recent tracks available";

pub const MSG_THANKS: &str = "Thanks for rating!";
pub const MSG_RATE_FAILED: &str = "Failed to submit rating";
pub const MSG_RATE_UNREACHABLE: &str = "Unable to submit rating";
pub const MSG_RATINGS_FAILED: &str = "Unable to load ratings";

pub const STATUS_LOADING: &str = "Loading stream...";
pub const STATUS_READY: &str = "Ready to play";
pub const STATUS_PLAYING: &str = "Playing - Lossless HLS Stream";
pub const STATUS_PAUSED: &str = "Paused";
pub const STATUS_ENDED: &str = "Ended";
pub const STATUS_PLAYBACK_ERROR: &str = "Playback error occurred";
pub const STATUS_MANIFEST_LOADED: &str = "Stream loaded successfully";
pub const STATUS_NATIVE: &str = "Using native HLS support";
pub const STATUS_UNSUPPORTED: &str = "HLS not supported on this system";

/// How the stream got attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    #[default]
    Pending,
    Adaptive,
    Native,
    Unsupported,
}

/// The cover image slot.  While a new load is in flight the previous
/// result stays on screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CoverArt {
    /// Hidden, placeholder shown.
    #[default]
    Placeholder,
    Shown {
        content_type: String,
        size_bytes: usize,
    },
}

/// Text lines of the now-playing block.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingView {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl Default for NowPlayingView {
    fn default() -> Self {
        Self {
            title: TITLE_LOADING.to_string(),
            artist: ARTIST_LOADING.to_string(),
            album: String::new(),
        }
    }
}

/// Result of a vote submission, as far as the page cares.
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    /// 2xx from the backend.
    Accepted,
    /// Non-2xx; carries the server's `error` message when it sent one.
    Rejected(Option<String>),
    /// The request never got a response.
    Unreachable(String),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadRatings(Track),
    /// Start cover load number `seq`; older loads are superseded.
    LoadCover { seq: u64 },
    SubmitRating { track: Track, request: RateRequest },
    /// Clear the rating message after the configured delay.
    ScheduleMessageClear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    // ── player ──────────────────────────────────────────────────────────────
    pub status: String,
    pub attach: AttachMode,
    pub quality: QualityReport,
    pub levels: Option<LevelSnapshot>,
    pub native_source: Option<String>,
    pub paused: bool,

    // ── now playing ─────────────────────────────────────────────────────────
    pub now_playing: NowPlayingView,
    pub track: Option<Track>,
    pub cover: CoverArt,
    pub cover_seq: u64,

    // ── rating ──────────────────────────────────────────────────────────────
    pub rating_visible: bool,
    pub rating: RatingState,
    pub buttons_enabled: bool,
    pub rating_message: String,

    // ── recently played ─────────────────────────────────────────────────────
    pub recent: Vec<RecentTrack>,
    pub last_poll: Option<chrono::DateTime<chrono::Local>>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            status: String::new(),
            attach: AttachMode::Pending,
            quality: QualityReport::loading(),
            levels: None,
            native_source: None,
            paused: false,
            now_playing: NowPlayingView::default(),
            track: None,
            cover: CoverArt::Placeholder,
            cover_seq: 0,
            rating_visible: false,
            rating: RatingState::default(),
            buttons_enabled: true,
            rating_message: String::new(),
            recent: Vec::new(),
            last_poll: None,
        }
    }
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which vote button shows as active.  At most one.
    pub fn active_vote(&self) -> Option<Vote> {
        match self.rating.user_vote {
            UserVote::Up => Some(Vote::Up),
            UserVote::Down => Some(Vote::Down),
            UserVote::None => None,
        }
    }

    pub fn recent_placeholder(&self) -> Option<&'static str> {
        self.recent.is_empty().then_some(RECENT_EMPTY)
    }

    // ── stream attach / quality ─────────────────────────────────────────────

    fn refresh_quality(&mut self) {
        self.quality = quality::report(self.levels.as_ref(), self.native_source.as_deref());
    }

    pub fn on_adaptive_attached(&mut self) {
        self.attach = AttachMode::Adaptive;
        self.refresh_quality();
    }

    pub fn on_native_attached(&mut self, source: &str) {
        self.attach = AttachMode::Native;
        self.native_source = Some(source.to_string());
        self.status = STATUS_NATIVE.to_string();
        self.refresh_quality();
    }

    pub fn on_unsupported(&mut self) {
        warn!("[stream] no adaptive engine and no native HLS sink");
        self.attach = AttachMode::Unsupported;
        self.status = STATUS_UNSUPPORTED.to_string();
        self.quality = QualityReport::unsupported();
    }

    pub fn on_stream(&mut self, signal: StreamSignal) {
        match signal {
            StreamSignal::ManifestParsed(snapshot) => {
                info!(
                    "[stream] manifest parsed: {} level(s), current={}",
                    snapshot.levels.len(),
                    snapshot.current_level
                );
                self.status = STATUS_MANIFEST_LOADED.to_string();
                self.levels = Some(snapshot);
                self.refresh_quality();
            }
            StreamSignal::LevelsUpdated(levels) => {
                let current_level = self
                    .levels
                    .as_ref()
                    .map(|s| s.current_level)
                    .unwrap_or(calico_proto::protocol::AUTO_LEVEL);
                self.levels = Some(LevelSnapshot {
                    levels,
                    current_level,
                });
                self.refresh_quality();
            }
            StreamSignal::LevelSwitched { level } => {
                info!("[stream] level switched → {}", level);
                if let Some(snapshot) = self.levels.as_mut() {
                    snapshot.current_level = level;
                }
                self.refresh_quality();
            }
            StreamSignal::Error { details, fatal } => {
                error!("[stream] error (fatal={}): {}", fatal, details);
                self.status = format!("Error loading stream: {}", details);
            }
        }
    }

    // ── media lifecycle ─────────────────────────────────────────────────────

    pub fn on_media(&mut self, signal: MediaSignal) {
        let status = match signal {
            MediaSignal::LoadStart => STATUS_LOADING,
            MediaSignal::CanPlay => STATUS_READY,
            MediaSignal::Playing => {
                self.paused = false;
                STATUS_PLAYING
            }
            MediaSignal::Pause => {
                self.paused = true;
                STATUS_PAUSED
            }
            MediaSignal::Ended => STATUS_ENDED,
            MediaSignal::Error(detail) => {
                error!("[media] playback error: {}", detail);
                STATUS_PLAYBACK_ERROR
            }
        };
        self.status = status.to_string();
    }

    // ── metadata ────────────────────────────────────────────────────────────

    /// Apply a successful poll.  Returns one `LoadRatings` and one
    /// `LoadCover` when a track is on air, nothing otherwise.
    pub fn on_metadata(&mut self, payload: &MetadataPayload, album_suffix: &str) -> Vec<Effect> {
        self.last_poll = Some(chrono::Local::now());
        self.recent = payload.recent_tracks();

        match payload.now_playing() {
            Some(track) => {
                let same_track = self
                    .track
                    .as_ref()
                    .map(|t| t.same_key(&track))
                    .unwrap_or(false);
                if !same_track {
                    info!("[metadata] now playing: {} – {}", track.artist, track.title);
                    // Counts of the previous track must not show against this one.
                    self.rating = RatingState::default();
                }

                self.now_playing = NowPlayingView {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                    album: album_display(&track.album, album_suffix),
                };
                self.track = Some(track.clone());
                self.rating_visible = true;
                self.cover_seq += 1;

                vec![
                    Effect::LoadRatings(track),
                    Effect::LoadCover {
                        seq: self.cover_seq,
                    },
                ]
            }
            None => {
                if self.track.is_some() {
                    info!("[metadata] track info cleared");
                }
                self.now_playing = NowPlayingView::default();
                self.track = None;
                self.cover = CoverArt::Placeholder;
                // Any cover load still in flight belongs to the old track.
                self.cover_seq += 1;
                self.rating_visible = false;
                self.rating = RatingState::default();
                Vec::new()
            }
        }
    }

    pub fn on_metadata_failed(&mut self, reason: &str) {
        warn!("[metadata] fetch failed: {}", reason);
        self.now_playing.title = TITLE_FAILED.to_string();
    }

    pub fn on_cover_loaded(&mut self, seq: u64, result: Result<CoverImage, String>) {
        if seq != self.cover_seq {
            return;
        }
        self.cover = match result {
            Ok(image) => CoverArt::Shown {
                content_type: image.content_type,
                size_bytes: image.bytes.len(),
            },
            Err(e) => {
                warn!("[cover] load failed: {}", e);
                CoverArt::Placeholder
            }
        };
    }

    // ── ratings ─────────────────────────────────────────────────────────────

    /// Apply a ratings load for `track`.  Results for anything but the
    /// current track are dropped.
    pub fn on_ratings_loaded(&mut self, track: &Track, result: Result<RatingState, String>) {
        let is_current = self
            .track
            .as_ref()
            .map(|t| t.same_key(track))
            .unwrap_or(false);
        if !is_current {
            info!(
                "[ratings] dropping result for {} – {} (no longer playing)",
                track.artist, track.title
            );
            return;
        }
        match result {
            Ok(rating) => self.rating = rating,
            Err(e) => {
                warn!("[ratings] load failed: {}", e);
                self.rating_message = MSG_RATINGS_FAILED.to_string();
            }
        }
    }

    /// Start a vote.  No-op when nothing is playing or a vote is in flight.
    pub fn rate(&mut self, vote: Vote) -> Vec<Effect> {
        let Some(track) = self.track.clone() else {
            return Vec::new();
        };
        if !self.buttons_enabled {
            return Vec::new();
        }
        self.buttons_enabled = false;
        let request = RateRequest::for_track(&track, vote);
        vec![Effect::SubmitRating { track, request }]
    }

    pub fn on_rate_finished(&mut self, track: &Track, outcome: RateOutcome) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.rating_message = match outcome {
            RateOutcome::Accepted => {
                effects.push(Effect::LoadRatings(track.clone()));
                MSG_THANKS.to_string()
            }
            RateOutcome::Rejected(message) => {
                message.unwrap_or_else(|| MSG_RATE_FAILED.to_string())
            }
            RateOutcome::Unreachable(e) => {
                error!("[ratings] submit failed: {}", e);
                MSG_RATE_UNREACHABLE.to_string()
            }
        };
        self.buttons_enabled = true;
        effects.push(Effect::ScheduleMessageClear);
        effects
    }

    /// Clear the message line, whichever submission set it.
    pub fn clear_message(&mut self) {
        self.rating_message.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calico_proto::protocol::{LevelInfo, AUTO_LEVEL};
    use serde_json::json;

    const SUFFIX: &str = "(Original Motion Picture Soundtrack)";

    fn payload(v: serde_json::Value) -> MetadataPayload {
        MetadataPayload::from_value(v).unwrap()
    }

    fn track(title: &str, artist: &str, album: &str) -> Track {
        Track {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
        }
    }

    fn playing(title: &str, artist: &str) -> PageState {
        let mut page = PageState::new();
        page.on_metadata(&payload(json!({"title": title, "artist": artist})), SUFFIX);
        page
    }

    #[test]
    fn track_on_air_reveals_rating_and_loads_once() {
        let mut page = PageState::new();
        let effects = page.on_metadata(
            &payload(json!({"title": "A", "artist": "B", "album": "C"})),
            SUFFIX,
        );

        assert_eq!(page.now_playing.title, "A");
        assert_eq!(page.now_playing.artist, "B");
        assert_eq!(page.now_playing.album, format!("C {}", SUFFIX));
        assert!(page.rating_visible);
        assert_eq!(page.track, Some(track("A", "B", "C")));

        let loads: Vec<_> = effects
            .iter()
            .filter(|e| matches!(e, Effect::LoadRatings(_)))
            .collect();
        assert_eq!(loads, [&Effect::LoadRatings(track("A", "B", "C"))]);
        assert!(effects.contains(&Effect::LoadCover { seq: 1 }));
    }

    #[test]
    fn empty_payload_clears_track_and_hides_rating() {
        let mut page = playing("A", "B");
        page.on_ratings_loaded(
            &track("A", "B", ""),
            Ok(RatingState {
                thumbs_up: "4".into(),
                thumbs_down: "1".into(),
                user_vote: UserVote::Up,
            }),
        );

        let effects = page.on_metadata(&payload(json!({})), SUFFIX);

        assert!(effects.is_empty());
        assert_eq!(page.now_playing, NowPlayingView::default());
        assert_eq!(page.now_playing.title, TITLE_LOADING);
        assert_eq!(page.now_playing.artist, ARTIST_LOADING);
        assert!(page.track.is_none());
        assert!(!page.rating_visible);
        assert_eq!(page.rating, RatingState::default());
        assert_eq!(page.cover, CoverArt::Placeholder);
    }

    #[test]
    fn missing_artist_counts_as_no_track() {
        let mut page = playing("A", "B");
        page.on_metadata(&payload(json!({"title": "A"})), SUFFIX);
        assert!(page.track.is_none());
        assert!(!page.rating_visible);
    }

    #[test]
    fn album_line_is_empty_without_album() {
        let page = playing("A", "B");
        assert_eq!(page.now_playing.album, "");
    }

    #[test]
    fn recent_list_follows_payload() {
        let mut page = PageState::new();
        page.on_metadata(
            &payload(json!({
                "prev_artist_2": "a2", "prev_title_2": "t2",
                "prev_artist_4": "a4", "prev_title_4": "t4",
                "prev_artist_5": "a5",
            })),
            SUFFIX,
        );
        assert_eq!(
            page.recent,
            vec![
                RecentTrack {
                    artist: "a2".into(),
                    title: "t2".into()
                },
                RecentTrack {
                    artist: "a4".into(),
                    title: "t4".into()
                },
            ]
        );
        assert!(page.recent_placeholder().is_none());

        page.on_metadata(&payload(json!({"title": "A", "artist": "B"})), SUFFIX);
        assert_eq!(page.recent_placeholder(), Some(RECENT_EMPTY));
    }

    #[test]
    fn metadata_failure_only_touches_title() {
        let mut page = playing("A", "B");
        page.on_metadata_failed("connection refused");
        assert_eq!(page.now_playing.title, TITLE_FAILED);
        assert_eq!(page.now_playing.artist, "B");
        assert_eq!(page.track, Some(track("A", "B", "")));
        assert!(page.rating_visible);
    }

    #[test]
    fn ratings_select_exactly_one_active_button() {
        for (raw, expected) in [
            (json!(1), Some(Vote::Up)),
            (json!(-1), Some(Vote::Down)),
            (json!(null), None),
            (json!(0), None),
            (json!("up"), None),
        ] {
            let mut page = playing("A", "B");
            page.on_ratings_loaded(
                &track("A", "B", ""),
                Ok(RatingState {
                    thumbs_up: "1".into(),
                    thumbs_down: "2".into(),
                    user_vote: UserVote::from_json(&raw),
                }),
            );
            assert_eq!(page.active_vote(), expected, "user_rating={}", raw);
            assert_eq!(page.rating.thumbs_up, "1");
            assert_eq!(page.rating.thumbs_down, "2");
        }
    }

    #[test]
    fn stale_ratings_are_dropped() {
        let mut page = playing("A", "B");
        page.on_metadata(&payload(json!({"title": "X", "artist": "Y"})), SUFFIX);
        page.on_ratings_loaded(
            &track("A", "B", ""),
            Ok(RatingState {
                thumbs_up: "99".into(),
                thumbs_down: "0".into(),
                user_vote: UserVote::Up,
            }),
        );
        assert_eq!(page.rating, RatingState::default());
        assert!(page.active_vote().is_none());
    }

    #[test]
    fn ratings_failure_keeps_stale_counts() {
        let mut page = playing("A", "B");
        let loaded = RatingState {
            thumbs_up: "5".into(),
            thumbs_down: "1".into(),
            user_vote: UserVote::None,
        };
        page.on_ratings_loaded(&track("A", "B", ""), Ok(loaded.clone()));
        page.on_metadata(&payload(json!({"title": "A", "artist": "B"})), SUFFIX);
        page.on_ratings_loaded(&track("A", "B", ""), Err("timeout".into()));
        assert_eq!(page.rating, loaded);
        assert_eq!(page.rating_message, MSG_RATINGS_FAILED);
    }

    #[test]
    fn rate_without_track_is_noop() {
        let mut page = PageState::new();
        let before = page.clone();
        assert!(page.rate(Vote::Up).is_empty());
        assert_eq!(page, before);
    }

    #[test]
    fn rate_disables_buttons_until_finished() {
        let mut page = PageState::new();
        page.on_metadata(
            &payload(json!({"title": "A", "artist": "B", "album": "C"})),
            SUFFIX,
        );
        assert!(page.buttons_enabled);

        let effects = page.rate(Vote::Up);
        assert_eq!(
            effects,
            vec![Effect::SubmitRating {
                track: track("A", "B", "C"),
                request: RateRequest {
                    title: "A".into(),
                    artist: "B".into(),
                    album: "C".into(),
                    rating: Vote::Up,
                },
            }]
        );
        assert!(!page.buttons_enabled);
        // A second press while in flight does nothing.
        assert!(page.rate(Vote::Down).is_empty());

        let effects = page.on_rate_finished(&track("A", "B", "C"), RateOutcome::Accepted);
        assert!(page.buttons_enabled);
        assert_eq!(page.rating_message, MSG_THANKS);
        assert_eq!(
            effects,
            vec![
                Effect::LoadRatings(track("A", "B", "C")),
                Effect::ScheduleMessageClear
            ]
        );
    }

    #[test]
    fn rejected_vote_shows_server_message_or_fallback() {
        let mut page = playing("A", "B");
        page.rate(Vote::Down);
        let effects = page.on_rate_finished(
            &track("A", "B", ""),
            RateOutcome::Rejected(Some("too many".into())),
        );
        assert_eq!(page.rating_message, "too many");
        assert_eq!(effects, vec![Effect::ScheduleMessageClear]);
        assert!(page.buttons_enabled);

        page.rate(Vote::Down);
        page.on_rate_finished(&track("A", "B", ""), RateOutcome::Rejected(None));
        assert_eq!(page.rating_message, MSG_RATE_FAILED);

        page.rate(Vote::Up);
        page.on_rate_finished(
            &track("A", "B", ""),
            RateOutcome::Unreachable("dns error".into()),
        );
        assert_eq!(page.rating_message, MSG_RATE_UNREACHABLE);
        assert!(page.buttons_enabled);

        page.clear_message();
        assert!(page.rating_message.is_empty());
    }

    #[test]
    fn only_latest_cover_load_lands() {
        let mut page = playing("A", "B");
        page.on_metadata(&payload(json!({"title": "A", "artist": "B"})), SUFFIX);
        assert_eq!(page.cover_seq, 2);

        page.on_cover_loaded(
            2,
            Ok(CoverImage {
                url: "https://x.test/cover.jpg?t=2".into(),
                content_type: "image/png".into(),
                bytes: vec![0; 10],
            }),
        );
        // A late answer for the first request must not replace it.
        page.on_cover_loaded(1, Err("timeout".into()));
        assert_eq!(
            page.cover,
            CoverArt::Shown {
                content_type: "image/png".into(),
                size_bytes: 10
            }
        );

        page.on_cover_loaded(2, Err("404".into()));
        assert_eq!(page.cover, CoverArt::Placeholder);
    }

    #[test]
    fn media_signals_overwrite_status() {
        let mut page = PageState::new();
        for (signal, expected) in [
            (MediaSignal::LoadStart, STATUS_LOADING),
            (MediaSignal::CanPlay, STATUS_READY),
            (MediaSignal::Playing, STATUS_PLAYING),
            (MediaSignal::Pause, STATUS_PAUSED),
            (MediaSignal::Ended, STATUS_ENDED),
            (MediaSignal::Error("decoder".into()), STATUS_PLAYBACK_ERROR),
        ] {
            page.on_media(signal);
            assert_eq!(page.status, expected);
        }
    }

    #[test]
    fn stream_signals_drive_status_and_quality() {
        let mut page = PageState::new();
        page.on_adaptive_attached();
        assert_eq!(page.quality, QualityReport::loading());

        page.on_stream(StreamSignal::ManifestParsed(LevelSnapshot {
            levels: vec![
                LevelInfo {
                    bitrate: Some(128_000),
                    audio_codec: Some("mp4a.40.2".into()),
                },
                LevelInfo {
                    bitrate: Some(1_411_000),
                    audio_codec: Some("flac".into()),
                },
            ],
            current_level: AUTO_LEVEL,
        }));
        assert_eq!(page.status, STATUS_MANIFEST_LOADED);
        assert_eq!(page.quality.stream, "128kbps AAC-LC / HLS");

        page.on_stream(StreamSignal::LevelSwitched { level: 1 });
        assert_eq!(page.quality.stream, "1411kbps FLAC / HLS");
        assert_eq!(page.quality.source, "Live Stream (FLAC)");

        page.on_stream(StreamSignal::Error {
            details: "fragLoadError".into(),
            fatal: false,
        });
        assert_eq!(page.status, "Error loading stream: fragLoadError");
        // Quality is untouched by errors.
        assert_eq!(page.quality.source, "Live Stream (FLAC)");
    }

    #[test]
    fn native_and_unsupported_attach() {
        let mut page = PageState::new();
        page.on_native_attached("https://x.test/live.m3u8");
        assert_eq!(page.attach, AttachMode::Native);
        assert_eq!(page.status, STATUS_NATIVE);
        assert_eq!(page.quality.stream, "HLS Lossless (Native)");

        let mut page = PageState::new();
        page.on_unsupported();
        assert_eq!(page.attach, AttachMode::Unsupported);
        assert_eq!(page.status, STATUS_UNSUPPORTED);
        assert_eq!(page.quality, QualityReport::unsupported());
    }
}
