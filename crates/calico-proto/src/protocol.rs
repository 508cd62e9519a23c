use serde::{Deserialize, Serialize};

/// Requests from the front-end to the player core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Vote on the current track.  Ignored when nothing is playing or a
    /// vote is already in flight.
    Rate { vote: Vote },
    TogglePause,
    /// Poll the metadata endpoint now instead of waiting for the timer.
    RefreshMetadata,
}

/// The item currently on air, as reported by the metadata endpoint.
/// Also the key for rating lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Empty when the payload carried no album.
    #[serde(default)]
    pub album: String,
}

impl Track {
    /// True when `other` names the same rating key (title + artist).
    pub fn same_key(&self, other: &Track) -> bool {
        self.title == other.title && self.artist == other.artist
    }
}

/// One previously played item from the `prev_artist_N` / `prev_title_N` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTrack {
    pub artist: String,
    pub title: String,
}

/// A vote the listener can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn as_i8(self) -> i8 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl From<Vote> for i8 {
    fn from(v: Vote) -> Self {
        v.as_i8()
    }
}

impl TryFrom<i8> for Vote {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Vote::Up),
            -1 => Ok(Vote::Down),
            other => Err(format!("rating must be 1 or -1, got {}", other)),
        }
    }
}

/// The viewer's own prior vote for a track, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserVote {
    #[default]
    None,
    Up,
    Down,
}

impl UserVote {
    /// Map the backend's `user_rating` field.  Anything but 1 / -1 (including
    /// null, 0, floats and strings) means the viewer has not voted.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value.as_i64() {
            Some(1) => UserVote::Up,
            Some(-1) => UserVote::Down,
            _ => UserVote::None,
        }
    }
}

/// Counts and the viewer's own vote for one track.  Replaced wholesale on
/// every load; never carried over to another track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingState {
    /// Rendered verbatim from the response.
    pub thumbs_up: String,
    pub thumbs_down: String,
    pub user_vote: UserVote,
}

// ── quality levels ────────────────────────────────────────────────────────────

/// A variant as reported by the streaming engine.  Both fields may be
/// missing depending on what the manifest declares.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Bits per second.
    pub bitrate: Option<u64>,
    /// RFC 6381 codec string (`mp4a.40.2`) or a demuxer codec name (`flac`).
    pub audio_codec: Option<String>,
}

/// Index value meaning "engine picks the level".
pub const AUTO_LEVEL: i32 = -1;

/// The engine's level list and the active index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub levels: Vec<LevelInfo>,
    pub current_level: i32,
}

impl LevelSnapshot {
    /// The level shown to the user.  The auto sentinel displays level 0.
    pub fn active(&self) -> Option<&LevelInfo> {
        let idx = if self.current_level >= 0 {
            self.current_level as usize
        } else {
            0
        };
        self.levels.get(idx)
    }
}

/// Display-ready description of the active level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub bitrate_kbps: Option<u64>,
    pub codec_label: String,
}

// ── backend wire types ───────────────────────────────────────────────────────

/// Body of `POST {api_base}/rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequest {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub rating: Vote,
}

impl RateRequest {
    pub fn for_track(track: &Track, vote: Vote) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            rating: vote,
        }
    }
}

/// Body of `GET {api_base}/ratings/{title}/{artist}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingsResponse {
    #[serde(default)]
    pub thumbs_up: serde_json::Value,
    #[serde(default)]
    pub thumbs_down: serde_json::Value,
    #[serde(default)]
    pub user_rating: serde_json::Value,
}

impl RatingsResponse {
    pub fn into_state(self) -> RatingState {
        RatingState {
            thumbs_up: verbatim(&self.thumbs_up),
            thumbs_down: verbatim(&self.thumbs_down),
            user_vote: UserVote::from_json(&self.user_rating),
        }
    }
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

fn verbatim(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vote_serializes_as_integer() {
        let req = RateRequest::for_track(
            &Track {
                title: "A".into(),
                artist: "B".into(),
                album: "C".into(),
            },
            Vote::Up,
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"title": "A", "artist": "B", "album": "C", "rating": 1})
        );
        assert!(serde_json::from_value::<Vote>(json!(0)).is_err());
    }

    #[test]
    fn user_vote_only_recognises_plus_minus_one() {
        assert_eq!(UserVote::from_json(&json!(1)), UserVote::Up);
        assert_eq!(UserVote::from_json(&json!(-1)), UserVote::Down);
        assert_eq!(UserVote::from_json(&json!(null)), UserVote::None);
        assert_eq!(UserVote::from_json(&json!(2)), UserVote::None);
        assert_eq!(UserVote::from_json(&json!("1")), UserVote::None);
    }

    #[test]
    fn counts_are_rendered_verbatim() {
        let resp: RatingsResponse =
            serde_json::from_value(json!({"thumbs_up": 12, "thumbs_down": 3, "user_rating": -1}))
                .unwrap();
        let state = resp.into_state();
        assert_eq!(state.thumbs_up, "12");
        assert_eq!(state.thumbs_down, "3");
        assert_eq!(state.user_vote, UserVote::Down);
    }

    #[test]
    fn auto_level_displays_first_variant() {
        let snap = LevelSnapshot {
            levels: vec![
                LevelInfo {
                    bitrate: Some(128_000),
                    audio_codec: None,
                },
                LevelInfo {
                    bitrate: Some(256_000),
                    audio_codec: None,
                },
            ],
            current_level: AUTO_LEVEL,
        };
        assert_eq!(snap.active().and_then(|l| l.bitrate), Some(128_000));
        let snap = LevelSnapshot {
            current_level: 5,
            ..snap
        };
        assert!(snap.active().is_none());
    }
}
