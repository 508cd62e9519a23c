//! Now-playing payload served by the metadata endpoint.
//!
//! The payload is a flat JSON object.  `title`, `artist` and `album` describe
//! the current item; previously played items arrive positionally as
//! `prev_artist_1` / `prev_title_1` … `prev_artist_5` / `prev_title_5`.
//! Every field is optional, and an empty string counts as absent.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::{RecentTrack, Track};

/// Number of positional recently-played slots in the payload.
pub const RECENT_SLOTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MetadataPayload {
    fields: HashMap<String, Value>,
}

impl MetadataPayload {
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            other => anyhow::bail!("metadata payload is not an object: {}", other),
        }
    }

    /// String value of `key`, or `None` when missing, null or empty.
    /// Numbers are stringified.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.field("title")
    }

    pub fn artist(&self) -> Option<String> {
        self.field("artist")
    }

    pub fn album(&self) -> Option<String> {
        self.field("album")
    }

    /// The current item, when both title and artist are present.
    pub fn now_playing(&self) -> Option<Track> {
        let title = self.title()?;
        let artist = self.artist()?;
        Some(Track {
            title,
            artist,
            album: self.album().unwrap_or_default(),
        })
    }

    /// Complete `prev_artist_N` / `prev_title_N` pairs in slot order.
    /// Incomplete slots are skipped, not compacted into.
    pub fn recent_tracks(&self) -> Vec<RecentTrack> {
        (1..=RECENT_SLOTS)
            .filter_map(|i| {
                let artist = self.field(&format!("prev_artist_{}", i))?;
                let title = self.field(&format!("prev_title_{}", i))?;
                Some(RecentTrack { artist, title })
            })
            .collect()
    }
}

/// Album line shown under the artist: the album name with the station's
/// fixed annotation, or empty when there is no album.
pub fn album_display(album: &str, suffix: &str) -> String {
    if album.is_empty() {
        String::new()
    } else if suffix.is_empty() {
        album.to_string()
    } else {
        format!("{} {}", album, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> MetadataPayload {
        MetadataPayload::from_value(v).unwrap()
    }

    #[test]
    fn now_playing_requires_title_and_artist() {
        let p = payload(json!({"title": "A", "artist": "B"}));
        assert_eq!(
            p.now_playing(),
            Some(Track {
                title: "A".into(),
                artist: "B".into(),
                album: String::new()
            })
        );

        assert!(payload(json!({"title": "A"})).now_playing().is_none());
        assert!(payload(json!({"title": "A", "artist": ""})).now_playing().is_none());
        assert!(payload(json!({})).now_playing().is_none());
    }

    #[test]
    fn recent_slots_keep_index_order_and_skip_gaps() {
        let p = payload(json!({
            "prev_artist_1": "a1", "prev_title_1": "t1",
            "prev_artist_2": "a2",
            "prev_artist_3": "a3", "prev_title_3": "t3",
            "prev_title_4": "t4",
            "prev_artist_5": "a5", "prev_title_5": "t5",
            "prev_artist_6": "a6", "prev_title_6": "t6",
        }));
        let recent = p.recent_tracks();
        let artists: Vec<&str> = recent.iter().map(|r| r.artist.as_str()).collect();
        assert_eq!(artists, ["a1", "a3", "a5"]);
        assert_eq!(recent[1].title, "t3");
    }

    #[test]
    fn recent_is_empty_without_complete_slots() {
        let p = payload(json!({"prev_artist_1": "a1", "prev_title_2": "t2"}));
        assert!(p.recent_tracks().is_empty());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(MetadataPayload::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn album_line_carries_suffix_only_when_present() {
        assert_eq!(
            album_display("Heat", "(Original Motion Picture Soundtrack)"),
            "Heat (Original Motion Picture Soundtrack)"
        );
        assert_eq!(album_display("", "(Original Motion Picture Soundtrack)"), "");
    }
}
