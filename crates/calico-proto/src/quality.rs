//! Human-readable stream quality derived from the engine's active level.

use serde::{Deserialize, Serialize};

use crate::protocol::{LevelInfo, LevelSnapshot, QualityLevel};

/// Substring → display label.  Checked in order; first match wins.
const CODEC_LABELS: &[(&str, &str)] = &[
    ("mp4a.40.2", "AAC-LC"),
    ("mp4a.40.5", "AAC-HE"),
    ("flac", "FLAC"),
    ("opus", "Opus"),
    ("mp3", "MP3"),
];

pub const UNKNOWN: &str = "Unknown";
pub const LOADING: &str = "Loading...";

/// The two quality lines shown under the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub stream: String,
    pub source: String,
}

impl QualityReport {
    pub fn loading() -> Self {
        Self {
            stream: LOADING.to_string(),
            source: LOADING.to_string(),
        }
    }

    /// Placeholder when neither the engine nor the sink can play HLS.
    pub fn unsupported() -> Self {
        Self {
            stream: "Not supported".to_string(),
            source: UNKNOWN.to_string(),
        }
    }
}

impl Default for QualityReport {
    fn default() -> Self {
        Self::loading()
    }
}

/// Display label for a codec identifier.  Unknown codecs pass through
/// untouched; a missing codec is "Unknown".
pub fn codec_label(codec: Option<&str>) -> String {
    let Some(codec) = codec.filter(|c| !c.is_empty()) else {
        return UNKNOWN.to_string();
    };
    CODEC_LABELS
        .iter()
        .find(|(needle, _)| codec.contains(needle))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| codec.to_string())
}

/// Bitrate in kbps, rounded to the nearest integer.  Zero or missing
/// bitrates are treated as unknown.
pub fn bitrate_kbps(bitrate: Option<u64>) -> Option<u64> {
    bitrate
        .filter(|b| *b > 0)
        .map(|b| (b as f64 / 1000.0).round() as u64)
}

pub fn quality_level(level: &LevelInfo) -> QualityLevel {
    QualityLevel {
        bitrate_kbps: bitrate_kbps(level.bitrate),
        codec_label: codec_label(level.audio_codec.as_deref()),
    }
}

/// Derive the quality lines from whatever is attached.
///
/// `levels` is the engine's level list when the adaptive path is in use;
/// `native_source` is the sink's source when the native path is in use.
pub fn report(levels: Option<&LevelSnapshot>, native_source: Option<&str>) -> QualityReport {
    if let Some(snapshot) = levels.filter(|s| !s.levels.is_empty()) {
        return match snapshot.active() {
            Some(level) => {
                let q = quality_level(level);
                let bitrate = q
                    .bitrate_kbps
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| UNKNOWN.to_string());
                QualityReport {
                    stream: format!("{}kbps {} / HLS", bitrate, q.codec_label),
                    source: format!("Live Stream ({})", q.codec_label),
                }
            }
            None => QualityReport {
                stream: "HLS Lossless".to_string(),
                source: UNKNOWN.to_string(),
            },
        };
    }

    if native_source.is_some_and(|s| !s.is_empty()) {
        return QualityReport {
            stream: "HLS Lossless (Native)".to_string(),
            source: UNKNOWN.to_string(),
        };
    }

    QualityReport::loading()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AUTO_LEVEL;

    fn snapshot(bitrate: Option<u64>, codec: Option<&str>, current: i32) -> LevelSnapshot {
        LevelSnapshot {
            levels: vec![LevelInfo {
                bitrate,
                audio_codec: codec.map(str::to_string),
            }],
            current_level: current,
        }
    }

    #[test]
    fn known_codecs_map_to_labels() {
        assert_eq!(codec_label(Some("mp4a.40.2")), "AAC-LC");
        assert_eq!(codec_label(Some("mp4a.40.5")), "AAC-HE");
        assert_eq!(codec_label(Some("fLaC,flac")), "FLAC");
        assert_eq!(codec_label(Some("opus")), "Opus");
        assert_eq!(codec_label(Some("mp3")), "MP3");
        assert_eq!(codec_label(Some("ac-3")), "ac-3");
        assert_eq!(codec_label(Some("")), "Unknown");
        assert_eq!(codec_label(None), "Unknown");
    }

    #[test]
    fn first_matching_substring_wins() {
        // "mp4a.40.2" is checked before "mp3".
        assert_eq!(codec_label(Some("mp4a.40.2,mp3")), "AAC-LC");
    }

    #[test]
    fn bitrate_rounds_to_nearest_kbps() {
        assert_eq!(bitrate_kbps(Some(1_411_200)), Some(1411));
        assert_eq!(bitrate_kbps(Some(127_500)), Some(128));
        assert_eq!(bitrate_kbps(Some(127_499)), Some(127));
        assert_eq!(bitrate_kbps(Some(0)), None);
        assert_eq!(bitrate_kbps(None), None);
    }

    #[test]
    fn report_for_resolved_level() {
        let r = report(Some(&snapshot(Some(320_000), Some("flac"), AUTO_LEVEL)), None);
        assert_eq!(r.stream, "320kbps FLAC / HLS");
        assert_eq!(r.source, "Live Stream (FLAC)");

        let r = report(Some(&snapshot(None, None, 0)), None);
        assert_eq!(r.stream, "Unknownkbps Unknown / HLS");
        assert_eq!(r.source, "Live Stream (Unknown)");
    }

    #[test]
    fn report_falls_back_when_index_is_out_of_range() {
        let r = report(Some(&snapshot(Some(320_000), Some("flac"), 3)), None);
        assert_eq!(r.stream, "HLS Lossless");
        assert_eq!(r.source, "Unknown");
    }

    #[test]
    fn report_for_native_and_unloaded() {
        let r = report(None, Some("https://example.test/live.m3u8"));
        assert_eq!(r.stream, "HLS Lossless (Native)");
        assert_eq!(r.source, "Unknown");

        assert_eq!(report(None, None), QualityReport::loading());
        let empty = LevelSnapshot::default();
        assert_eq!(report(Some(&empty), None), QualityReport::loading());
    }
}
