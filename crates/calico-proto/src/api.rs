//! HTTP client for the metadata endpoint, the cover image and the ratings
//! backend.
//!
//! One `reqwest::Client` with a cookie store is shared by every call so the
//! ratings backend sees the same session cookie on reads and writes.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::metadata::MetadataPayload;
use crate::protocol::{ErrorBody, RateRequest, RatingState, RatingsResponse, Track};

/// Upper bound on one metadata request, headers and body included.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("calico/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Status {
        status: StatusCode,
        /// `error` field of the JSON body, when the server sent one.
        message: Option<String>,
    },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message the server attached to a non-2xx response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Bytes of a successfully loaded cover image.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverImage {
    pub url: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl ApiClient {
    pub fn new(api_base: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// `{api_base}/ratings/{title}/{artist}` with both segments percent-encoded.
    pub fn ratings_url(&self, title: &str, artist: &str) -> String {
        format!(
            "{}/ratings/{}/{}",
            self.api_base,
            urlencoding::encode(title),
            urlencoding::encode(artist)
        )
    }

    pub fn rate_url(&self) -> String {
        format!("{}/rate", self.api_base)
    }

    /// GET and parse the now-playing payload.
    ///
    /// The body is parsed whatever the status: an error page that still
    /// carries a JSON object is applied like any other payload.
    pub async fn fetch_metadata(&self, url: &str) -> Result<MetadataPayload, ApiError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            debug!("[metadata] {} returned {}", url, status);
        }
        let text = response.text().await?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        MetadataPayload::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Counts and the caller's own vote for `title` / `artist`.
    pub async fn load_ratings(&self, title: &str, artist: &str) -> Result<RatingState, ApiError> {
        let url = self.ratings_url(title, artist);
        debug!("[ratings] GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ApiError::Status { status, message });
        }
        let body: RatingsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.into_state())
    }

    /// Submit a vote.  Any 2xx counts as accepted; the body is ignored.
    pub async fn rate(&self, request: &RateRequest) -> Result<(), ApiError> {
        let url = self.rate_url();
        debug!("[ratings] POST {} rating={}", url, request.rating.as_i8());
        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = error_message(response).await;
        warn!("[ratings] rate rejected: {} {:?}", status, message);
        Err(ApiError::Status { status, message })
    }

    /// Load the cover image, bypassing caches with `t=<epoch-ms>`.
    pub async fn fetch_cover(
        &self,
        cover_url: &str,
        epoch_ms: i64,
    ) -> Result<CoverImage, ApiError> {
        let url = cache_busted(cover_url, epoch_ms);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                message: None,
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::Decode(format!(
                "cover is not an image: {}",
                content_type
            )));
        }
        let bytes = response.bytes().await?.to_vec();
        Ok(CoverImage {
            url,
            content_type,
            bytes,
        })
    }

    /// Convenience for the rating key of `track`.
    pub async fn load_ratings_for(&self, track: &Track) -> Result<RatingState, ApiError> {
        self.load_ratings(&track.title, &track.artist).await
    }
}

/// `url` with a `t=<epoch-ms>` query parameter appended.
pub fn cache_busted(url: &str, epoch_ms: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, epoch_ms)
}

async fn error_message(response: reqwest::Response) -> Option<String> {
    let text = response.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_path_segments_are_percent_encoded() {
        let client = ApiClient::new("http://localhost:5001/api/").unwrap();
        assert_eq!(
            client.ratings_url("Can't Stop / Won't", "AC/DC & Friends"),
            "http://localhost:5001/api/ratings/Can%27t%20Stop%20%2F%20Won%27t/AC%2FDC%20%26%20Friends"
        );
        assert_eq!(client.rate_url(), "http://localhost:5001/api/rate");
    }

    #[test]
    fn cache_buster_respects_existing_query() {
        assert_eq!(cache_busted("https://x.test/cover.jpg", 42), "https://x.test/cover.jpg?t=42");
        assert_eq!(
            cache_busted("https://x.test/cover.jpg?size=l", 42),
            "https://x.test/cover.jpg?size=l&t=42"
        );
    }
}
