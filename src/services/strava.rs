//! Strava API v3 client.
//!
//! Fetches the authenticated athlete's starred segments.
//! See: https://developers.strava.com/docs/reference/#api-Segments-getLoggedInAthleteStarredSegments

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::geo::Coordinate;

/// Segments requested per page.
const STARRED_PAGE_SIZE: usize = 100;

/// Upper bound on pages fetched for a single request.
const STARRED_MAX_PAGES: u32 = 5;

/// Client for the Strava segments API.
#[derive(Debug, Clone)]
pub struct StravaClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

/// Route map attached to a segment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SegmentMap {
    pub id: Option<String>,
    /// Full-resolution encoded polyline
    pub polyline: Option<String>,
    /// Reduced-resolution encoded polyline
    pub summary_polyline: Option<String>,
}

/// A starred segment as returned by Strava.
///
/// Fields this service reads are modelled; anything else in the upstream record
/// is kept in `extra` and passed through unchanged.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StarredSegment {
    /// Strava segment id
    pub id: i64,
    pub name: Option<String>,
    /// "Ride", "Run", ...
    pub activity_type: Option<String>,
    /// Segment length in metres
    pub distance: Option<f64>,
    /// Average grade in percent
    pub average_grade: Option<f64>,
    /// Maximum grade in percent
    pub maximum_grade: Option<f64>,
    pub elevation_high: Option<f64>,
    pub elevation_low: Option<f64>,
    pub climb_category: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub private: Option<bool>,
    pub starred: Option<bool>,
    /// `[lat, lon]` of the segment start, `null` or `[]` when unknown
    pub start_latlng: Option<Vec<f64>>,
    /// `[lat, lon]` of the segment end, `null` or `[]` when unknown
    pub end_latlng: Option<Vec<f64>>,
    pub map: Option<SegmentMap>,
    /// Upstream fields not modelled above
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StarredSegment {
    pub fn start(&self) -> Option<Coordinate> {
        self.start_latlng.as_deref().and_then(Coordinate::from_latlng)
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.end_latlng.as_deref().and_then(Coordinate::from_latlng)
    }

    /// Best available polyline: full resolution first, then the summary.
    pub fn polyline(&self) -> Option<&str> {
        let map = self.map.as_ref()?;
        map.polyline
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(map.summary_polyline.as_deref())
            .filter(|p| !p.is_empty())
    }
}

impl StravaClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        access_token: &str,
    ) -> Result<Self, AppError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid Strava API URL: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Fetch all starred segments of the athlete owning the access token.
    ///
    /// Pages through the listing until a short page comes back, up to
    /// `STARRED_MAX_PAGES` pages.
    pub async fn fetch_starred_segments(&self) -> Result<Vec<StarredSegment>, AppError> {
        let mut segments = Vec::new();

        for page in 1..=STARRED_MAX_PAGES {
            let batch = self.fetch_starred_page(page).await?;
            let is_last = batch.len() < STARRED_PAGE_SIZE;
            segments.extend(batch);
            if is_last {
                return Ok(segments);
            }
        }

        tracing::warn!(
            "Stopped after {} pages of starred segments ({} segments)",
            STARRED_MAX_PAGES,
            segments.len()
        );
        Ok(segments)
    }

    async fn fetch_starred_page(&self, page: u32) -> Result<Vec<StarredSegment>, AppError> {
        let url = format!("{}/segments/starred", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("page", page.to_string()),
                ("per_page", STARRED_PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Strava request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error from Strava API (HTTP {}): {}", status, body);
            return Err(AppError::ExternalServiceError(format!(
                "Failed to fetch Strava segments: HTTP {}",
                status
            )));
        }

        let raw_json: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Strava JSON parse error: {}", e))
        })?;

        if !raw_json.is_array() {
            return Err(AppError::ExternalServiceError(
                "Unexpected data format from Strava API".to_string(),
            ));
        }

        serde_json::from_value(raw_json).map_err(|e| {
            AppError::ExternalServiceError(format!("Strava segment structure error: {}", e))
        })
    }
}
