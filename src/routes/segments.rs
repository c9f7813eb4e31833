//! Segment HTTP endpoints.
//!
//! - GET /api/v1/segments?sort=wind_rating
//! - GET /segments_with_weather (legacy path used by the front-end)

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::{AppError, ErrorResponse};
use crate::services::enrich::{enrich_segments, sort_by_wind_rating, EnrichedSegment};
use crate::services::openweather::OpenWeatherClient;
use crate::services::strava::StravaClient;

/// Shared application state for segment endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) strava: StravaClient,
    pub(crate) weather: OpenWeatherClient,
    pub(crate) enrich_concurrency: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SegmentsQuery {
    /// Ordering of the result. `wind_rating` puts the most favorable segments
    /// first; omitted keeps Strava's order.
    pub sort: Option<String>,
}

/// Requested ordering of enriched segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentOrder {
    Upstream,
    WindRating,
}

fn parse_order(sort: Option<&str>) -> Result<SegmentOrder, AppError> {
    match sort {
        None | Some("") => Ok(SegmentOrder::Upstream),
        Some("wind_rating") => Ok(SegmentOrder::WindRating),
        Some(other) => Err(AppError::BadRequest(format!(
            "Unsupported sort '{}', expected 'wind_rating'",
            other
        ))),
    }
}

/// Get the athlete's starred segments enriched with wind data.
///
/// Each segment gets its travel bearing, the current wind at its start point
/// with a 0–5 favorability rating, and a rated 5-day wind forecast. Segments
/// whose weather lookup fails are still returned with an unknown wind.
#[utoipa::path(
    get,
    path = "/api/v1/segments",
    tag = "Segments",
    params(SegmentsQuery),
    responses(
        (status = 200, description = "Starred segments with wind ratings", body = [EnrichedSegment]),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 502, description = "Strava unreachable or returned an error", body = ErrorResponse),
    )
)]
pub async fn get_segments_with_weather(
    State(state): State<AppState>,
    Query(params): Query<SegmentsQuery>,
) -> Result<Json<Vec<EnrichedSegment>>, AppError> {
    let order = parse_order(params.sort.as_deref())?;

    let segments = state.strava.fetch_starred_segments().await?;
    tracing::info!("Enriching {} starred segments", segments.len());

    let mut enriched = enrich_segments(&state.weather, segments, state.enrich_concurrency).await;

    if order == SegmentOrder::WindRating {
        sort_by_wind_rating(&mut enriched);
    }

    Ok(Json(enriched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_for(strava: &MockServer, weather: &MockServer) -> AppState {
        let http = reqwest::Client::new();
        AppState {
            strava: StravaClient::new(http.clone(), &strava.uri(), "token").unwrap(),
            weather: OpenWeatherClient::new(http, &weather.uri(), "key").unwrap(),
            enrich_concurrency: 4,
        }
    }

    async fn mount_segments(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/segments/starred"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                // Eastbound: wind from the east is a headwind
                { "id": 1, "start_latlng": [0.0, 0.0], "end_latlng": [0.0, 0.01] },
                // Westbound: same wind is a tailwind
                { "id": 2, "start_latlng": [0.0, 0.01], "end_latlng": [0.0, 0.0] },
                // No coordinates at all
                { "id": 3, "start_latlng": [], "end_latlng": [] }
            ])))
            .mount(server)
            .await;
    }

    async fn mount_weather(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "wind": { "speed": 6.0, "deg": 90 }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("appid", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order(None).unwrap(), SegmentOrder::Upstream);
        assert_eq!(parse_order(Some("")).unwrap(), SegmentOrder::Upstream);
        assert_eq!(
            parse_order(Some("wind_rating")).unwrap(),
            SegmentOrder::WindRating
        );
        assert!(matches!(
            parse_order(Some("name")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_segments_keep_upstream_order() {
        let strava = MockServer::start().await;
        let weather = MockServer::start().await;
        mount_segments(&strava).await;
        mount_weather(&weather).await;

        let Json(segments) = get_segments_with_weather(
            State(state_for(&strava, &weather).await),
            Query(SegmentsQuery::default()),
        )
        .await
        .unwrap();

        let ids: Vec<i64> = segments.iter().map(|s| s.segment.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(segments[0].wind_rating.unwrap().abs() < 1e-6);
        assert!((segments[1].wind_rating.unwrap() - 5.0).abs() < 1e-6);
        assert_eq!(segments[2].wind_rating, None);
        assert_eq!(segments[2].wind_direction, "Unknown");
        assert!((segments[0].wind_speed_kmh - 21.6).abs() < 1e-9);
        assert_eq!(segments[0].wind_direction, "East");
    }

    #[tokio::test]
    async fn test_segments_sorted_by_wind_rating() {
        let strava = MockServer::start().await;
        let weather = MockServer::start().await;
        mount_segments(&strava).await;
        mount_weather(&weather).await;

        let Json(segments) = get_segments_with_weather(
            State(state_for(&strava, &weather).await),
            Query(SegmentsQuery {
                sort: Some("wind_rating".to_string()),
            }),
        )
        .await
        .unwrap();

        let ids: Vec<i64> = segments.iter().map(|s| s.segment.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_segments_strava_failure_is_bad_gateway() {
        let strava = MockServer::start().await;
        let weather = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segments/starred"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&strava)
            .await;

        let result = get_segments_with_weather(
            State(state_for(&strava, &weather).await),
            Query(SegmentsQuery::default()),
        )
        .await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }

    #[tokio::test]
    async fn test_segments_invalid_sort_is_bad_request() {
        let strava = MockServer::start().await;
        let weather = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&strava)
            .await;

        let result = get_segments_with_weather(
            State(state_for(&strava, &weather).await),
            Query(SegmentsQuery {
                sort: Some("distance".to_string()),
            }),
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
