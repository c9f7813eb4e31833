//! Segment enrichment.
//!
//! Combines a starred segment with the wind at its start point: the segment's
//! bearing is resolved from its geometry, then current and forecast wind are
//! rated against it. Segments are independent, so they are enriched
//! concurrently with a bounded number in flight, and results keep the
//! upstream order.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::geo::resolve_segment_bearing;
use crate::services::openweather::{OpenWeatherClient, WindRecord, WindSample};
use crate::services::strava::StarredSegment;
use crate::services::wind::{cardinal_direction_or_unknown, ms_to_kmh, wind_rating};

/// A wind forecast slot rated against a segment's bearing.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastWind {
    /// Start of the forecast slot (ISO 8601)
    pub time: String,
    /// Direction the wind blows from, degrees
    pub deg: Option<f64>,
    /// Wind speed in metres per second
    pub speed: Option<f64>,
    /// Cardinal name of `deg`, or "Unknown"
    pub wind_direction: String,
    /// Wind speed in km/h
    pub wind_speed_kmh: f64,
    /// Favorability 0 (headwind) to 5 (tailwind); null without a direction
    pub wind_rating: Option<f64>,
}

/// A starred segment with its bearing and wind assessment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrichedSegment {
    #[serde(flatten)]
    pub segment: StarredSegment,
    /// Overall direction of travel in degrees (0 = north, clockwise).
    /// 0 is also used when no direction can be derived.
    pub bearing: f64,
    /// Favorability 0 (headwind) to 5 (tailwind) of the current wind.
    /// Null when no wind direction is known.
    pub wind_rating: Option<f64>,
    /// Cardinal name of the current wind direction, or "Unknown"
    pub wind_direction: String,
    /// Current wind speed in km/h (0 when unknown)
    pub wind_speed_kmh: f64,
    /// Current wind as reported upstream, null when unavailable
    pub wind: Option<WindRecord>,
    /// Rated wind forecast keyed by UTC day (`YYYY-MM-DD`)
    pub forecast: BTreeMap<String, Vec<ForecastWind>>,
}

/// Wind figures derived for a given bearing.
#[derive(Debug, Clone, PartialEq)]
pub struct WindAssessment {
    pub rating: Option<f64>,
    pub direction: &'static str,
    pub speed_kmh: f64,
}

/// Rate `wind` against `bearing`. Missing wind or direction yields the
/// "unknown" fallbacks rather than an error.
pub fn assess_wind(bearing: f64, wind: Option<&WindRecord>) -> WindAssessment {
    let deg = wind.and_then(|w| w.deg);
    let speed = wind.and_then(|w| w.speed).unwrap_or(0.0);

    WindAssessment {
        rating: deg.map(|d| wind_rating(bearing, d)),
        direction: cardinal_direction_or_unknown(deg),
        speed_kmh: ms_to_kmh(speed),
    }
}

/// Rate each forecast slot against `bearing` and group the slots by UTC day.
pub fn group_forecast_by_day(
    samples: &[WindSample],
    bearing: f64,
) -> BTreeMap<String, Vec<ForecastWind>> {
    let mut days: BTreeMap<String, Vec<ForecastWind>> = BTreeMap::new();

    for sample in samples {
        let assessment = assess_wind(bearing, Some(&sample.wind));
        days.entry(sample.time.date_naive().to_string())
            .or_default()
            .push(ForecastWind {
                time: sample.time.to_rfc3339(),
                deg: sample.wind.deg,
                speed: sample.wind.speed,
                wind_direction: assessment.direction.to_string(),
                wind_speed_kmh: assessment.speed_kmh,
                wind_rating: assessment.rating,
            });
    }

    days
}

/// Enrich segments with at most `concurrency` weather lookups in flight.
pub async fn enrich_segments(
    weather: &OpenWeatherClient,
    segments: Vec<StarredSegment>,
    concurrency: usize,
) -> Vec<EnrichedSegment> {
    stream::iter(segments)
        .map(|segment| enrich_segment(weather, segment))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Enrich a single segment.
///
/// Weather is looked up at the segment start. Without a start coordinate no
/// lookup happens; a failed lookup is logged and treated as unknown wind.
pub async fn enrich_segment(weather: &OpenWeatherClient, segment: StarredSegment) -> EnrichedSegment {
    let start = segment.start();
    let bearing = resolve_segment_bearing(start, segment.end(), segment.polyline());

    let (wind, forecast) = match start {
        Some(point) => {
            let (current, upcoming) =
                tokio::join!(weather.current_wind(point), weather.wind_forecast(point));

            let wind = current
                .map_err(|e| {
                    tracing::warn!(
                        "Error fetching weather for segment {}: {}",
                        segment.id,
                        e
                    );
                })
                .ok();

            let forecast = match upcoming {
                Ok(samples) => group_forecast_by_day(&samples, bearing),
                Err(e) => {
                    tracing::warn!(
                        "Error fetching forecast for segment {}: {}",
                        segment.id,
                        e
                    );
                    BTreeMap::new()
                }
            };

            (wind, forecast)
        }
        None => {
            tracing::debug!(
                "Segment {} has no start coordinate, skipping weather lookup",
                segment.id
            );
            (None, BTreeMap::new())
        }
    };

    let assessment = assess_wind(bearing, wind.as_ref());

    EnrichedSegment {
        segment,
        bearing,
        wind_rating: assessment.rating,
        wind_direction: assessment.direction.to_string(),
        wind_speed_kmh: assessment.speed_kmh,
        wind,
        forecast,
    }
}

/// Order segments by current wind rating, best first. Segments without a
/// rating go last; ties keep their upstream order.
pub fn sort_by_wind_rating(segments: &mut [EnrichedSegment]) {
    segments.sort_by(|a, b| {
        let a = a.wind_rating.unwrap_or(f64::NEG_INFINITY);
        let b = b.wind_rating.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
}
