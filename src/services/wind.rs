//! Wind favorability relative to a direction of travel.
//!
//! Weather APIs report the direction wind blows *from*. A rider heading the way
//! the wind blows *to* has a tailwind.

use crate::services::geo::normalize_degrees;

/// Best possible rating (pure tailwind).
pub const MAX_WIND_RATING: f64 = 5.0;

/// Label used when no wind direction is known.
pub const UNKNOWN_DIRECTION: &str = "Unknown";

/// Eight compass sectors, clockwise from north in 45° steps.
const CARDINAL_DIRECTIONS: [&str; 8] = [
    "North",
    "North-East",
    "East",
    "South-East",
    "South",
    "South-West",
    "West",
    "North-West",
];

/// Conversion factor from metres per second to kilometres per hour.
const MS_TO_KMH: f64 = 3.6;

/// Rate how favorable the wind is for a segment ridden at `segment_bearing`.
///
/// Linear in the shortest angle between the travel direction and the direction
/// the wind blows toward: 5.0 for a tailwind, 2.5 for a crosswind, 0.0 for a
/// headwind.
pub fn wind_rating(segment_bearing: f64, wind_from_deg: f64) -> f64 {
    let wind_to = normalize_degrees(wind_from_deg + 180.0);
    let diff = (normalize_degrees(segment_bearing) - wind_to).abs();
    let angle = diff.min(360.0 - diff);

    MAX_WIND_RATING * (1.0 - angle / 180.0)
}

/// Name the 45° compass sector containing `degrees`.
pub fn cardinal_direction(degrees: f64) -> &'static str {
    let sector = (degrees / 45.0).round() as i64;
    CARDINAL_DIRECTIONS[sector.rem_euclid(8) as usize]
}

/// Like [`cardinal_direction`] but labels a missing direction as "Unknown".
pub fn cardinal_direction_or_unknown(degrees: Option<f64>) -> &'static str {
    degrees.map_or(UNKNOWN_DIRECTION, cardinal_direction)
}

/// Convert a wind speed from m/s to km/h.
pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * MS_TO_KMH
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {} ≈ {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_rating_pure_tailwind() {
        for bearing in [0.0, 45.0, 90.0, 180.0, 271.5, 359.0] {
            let wind_from = (bearing + 180.0) % 360.0;
            assert_close(wind_rating(bearing, wind_from), 5.0);
        }
    }

    #[test]
    fn test_rating_pure_headwind() {
        for bearing in [0.0, 45.0, 90.0, 180.0, 271.5, 359.0] {
            assert_close(wind_rating(bearing, bearing), 0.0);
        }
    }

    #[test]
    fn test_rating_crosswind() {
        assert_close(wind_rating(0.0, 90.0), 2.5);
        assert_close(wind_rating(0.0, 270.0), 2.5);
        assert_close(wind_rating(135.0, 45.0), 2.5);
    }

    #[test]
    fn test_rating_wraps_around_north() {
        // Heading 350°, wind from 190° blows toward 10°: 20° off a tailwind
        let expected = 5.0 * (1.0 - 20.0 / 180.0);
        assert_close(wind_rating(350.0, 190.0), expected);
    }

    #[test]
    fn test_rating_accepts_unnormalized_wind() {
        assert_close(wind_rating(180.0, 360.0), 5.0);
        assert_close(wind_rating(0.0, -180.0), 5.0);
    }

    #[test]
    fn test_cardinal_direction() {
        assert_eq!(cardinal_direction(0.0), "North");
        assert_eq!(cardinal_direction(44.0), "North-East");
        assert_eq!(cardinal_direction(90.0), "East");
        assert_eq!(cardinal_direction(135.0), "South-East");
        assert_eq!(cardinal_direction(180.0), "South");
        assert_eq!(cardinal_direction(225.0), "South-West");
        assert_eq!(cardinal_direction(270.0), "West");
        assert_eq!(cardinal_direction(315.0), "North-West");
        assert_eq!(cardinal_direction(359.0), "North");
    }

    #[test]
    fn test_cardinal_direction_sector_boundaries() {
        // Halfway between sectors rounds away from zero
        assert_eq!(cardinal_direction(22.5), "North-East");
        assert_eq!(cardinal_direction(22.4), "North");
        assert_eq!(cardinal_direction(337.5), "North");
    }

    #[test]
    fn test_cardinal_direction_or_unknown() {
        assert_eq!(cardinal_direction_or_unknown(None), "Unknown");
        assert_eq!(cardinal_direction_or_unknown(Some(200.0)), "South");
    }

    #[test]
    fn test_ms_to_kmh() {
        assert_close(ms_to_kmh(0.0), 0.0);
        assert_close(ms_to_kmh(10.0), 36.0);
        assert_close(ms_to_kmh(4.12), 14.832);
    }

    proptest! {
        #[test]
        fn prop_rating_within_bounds(bearing in 0.0..360.0f64, wind_from in -720.0..720.0f64) {
            let rating = wind_rating(bearing, wind_from);
            prop_assert!(rating >= 0.0);
            prop_assert!(rating <= MAX_WIND_RATING);
        }

        #[test]
        fn prop_rating_symmetric_around_tailwind(bearing in 0.0..360.0f64, offset in 0.0..180.0f64) {
            let tailwind_from = bearing + 180.0;
            let left = wind_rating(bearing, tailwind_from - offset);
            let right = wind_rating(bearing, tailwind_from + offset);
            prop_assert!((left - right).abs() < 1e-9);
        }

        #[test]
        fn prop_cardinal_direction_is_known(deg in 0.0..360.0f64) {
            prop_assert!(CARDINAL_DIRECTIONS.contains(&cardinal_direction(deg)));
        }
    }
}
