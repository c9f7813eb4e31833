//! Segment geometry: polyline decoding and travel bearings.
//!
//! Everything here is pure and synchronous. Bearings are degrees in `[0, 360)`,
//! 0 = north, measured clockwise. Degenerate inputs (coincident points, paths
//! that cancel out, unusable polylines) resolve to a bearing of 0, which is
//! indistinguishable from due north. Callers that care should check the inputs.

use thiserror::Error;

/// Polyline coordinates are stored as integers scaled by this factor.
const POLYLINE_PRECISION: f64 = 1e5;

/// Offset added to every 6-bit chunk to keep it printable.
const POLYLINE_CHAR_OFFSET: i64 = 63;

/// Continuation flag within a 6-bit chunk.
const POLYLINE_CONTINUATION: i64 = 0x20;

/// Payload mask within a 6-bit chunk.
const POLYLINE_PAYLOAD: i64 = 0x1f;

/// Polyline values are 32-bit, so no chunk may start past this shift.
const POLYLINE_MAX_SHIFT: u32 = 30;

/// Largest zig-zag encoded value that still fits in 32 bits.
const POLYLINE_MAX_VALUE: i64 = u32::MAX as i64;

/// Summed unit vectors shorter than this are treated as perfect cancellation.
const VECTOR_SUM_EPSILON: f64 = 1e-9;

/// Errors that can occur while decoding an encoded polyline.
#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("polyline truncated at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline character {found:?} at byte {index}")]
    InvalidCharacter { index: usize, found: char },
    #[error("polyline value at byte {0} overflows")]
    Overflow(usize),
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude (WGS84)
    pub lat: f64,
    /// Longitude (WGS84)
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate from an upstream `[lat, lon]` array.
    ///
    /// Upstream APIs send `null` or `[]` when a position is unknown, so anything
    /// other than exactly two values yields `None`.
    pub fn from_latlng(latlng: &[f64]) -> Option<Self> {
        match latlng {
            [lat, lon] => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }
}

/// Decode an encoded polyline into its coordinates.
///
/// An empty string decodes to an empty path. Input that ends in the middle of a
/// value, or that carries a latitude without its longitude, is rejected rather
/// than partially returned.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(read_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;
        // A latitude must always be followed by a longitude
        if index >= bytes.len() {
            return Err(PolylineError::Truncated(index));
        }
        let start = index;
        lon = lon
            .checked_add(read_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;

        coordinates.push(Coordinate::new(
            lat as f64 / POLYLINE_PRECISION,
            lon as f64 / POLYLINE_PRECISION,
        ));
    }

    Ok(coordinates)
}

/// Read one zig-zag encoded delta starting at `index`, advancing it past the value.
fn read_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated(*index));
        };
        let chunk = byte as i64 - POLYLINE_CHAR_OFFSET;
        if !(0..64).contains(&chunk) {
            return Err(PolylineError::InvalidCharacter {
                index: *index,
                found: byte as char,
            });
        }
        if shift > POLYLINE_MAX_SHIFT {
            return Err(PolylineError::Overflow(*index));
        }

        result |= (chunk & POLYLINE_PAYLOAD) << shift;
        if result > POLYLINE_MAX_VALUE {
            return Err(PolylineError::Overflow(*index));
        }
        shift += 5;
        *index += 1;

        if chunk & POLYLINE_CONTINUATION == 0 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode coordinates as a polyline, the inverse of [`decode_polyline`].
///
/// Only needed to build test fixtures; the service never emits polylines.
#[cfg(test)]
pub fn encode_polyline(coordinates: &[Coordinate]) -> String {
    let mut encoded = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for coordinate in coordinates {
        let lat = (coordinate.lat * POLYLINE_PRECISION).round() as i64;
        let lon = (coordinate.lon * POLYLINE_PRECISION).round() as i64;
        write_delta(&mut encoded, lat - prev_lat);
        write_delta(&mut encoded, lon - prev_lon);
        prev_lat = lat;
        prev_lon = lon;
    }

    encoded
}

#[cfg(test)]
fn write_delta(out: &mut String, delta: i64) {
    let mut value = (delta << 1) ^ (delta >> 63);
    while value >= POLYLINE_CONTINUATION {
        let chunk = (POLYLINE_CONTINUATION | (value & POLYLINE_PAYLOAD)) + POLYLINE_CHAR_OFFSET;
        out.push(chunk as u8 as char);
        value >>= 5;
    }
    out.push((value + POLYLINE_CHAR_OFFSET) as u8 as char);
}

/// Fold any finite angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let value = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if value >= 360.0 {
        0.0
    } else {
        value
    }
}

/// Initial great-circle bearing (forward azimuth) from point 1 to point 2.
///
/// Identical points give `atan2(0, 0) = 0`.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_degrees(x.atan2(y).to_degrees())
}

/// Bearing between two coordinates, see [`bearing`].
pub fn bearing_between(from: Coordinate, to: Coordinate) -> f64 {
    bearing(from.lat, from.lon, to.lat, to.lon)
}

/// Circular mean of the leg bearings along a path.
///
/// Each consecutive pair contributes a unit vector in its travel direction, so a
/// path that wanders still reports its overall trend. Paths with fewer than two
/// points, and paths whose legs cancel out (an out-and-back, a symmetric loop),
/// give 0.
pub fn average_bearing(path: &[Coordinate]) -> f64 {
    if path.len() < 2 {
        return 0.0;
    }

    let (sum_x, sum_y) = path
        .windows(2)
        .map(|leg| bearing_between(leg[0], leg[1]).to_radians())
        .fold((0.0_f64, 0.0_f64), |(x, y), b| (x + b.cos(), y + b.sin()));

    if sum_x.hypot(sum_y) < VECTOR_SUM_EPSILON {
        return 0.0;
    }

    normalize_degrees(sum_y.atan2(sum_x).to_degrees())
}

/// Pick the bearing that best represents a segment's overall direction.
///
/// The direct start→end bearing is used whenever the two endpoints differ.
/// Round trips report `start == end`, so those fall back to the averaged
/// bearing of the decoded polyline. Anything unusable resolves to 0.
pub fn resolve_segment_bearing(
    start: Option<Coordinate>,
    end: Option<Coordinate>,
    polyline: Option<&str>,
) -> f64 {
    let Some(start) = start else {
        return 0.0;
    };

    if let Some(end) = end.filter(|end| *end != start) {
        return bearing_between(start, end);
    }

    let Some(encoded) = polyline.filter(|p| !p.is_empty()) else {
        return 0.0;
    };

    match decode_polyline(encoded) {
        Ok(path) if path.len() >= 2 => average_bearing(&path),
        Ok(path) => {
            tracing::debug!(
                "Polyline has {} point(s), not enough for a bearing",
                path.len()
            );
            0.0
        }
        Err(e) => {
            tracing::warn!("Malformed segment polyline, defaulting bearing to 0: {}", e);
            0.0
        }
    }
}
