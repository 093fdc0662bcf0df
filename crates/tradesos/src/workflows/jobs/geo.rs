use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Centroid used when a postcode area has no entry in the lookup table.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    lat: 51.5074,
    lon: -0.1278,
};

/// Coarse centroids per postcode area. London areas share one point.
const AREA_CENTROIDS: &[(&str, Coordinate)] = &[
    ("M", Coordinate { lat: 53.4808, lon: -2.2426 }),
    ("B", Coordinate { lat: 52.4862, lon: -1.8904 }),
    ("L", Coordinate { lat: 53.4084, lon: -2.9916 }),
    ("LS", Coordinate { lat: 53.8008, lon: -1.5491 }),
    ("S", Coordinate { lat: 53.3811, lon: -1.4701 }),
    ("E", DEFAULT_COORDINATE),
    ("W", DEFAULT_COORDINATE),
    ("N", DEFAULT_COORDINATE),
    ("SW", DEFAULT_COORDINATE),
    ("SE", DEFAULT_COORDINATE),
    ("NW", DEFAULT_COORDINATE),
    ("EC", DEFAULT_COORDINATE),
    ("WC", DEFAULT_COORDINATE),
];

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("coordinate ({lat}, {lon}) is outside [-90, 90] x [-180, 180]")]
pub struct InvalidCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, InvalidCoordinate> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            Ok(Self { lat, lon })
        } else {
            Err(InvalidCoordinate { lat, lon })
        }
    }
}

/// Best-effort centroid for a postcode area; unknown areas fall back to
/// [`DEFAULT_COORDINATE`].
pub fn approximate_coordinate(area: &str) -> Coordinate {
    let area = area.trim();
    AREA_CENTROIDS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(area))
        .map(|(_, coordinate)| *coordinate)
        .unwrap_or(DEFAULT_COORDINATE)
}

/// Great-circle distance in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Whole minutes to cover `distance_km` at `speed_kmh`, rounded up.
pub fn travel_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    if distance_km <= 0.0 || speed_kmh <= 0.0 {
        return 0;
    }
    (distance_km / speed_kmh * 60.0).ceil() as u32
}
