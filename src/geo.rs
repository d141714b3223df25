//! Geographic coordinate math
//!
//! Pure functions over (latitude, longitude) pairs: great-circle distance,
//! bearing, centroid, bounding box, radius membership, display formatting.

/// Earth's mean radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine)
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from the first point to the second, in degrees 0-360
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlon_rad = (lon2 - lon1).to_radians();

    let y = dlon_rad.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlon_rad.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Arithmetic centroid of a list of points; (0, 0) for an empty list
pub fn center_point(coordinates: &[(f64, f64)]) -> (f64, f64) {
    if coordinates.is_empty() {
        return (0.0, 0.0);
    }

    let n = coordinates.len() as f64;
    let total_lat: f64 = coordinates.iter().map(|c| c.0).sum();
    let total_lon: f64 = coordinates.iter().map(|c| c.1).sum();

    (total_lat / n, total_lon / n)
}

/// Bounding box (min_lat, min_lon, max_lat, max_lon); zeros for an empty list
pub fn bounding_box(coordinates: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    if coordinates.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let mut min_lat = f64::INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut max_lon = f64::NEG_INFINITY;

    for &(lat, lon) in coordinates {
        min_lat = min_lat.min(lat);
        min_lon = min_lon.min(lon);
        max_lat = max_lat.max(lat);
        max_lon = max_lon.max(lon);
    }

    (min_lat, min_lon, max_lat, max_lon)
}

/// True when the test point lies within `radius_meters` of the center
pub fn is_within_radius(
    center_lat: f64,
    center_lon: f64,
    test_lat: f64,
    test_lon: f64,
    radius_meters: f64,
) -> bool {
    haversine_distance(center_lat, center_lon, test_lat, test_lon) <= radius_meters
}

/// Display formatting, e.g. `40.12345°N, 74.00000°W`
pub fn format_coordinates(lat: f64, lon: f64, precision: usize) -> String {
    let lat_dir = if lat >= 0.0 { "N" } else { "S" };
    let lon_dir = if lon >= 0.0 { "E" } else { "W" };

    format!(
        "{:.prec$}°{}, {:.prec$}°{}",
        lat.abs(),
        lat_dir,
        lon.abs(),
        lon_dir,
        prec = precision
    )
}
