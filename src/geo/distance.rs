//! Great-circle distance.

use super::types::Coordinate;
use crate::config::EARTH_RADIUS_KM;

/// Haversine distance between two coordinates in kilometres.
pub fn great_circle_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let (lat1, lon1) = (a.latitude().to_radians(), a.longitude().to_radians());
    let (lat2, lon2) = (b.latitude().to_radians(), b.longitude().to_radians());

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_same_point_is_zero() {
        let paris = at(48.8566, 2.3522);
        assert_eq!(great_circle_km(&paris, &paris), 0.0);
    }

    #[test]
    fn test_nyc_to_london() {
        // ~5,570 km
        let dist = great_circle_km(&at(40.7128, -74.0060), &at(51.5074, -0.1278));
        assert!((dist - 5570.0).abs() < 50.0, "got {}", dist);
    }

    #[test]
    fn test_paris_to_berlin() {
        // ~878 km
        let dist = great_circle_km(&at(48.8566, 2.3522), &at(52.5200, 13.4050));
        assert!((dist - 878.0).abs() < 10.0, "got {}", dist);
    }

    #[test]
    fn test_symmetric() {
        let a = at(-33.8688, 151.2093);
        let b = at(35.6762, 139.6503);
        assert!((great_circle_km(&a, &b) - great_circle_km(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_antipodal_is_half_circumference() {
        let dist = great_circle_km(&at(0.0, 0.0), &at(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((dist - half).abs() < 1e-6);
    }

    #[test]
    fn test_crosses_antimeridian() {
        // 179.5E to 179.5W is one degree of longitude at the equator, not 359
        let dist = great_circle_km(&at(0.0, 179.5), &at(0.0, -179.5));
        assert!(dist < 112.0, "got {}", dist);
    }
}
