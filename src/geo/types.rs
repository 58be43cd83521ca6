//! Geographic data structures.

use serde::{Deserialize, Serialize};

use crate::error_handling::InputError;

/// A resolved geographic position.
///
/// Latitude is always within [-90, 90] and longitude within [-180, 180];
/// construction rejects anything else. Country and city are optional and stay
/// `None` when unknown. An unresolved address is represented by the absence of
/// a `Coordinate`, never by (0, 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    city: Option<String>,
}

impl Coordinate {
    /// Creates a coordinate, validating the latitude/longitude bounds.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(InputError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Coordinate {
            latitude,
            longitude,
            country: None,
            city: None,
        })
    }

    /// Attaches place names. Empty strings are treated as unknown.
    pub fn with_place(mut self, country: Option<String>, city: Option<String>) -> Self {
        self.country = country.filter(|s| !s.trim().is_empty());
        self.city = city.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// "City, Country" with whatever parts are known.
    pub fn place_label(&self) -> String {
        match (self.city(), self.country()) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (Some(city), None) => city.to_string(),
            (None, Some(country)) => country.to_string(),
            (None, None) => format!("{:.4}, {:.4}", self.latitude, self.longitude),
        }
    }
}

/// Unvalidated wire form; deserialization goes through `Coordinate::new`.
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InputError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Ok(Coordinate::new(raw.latitude, raw.longitude)?.with_place(raw.country, raw.city))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_with_place_drops_empty_names() {
        let coord = Coordinate::new(48.8566, 2.3522)
            .unwrap()
            .with_place(Some("France".into()), Some("  ".into()));
        assert_eq!(coord.country(), Some("France"));
        assert_eq!(coord.city(), None);
    }

    #[test]
    fn test_place_label() {
        let paris = Coordinate::new(48.8566, 2.3522)
            .unwrap()
            .with_place(Some("France".into()), Some("Paris".into()));
        assert_eq!(paris.place_label(), "Paris, France");

        let nowhere = Coordinate::new(1.0, 2.0).unwrap();
        assert_eq!(nowhere.place_label(), "1.0000, 2.0000");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 52.52, "longitude": 13.405, "city": "Berlin"}"#);
        assert_eq!(ok.unwrap().city(), Some("Berlin"));

        let bad: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 120.0, "longitude": 13.405}"#);
        assert!(bad.is_err());
    }
}
