//! Great-circle distance and the `near=lat,lng[,radius]` filter

use crate::db::schemas::IssueDoc;
use crate::types::CivicError;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius used when `near` carries only a point
pub const DEFAULT_NEAR_RADIUS_M: f64 = 5_000.0;

/// Haversine distance in metres
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Point and radius parsed from a `near` query value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearFilter {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

impl NearFilter {
    pub fn parse(value: &str) -> Result<Self, CivicError> {
        let invalid = || CivicError::bad_request("near must be lat,lng[,radius]");
        let parts: Vec<f64> = value
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        let (lat, lng, radius_m) = match parts.as_slice() {
            [lat, lng] => (*lat, *lng, DEFAULT_NEAR_RADIUS_M),
            [lat, lng, radius] => (*lat, *lng, *radius),
            _ => return Err(invalid()),
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) || radius_m <= 0.0 {
            return Err(invalid());
        }
        Ok(Self { lat, lng, radius_m })
    }

    /// Issues without captured coordinates never match
    pub fn contains(&self, issue: &IssueDoc) -> bool {
        issue.location.has_coordinates()
            && haversine_m(self.lat, self.lng, issue.location.lat, issue.location.lng)
                <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::GeoLocation;

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km
        let d = haversine_m(9.0, 78.0, 10.0, 78.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
        assert_eq!(haversine_m(9.9, 78.1, 9.9, 78.1), 0.0);
    }

    #[test]
    fn test_near_parse() {
        let near = NearFilter::parse("9.92,78.11").unwrap();
        assert_eq!(near.radius_m, DEFAULT_NEAR_RADIUS_M);
        assert_eq!(NearFilter::parse("9.92, 78.11, 250").unwrap().radius_m, 250.0);
        assert!(NearFilter::parse("9.92").is_err());
        assert!(NearFilter::parse("abc,78").is_err());
        assert!(NearFilter::parse("95,78").is_err());
    }

    #[test]
    fn test_near_contains() {
        let near = NearFilter::parse("9.9252,78.1198,1000").unwrap();
        let at = |lat, lng| IssueDoc {
            location: GeoLocation {
                lat,
                lng,
                address: String::new(),
            },
            ..IssueDoc::default()
        };
        assert!(near.contains(&at(9.9260, 78.1200)));
        assert!(!near.contains(&at(9.9800, 78.1198)));
        assert!(!near.contains(&at(0.0, 0.0)));
    }
}
