// Bundled route datasets. These never change at runtime.

use crate::error::Result;
use crate::features::{CollectionOrigin, FeatureCollection};

const TOUR_ROUTE: &str = include_str!("../data/tour_route.geojson");
const COUNTY_ROUTES: &str = include_str!("../data/county_routes.geojson");
const WATER_POINTS: &str = include_str!("../data/water_points.geojson");

/// Route lines ridden by the tour.
pub fn tour_route() -> Result<FeatureCollection> {
    FeatureCollection::parse(TOUR_ROUTE, CollectionOrigin::Static)
}

/// County-level way points, one per stop of the tour.
pub fn county_routes() -> Result<FeatureCollection> {
    FeatureCollection::parse(COUNTY_ROUTES, CollectionOrigin::Static)
}

/// Water breaks and meeting points along the first leg.
pub fn water_points() -> Result<FeatureCollection> {
    FeatureCollection::parse(WATER_POINTS, CollectionOrigin::Static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Geometry;

    #[test]
    fn test_water_points() {
        let fc = water_points().unwrap();
        assert_eq!(fc.len(), 5);
        assert_eq!(fc.name.as_deref(), Some("county_rest_points"));
        let first = &fc.features[0];
        assert_eq!(first.label(), Some("DayStar University Nairobi Campus"));
        let p = first.as_point().unwrap();
        assert_eq!((p.x, p.y), (36.8013499, -1.2965247));
    }

    #[test]
    fn test_county_routes_are_points() {
        let fc = county_routes().unwrap();
        assert_eq!(fc.len(), 23);
        assert!(fc.features.iter().all(|f| matches!(f.geometry, Geometry::Point(_))));
        assert_eq!(fc.features[0].property_str("type"), Some("starting_point"));
    }

    #[test]
    fn test_tour_route_is_lines() {
        let fc = tour_route().unwrap();
        assert!(!fc.is_empty());
        assert!(fc
            .features
            .iter()
            .all(|f| matches!(f.geometry, Geometry::LineString(_))));
    }
}
