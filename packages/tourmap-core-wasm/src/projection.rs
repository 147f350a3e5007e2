// Geographic (EPSG:4326) <-> Web Mercator (EPSG:3857) conversions.

use geo::Coord;

pub const EARTH_RADIUS: f64 = 6_378_137.0;
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Project a `(lon, lat)` coordinate into Web Mercator metres.
pub fn to_mercator(lon_lat: Coord<f64>) -> Coord<f64> {
    let lat = lon_lat.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon_lat.x.to_radians();
    let y = EARTH_RADIUS * ((std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan()).ln();
    Coord { x, y }
}

/// Inverse of [`to_mercator`].
pub fn to_lon_lat(projected: Coord<f64>) -> Coord<f64> {
    let lon = (projected.x / EARTH_RADIUS).to_degrees();
    // atan(sinh(y / R))
    let lat = (projected.y / EARTH_RADIUS).sinh().atan().to_degrees();
    Coord { x: lon, y: lat }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_origin() {
        let p = to_mercator(Coord { x: 0.0, y: 0.0 });
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_nairobi() {
        let nairobi = Coord { x: 36.8219, y: -1.2921 };
        let back = to_lon_lat(to_mercator(nairobi));
        assert!((back.x - nairobi.x).abs() < 1e-9);
        assert!((back.y - nairobi.y).abs() < 1e-9);
    }

    #[test]
    fn test_latitude_is_clamped() {
        let pole = to_mercator(Coord { x: 0.0, y: 90.0 });
        let edge = to_mercator(Coord { x: 0.0, y: MAX_LATITUDE });
        assert_eq!(pole.y, edge.y);
        // Half the world width at the antimeridian
        let east = to_mercator(Coord { x: 180.0, y: 0.0 });
        assert!((east.x - 20_037_508.342_789_244).abs() < 1e-6);
    }
}
