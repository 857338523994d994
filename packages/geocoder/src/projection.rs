//! Reprojection between WGS84 and spherical web mercator.
//!
//! The dataset stores every geometry in EPSG:3857, so query points are
//! projected on the way in and building centroids are unprojected on the
//! way out. Both directions are closed-form and stateless.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use osm_geocoder_models::{GeographicPoint, ProjectedPoint};

/// SRID of the projected system used by the stored geometries.
pub const WEB_MERCATOR_SRID: i32 = 3857;

/// Semi-major axis of the WGS84 ellipsoid, used as the sphere radius.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Projects a geographic coordinate to web mercator meters.
///
/// The northing is computed for `|lat|` and mirrored, so both poles map to
/// a large but finite value and unproject back to `±90`.
#[must_use]
pub fn to_projected(point: GeographicPoint) -> ProjectedPoint {
    let lat = point.lat.to_radians();
    let lon = point.lon.to_radians();

    // tan(pi/4 - pi/4) is exactly zero at the south pole; the north side
    // never reaches zero or infinity in f64.
    let northing = EARTH_RADIUS * (FRAC_PI_4 + lat.abs() / 2.0).tan().ln();

    ProjectedPoint::new(EARTH_RADIUS * lon, northing.copysign(lat))
}

/// Unprojects web mercator meters to a geographic coordinate.
#[must_use]
pub fn to_geographic(point: ProjectedPoint) -> GeographicPoint {
    let lon = (point.x / EARTH_RADIUS).to_degrees();
    let lat = 2.0f64
        .mul_add((point.y / EARTH_RADIUS).exp().atan(), -FRAC_PI_2)
        .to_degrees();

    GeographicPoint::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn origin_maps_to_origin() {
        let projected = to_projected(GeographicPoint::new(0.0, 0.0));
        assert!(projected.x.abs() < 1e-9);
        assert!(projected.y.abs() < 1e-9);
    }

    #[test]
    fn projects_known_reference_point() {
        // Berlin, Brandenburg Gate.
        let projected = to_projected(GeographicPoint::new(52.516_275, 13.377_704));
        assert!((projected.x - 1_489_199.197).abs() < 0.01, "x = {}", projected.x);
        assert!((projected.y - 6_894_018.358).abs() < 0.01, "y = {}", projected.y);
    }

    #[test]
    fn antimeridian_maps_to_world_edge() {
        let projected = to_projected(GeographicPoint::new(0.0, 180.0));
        assert!((projected.x - 20_037_508.342_789_244).abs() < 1e-6);
    }

    #[test]
    fn round_trip_within_tolerance() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lon = -180.0;
            while lon <= 180.0 {
                let original = GeographicPoint::new(lat, lon);
                let back = to_geographic(to_projected(original));
                assert!(
                    (back.lat - lat).abs() < TOLERANCE && (back.lon - lon).abs() < TOLERANCE,
                    "round trip drifted for {original:?}: {back:?}"
                );
                lon += 7.5;
            }
            lat += 2.5;
        }
    }

    #[test]
    fn round_trips_beyond_square_mercator_bounds() {
        for lat in [85.1, 87.5, 89.0, 89.9, 89.999, -85.1, -89.9, -89.999] {
            let back = to_geographic(to_projected(GeographicPoint::new(lat, 10.0)));
            assert!(
                (back.lat - lat).abs() < TOLERANCE,
                "lat {lat} came back as {}",
                back.lat
            );
        }
    }

    #[test]
    fn poles_stay_finite_and_round_trip() {
        for lat in [90.0, -90.0] {
            let projected = to_projected(GeographicPoint::new(lat, 10.0));
            assert!(projected.y.is_finite(), "northing at {lat} is {}", projected.y);
            assert_eq!(projected.y.signum(), lat.signum());

            let back = to_geographic(projected);
            assert!((back.lat - lat).abs() < TOLERANCE, "pole {lat} came back as {}", back.lat);
            assert!((back.lon - 10.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn southern_latitudes_mirror_northern() {
        let north = to_projected(GeographicPoint::new(60.0, 0.0));
        let south = to_projected(GeographicPoint::new(-60.0, 0.0));
        assert!((north.y + south.y).abs() < 1e-6);
    }
}
