//! Distance properties the search heuristic relies on.

mod fixtures;

use emergency_router::geo::{self, BoundingBox};

use fixtures::{GOVERNMENT_HOSPITAL, HOPE_HOSPITAL, all_locations};

#[test]
fn test_distance_is_symmetric_and_zero_on_identity() {
    let locations = all_locations();
    for a in &locations {
        assert_eq!(geo::distance(a.point(), a.point()), 0.0, "{}", a.name);
        for b in &locations {
            assert_eq!(
                geo::distance(a.point(), b.point()),
                geo::distance(b.point(), a.point()),
                "{} <-> {}",
                a.name,
                b.name
            );
        }
    }
}

#[test]
fn test_triangle_inequality() {
    let locations = all_locations();
    for a in &locations {
        for b in &locations {
            for c in &locations {
                let direct = geo::distance(a.point(), c.point());
                let detour = geo::distance(a.point(), b.point()) + geo::distance(b.point(), c.point());
                assert!(
                    direct <= detour + 1e-9,
                    "{} -> {} -> {}: {direct} > {detour}",
                    a.name,
                    b.name,
                    c.name
                );
            }
        }
    }
}

#[test]
fn test_hospital_separation() {
    // ~0.93 km of latitude and ~0.61 km of longitude apart.
    let km = geo::distance(GOVERNMENT_HOSPITAL.point(), HOPE_HOSPITAL.point());
    assert!(km > 1.0 && km < 1.25, "got {km}");
}

#[test]
fn test_fixtures_inside_service_area() {
    for location in all_locations() {
        assert!(
            BoundingBox::RAJAHMUNDRY.contains(location.point()),
            "{} is outside the service area",
            location.name
        );
    }
}
