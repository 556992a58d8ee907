//! Ray/sphere intersection against spheres centred on the planet.
//!
//! Directions are assumed to be unit length.

use glam::Vec3;

/// Returned when a ray does not hit a sphere.
pub const NO_HIT: f32 = -1.0;

/// Distance to the nearest hit in front of `origin`, or [`NO_HIT`].
///
/// From inside the sphere, or on its surface, this is the far root (the exit
/// point).
pub fn sphere_intersect_distance(origin: Vec3, dir: Vec3, radius: f32) -> f32 {
    let b = origin.dot(dir);
    let c = origin.dot(origin) - radius * radius;

    // Outside and pointing away.
    if c > 0.0 && b > 0.0 {
        return NO_HIT;
    }

    let discr = b * b - c;
    if discr < 0.0 {
        NO_HIT
    } else if c <= 0.0 {
        -b + discr.sqrt()
    } else {
        -b - discr.sqrt()
    }
}

/// Signed `(entry, exit)` distances along the ray.
///
/// `entry < 0` means the origin is inside the sphere; `exit < 0` means the
/// sphere is not hit in front of the origin. A miss returns `(NO_HIT, NO_HIT)`.
pub fn sphere_intersect(origin: Vec3, dir: Vec3, radius: f32) -> (f32, f32) {
    let b = origin.dot(dir);
    let c = origin.dot(origin) - radius * radius;
    let discr = b * b - c;
    if discr < 0.0 {
        return (NO_HIT, NO_HIT);
    }
    let root = discr.sqrt();
    (-b - root, -b + root)
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f32 = 6360.0;

    #[test]
    fn test_distance_from_outside() {
        let origin = Vec3::new(0.0, R + 100.0, 0.0);
        let hit = sphere_intersect_distance(origin, Vec3::NEG_Y, R);
        assert!((hit - 100.0).abs() < 1e-2, "hit {hit}");
    }

    #[test]
    fn test_distance_pointing_away_misses() {
        let origin = Vec3::new(0.0, R + 100.0, 0.0);
        assert_eq!(sphere_intersect_distance(origin, Vec3::Y, R), NO_HIT);
    }

    #[test]
    fn test_distance_tangent_miss() {
        let origin = Vec3::new(0.0, R + 100.0, 0.0);
        assert_eq!(sphere_intersect_distance(origin, Vec3::X, R), NO_HIT);
    }

    #[test]
    fn test_distance_from_inside_uses_far_root() {
        let origin = Vec3::new(0.0, R + 1.0, 0.0);
        let top = R + 100.0;
        let up = sphere_intersect_distance(origin, Vec3::Y, top);
        assert!((up - 99.0).abs() < 1e-2, "up {up}");
        let down = sphere_intersect_distance(origin, Vec3::NEG_Y, top);
        assert!((down - (2.0 * top - 99.0)).abs() < 1e-1, "down {down}");
    }

    #[test]
    fn test_distance_from_surface() {
        let origin = Vec3::new(0.0, R, 0.0);
        let inward = sphere_intersect_distance(origin, Vec3::NEG_Y, R);
        assert!((inward - 2.0 * R).abs() < 1.0, "inward {inward}");
        let slanted = Vec3::new(0.0, -0.5, -0.75f32.sqrt());
        let chord = sphere_intersect_distance(origin, slanted, R);
        assert!((chord - R).abs() < 1.0, "chord {chord}");
        assert_eq!(sphere_intersect_distance(origin, Vec3::Y, R), 0.0);
    }

    #[test]
    fn test_entry_exit_from_inside() {
        let origin = Vec3::new(0.0, R + 1.0, 0.0);
        let (entry, exit) = sphere_intersect(origin, Vec3::Y, R + 100.0);
        assert!(entry < 0.0);
        assert!((exit - 99.0).abs() < 1e-2);
    }

    #[test]
    fn test_entry_exit_from_outside() {
        let origin = Vec3::new(0.0, 0.0, 3.0);
        let (entry, exit) = sphere_intersect(origin, Vec3::NEG_Z, 1.0);
        assert!((entry - 2.0).abs() < 1e-6);
        assert!((exit - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_entry_exit_behind_and_miss() {
        let origin = Vec3::new(0.0, 0.0, 3.0);
        let (_, exit) = sphere_intersect(origin, Vec3::Z, 1.0);
        assert!(exit < 0.0, "sphere behind the ray must report exit < 0");
        assert_eq!(sphere_intersect(origin, Vec3::X, 1.0), (NO_HIT, NO_HIT));
    }
}
