//! Horizontal-plane geometry for distances and directional hints.

use crate::models::{Coords, RoutePreference};
use crate::provider::PointOfInterest;
use std::fmt;

pub fn horizontal_distance(a: Coords, b: Coords) -> f64 {
    (a.x - b.x).hypot(a.z - b.z)
}

/// Compass bearing in degrees from `from` to `to`, 0 = north, clockwise.
pub fn bearing_degrees(from: Coords, to: Coords) -> f64 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    // Map north is -z
    dx.atan2(-dz).to_degrees().rem_euclid(360.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compass {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Compass {
    const POINTS: [Compass; 8] = [
        Compass::North,
        Compass::NorthEast,
        Compass::East,
        Compass::SouthEast,
        Compass::South,
        Compass::SouthWest,
        Compass::West,
        Compass::NorthWest,
    ];

    pub fn from_bearing(degrees: f64) -> Self {
        let sector = ((degrees.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
        Self::POINTS[sector]
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compass::North => "north",
            Compass::NorthEast => "north-east",
            Compass::East => "east",
            Compass::SouthEast => "south-east",
            Compass::South => "south",
            Compass::SouthWest => "south-west",
            Compass::West => "west",
            Compass::NorthWest => "north-west",
        };
        f.write_str(name)
    }
}

/// How to reach the target from the closest usable point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalHint {
    pub via: String,
    pub direction: Compass,
    /// Rounded straight-line distance in blocks
    pub distance: u32,
}

/// Nearest point of interest the route preference allows, with the heading to the target.
///
/// `Fastest` uses any public spawn. `Safest` also skips non-neutral nations.
pub fn directional_hint(
    target: Coords,
    points: &[PointOfInterest],
    route: RoutePreference,
) -> Option<DirectionalHint> {
    points
        .iter()
        .filter(|poi| poi.public && (route == RoutePreference::Fastest || poi.neutral))
        .map(|poi| (poi, horizontal_distance(poi.coords, target)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(poi, distance)| DirectionalHint {
            via: poi.name.clone(),
            direction: Compass::from_bearing(bearing_degrees(poi.coords, target)),
            distance: distance.round() as u32,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poi(name: &str, x: f64, z: f64, public: bool, neutral: bool) -> PointOfInterest {
        PointOfInterest {
            name: name.to_string(),
            coords: Coords::new(x, z),
            public,
            neutral,
        }
    }

    #[test]
    fn test_distance_in_horizontal_plane() {
        assert_eq!(horizontal_distance(Coords::new(0.0, 0.0), Coords::new(30.0, 40.0)), 50.0);
        assert_eq!(
            horizontal_distance(Coords::new(-10.0, 5.0), Coords::new(50.0, 85.0)),
            100.0
        );
    }

    #[test]
    fn test_compass_headings() {
        let origin = Coords::new(0.0, 0.0);
        let heading = |x, z| Compass::from_bearing(bearing_degrees(origin, Coords::new(x, z)));
        assert_eq!(heading(0.0, -100.0), Compass::North);
        assert_eq!(heading(100.0, 0.0), Compass::East);
        assert_eq!(heading(0.0, 100.0), Compass::South);
        assert_eq!(heading(-100.0, 0.0), Compass::West);
        assert_eq!(heading(100.0, -100.0), Compass::NorthEast);
        assert_eq!(heading(-100.0, 100.0), Compass::SouthWest);
        // 350 degrees rounds back to north
        assert_eq!(Compass::from_bearing(350.0), Compass::North);
    }

    #[test]
    fn test_hint_picks_nearest_allowed_spawn() {
        let points = vec![
            poi("Closed", 10.0, 0.0, false, true),
            poi("Warzone", 400.0, 0.0, true, false),
            poi("Haven", 0.0, 900.0, true, true),
        ];
        let target = Coords::new(500.0, 0.0);

        let fastest = directional_hint(target, &points, RoutePreference::Fastest).unwrap();
        assert_eq!(fastest.via, "Warzone");
        assert_eq!(fastest.direction, Compass::East);
        assert_eq!(fastest.distance, 100);

        let safest = directional_hint(target, &points, RoutePreference::Safest).unwrap();
        assert_eq!(safest.via, "Haven");
        assert_eq!(safest.direction, Compass::NorthEast);
    }

    #[test]
    fn test_hint_without_points() {
        assert!(directional_hint(Coords::new(0.0, 0.0), &[], RoutePreference::Fastest).is_none());
    }
}
