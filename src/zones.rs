//! Polygonal monitoring zones.
//!
//! A zone is a named simple polygon over the camera's field of view. A person
//! triggers a zone intrusion when their centroid lies inside the polygon; the
//! whole body is not tested, only its center.
//!
//! Boundary points count as inside. The crossing test uses the semi-open
//! `(y1 > y) != (y2 > y)` rule in integer arithmetic, which is exact and
//! handles horizontal edges and shared vertices without special cases; an
//! explicit on-segment check makes the boundary inclusive.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{validate_zone_name, Point};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub polygon: Vec<Point>,
    /// Display color for overlays and thumbnails.
    pub color: [u8; 3],
}

impl Zone {
    pub fn new(name: &str, polygon: Vec<Point>, color: [u8; 3]) -> Result<Self> {
        validate_zone_name(name)?;
        Ok(Self {
            name: name.to_string(),
            polygon,
            color,
        })
    }

    /// A zone needs at least 3 vertices to bound an area. Inactive zones
    /// never match.
    pub fn is_active(&self) -> bool {
        self.polygon.len() >= 3
    }

    /// Point-in-polygon, boundary inclusive. Inactive zones return false.
    pub fn contains(&self, p: Point) -> bool {
        if !self.is_active() {
            return false;
        }

        let px = p.x as i64;
        let py = p.y as i64;
        let n = self.polygon.len();

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.polygon[i];
            let b = self.polygon[j];
            if on_segment(p, a, b) {
                return true;
            }

            let (xi, yi) = (a.x as i64, a.y as i64);
            let (xj, yj) = (b.x as i64, b.y as i64);
            if (yi > py) != (yj > py) {
                // px < x-intersection of the edge with the scanline, kept in
                // integer form by multiplying through by (yj - yi).
                let lhs = (px - xi) * (yj - yi);
                let rhs = (py - yi) * (xj - xi);
                let crosses = if yj > yi { lhs < rhs } else { lhs > rhs };
                if crosses {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Is `p` on the closed segment `a`-`b`? Exact integer test.
fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let (px, py) = (p.x as i64, p.y as i64);
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (bx, by) = (b.x as i64, b.y as i64);

    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross != 0 {
        return false;
    }
    px >= ax.min(bx) && px <= ax.max(bx) && py >= ay.min(by) && py <= ay.max(by)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Zone {
        Zone::new(
            "square",
            vec![
                Point::new(0, 0),
                Point::new(10, 0),
                Point::new(10, 10),
                Point::new(0, 10),
            ],
            [255, 0, 0],
        )
        .unwrap()
    }

    #[test]
    fn interior_and_exterior() {
        let zone = square();
        assert!(zone.contains(Point::new(5, 5)));
        assert!(!zone.contains(Point::new(15, 5)));
        assert!(!zone.contains(Point::new(-1, 5)));
    }

    #[test]
    fn boundary_points_are_inside() {
        let zone = square();
        // edges
        assert!(zone.contains(Point::new(5, 0)));
        assert!(zone.contains(Point::new(10, 5)));
        assert!(zone.contains(Point::new(0, 5)));
        // vertices
        assert!(zone.contains(Point::new(0, 0)));
        assert!(zone.contains(Point::new(10, 10)));
    }

    #[test]
    fn verdict_invariant_under_vertex_rotation() {
        let vertices = vec![
            Point::new(2, 1),
            Point::new(12, 3),
            Point::new(9, 11),
            Point::new(4, 9),
            Point::new(1, 5),
        ];
        let probes = [
            Point::new(6, 6),
            Point::new(0, 0),
            Point::new(12, 3),
            Point::new(7, 2),
            Point::new(13, 11),
        ];
        for start in 0..vertices.len() {
            let mut rotated = vertices.clone();
            rotated.rotate_left(start);
            let zone = Zone::new("rotated", rotated, [0, 0, 255]).unwrap();
            let reference = Zone::new("reference", vertices.clone(), [0, 0, 255]).unwrap();
            for p in probes {
                assert_eq!(
                    zone.contains(p),
                    reference.contains(p),
                    "rotation {} changed verdict for {:?}",
                    start,
                    p
                );
            }
        }
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U-shape: the notch between the arms is outside.
        let zone = Zone::new(
            "u-shape",
            vec![
                Point::new(0, 0),
                Point::new(12, 0),
                Point::new(12, 12),
                Point::new(8, 12),
                Point::new(8, 4),
                Point::new(4, 4),
                Point::new(4, 12),
                Point::new(0, 12),
            ],
            [0, 255, 0],
        )
        .unwrap();
        assert!(zone.contains(Point::new(2, 8))); // left arm
        assert!(zone.contains(Point::new(10, 8))); // right arm
        assert!(!zone.contains(Point::new(6, 8))); // notch
        assert!(zone.contains(Point::new(6, 2))); // bridge
    }

    #[test]
    fn degenerate_polygon_is_inactive() {
        let zone = Zone::new(
            "line",
            vec![Point::new(0, 0), Point::new(10, 10)],
            [0, 0, 0],
        )
        .unwrap();
        assert!(!zone.is_active());
        assert!(!zone.contains(Point::new(5, 5)));
    }

    #[test]
    fn zone_name_is_validated() {
        assert!(Zone::new("bad/name", vec![], [0, 0, 0]).is_err());
    }
}
