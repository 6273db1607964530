//! Connection curve geometry.
//!
//! A connection's path is a chain of cubic segments running through
//! start → each split → end. Every segment places its control points at
//! 25%/10% and 75%/90% of its displacement, so curves leave and enter their
//! anchors close to horizontal.

use kurbo::{BezPath, ParamCurve, ParamCurveNearest, PathSeg, Point};

const NEAREST_ACCURACY: f64 = 1e-3;

/// Control points of the segment running from `from` to `to`.
pub fn segment_controls(from: Point, to: Point) -> (Point, Point) {
    let d = to - from;
    (
        Point::new(from.x + d.x * 0.25, from.y + d.y * 0.1),
        Point::new(from.x + d.x * 0.75, from.y + d.y * 0.9),
    )
}

/// Build the full curve through `start`, `via` (in order) and `end`.
pub fn connection_path(start: Point, via: &[Point], end: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(start);
    let mut from = start;
    for &to in via.iter().chain(std::iter::once(&end)) {
        let (c1, c2) = segment_controls(from, to);
        path.curve_to(c1, c2, to);
        from = to;
    }
    path
}

/// Closest point of a path to `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathHit {
    /// Index of the segment (0 = start → first split).
    pub segment: usize,
    /// The point on the curve.
    pub point: Point,
    pub distance: f64,
}

/// Find the point of `path` nearest to `p`, or `None` for an empty path.
pub fn nearest_on_path(path: &BezPath, p: Point) -> Option<PathHit> {
    path.segments()
        .enumerate()
        .map(|(segment, seg)| nearest_on_segment(segment, seg, p))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn nearest_on_segment(segment: usize, seg: PathSeg, p: Point) -> PathHit {
    let nearest = seg.nearest(p, NEAREST_ACCURACY);
    PathHit {
        segment,
        point: seg.eval(nearest.t),
        distance: nearest.distance_sq.sqrt(),
    }
}
