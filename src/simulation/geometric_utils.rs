//! Geometric helpers for ray casting and polyline validation.

use geo::algorithm::Distance;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Euclidean, Line, Point};

/// Euclidean distance between two coordinates.
#[inline]
pub fn distance(a: Coord<f32>, b: Coord<f32>) -> f32 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Distance from `origin` to the nearest point where `ray` meets `segment`.
///
/// `ray` must start at `origin`. For collinear overlaps the nearer end of the
/// overlap is used.
pub fn segment_hit_distance(origin: Coord<f32>, ray: Line<f32>, segment: Line<f32>) -> Option<f32> {
    match line_intersection(ray, segment)? {
        LineIntersection::SinglePoint { intersection, .. } => Some(distance(origin, intersection)),
        LineIntersection::Collinear { intersection } => Some(
            distance(origin, intersection.start).min(distance(origin, intersection.end)),
        ),
    }
}

/// Segments of a closed ring, including the one joining the last point back
/// to the first.
pub fn ring_segments(points: &[Coord<f32>]) -> impl Iterator<Item = Line<f32>> + '_ {
    let n = points.len();
    (0..n).map(move |i| Line::new(points[i], points[(i + 1) % n]))
}

/// Returns the indices of two non-adjacent segments of a closed ring that
/// touch, if any.
pub fn find_self_intersection(points: &[Coord<f32>]) -> Option<(usize, usize)> {
    let segments: Vec<Line<f32>> = ring_segments(points).collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // the first and last segments share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if line_intersection(segments[i], segments[j]).is_some() {
                return Some((i, j));
            }
        }
    }
    None
}

/// Returns `true` if any segment of ring `a` touches any segment of ring `b`.
pub fn rings_intersect(a: &[Coord<f32>], b: &[Coord<f32>]) -> bool {
    ring_segments(a).any(|sa| ring_segments(b).any(|sb| line_intersection(sa, sb).is_some()))
}

/// Unit vector pointing along `heading` (radians, counter-clockwise from +x).
#[inline]
pub fn heading_vector(heading: f32) -> Coord<f32> {
    Coord {
        x: heading.cos(),
        y: heading.sin(),
    }
}
