//! Track boundaries and the queries cars run against them.
//!
//! A track is built from the editor's cubic Bezier control points: the closed
//! centerline is sampled from the curve and offset to either side by half the
//! track width. The resulting inner and outer rings are validated once; after
//! that the track is read-only.

use geo::{Area, BoundingRect, Contains, Coord, Line, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use super::geometric_utils::{
    distance, find_self_intersection, ring_segments, rings_intersect, segment_hit_distance,
};
use super::params::TrackParams;
use crate::error::{Error, Result};

/// Samples closer than this are merged.
const MIN_SAMPLE_SPACING: f32 = 1e-3;

/// One editor control point: an anchor and the handle leaving it.
///
/// The handle entering the anchor mirrors `control` through `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Anchor the curve passes through.
    pub pos: [f32; 2],
    /// Outgoing control handle.
    pub control: [f32; 2],
}

impl TrackPoint {
    /// Creates a control point.
    pub fn new(pos: [f32; 2], control: [f32; 2]) -> Self {
        Self { pos, control }
    }

    /// The incoming handle, `control` mirrored through `pos`.
    pub fn opp_control(&self) -> [f32; 2] {
        [
            2.0 * self.pos[0] - self.control[0],
            2.0 * self.pos[1] - self.control[1],
        ]
    }
}

/// Parses the editor's text format: one `x y cx cy` point per line.
pub fn parse_control_points(text: &str) -> Result<Vec<TrackPoint>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let values: Vec<f32> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| {
                    Error::invalid_configuration(format!("track line {}: {e}", i + 1))
                })?;
            match values.as_slice() {
                &[x, y, cx, cy] => Ok(TrackPoint::new([x, y], [cx, cy])),
                _ => Err(Error::invalid_configuration(format!(
                    "track line {}: expected 4 numbers, found {}",
                    i + 1,
                    values.len()
                ))),
            }
        })
        .collect()
}

/// Closed track between an inner and an outer boundary.
#[derive(Debug, Clone)]
pub struct Track {
    inner: Vec<Coord<f32>>,
    outer: Vec<Coord<f32>>,
    centerline: Vec<Coord<f32>>,
    /// Outer ring with the inner ring as a hole.
    surface: Polygon<f32>,
    /// Ray length that crosses the whole track from any point on it.
    reach: f32,
}

impl Track {
    /// Builds a track from editor control points.
    ///
    /// Points are moved so the first anchor sits at the origin and scaled by
    /// `params.scale`. The curve is treated as closed.
    pub fn from_control_points(points: &[TrackPoint], params: &TrackParams) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::degenerate_geometry(format!(
                "a closed track needs at least 2 control points, got {}",
                points.len()
            )));
        }

        let origin = points[0].pos;
        let transform = |p: [f32; 2]| Coord {
            x: (p[0] - origin[0]) * params.scale,
            y: (p[1] - origin[1]) * params.scale,
        };

        let steps = (1.0 / params.curve_step).ceil() as usize;
        let mut centerline: Vec<Coord<f32>> = Vec::with_capacity(points.len() * steps);
        for (i, p1) in points.iter().enumerate() {
            let p2 = &points[(i + 1) % points.len()];
            let (a, b, c, d) = (
                transform(p1.pos),
                transform(p1.control),
                transform(p2.opp_control()),
                transform(p2.pos),
            );
            for k in 0..steps {
                let t = k as f32 * params.curve_step;
                if t >= 1.0 {
                    break;
                }
                push_sample(&mut centerline, cubic_bezier(a, b, c, d, t));
            }
        }
        while centerline.len() > 1
            && distance(centerline[0], centerline[centerline.len() - 1]) < MIN_SAMPLE_SPACING
        {
            centerline.pop();
        }

        if centerline.len() < 3 {
            return Err(Error::degenerate_geometry(
                "curve collapses to fewer than 3 distinct samples",
            ));
        }

        let (left, right) = offset_ring(&centerline, params.width / 2.0);
        let (inner, outer) = if ring_area(&left) < ring_area(&right) {
            (left, right)
        } else {
            (right, left)
        };

        Self::from_boundaries(inner, outer, centerline)
    }

    /// Builds a track from ready-made boundary rings and a centerline.
    ///
    /// Rings are closed implicitly; do not repeat the first point.
    pub fn from_boundaries(
        inner: Vec<Coord<f32>>,
        outer: Vec<Coord<f32>>,
        centerline: Vec<Coord<f32>>,
    ) -> Result<Self> {
        for (name, ring) in [("inner", &inner), ("outer", &outer)] {
            if ring.len() < 3 {
                return Err(Error::degenerate_geometry(format!(
                    "{name} boundary has {} points, need at least 3",
                    ring.len()
                )));
            }
            if ring.iter().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
                return Err(Error::degenerate_geometry(format!(
                    "{name} boundary has non-finite points"
                )));
            }
            if let Some((a, b)) = find_self_intersection(ring) {
                return Err(Error::degenerate_geometry(format!(
                    "{name} boundary intersects itself (segments {a} and {b})"
                )));
            }
        }
        if rings_intersect(&inner, &outer) {
            return Err(Error::degenerate_geometry("inner and outer boundaries cross"));
        }
        if centerline.len() < 2 {
            return Err(Error::degenerate_geometry("centerline needs at least 2 points"));
        }

        let outer_polygon = Polygon::new(LineString::new(outer.clone()), vec![]);
        if !outer_polygon.contains(&Point::from(inner[0])) {
            return Err(Error::degenerate_geometry(
                "inner boundary does not lie inside the outer boundary",
            ));
        }

        let reach = outer_polygon
            .bounding_rect()
            .map_or(0.0, |rect| 2.0 * distance(rect.min(), rect.max()))
            + 1.0;

        let (outer_ring, _) = outer_polygon.into_inner();
        let surface = Polygon::new(outer_ring, vec![LineString::new(inner.clone())]);

        Ok(Self {
            inner,
            outer,
            centerline,
            surface,
            reach,
        })
    }

    /// Distance along the ray from `origin` in `direction` to the nearest
    /// boundary, or `None` if the ray hits nothing.
    pub fn nearest_intersection(&self, origin: Coord<f32>, direction: Coord<f32>) -> Option<f32> {
        let len = direction.x.hypot(direction.y);
        if !(len.is_finite() && len > 0.0) {
            return None;
        }
        let end = Coord {
            x: origin.x + direction.x / len * self.reach,
            y: origin.y + direction.y / len * self.reach,
        };
        let ray = Line::new(origin, end);

        ring_segments(&self.inner)
            .chain(ring_segments(&self.outer))
            .filter_map(|segment| segment_hit_distance(origin, ray, segment))
            .min_by(f32::total_cmp)
    }

    /// Returns `true` if `point` lies strictly between the two boundaries.
    pub fn is_inside(&self, point: Coord<f32>) -> bool {
        self.surface.contains(&Point::from(point))
    }

    /// Starting position and heading: the first centerline sample, facing the
    /// second.
    pub fn start_pose(&self) -> (Coord<f32>, f32) {
        let (a, b) = (self.centerline[0], self.centerline[1]);
        (a, (b.y - a.y).atan2(b.x - a.x))
    }

    /// Centerline samples in driving order.
    pub fn checkpoints(&self) -> &[Coord<f32>] {
        &self.centerline
    }

    /// Inner boundary ring.
    pub fn inner(&self) -> &[Coord<f32>] {
        &self.inner
    }

    /// Outer boundary ring.
    pub fn outer(&self) -> &[Coord<f32>] {
        &self.outer
    }
}

fn cubic_bezier(a: Coord<f32>, b: Coord<f32>, c: Coord<f32>, d: Coord<f32>, t: f32) -> Coord<f32> {
    let u = 1.0 - t;
    let (wa, wb, wc, wd) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    Coord {
        x: wa * a.x + wb * b.x + wc * c.x + wd * d.x,
        y: wa * a.y + wb * b.y + wc * c.y + wd * d.y,
    }
}

fn push_sample(samples: &mut Vec<Coord<f32>>, p: Coord<f32>) {
    if samples
        .last()
        .is_none_or(|&last| distance(last, p) >= MIN_SAMPLE_SPACING)
    {
        samples.push(p);
    }
}

/// Offsets a closed polyline to both sides along averaged vertex normals.
fn offset_ring(centerline: &[Coord<f32>], half_width: f32) -> (Vec<Coord<f32>>, Vec<Coord<f32>>) {
    let n = centerline.len();
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    for i in 0..n {
        let prev = centerline[(i + n - 1) % n];
        let next = centerline[(i + 1) % n];
        let (tx, ty) = (next.x - prev.x, next.y - prev.y);
        let len = tx.hypot(ty).max(f32::EPSILON);
        let normal = Coord {
            x: -ty / len * half_width,
            y: tx / len * half_width,
        };
        left.push(centerline[i] + normal);
        right.push(centerline[i] - normal);
    }
    (left, right)
}

/// Area enclosed by a closed ring.
fn ring_area(ring: &[Coord<f32>]) -> f32 {
    Polygon::new(LineString::new(ring.to_vec()), vec![]).unsigned_area()
}
