use glam::Vec2;

use crate::{core::collider::ConvexPolygon, utils::{allocator::ShapeId, math}};

/// Intersection of a query segment with a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub shape: ShapeId,
    /// Fraction along the query segment, in `[0, 1]`.
    pub t: f32,
    /// Surface normal at the hit point.
    pub normal: Vec2,
}

impl SegmentHit {
    pub fn hit_point(&self, start: Vec2, end: Vec2) -> Vec2 {
        start.lerp(end, self.t)
    }

    pub fn hit_distance(&self, start: Vec2, end: Vec2) -> f32 {
        start.distance(end) * self.t
    }
}

/// Segment `a`-`b` against a circle. Returns `(t, normal)` for the entry point.
pub fn circle_segment_query(center: Vec2, radius: f32, a: Vec2, b: Vec2) -> Option<(f32, Vec2)> {
    let a = a - center;
    let b = b - center;

    let qa = a.dot(a) - 2.0 * a.dot(b) + b.dot(b);
    if qa == 0.0 {
        return None;
    }
    let qb = -2.0 * a.dot(a) + 2.0 * a.dot(b);
    let qc = a.dot(a) - radius * radius;

    let det = qb * qb - 4.0 * qa * qc;
    if det < 0.0 {
        return None;
    }

    let t = (-qb - det.sqrt()) / (2.0 * qa);
    if (0.0..=1.0).contains(&t) {
        Some((t, a.lerp(b, t).normalize_or_zero()))
    } else {
        None
    }
}

/// Segment `a`-`b` against a rounded segment shape `ta`-`tb` with face normal `tn`.
pub fn segment_segment_query(
    ta: Vec2,
    tb: Vec2,
    tn: Vec2,
    radius: f32,
    a: Vec2,
    b: Vec2,
) -> Option<(f32, Vec2)> {
    let n = if a.dot(tn) < ta.dot(tn) { -tn } else { tn };

    let an = a.dot(n);
    let bn = b.dot(n);
    if an != bn {
        let d = ta.dot(n) + radius;
        let t = (d - an) / (bn - an);

        if t > 0.0 && t < 1.0 {
            let point = a.lerp(b, t);
            let dt = -math::cross(tn, point);
            let dt_min = -math::cross(tn, ta);
            let dt_max = -math::cross(tn, tb);

            if dt_min < dt && dt < dt_max {
                return Some((t, n));
            }
        }
    }

    if radius > 0.0 {
        let hit_a = circle_segment_query(ta, radius, a, b);
        let hit_b = circle_segment_query(tb, radius, a, b);
        return match (hit_a, hit_b) {
            (Some(ha), Some(hb)) => Some(if ha.0 <= hb.0 { ha } else { hb }),
            (hit, None) | (None, hit) => hit,
        };
    }

    None
}

/// Segment `a`-`b` against a world-space convex polygon. Returns the closest face hit.
pub fn polygon_segment_query(poly: &ConvexPolygon, a: Vec2, b: Vec2) -> Option<(f32, Vec2)> {
    let verts = poly.verts();
    let mut best: Option<(f32, Vec2)> = None;

    for (i, axis) in poly.axes().iter().enumerate() {
        let n = axis.normal;
        let an = a.dot(n);
        if axis.offset > an {
            continue;
        }

        let bn = b.dot(n);
        if an == bn {
            continue;
        }
        let t = (axis.offset - an) / (bn - an);
        if !(0.0..=1.0).contains(&t) {
            continue;
        }

        let point = a.lerp(b, t);
        let dt = -math::cross(n, point);
        let dt_min = -math::cross(n, verts[i]);
        let dt_max = -math::cross(n, verts[(i + 1) % verts.len()]);

        if dt_min <= dt && dt <= dt_max && best.map_or(true, |(best_t, _)| t < best_t) {
            best = Some((t, n));
        }
    }

    best
}
