use glam::Vec2;

use super::contact::Contact;
use crate::{
    config::MAX_CONTACTS_PER_ARBITER,
    core::collider::{Collider, ConvexPolygon, PolygonAxis, WorldGeometry},
    utils::{hash::feature_hash, math},
};

/// Appends contacts to a caller-owned buffer, dropping any beyond the per-arbiter cap.
struct ContactSink<'a> {
    out: &'a mut Vec<Contact>,
    start: usize,
}

impl<'a> ContactSink<'a> {
    fn new(out: &'a mut Vec<Contact>) -> Self {
        let start = out.len();
        Self { out, start }
    }

    fn push(&mut self, contact: Contact) {
        if self.count() < MAX_CONTACTS_PER_ARBITER {
            self.out.push(contact);
        }
    }

    fn push_opt(&mut self, contact: Option<Contact>) -> bool {
        match contact {
            Some(contact) => {
                self.push(contact);
                true
            }
            None => false,
        }
    }

    fn count(&self) -> usize {
        self.out.len() - self.start
    }
}

/// Rounded segment in world space.
#[derive(Debug, Clone, Copy)]
struct WorldSegment {
    a: Vec2,
    b: Vec2,
    normal: Vec2,
    radius: f32,
    hash: u64,
}

impl WorldSegment {
    fn value_on_axis(&self, n: Vec2, d: f32) -> f32 {
        (n.dot(self.a) - self.radius).min(n.dot(self.b) - self.radius) - d
    }
}

/// Circle–circle test. The contact sits midway through the overlap.
pub fn circle_circle(p1: Vec2, r1: f32, p2: Vec2, r2: f32, hash: u64) -> Option<Contact> {
    let min_dist = r1 + r2;
    let delta = p2 - p1;
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    // Coincident centers have no defined axis.
    let normal = if dist > 0.0 { delta / dist } else { Vec2::X };
    let point = p1 + normal * (r1 + 0.5 * (dist - min_dist));
    Some(Contact::new(point, normal, dist - min_dist, hash))
}

fn circle_segment(center: Vec2, radius: f32, seg: &WorldSegment) -> Option<Contact> {
    let r_sum = radius + seg.radius;

    let dn = seg.normal.dot(center) - seg.a.dot(seg.normal);
    let dist = dn.abs() - r_sum;
    if dist > 0.0 {
        return None;
    }

    let dt = -math::cross(seg.normal, center);
    let dt_min = -math::cross(seg.normal, seg.a);
    let dt_max = -math::cross(seg.normal, seg.b);

    if dt < dt_min {
        if dt < dt_min - r_sum {
            None
        } else {
            circle_circle(center, radius, seg.a, seg.radius, feature_hash(seg.hash, 0))
        }
    } else if dt < dt_max {
        let n = if dn < 0.0 { seg.normal } else { -seg.normal };
        Some(Contact::new(
            center + n * (radius + dist * 0.5),
            n,
            dist,
            feature_hash(seg.hash, 2),
        ))
    } else if dt < dt_max + r_sum {
        circle_circle(center, radius, seg.b, seg.radius, feature_hash(seg.hash, 1))
    } else {
        None
    }
}

fn circle_polygon(center: Vec2, radius: f32, poly: &ConvexPolygon, poly_hash: u64) -> Option<Contact> {
    let axes = poly.axes();
    let verts = poly.verts();

    let mut min_index = 0;
    let mut min = f32::NEG_INFINITY;
    for (i, axis) in axes.iter().enumerate() {
        let dist = axis.normal.dot(center) - axis.offset - radius;
        if dist > 0.0 {
            return None;
        }
        if dist > min {
            min = dist;
            min_index = i;
        }
    }

    let n = axes[min_index].normal;
    let next = (min_index + 1) % verts.len();
    let a = verts[min_index];
    let b = verts[next];
    let dta = math::cross(n, a);
    let dtb = math::cross(n, b);
    let dt = math::cross(n, center);

    if dt < dtb {
        circle_circle(center, radius, b, 0.0, feature_hash(poly_hash, next))
    } else if dt < dta {
        Some(Contact::new(
            center - n * (radius + min * 0.5),
            -n,
            min,
            feature_hash(poly_hash, verts.len() + min_index),
        ))
    } else {
        circle_circle(center, radius, a, 0.0, feature_hash(poly_hash, min_index))
    }
}

fn points_behind_segment(
    sink: &mut ContactSink<'_>,
    seg: &WorldSegment,
    poly: &ConvexPolygon,
    poly_hash: u64,
    p_dist: f32,
    coef: f32,
) {
    let dta = math::cross(seg.normal, seg.a);
    let dtb = math::cross(seg.normal, seg.b);
    let n = seg.normal * coef;
    let limit = seg.normal.dot(seg.a) * coef + seg.radius;

    for (i, v) in poly.verts().iter().enumerate() {
        if v.dot(n) < limit {
            let dt = math::cross(seg.normal, *v);
            if dta >= dt && dt >= dtb {
                sink.push(Contact::new(*v, n, p_dist, feature_hash(poly_hash, i)));
            }
        }
    }
}

fn segment_polygon(
    sink: &mut ContactSink<'_>,
    seg: &WorldSegment,
    poly: &ConvexPolygon,
    poly_hash: u64,
    slop: f32,
) {
    let seg_d = seg.normal.dot(seg.a);
    let min_norm = poly.value_on_axis(seg.normal, seg_d) - seg.radius;
    let min_neg = poly.value_on_axis(-seg.normal, -seg_d) - seg.radius;
    if min_neg > 0.0 || min_norm > 0.0 {
        return;
    }

    let axes = poly.axes();
    let mut min_index = 0;
    let mut poly_min = f32::NEG_INFINITY;
    for (i, axis) in axes.iter().enumerate() {
        let dist = seg.value_on_axis(axis.normal, axis.offset);
        if dist > 0.0 {
            return;
        }
        if dist > poly_min {
            poly_min = dist;
            min_index = i;
        }
    }

    let poly_n = -axes[min_index].normal;
    let va = seg.a + poly_n * seg.radius;
    let vb = seg.b + poly_n * seg.radius;
    if poly.contains_point(va) {
        sink.push(Contact::new(va, poly_n, poly_min, feature_hash(seg.hash, 0)));
    }
    if poly.contains_point(vb) {
        sink.push(Contact::new(vb, poly_n, poly_min, feature_hash(seg.hash, 1)));
    }

    // Prefer the segment's own face when it is nearly as shallow as the best polygon face.
    let threshold = poly_min - slop;
    if min_norm >= threshold || min_neg >= threshold {
        if min_norm > min_neg {
            points_behind_segment(sink, seg, poly, poly_hash, min_norm, 1.0);
        } else {
            points_behind_segment(sink, seg, poly, poly_hash, min_neg, -1.0);
        }
    }

    if sink.count() == 0 {
        let verts = poly.verts();
        let next = (min_index + 1) % verts.len();
        let candidates = [
            (seg.a, 0, verts[min_index], min_index),
            (seg.b, 1, verts[min_index], min_index),
            (seg.a, 0, verts[next], next),
            (seg.b, 1, verts[next], next),
        ];
        for (end, end_index, vert, vert_index) in candidates {
            let hash = feature_hash(feature_hash(seg.hash, end_index), vert_index);
            if sink.push_opt(circle_circle(end, seg.radius, vert, 0.0, hash)) {
                break;
            }
        }
    }
}

/// Separating-axis routines for convex polygons.
pub struct SATAlgorithm;

impl SATAlgorithm {
    /// Least-penetrating axis of `axes` against `poly`, or `None` if one of them separates.
    pub fn find_min_separating_axis(
        poly: &ConvexPolygon,
        axes: &[PolygonAxis],
    ) -> Option<(usize, f32)> {
        let mut best = (0, f32::NEG_INFINITY);
        for (i, axis) in axes.iter().enumerate() {
            let dist = poly.value_on_axis(axis.normal, axis.offset);
            if dist > 0.0 {
                return None;
            }
            if dist > best.1 {
                best = (i, dist);
            }
        }
        Some(best)
    }

    fn polygon_polygon(
        sink: &mut ContactSink<'_>,
        poly1: &ConvexPolygon,
        hash1: u64,
        poly2: &ConvexPolygon,
        hash2: u64,
    ) {
        let Some((mini1, min1)) = Self::find_min_separating_axis(poly2, poly1.axes()) else {
            return;
        };
        let Some((mini2, min2)) = Self::find_min_separating_axis(poly1, poly2.axes()) else {
            return;
        };

        if min1 > min2 {
            Self::find_verts(sink, poly1, hash1, poly2, hash2, poly1.axes()[mini1].normal, min1);
        } else {
            Self::find_verts(sink, poly1, hash1, poly2, hash2, -poly2.axes()[mini2].normal, min2);
        }
    }

    fn find_verts(
        sink: &mut ContactSink<'_>,
        poly1: &ConvexPolygon,
        hash1: u64,
        poly2: &ConvexPolygon,
        hash2: u64,
        n: Vec2,
        dist: f32,
    ) {
        for (i, v) in poly1.verts().iter().enumerate() {
            if poly2.contains_point_partial(*v, -n) {
                sink.push(Contact::new(*v, n, dist, feature_hash(hash1, i)));
            }
        }
        for (i, v) in poly2.verts().iter().enumerate() {
            if poly1.contains_point_partial(*v, n) {
                sink.push(Contact::new(*v, n, dist, feature_hash(hash2, i)));
            }
        }

        // Edges can cross without either polygon holding a vertex of the other.
        if sink.count() == 0 {
            let deepest = poly2
                .verts()
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| n.dot(**a).total_cmp(&n.dot(**b)));
            if let Some((i, v)) = deepest {
                sink.push(Contact::new(*v, n, dist, feature_hash(hash2, i)));
            }
        }
    }
}

/// Narrow phase dispatcher mapping shape pairs onto the routines above.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Appends contacts between `a` and `b` to `out` and returns how many were added.
    ///
    /// Normals point from `a` to `b` regardless of argument order. Segment pairs
    /// never collide. World geometry must be current (see [`Collider::cache_bounds`]).
    pub fn collide(a: &Collider, b: &Collider, slop: f32, out: &mut Vec<Contact>) -> usize {
        let start = out.len();
        if a.kind() > b.kind() {
            Self::dispatch(b, a, slop, out);
            for contact in &mut out[start..] {
                *contact = contact.flipped();
            }
        } else {
            Self::dispatch(a, b, slop, out);
        }
        out.len() - start
    }

    fn dispatch(a: &Collider, b: &Collider, slop: f32, out: &mut Vec<Contact>) {
        let mut sink = ContactSink::new(out);
        match (a.world_geometry(), b.world_geometry()) {
            (
                WorldGeometry::Circle { center: c1, radius: r1 },
                WorldGeometry::Circle { center: c2, radius: r2 },
            ) => {
                sink.push_opt(circle_circle(*c1, *r1, *c2, *r2, 0));
            }
            (WorldGeometry::Circle { center, radius }, WorldGeometry::Segment { .. }) => {
                if let Some(seg) = world_segment(b) {
                    sink.push_opt(circle_segment(*center, *radius, &seg));
                }
            }
            (WorldGeometry::Circle { center, radius }, WorldGeometry::Polygon(poly)) => {
                sink.push_opt(circle_polygon(*center, *radius, poly, b.hash_id()));
            }
            (WorldGeometry::Segment { .. }, WorldGeometry::Polygon(poly)) => {
                if let Some(seg) = world_segment(a) {
                    segment_polygon(&mut sink, &seg, poly, b.hash_id(), slop);
                }
            }
            (WorldGeometry::Polygon(poly1), WorldGeometry::Polygon(poly2)) => {
                SATAlgorithm::polygon_polygon(&mut sink, poly1, a.hash_id(), poly2, b.hash_id());
            }
            _ => {}
        }
    }
}

fn world_segment(collider: &Collider) -> Option<WorldSegment> {
    match collider.world_geometry() {
        WorldGeometry::Segment {
            a,
            b,
            normal,
            radius,
        } => Some(WorldSegment {
            a: *a,
            b: *b,
            normal: *normal,
            radius: *radius,
            hash: collider.hash_id(),
        }),
        _ => None,
    }
}
