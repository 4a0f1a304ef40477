use std::f32::consts::TAU;

use super::types::{Bounds, Material};
use crate::{
    collision::queries::{self, SegmentHit},
    error::{PhysicsError, PhysicsResult},
    utils::{
        allocator::{BodyId, ShapeId},
        math,
    },
};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// User-defined tag selecting which collision handler a pair uses.
pub type CollisionType = u32;

/// Group value meaning "no group".
pub const NO_GROUP: u32 = 0;

/// Layer mask that collides with everything.
pub const ALL_LAYERS: u32 = u32::MAX;

/// Collision filtering tags shared by shapes and spatial queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Shapes sharing a nonzero group never collide.
    pub group: u32,
    /// Shapes collide only when their layer masks intersect.
    pub layers: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: NO_GROUP,
            layers: ALL_LAYERS,
        }
    }
}

impl CollisionFilter {
    pub fn new(group: u32, layers: u32) -> Self {
        Self { group, layers }
    }

    /// True when the two filters reject each other.
    pub fn rejects(&self, other: &CollisionFilter) -> bool {
        (self.group != NO_GROUP && self.group == other.group) || (self.layers & other.layers) == 0
    }
}

/// Shape kinds in narrow-phase dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Circle,
    Segment,
    Polygon,
}

/// Outward face normal and its distance from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonAxis {
    pub normal: Vec2,
    pub offset: f32,
}

/// Convex polygon with clockwise winding and precomputed face axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexPolygon {
    verts: Vec<Vec2>,
    axes: Vec<PolygonAxis>,
}

impl ConvexPolygon {
    /// Validates `verts` (convex, clockwise, no repeated points) and shifts them by `offset`.
    pub fn new(verts: &[Vec2], offset: Vec2) -> PhysicsResult<Self> {
        Self::validate(verts)?;
        let verts: Vec<Vec2> = verts.iter().map(|v| *v + offset).collect();
        let axes = Self::compute_axes(&verts);
        Ok(Self { verts, axes })
    }

    /// Axis-aligned rectangle centered on the origin.
    pub fn rectangle(width: f32, height: f32) -> PhysicsResult<Self> {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(
            &[
                Vec2::new(-hw, -hh),
                Vec2::new(-hw, hh),
                Vec2::new(hw, hh),
                Vec2::new(hw, -hh),
            ],
            Vec2::ZERO,
        )
    }

    pub fn verts(&self) -> &[Vec2] {
        &self.verts
    }

    pub fn axes(&self) -> &[PolygonAxis] {
        &self.axes
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Smallest signed distance of any vertex from the plane `n·x = d`.
    pub fn value_on_axis(&self, n: Vec2, d: f32) -> f32 {
        self.verts
            .iter()
            .map(|v| n.dot(*v))
            .fold(f32::INFINITY, f32::min)
            - d
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.axes.iter().all(|axis| axis.normal.dot(p) - axis.offset <= 0.0)
    }

    /// Containment test that ignores faces pointing away from `n`.
    pub fn contains_point_partial(&self, p: Vec2, n: Vec2) -> bool {
        self.axes
            .iter()
            .filter(|axis| axis.normal.dot(n) >= 0.0)
            .all(|axis| axis.normal.dot(p) - axis.offset <= 0.0)
    }

    fn validate(verts: &[Vec2]) -> PhysicsResult<()> {
        if verts.len() < 3 {
            return Err(PhysicsError::invalid_polygon(format!(
                "needs at least 3 vertices, got {}",
                verts.len()
            )));
        }
        let count = verts.len();
        for i in 0..count {
            let a = verts[i];
            let b = verts[(i + 1) % count];
            let c = verts[(i + 2) % count];
            if !a.is_finite() {
                return Err(PhysicsError::invalid_polygon(format!(
                    "vertex {i} is not finite"
                )));
            }
            if a == b {
                return Err(PhysicsError::invalid_polygon(format!(
                    "vertices {i} and {} coincide",
                    (i + 1) % count
                )));
            }
            if math::cross(b - a, c - b) > 0.0 {
                return Err(PhysicsError::invalid_polygon(format!(
                    "concave or counter-clockwise at vertex {}",
                    (i + 1) % count
                )));
            }
        }

        // Every turn is clockwise, so a star shape only shows up as extra windings.
        let turning: f32 = (0..count)
            .map(|i| {
                let e1 = verts[(i + 1) % count] - verts[i];
                let e2 = verts[(i + 2) % count] - verts[(i + 1) % count];
                math::cross(e1, e2).atan2(e1.dot(e2))
            })
            .sum();
        if (turning + TAU).abs() > 1e-3 {
            return Err(PhysicsError::invalid_polygon(format!(
                "vertices wind {:.2} times around the centroid",
                -turning / TAU
            )));
        }
        Ok(())
    }

    fn compute_axes(verts: &[Vec2]) -> Vec<PolygonAxis> {
        (0..verts.len())
            .map(|i| {
                let a = verts[i];
                let b = verts[(i + 1) % verts.len()];
                let normal = (b - a).normalize_or_zero().perp();
                PolygonAxis {
                    normal,
                    offset: normal.dot(a),
                }
            })
            .collect()
    }

    /// Writes this polygon transformed by `(position, rotation)` into `out`, reusing its storage.
    fn transform_into(&self, position: Vec2, rotation: Vec2, out: &mut ConvexPolygon) {
        out.verts.clear();
        out.verts
            .extend(self.verts.iter().map(|v| position + v.rotate(rotation)));
        out.axes.clear();
        out.axes.extend(self.axes.iter().map(|axis| {
            let normal = axis.normal.rotate(rotation);
            PolygonAxis {
                normal,
                offset: position.dot(normal) + axis.offset,
            }
        }));
    }
}

/// Enumeration of supported collider geometries, in body space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Circle { center: Vec2, radius: f32 },
    Segment { a: Vec2, b: Vec2, radius: f32 },
    Polygon(ConvexPolygon),
}

impl ColliderShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ColliderShape::Circle { .. } => ShapeKind::Circle,
            ColliderShape::Segment { .. } => ShapeKind::Segment,
            ColliderShape::Polygon(_) => ShapeKind::Polygon,
        }
    }
}

/// World-space copy of a shape's geometry, refreshed whenever its body moves.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldGeometry {
    Circle {
        center: Vec2,
        radius: f32,
    },
    Segment {
        a: Vec2,
        b: Vec2,
        normal: Vec2,
        radius: f32,
    },
    Polygon(ConvexPolygon),
}

/// Collider component attached to a rigid body.
#[derive(Debug, Clone)]
pub struct Collider {
    pub id: ShapeId,
    pub body: BodyId,
    pub material: Material,
    pub filter: CollisionFilter,
    pub collision_type: CollisionType,
    /// Sensors report collisions to handlers but never push bodies apart.
    pub sensor: bool,
    pub user_data: u64,
    shape: ColliderShape,
    world: WorldGeometry,
    bounds: Bounds,
    pub(crate) hash_id: u64,
    pub(crate) is_static: bool,
}

impl Collider {
    pub fn builder() -> ColliderBuilder {
        ColliderBuilder::new()
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn world_geometry(&self) -> &WorldGeometry {
        &self.world
    }

    /// World-space bounding box as of the last cache refresh.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Per-space identity used to build contact hashes.
    pub fn hash_id(&self) -> u64 {
        self.hash_id
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Recomputes world geometry and bounds for a body at `position` with rotation vector `rotation`.
    pub fn cache_bounds(&mut self, position: Vec2, rotation: Vec2) -> Bounds {
        self.bounds = match (&self.shape, &mut self.world) {
            (ColliderShape::Circle { center, radius }, world) => {
                let center = position + center.rotate(rotation);
                *world = WorldGeometry::Circle {
                    center,
                    radius: *radius,
                };
                Bounds::for_circle(center, *radius)
            }
            (ColliderShape::Segment { a, b, radius }, world) => {
                let ta = position + a.rotate(rotation);
                let tb = position + b.rotate(rotation);
                let normal = (*b - *a).normalize_or_zero().perp().rotate(rotation);
                *world = WorldGeometry::Segment {
                    a: ta,
                    b: tb,
                    normal,
                    radius: *radius,
                };
                Bounds::new(
                    ta.x.min(tb.x) - radius,
                    ta.y.min(tb.y) - radius,
                    ta.x.max(tb.x) + radius,
                    ta.y.max(tb.y) + radius,
                )
            }
            (ColliderShape::Polygon(local), WorldGeometry::Polygon(world)) => {
                local.transform_into(position, rotation, world);
                Bounds::from_points(world.verts())
            }
            (ColliderShape::Polygon(local), world) => {
                let mut transformed = local.clone();
                local.transform_into(position, rotation, &mut transformed);
                let bounds = Bounds::from_points(transformed.verts());
                *world = WorldGeometry::Polygon(transformed);
                bounds
            }
        };
        self.bounds
    }

    /// True when world point `p` lies inside the shape.
    pub fn point_query(&self, p: Vec2) -> bool {
        match &self.world {
            WorldGeometry::Circle { center, radius } => {
                center.distance_squared(p) < radius * radius
            }
            WorldGeometry::Segment { a, b, radius, .. } => {
                let closest = math::closest_point_on_segment(p, *a, *b);
                closest.distance_squared(p) < radius * radius
            }
            WorldGeometry::Polygon(poly) => {
                self.bounds.contains_point(p) && poly.contains_point(p)
            }
        }
    }

    /// First intersection of the segment `start`-`end` with the shape, if any.
    pub fn segment_query(&self, start: Vec2, end: Vec2) -> Option<SegmentHit> {
        let hit = match &self.world {
            WorldGeometry::Circle { center, radius } => {
                queries::circle_segment_query(*center, *radius, start, end)
            }
            WorldGeometry::Segment {
                a,
                b,
                normal,
                radius,
            } => queries::segment_segment_query(*a, *b, *normal, *radius, start, end),
            WorldGeometry::Polygon(poly) => queries::polygon_segment_query(poly, start, end),
        };
        hit.map(|(t, normal)| SegmentHit {
            shape: self.id,
            t,
            normal,
        })
    }
}

enum ShapeSpec {
    Circle { radius: f32 },
    Segment { a: Vec2, b: Vec2, radius: f32 },
    Polygon { verts: Vec<Vec2> },
    Box { width: f32, height: f32 },
}

pub struct ColliderBuilder {
    spec: ShapeSpec,
    offset: Vec2,
    material: Material,
    filter: CollisionFilter,
    collision_type: CollisionType,
    sensor: bool,
    user_data: u64,
}

impl Default for ColliderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColliderBuilder {
    pub fn new() -> Self {
        Self {
            spec: ShapeSpec::Circle { radius: 1.0 },
            offset: Vec2::ZERO,
            material: Material::default(),
            filter: CollisionFilter::default(),
            collision_type: 0,
            sensor: false,
            user_data: 0,
        }
    }

    pub fn circle(mut self, radius: f32) -> Self {
        self.spec = ShapeSpec::Circle { radius };
        self
    }

    pub fn segment(mut self, a: Vec2, b: Vec2, radius: f32) -> Self {
        self.spec = ShapeSpec::Segment { a, b, radius };
        self
    }

    /// Convex polygon given in clockwise order.
    pub fn polygon(mut self, verts: &[Vec2]) -> Self {
        self.spec = ShapeSpec::Polygon {
            verts: verts.to_vec(),
        };
        self
    }

    pub fn box_shape(mut self, width: f32, height: f32) -> Self {
        self.spec = ShapeSpec::Box { width, height };
        self
    }

    /// Body-space offset applied to the circle center, segment endpoints or polygon vertices.
    pub fn offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn elasticity(mut self, elasticity: f32) -> Self {
        self.material.elasticity = elasticity;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn surface_velocity(mut self, velocity: Vec2) -> Self {
        self.material.surface_velocity = velocity;
        self
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn filter(mut self, group: u32, layers: u32) -> Self {
        self.filter = CollisionFilter { group, layers };
        self
    }

    pub fn collision_type(mut self, collision_type: CollisionType) -> Self {
        self.collision_type = collision_type;
        self
    }

    pub fn user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    /// Validates the geometry and attaches the collider to `body`.
    pub fn build(self, body: BodyId) -> PhysicsResult<Collider> {
        let offset = self.offset;
        let shape = match self.spec {
            ShapeSpec::Circle { radius } => {
                check_radius(radius)?;
                ColliderShape::Circle {
                    center: offset,
                    radius,
                }
            }
            ShapeSpec::Segment { a, b, radius } => {
                check_radius(radius)?;
                if a == b || !a.is_finite() || !b.is_finite() {
                    return Err(PhysicsError::invalid_shape(
                        "segment endpoints must be finite and distinct",
                    ));
                }
                ColliderShape::Segment {
                    a: a + offset,
                    b: b + offset,
                    radius,
                }
            }
            ShapeSpec::Polygon { verts } => {
                ColliderShape::Polygon(ConvexPolygon::new(&verts, offset)?)
            }
            ShapeSpec::Box { width, height } => {
                if !(width > 0.0 && height > 0.0) {
                    return Err(PhysicsError::invalid_shape(format!(
                        "box extents must be positive, got {width}x{height}"
                    )));
                }
                let hw = width * 0.5;
                let hh = height * 0.5;
                ColliderShape::Polygon(ConvexPolygon::new(
                    &[
                        Vec2::new(-hw, -hh),
                        Vec2::new(-hw, hh),
                        Vec2::new(hw, hh),
                        Vec2::new(hw, -hh),
                    ],
                    offset,
                )?)
            }
        };

        let world = match &shape {
            ColliderShape::Circle { center, radius } => WorldGeometry::Circle {
                center: *center,
                radius: *radius,
            },
            ColliderShape::Segment { a, b, radius } => WorldGeometry::Segment {
                a: *a,
                b: *b,
                normal: (*b - *a).normalize_or_zero().perp(),
                radius: *radius,
            },
            ColliderShape::Polygon(poly) => WorldGeometry::Polygon(poly.clone()),
        };

        let mut collider = Collider {
            id: ShapeId::default(),
            body,
            material: self.material,
            filter: self.filter,
            collision_type: self.collision_type,
            sensor: self.sensor,
            user_data: self.user_data,
            shape,
            world,
            bounds: Bounds::default(),
            hash_id: 0,
            is_static: false,
        };
        collider.cache_bounds(Vec2::ZERO, Vec2::X);
        Ok(collider)
    }
}

fn check_radius(radius: f32) -> PhysicsResult<()> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::invalid_shape(format!(
            "radius must be finite and non-negative, got {radius}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
        ]
    }

    #[test]
    fn counter_clockwise_polygon_is_rejected() {
        let mut verts = square();
        verts.reverse();
        let err = ConvexPolygon::new(&verts, Vec2::ZERO).expect_err("wrong winding");
        assert!(matches!(err, PhysicsError::InvalidPolygon { .. }));
    }

    #[test]
    fn concave_polygon_is_rejected() {
        let verts = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
        ];
        assert!(ConvexPolygon::new(&verts, Vec2::ZERO).is_err());
        assert!(ConvexPolygon::new(&verts[..2], Vec2::ZERO).is_err());
    }

    #[test]
    fn star_polygon_is_rejected() {
        // Every turn is clockwise but the outline circles the centre twice.
        let star: Vec<Vec2> = (0..5)
            .map(|i| Vec2::from_angle(std::f32::consts::FRAC_PI_2 - i as f32 * 0.8 * std::f32::consts::PI))
            .collect();
        let err = ConvexPolygon::new(&star, Vec2::ZERO).expect_err("pentagram");
        assert!(matches!(err, PhysicsError::InvalidPolygon { .. }));

        let pentagon: Vec<Vec2> = (0..5)
            .map(|i| Vec2::from_angle(std::f32::consts::FRAC_PI_2 - i as f32 * 0.4 * std::f32::consts::PI))
            .collect();
        assert!(ConvexPolygon::new(&pentagon, Vec2::ZERO).is_ok());
    }

    #[test]
    fn axes_point_outward() {
        let poly = ConvexPolygon::new(&square(), Vec2::ZERO).expect("valid square");
        assert_eq!(poly.axes()[0].normal, Vec2::new(-1.0, 0.0));
        assert_eq!(poly.axes()[0].offset, 1.0);
        assert!(poly.contains_point(Vec2::new(0.5, 0.5)));
        assert!(!poly.contains_point(Vec2::new(1.5, 0.5)));
        assert_eq!(poly.value_on_axis(Vec2::X, 2.0), -3.0);
    }

    #[test]
    fn cached_bounds_follow_body_transform() {
        let mut collider = Collider::builder()
            .box_shape(2.0, 4.0)
            .build(BodyId::default())
            .expect("valid box");
        let rotation = Vec2::from_angle(std::f32::consts::FRAC_PI_2);
        let bb = collider.cache_bounds(Vec2::new(10.0, 0.0), rotation);

        assert!((bb.l - 8.0).abs() < 1e-5);
        assert!((bb.r - 12.0).abs() < 1e-5);
        assert!((bb.b + 1.0).abs() < 1e-5);
        assert!((bb.t - 1.0).abs() < 1e-5);
        assert!(collider.point_query(Vec2::new(11.5, 0.5)));
        assert!(!collider.point_query(Vec2::new(10.0, 1.5)));
    }

    #[test]
    fn segment_bounds_include_radius() {
        let mut collider = Collider::builder()
            .segment(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), 0.5)
            .build(BodyId::default())
            .expect("valid segment");
        let bb = collider.cache_bounds(Vec2::ZERO, Vec2::X);
        assert_eq!(bb, Bounds::new(-2.5, -0.5, 2.5, 0.5));
        assert!(collider.point_query(Vec2::new(2.3, 0.0)));
        assert!(!collider.point_query(Vec2::new(0.0, 0.6)));
    }

    #[test]
    fn filters_reject_shared_group_and_disjoint_layers() {
        let a = CollisionFilter::new(3, 0b01);
        assert!(a.rejects(&CollisionFilter::new(3, 0b01)));
        assert!(a.rejects(&CollisionFilter::new(0, 0b10)));
        assert!(!a.rejects(&CollisionFilter::new(0, 0b11)));
        assert!(!CollisionFilter::default().rejects(&CollisionFilter::default()));
    }
}
