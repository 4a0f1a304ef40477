//! Additional math helpers layered on top of `glam`.

use glam::Vec2;

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Inverse of `Vec2::rotate` for a unit rotation vector.
#[inline]
pub fn unrotate(v: Vec2, rot: Vec2) -> Vec2 {
    Vec2::new(v.x * rot.x + v.y * rot.y, v.y * rot.x - v.x * rot.y)
}

/// Scales `v` down so its length does not exceed `len`. Infinite limits pass through.
#[inline]
pub fn clamp_length(v: Vec2, len: f32) -> Vec2 {
    if len.is_infinite() {
        v
    } else {
        v.clamp_length_max(len)
    }
}

/// Clamps `v` to `[min, max]` without panicking on an inverted range (the upper bound wins).
#[inline]
pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Projects `v` onto `onto`. Zero `onto` yields zero.
#[inline]
pub fn project(v: Vec2, onto: Vec2) -> Vec2 {
    let denom = onto.length_squared();
    if denom == 0.0 {
        Vec2::ZERO
    } else {
        onto * (v.dot(onto) / denom)
    }
}

/// Reciprocal of an inverse mass. Zero or non-finite input yields zero, meaning "immovable".
#[inline]
pub fn recip_or_zero(value: f32) -> f32 {
    if value > 0.0 && value.is_finite() {
        value.recip()
    } else {
        0.0
    }
}

/// Closest point to `p` on the segment `a`-`b`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let delta = a - b;
    let len_sq = delta.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    let t = (delta.dot(p - b) / len_sq).clamp(0.0, 1.0);
    b + delta * t
}
