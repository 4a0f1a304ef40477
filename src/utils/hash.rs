//! Integer hashing helpers shared by the spatial hash and contact identities.

/// Bucket counts the spatial hash may use. Each is roughly double the last.
const PRIMES: [usize; 29] = [
    5, 13, 23, 47, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319,
    201326611, 402653189, 805306457, 1610612741,
];

const PAIR_MULTIPLIER: u64 = 3_344_921_057;

/// Smallest tabulated prime that is `>= target`. Saturates at the largest entry.
pub fn next_prime(target: usize) -> usize {
    PRIMES
        .iter()
        .copied()
        .find(|&prime| prime >= target)
        .unwrap_or(PRIMES[PRIMES.len() - 1])
}

/// Identity of a geometric feature (vertex, face, endpoint) on a shape.
///
/// Not symmetric: vertex 5 of shape 0 and vertex 0 of shape 5 get different
/// identities.
#[inline]
pub fn feature_hash(shape: u64, feature: usize) -> u64 {
    shape.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (feature as u64 + 1).wrapping_mul(PAIR_MULTIPLIER)
}

/// Maps an integer grid cell onto one of `cells` buckets.
#[inline]
pub fn hash_cell(x: i32, y: i32, cells: usize) -> usize {
    let hx = (x as i64 as u64).wrapping_mul(1_640_531_513);
    let hy = (y as i64 as u64).wrapping_mul(2_654_435_789);
    ((hx ^ hy) % cells as u64) as usize
}
