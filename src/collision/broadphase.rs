use std::collections::HashMap;

use glam::Vec2;

use crate::{
    config::POOL_BATCH_SIZE,
    core::{collider::Collider, types::Bounds},
    error::{PhysicsError, PhysicsResult},
    utils::{
        allocator::{Arena, ShapeId},
        hash::{hash_cell, next_prime},
    },
};

/// Pooled per-shape record. Bins hold a reference each, the membership set holds one more.
#[derive(Debug, Clone, Copy, Default)]
struct Handle {
    shape: Option<ShapeId>,
    retain: u32,
    stamp: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    handle: u32,
    next: Option<u32>,
}

/// Spatial hash over shape bounding boxes.
///
/// Each shape is binned into every grid cell its bounds overlap. Cells map onto a
/// prime-sized bucket table, so distant cells may share a bucket; queries stamp
/// handles to report each shape at most once. Handles and bins are recycled
/// through free lists and iterated in slot order, which keeps pair order stable
/// from run to run.
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    table: Vec<Option<u32>>,
    bins: Vec<Bin>,
    free_bin: Option<u32>,
    handles: Vec<Handle>,
    free_handles: Vec<u32>,
    handle_set: HashMap<ShapeId, u32>,
    stamp: u64,
}

impl SpatialHash {
    pub fn new(cell_size: f32, cells: usize) -> Self {
        let mut hash = Self {
            cell_size: 1.0,
            inv_cell_size: 1.0,
            table: Vec::new(),
            bins: Vec::new(),
            free_bin: None,
            handles: Vec::new(),
            free_handles: Vec::new(),
            handle_set: HashMap::new(),
            stamp: 1,
        };
        hash.set_dimensions(cell_size, cells);
        hash
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of buckets in the table (always one of the tabulated primes).
    pub fn cell_count(&self) -> usize {
        self.table.len()
    }

    pub fn len(&self) -> usize {
        self.handle_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle_set.is_empty()
    }

    pub fn contains(&self, shape: ShapeId) -> bool {
        self.handle_set.contains_key(&shape)
    }

    /// Handles currently allocated, live or pooled.
    pub fn pooled_handles(&self) -> usize {
        self.handles.len()
    }

    /// Adds `shape` and bins it by `bounds`.
    pub fn insert(&mut self, shape: ShapeId, bounds: Bounds) -> PhysicsResult<()> {
        if self.handle_set.contains_key(&shape) {
            return Err(PhysicsError::DuplicateShape(shape));
        }
        let handle = self.alloc_handle(shape);
        self.handle_set.insert(shape, handle);
        self.hash_handle(handle, bounds);
        Ok(())
    }

    /// Removes `shape`. Bins still pointing at it are dropped lazily by later queries.
    pub fn remove(&mut self, shape: ShapeId) -> bool {
        match self.handle_set.remove(&shape) {
            Some(handle) => {
                self.handles[handle as usize].shape = None;
                self.release_handle(handle);
                true
            }
            None => false,
        }
    }

    /// Re-bins a single shape under new bounds without touching the others.
    pub fn rehash_object(&mut self, shape: ShapeId, bounds: Bounds) -> bool {
        match self.handle_set.get(&shape).copied() {
            Some(handle) => {
                self.hash_handle(handle, bounds);
                true
            }
            None => false,
        }
    }

    /// Rebuilds the table from the current bounds of every member shape.
    pub fn rehash(&mut self, shapes: &Arena<Collider>) {
        self.grow_if_crowded();
        self.clear_table();

        for index in 0..self.handles.len() {
            let Some(bounds) = self.live_bounds(index, shapes) else {
                continue;
            };
            self.hash_handle(index as u32, bounds);
        }
    }

    /// Rebuilds the table and reports every pair of shapes that share a cell.
    ///
    /// Each unordered pair is reported once, as `(current, earlier)` in slot order.
    /// The pairs are candidates only; their bounds may still be disjoint.
    pub fn rehash_query(&mut self, shapes: &Arena<Collider>, mut f: impl FnMut(ShapeId, ShapeId)) {
        self.grow_if_crowded();
        self.clear_table();

        for index in 0..self.handles.len() {
            let Some(bounds) = self.live_bounds(index, shapes) else {
                continue;
            };
            let Some(shape) = self.handles[index].shape else {
                continue;
            };

            self.stamp += 1;
            self.handles[index].stamp = self.stamp;

            let (l, b, r, t) = self.cell_range(bounds);
            for x in l..=r {
                for y in b..=t {
                    let cell = hash_cell(x, y, self.table.len());
                    self.query_cell(cell, |other| f(shape, other));

                    let bin = self.alloc_bin(index as u32);
                    self.bins[bin as usize].next = self.table[cell];
                    self.table[cell] = Some(bin);
                    self.handles[index].retain += 1;
                }
            }
        }
    }

    /// Calls `f` for every shape binned in a cell overlapping `bounds`.
    pub fn query(&mut self, bounds: Bounds, mut f: impl FnMut(ShapeId)) {
        self.stamp += 1;
        let (l, b, r, t) = self.cell_range(bounds);
        for x in l..=r {
            for y in b..=t {
                let cell = hash_cell(x, y, self.table.len());
                self.query_cell(cell, &mut f);
            }
        }
    }

    /// Calls `f` for every shape binned in the cell holding `point`.
    pub fn query_point(&mut self, point: Vec2, f: impl FnMut(ShapeId)) {
        self.stamp += 1;
        let p = point * self.inv_cell_size;
        let cell = hash_cell(p.x.floor() as i32, p.y.floor() as i32, self.table.len());
        self.query_cell(cell, f);
    }

    /// Walks the cells crossed by `a`-`b` in order.
    ///
    /// `f` returns the fraction along the segment at which the shape was hit (or
    /// `1.0` for a miss); the walk stops once it passes the nearest hit so far.
    pub fn query_segment(&mut self, a: Vec2, b: Vec2, mut f: impl FnMut(ShapeId) -> f32) {
        let a = a * self.inv_cell_size;
        let b = b * self.inv_cell_size;

        let mut cell_x = a.x.floor() as i32;
        let mut cell_y = a.y.floor() as i32;

        let (x_inc, temp_h) = if b.x > a.x {
            (1, (a.x + 1.0).floor() - a.x)
        } else {
            (-1, a.x - a.x.floor())
        };
        let (y_inc, temp_v) = if b.y > a.y {
            (1, (a.y + 1.0).floor() - a.y)
        } else {
            (-1, a.y - a.y.floor())
        };

        let dx = (b.x - a.x).abs();
        let dy = (b.y - a.y).abs();
        let dt_dx = if dx != 0.0 { dx.recip() } else { f32::INFINITY };
        let dt_dy = if dy != 0.0 { dy.recip() } else { f32::INFINITY };

        let mut next_h = if temp_h != 0.0 { temp_h * dt_dx } else { dt_dx };
        let mut next_v = if temp_v != 0.0 { temp_v * dt_dy } else { dt_dy };

        self.stamp += 1;
        let mut t = 0.0;
        let mut t_exit = 1.0f32;
        while t < t_exit {
            let cell = hash_cell(cell_x, cell_y, self.table.len());
            self.query_cell(cell, |shape| t_exit = t_exit.min(f(shape)));

            if next_v < next_h {
                cell_y += y_inc;
                t = next_v;
                next_v += dt_dy;
            } else {
                cell_x += x_inc;
                t = next_h;
                next_h += dt_dx;
            }
        }
    }

    /// Calls `f` once per member shape, in slot order.
    pub fn each(&self, mut f: impl FnMut(ShapeId)) {
        for handle in &self.handles {
            if let Some(shape) = handle.shape {
                f(shape);
            }
        }
    }

    /// Changes cell size and bucket count, then rebins every member shape.
    pub fn resize(&mut self, cell_size: f32, cells: usize, shapes: &Arena<Collider>) {
        self.clear_table();
        self.set_dimensions(cell_size, cells);
        self.rehash(shapes);
    }

    fn set_dimensions(&mut self, cell_size: f32, cells: usize) {
        self.cell_size = cell_size;
        self.inv_cell_size = cell_size.recip();
        self.table = vec![None; next_prime(cells)];
    }

    fn grow_if_crowded(&mut self) {
        if self.handle_set.len() > self.table.len() {
            let cells = next_prime((self.table.len() * 2).max(self.handle_set.len()));
            log::debug!(
                "spatial hash grew from {} to {} buckets for {} shapes",
                self.table.len(),
                cells,
                self.handle_set.len()
            );
            self.clear_table();
            self.table = vec![None; cells];
        }
    }

    fn live_bounds(&self, index: usize, shapes: &Arena<Collider>) -> Option<Bounds> {
        let shape = self.handles[index].shape?;
        match shapes.get(shape.0) {
            Some(collider) => Some(collider.bounds()),
            None => {
                log::warn!("spatial hash holds {:?} but the shape no longer exists", shape);
                None
            }
        }
    }

    fn cell_range(&self, bounds: Bounds) -> (i32, i32, i32, i32) {
        (
            (bounds.l * self.inv_cell_size).floor() as i32,
            (bounds.b * self.inv_cell_size).floor() as i32,
            (bounds.r * self.inv_cell_size).floor() as i32,
            (bounds.t * self.inv_cell_size).floor() as i32,
        )
    }

    fn hash_handle(&mut self, handle: u32, bounds: Bounds) {
        let (l, b, r, t) = self.cell_range(bounds);
        for x in l..=r {
            for y in b..=t {
                let cell = hash_cell(x, y, self.table.len());
                if self.cell_holds(cell, handle) {
                    continue;
                }
                let bin = self.alloc_bin(handle);
                self.bins[bin as usize].next = self.table[cell];
                self.table[cell] = Some(bin);
                self.handles[handle as usize].retain += 1;
            }
        }
    }

    fn cell_holds(&self, cell: usize, handle: u32) -> bool {
        let mut cursor = self.table[cell];
        while let Some(bin) = cursor {
            let entry = self.bins[bin as usize];
            if entry.handle == handle {
                return true;
            }
            cursor = entry.next;
        }
        false
    }

    /// Visits unstamped live handles in `cell`, unlinking bins whose shape was removed.
    fn query_cell(&mut self, cell: usize, mut f: impl FnMut(ShapeId)) {
        let mut prev: Option<u32> = None;
        let mut cursor = self.table[cell];

        while let Some(bin) = cursor {
            let Bin { handle, next } = self.bins[bin as usize];

            match self.handles[handle as usize].shape {
                None => {
                    match prev {
                        Some(p) => self.bins[p as usize].next = next,
                        None => self.table[cell] = next,
                    }
                    self.recycle_bin(bin);
                    self.release_handle(handle);
                }
                Some(shape) => {
                    let entry = &mut self.handles[handle as usize];
                    if entry.stamp != self.stamp {
                        entry.stamp = self.stamp;
                        f(shape);
                    }
                    prev = Some(bin);
                }
            }
            cursor = next;
        }
    }

    fn clear_table(&mut self) {
        for cell in 0..self.table.len() {
            let mut cursor = self.table[cell].take();
            while let Some(bin) = cursor {
                let Bin { handle, next } = self.bins[bin as usize];
                self.recycle_bin(bin);
                self.release_handle(handle);
                cursor = next;
            }
        }
    }

    fn alloc_handle(&mut self, shape: ShapeId) -> u32 {
        if self.free_handles.is_empty() {
            let start = self.handles.len();
            self.handles
                .resize(start + POOL_BATCH_SIZE, Handle::default());
            // Reversed so the lowest slot is handed out first.
            self.free_handles
                .extend((start..start + POOL_BATCH_SIZE).rev().map(|i| i as u32));
        }
        let index = self.free_handles.pop().unwrap_or_default();
        self.handles[index as usize] = Handle {
            shape: Some(shape),
            retain: 1,
            stamp: 0,
        };
        index
    }

    fn release_handle(&mut self, handle: u32) {
        let entry = &mut self.handles[handle as usize];
        entry.retain = entry.retain.saturating_sub(1);
        if entry.retain == 0 {
            *entry = Handle::default();
            self.free_handles.push(handle);
        }
    }

    fn alloc_bin(&mut self, handle: u32) -> u32 {
        let bin = match self.free_bin {
            Some(bin) => bin,
            None => {
                let start = self.bins.len() as u32;
                let end = start + POOL_BATCH_SIZE as u32;
                self.bins.extend((start..end).map(|i| Bin {
                    handle: 0,
                    next: (i + 1 < end).then_some(i + 1),
                }));
                start
            }
        };
        self.free_bin = self.bins[bin as usize].next;
        self.bins[bin as usize] = Bin { handle, next: None };
        bin
    }

    fn recycle_bin(&mut self, bin: u32) {
        self.bins[bin as usize] = Bin {
            handle: 0,
            next: self.free_bin,
        };
        self.free_bin = Some(bin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::BodyId;
    use std::collections::BTreeSet;

    fn add_box(shapes: &mut Arena<Collider>, center: Vec2, half: f32) -> ShapeId {
        let mut collider = Collider::builder()
            .box_shape(half * 2.0, half * 2.0)
            .build(BodyId::default())
            .expect("valid box");
        collider.cache_bounds(center, Vec2::X);
        let id = ShapeId(shapes.insert(collider));
        if let Some(c) = shapes.get_mut(id.0) {
            c.id = id;
        }
        id
    }

    fn scattered(shapes: &mut Arena<Collider>, count: usize) -> Vec<ShapeId> {
        let mut seed = 12345u32;
        let mut next = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 8) as f32 / (1 << 24) as f32
        };
        (0..count)
            .map(|_| {
                let center = Vec2::new(next() * 200.0 - 100.0, next() * 200.0 - 100.0);
                add_box(shapes, center, 1.0 + next() * 8.0)
            })
            .collect()
    }

    fn sorted(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut shapes = Arena::new();
        let id = add_box(&mut shapes, Vec2::ZERO, 1.0);
        let mut hash = SpatialHash::new(10.0, 100);
        let bounds = shapes.get(id.0).expect("shape").bounds();

        hash.insert(id, bounds).expect("first insert");
        let err = hash.insert(id, bounds).expect_err("second insert");
        assert!(matches!(err, PhysicsError::DuplicateShape(dup) if dup == id));
        assert_eq!(hash.len(), 1);
    }

    #[test]
    fn rehash_query_reports_every_overlapping_pair_once() {
        let mut shapes = Arena::new();
        let ids = scattered(&mut shapes, 120);
        let mut hash = SpatialHash::new(7.0, 97);
        for id in &ids {
            hash.insert(*id, shapes.get(id.0).expect("shape").bounds())
                .expect("insert");
        }

        let mut reported = Vec::new();
        hash.rehash_query(&shapes, |a, b| reported.push(sorted(a, b)));

        let unique: BTreeSet<_> = reported.iter().copied().collect();
        assert_eq!(unique.len(), reported.len(), "a pair was reported twice");

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let ba = shapes.get(a.0).expect("shape").bounds();
                let bb = shapes.get(b.0).expect("shape").bounds();
                if ba.intersects(&bb) {
                    assert!(
                        unique.contains(&sorted(*a, *b)),
                        "overlapping pair {:?} {:?} was missed",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn removed_shapes_vanish_from_queries() {
        let mut shapes = Arena::new();
        let a = add_box(&mut shapes, Vec2::ZERO, 2.0);
        let b = add_box(&mut shapes, Vec2::new(1.0, 0.0), 2.0);
        let mut hash = SpatialHash::new(5.0, 13);
        hash.insert(a, shapes.get(a.0).expect("shape").bounds()).expect("insert");
        hash.insert(b, shapes.get(b.0).expect("shape").bounds()).expect("insert");

        assert!(hash.remove(a));
        assert!(!hash.remove(a));

        let mut found = Vec::new();
        hash.query(Bounds::new(-3.0, -3.0, 3.0, 3.0), |id| found.push(id));
        assert_eq!(found, vec![b]);
    }

    #[test]
    fn handles_are_recycled_through_the_pool() {
        let mut shapes = Arena::new();
        let ids = scattered(&mut shapes, 64);
        let mut hash = SpatialHash::new(10.0, 1000);

        for _ in 0..5 {
            for id in &ids {
                hash.insert(*id, shapes.get(id.0).expect("shape").bounds())
                    .expect("insert");
            }
            hash.rehash(&shapes);
            for id in &ids {
                assert!(hash.remove(*id));
            }
            hash.query(Bounds::new(-200.0, -200.0, 200.0, 200.0), |_| {});
        }
        assert_eq!(hash.pooled_handles(), POOL_BATCH_SIZE);
        assert!(hash.is_empty());
    }

    #[test]
    fn segment_walk_finds_shapes_along_the_line() {
        let mut shapes = Arena::new();
        let near = add_box(&mut shapes, Vec2::new(20.0, 0.0), 1.0);
        let far = add_box(&mut shapes, Vec2::new(80.0, 0.0), 1.0);
        let off = add_box(&mut shapes, Vec2::new(50.0, 40.0), 1.0);
        let mut hash = SpatialHash::new(5.0, 997);
        for id in [near, far, off] {
            hash.insert(id, shapes.get(id.0).expect("shape").bounds()).expect("insert");
        }

        let mut visited = Vec::new();
        hash.query_segment(Vec2::new(0.0, 0.5), Vec2::new(100.0, 0.5), |id| {
            visited.push(id);
            1.0
        });
        assert!(visited.contains(&near));
        assert!(visited.contains(&far));
        assert!(!visited.contains(&off));

        // Stopping at the first hit keeps the walk from reaching the far box.
        let mut visited = Vec::new();
        hash.query_segment(Vec2::new(0.0, 0.5), Vec2::new(100.0, 0.5), |id| {
            visited.push(id);
            if id == near {
                0.19
            } else {
                1.0
            }
        });
        assert!(visited.contains(&near));
        assert!(!visited.contains(&far));
    }

    #[test]
    fn crowded_table_grows_on_rehash() {
        let mut shapes = Arena::new();
        let ids = scattered(&mut shapes, 40);
        let mut hash = SpatialHash::new(10.0, 5);
        for id in &ids {
            hash.insert(*id, shapes.get(id.0).expect("shape").bounds())
                .expect("insert");
        }
        hash.rehash(&shapes);
        assert!(hash.cell_count() >= ids.len());

        let mut found = 0;
        hash.query(Bounds::new(-200.0, -200.0, 200.0, 200.0), |_| found += 1);
        assert_eq!(found, ids.len());
    }
}
