use std::{collections::HashMap, ops::Range};

use pathfinder_geometry::vector::Vector2F;

/// Half side of the square an icon needs free before it is drawn.
const ICON_HALF_SIZE: i32 = 8;
/// Approximate advance of one label character.
pub const LABEL_CHARACTER_WIDTH: i32 = 6;

/// Side of one lazily allocated block of cells.
const CHUNK_SIZE: i32 = 64;

fn around(center: i32, half: i32) -> Range<i32> {
    center.saturating_sub(half)..center.saturating_add(half)
}

/// Pixel grid of claimed canvas regions. Anything outside the canvas counts as
/// claimed. With an overlap of 0 nothing is tracked and every claim succeeds.
/// Cells live in square chunks created on first claim, so memory follows the
/// claimed area rather than the canvas size.
#[derive(Debug, Clone)]
pub struct OccupancyTracker {
    width: i32,
    height: i32,
    overlap: i32,
    chunks: HashMap<(i32, i32), Vec<bool>>,
}

impl OccupancyTracker {
    pub fn new(size: Vector2F, overlap: u32) -> Self {
        let overlap = i32::try_from(overlap).unwrap_or(i32::MAX);
        let (width, height) = if overlap == 0 {
            (0, 0)
        } else {
            (size.x().max(0.0) as i32, size.y().max(0.0) as i32)
        };
        OccupancyTracker { width, height, overlap, chunks: HashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.overlap > 0
    }

    /// Chunk and cell offset of an on-canvas pixel.
    fn locate(&self, x: i32, y: i32) -> Option<((i32, i32), usize)> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let chunk = (x / CHUNK_SIZE, y / CHUNK_SIZE);
        let offset = (y % CHUNK_SIZE) as usize * CHUNK_SIZE as usize + (x % CHUNK_SIZE) as usize;
        Some((chunk, offset))
    }

    pub fn check(&self, x: i32, y: i32) -> bool {
        match self.locate(x, y) {
            Some((chunk, offset)) => self.chunks.get(&chunk).is_some_and(|cells| cells[offset]),
            None => true,
        }
    }

    pub fn register(&mut self, x: i32, y: i32) {
        if let Some((chunk, offset)) = self.locate(x, y) {
            let cells = self.chunks
                .entry(chunk)
                .or_insert_with(|| vec![false; (CHUNK_SIZE * CHUNK_SIZE) as usize]);
            cells[offset] = true;
        }
    }

    fn is_free(&self, x_range: Range<i32>, y_range: Range<i32>) -> bool {
        y_range
            .flat_map(|y| x_range.clone().map(move |x| (x, y)))
            .all(|(x, y)| !self.check(x, y))
    }

    fn register_area(&mut self, x_range: Range<i32>, y_range: Range<i32>) {
        let x_range = x_range.start.max(0)..x_range.end.min(self.width);
        for y in y_range.start.max(0)..y_range.end.min(self.height) {
            for x in x_range.clone() {
                self.register(x, y);
            }
        }
    }

    /// Claims the icon cell centered at `point`. Returns false, claiming nothing,
    /// when part of it is taken.
    pub fn claim_icon(&mut self, point: Vector2F) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let (x, y) = (point.x() as i32, point.y() as i32);
        if !self.is_free(around(x, ICON_HALF_SIZE), around(y, ICON_HALF_SIZE)) {
            return false;
        }
        let overlap = self.overlap;
        self.register_area(around(x, overlap), around(y, overlap));
        true
    }

    /// Claims the box of a label of `characters` characters with its baseline at
    /// `point`, centered horizontally.
    pub fn claim_label(&mut self, point: Vector2F, characters: usize) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let half_length = i32::try_from(characters)
            .unwrap_or(i32::MAX)
            .saturating_mul(LABEL_CHARACTER_WIDTH) / 2;
        let (x, y) = (point.x() as i32, point.y() as i32);
        if !self.is_free(around(x, half_length), y.saturating_sub(4)..y.saturating_sub(3)) {
            return false;
        }
        self.register_area(around(x, half_length), y.saturating_sub(12)..y.saturating_add(5));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathfinder_geometry::vector::vec2f;

    #[test]
    fn test_claim_blocks_neighbour() {
        let mut tracker = OccupancyTracker::new(vec2f(100.0, 100.0), 12);
        assert!(tracker.claim_icon(vec2f(50.0, 50.0)));
        assert!(!tracker.claim_icon(vec2f(55.0, 50.0)));
        assert!(tracker.claim_icon(vec2f(50.0, 80.0)));
    }

    #[test]
    fn test_failed_claim_registers_nothing() {
        let mut tracker = OccupancyTracker::new(vec2f(100.0, 100.0), 12);
        assert!(tracker.claim_icon(vec2f(20.0, 20.0)));
        assert!(!tracker.claim_icon(vec2f(30.0, 20.0)));
        assert!(!tracker.check(40, 20));
    }

    #[test]
    fn test_outside_canvas_is_occupied() {
        let mut tracker = OccupancyTracker::new(vec2f(100.0, 100.0), 12);
        assert!(tracker.check(-1, 5));
        assert!(tracker.check(100, 5));
        assert!(!tracker.claim_icon(vec2f(2.0, 50.0)));
    }

    #[test]
    fn test_zero_overlap_disables_tracking() {
        let mut tracker = OccupancyTracker::new(vec2f(100.0, 100.0), 0);
        assert!(!tracker.is_enabled());
        assert!(tracker.claim_icon(vec2f(50.0, 50.0)));
        assert!(tracker.claim_icon(vec2f(50.0, 50.0)));
        assert!(tracker.claim_label(vec2f(-10.0, 50.0), 20));
    }

    #[test]
    fn test_large_canvas() {
        let mut tracker = OccupancyTracker::new(vec2f(50000.0, 43000.0), 12);
        assert!(tracker.claim_icon(vec2f(25000.0, 42980.0)));
        assert!(!tracker.claim_icon(vec2f(25004.0, 42980.0)));
        assert!(tracker.check(25000, 43000));
        assert!(tracker.claim_icon(vec2f(49980.0, 20.0)));
        assert!(tracker.chunks.len() <= 8);
    }

    #[test]
    fn test_claim_across_chunk_border() {
        let mut tracker = OccupancyTracker::new(vec2f(200.0, 200.0), 12);
        assert!(tracker.claim_icon(vec2f(64.0, 64.0)));
        assert!(tracker.check(63, 63));
        assert!(tracker.check(75, 75));
        assert!(!tracker.check(76, 64));
    }

    #[test]
    fn test_label_claim() {
        let mut tracker = OccupancyTracker::new(vec2f(200.0, 100.0), 12);
        assert!(tracker.claim_label(vec2f(100.0, 50.0), 10));
        assert!(!tracker.claim_label(vec2f(110.0, 50.0), 4));
        assert!(tracker.claim_label(vec2f(100.0, 80.0), 10));
    }
}
