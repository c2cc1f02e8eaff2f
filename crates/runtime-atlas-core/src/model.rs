use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is the origin; `w,h` are sizes.
///
/// Edges reported by [`Rect::right`] and [`Rect::top`] are exclusive (`x + w`, `y + h`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive top edge (`y + h`).
    pub fn top(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` lies fully inside `self` (shared edges count as inside).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.right() <= self.right() && r.y >= self.y && r.top() <= self.top()
    }
    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.y < other.top()
            && self.right() > other.x
            && self.top() > other.y
    }
    /// Returns true if `self` is at least as wide and as tall as `other`.
    pub fn can_hold(&self, other: &Rect) -> bool {
        self.w >= other.w && self.h >= other.h
    }
    /// Same size, moved to `(x, y)`.
    pub fn at(&self, x: u32, y: u32) -> Rect {
        Rect::new(x, y, self.w, self.h)
    }
    /// Overlapping part of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        Some(Rect::new(x, y, right - x, top - y))
    }
}

/// Where an item lives: the page it was placed on and its region there.
///
/// `region` has the requested (unpadded) size, anchored at the padded slot's origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    pub page: usize,
    pub region: Rect,
}

/// Live allocation record kept by the atlas for one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub key: String,
    pub page: usize,
    /// Region reported to clients (unpadded).
    pub region: Rect,
    /// Padded slot carved out of the page, clipped to the page bounds.
    pub footprint: Rect,
    pub ref_count: u32,
}

impl Allocation {
    pub fn placement(&self) -> Placement {
        Placement {
            page: self.page,
            region: self.region,
        }
    }
}

/// Result of [`crate::atlas::Atlas::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// No live allocation for that key; nothing changed.
    Unknown,
    /// Reference dropped but other holders remain.
    Retained { remaining: u32 },
    /// Last reference dropped; the slot went back to the page's free list.
    Reclaimed(Placement),
}

impl ReleaseOutcome {
    pub fn is_reclaimed(&self) -> bool {
        matches!(self, ReleaseOutcome::Reclaimed(_))
    }
}

/// Region that needs to be updated on a GPU texture after a copy or clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRegion {
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UpdateRegion {
    pub fn from_placement(p: &Placement) -> Self {
        Self {
            page: p.page,
            x: p.region.x,
            y: p.region.y,
            width: p.region.w,
            height: p.region.h,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area of this region in pixels.
    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
}

/// Statistics about atlas occupancy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AtlasStats {
    /// Pages created so far (pages are never dropped before `clear`/`reset`).
    pub num_pages: usize,
    /// Live allocations (distinct keys).
    pub num_allocations: usize,
    /// Sum of reference counts over all live allocations.
    pub total_refs: u64,
    /// Total area of all pages.
    pub total_page_area: u64,
    /// Area reserved by placed slots, padding included.
    pub used_area: u64,
    /// Area covered by free regions (union, overlaps counted once).
    pub free_area: u64,
    /// Number of free regions across all pages.
    pub free_regions: usize,
    /// used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Allocations: {}, Refs: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Free Regions: {}",
            self.num_pages,
            self.num_allocations,
            self.total_refs,
            self.occupancy * 100.0,
            self.total_page_area,
            self.used_area,
            self.free_regions,
        )
    }

    /// Returns unreserved space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }
}

/// Serializable view of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub free_regions: Vec<Rect>,
    pub allocations: Vec<Allocation>,
}

/// Serializable view of the whole atlas (diagnostics only, never reloaded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasSnapshot {
    pub page_width: u32,
    pub page_height: u32,
    pub padding: u32,
    /// `None` once the atlas has been cleared.
    pub strategy: Option<String>,
    pub pages: Vec<PageSnapshot>,
}
