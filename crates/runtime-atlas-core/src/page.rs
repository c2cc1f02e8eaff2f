use tracing::trace;

use crate::model::Rect;
use crate::strategy::FitStrategy;

/// One fixed-size atlas surface and its free-region list.
///
/// Free regions form a maximal-rectangles cover of the unallocated area: they may overlap
/// each other, but after [`Page::normalize`] none is contained in another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    index: usize,
    width: u32,
    height: u32,
    free: Vec<Rect>,
}

impl Page {
    /// A fresh page has exactly one free region spanning its full extent.
    pub fn new(index: usize, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            free: vec![Rect::new(0, 0, width, height)],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
    pub fn area(&self) -> u64 {
        self.bounds().area()
    }
    pub fn free_regions(&self) -> &[Rect] {
        &self.free
    }

    pub fn try_find_fit(&self, requested: &Rect, strategy: &FitStrategy) -> Option<Rect> {
        strategy.select_free_region(requested, self)
    }

    /// Remove `placed` from every free region it overlaps.
    ///
    /// Each overlapped region is replaced by up to four residuals (right, left, top, bottom
    /// of `placed`); residuals may overlap and must be run through [`Page::normalize`].
    pub fn carve(&mut self, placed: &Rect) {
        let (hit, mut kept): (Vec<Rect>, Vec<Rect>) =
            self.free.iter().copied().partition(|fr| placed.intersects(fr));
        let mut residuals: Vec<Rect> = Vec::with_capacity(hit.len() * 4);
        for area in &hit {
            split_region(placed, area, &mut residuals);
        }
        trace!(
            page = self.index,
            split = hit.len(),
            residuals = residuals.len(),
            "carve"
        );
        kept.extend(residuals);
        self.free = kept;
    }

    /// Drop every free region fully contained in another one.
    ///
    /// Of identical duplicates only the earliest survives.
    pub fn normalize(&mut self) {
        let before = self.free.len();
        let redundant: Vec<bool> = (0..self.free.len())
            .map(|i| {
                let a = &self.free[i];
                self.free
                    .iter()
                    .enumerate()
                    .any(|(j, b)| j != i && b.contains(a) && (a != b || j < i))
            })
            .collect();
        let mut flags = redundant.into_iter();
        self.free.retain(|_| !flags.next().unwrap_or(false));
        trace!(
            page = self.index,
            removed = before - self.free.len(),
            remaining = self.free.len(),
            "normalize"
        );
        debug_assert!(self.is_normalized());
    }

    /// Give `region` back as free space. Call [`Page::normalize`] afterwards.
    pub fn reclaim(&mut self, region: Rect) {
        if !region.is_empty() {
            self.free.push(region);
        }
    }

    /// Merge pairs of free regions that share a full edge, until none are left.
    pub fn coalesce(&mut self) {
        let free = &mut self.free;
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..free.len() {
                for j in i + 1..free.len() {
                    if let Some(joined) = join_aligned(&free[i], &free[j]) {
                        free[i] = joined;
                        free.remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    /// True if no free region is contained in another.
    pub fn is_normalized(&self) -> bool {
        for (i, a) in self.free.iter().enumerate() {
            for (j, b) in self.free.iter().enumerate() {
                if i != j && b.contains(a) {
                    return false;
                }
            }
        }
        true
    }

    pub fn largest_free_region(&self) -> Option<Rect> {
        self.free.iter().copied().max_by_key(|r| r.area())
    }

    /// Area covered by free regions, overlaps counted once.
    pub fn free_area(&self) -> u64 {
        union_area(&self.free)
    }

    pub fn used_area(&self) -> u64 {
        self.area().saturating_sub(self.free_area())
    }
}

fn split_region(divider: &Rect, area: &Rect, out: &mut Vec<Rect>) {
    if area.right() > divider.right() {
        out.push(Rect::new(
            divider.right(),
            area.y,
            area.right() - divider.right(),
            area.h,
        ));
    }
    if divider.x > area.x {
        out.push(Rect::new(area.x, area.y, divider.x - area.x, area.h));
    }
    if area.top() > divider.top() {
        out.push(Rect::new(
            area.x,
            divider.top(),
            area.w,
            area.top() - divider.top(),
        ));
    }
    if divider.y > area.y {
        out.push(Rect::new(area.x, area.y, area.w, divider.y - area.y));
    }
}

fn join_aligned(a: &Rect, b: &Rect) -> Option<Rect> {
    if a.y == b.y && a.h == b.h {
        if a.right() == b.x {
            return Some(Rect::new(a.x, a.y, a.w + b.w, a.h));
        }
        if b.right() == a.x {
            return Some(Rect::new(b.x, a.y, a.w + b.w, a.h));
        }
    }
    if a.x == b.x && a.w == b.w {
        if a.top() == b.y {
            return Some(Rect::new(a.x, a.y, a.w, a.h + b.h));
        }
        if b.top() == a.y {
            return Some(Rect::new(a.x, b.y, a.w, a.h + b.h));
        }
    }
    None
}

// Sweep over compressed x coordinates, merging covered y intervals per strip.
fn union_area(rects: &[Rect]) -> u64 {
    let mut xs: Vec<u32> = rects
        .iter()
        .filter(|r| !r.is_empty())
        .flat_map(|r| [r.x, r.right()])
        .collect();
    xs.sort_unstable();
    xs.dedup();

    let mut total = 0u64;
    for strip in xs.windows(2) {
        let (x0, x1) = (strip[0], strip[1]);
        let mut spans: Vec<(u32, u32)> = rects
            .iter()
            .filter(|r| !r.is_empty() && r.x <= x0 && r.right() >= x1)
            .map(|r| (r.y, r.top()))
            .collect();
        if spans.is_empty() {
            continue;
        }
        spans.sort_unstable();
        let mut covered = 0u64;
        let (mut lo, mut hi) = spans[0];
        for &(y0, y1) in &spans[1..] {
            if y0 > hi {
                covered += (hi - lo) as u64;
                lo = y0;
                hi = y1;
            } else {
                hi = hi.max(y1);
            }
        }
        covered += (hi - lo) as u64;
        total += covered * (x1 - x0) as u64;
    }
    total
}
