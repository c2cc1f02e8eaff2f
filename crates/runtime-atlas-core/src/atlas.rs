use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{
    Allocation, AtlasSnapshot, AtlasStats, PageSnapshot, Placement, Rect, ReleaseOutcome,
};
use crate::page::Page;
use crate::strategy::FitStrategy;

/// Reference-counted 2D allocator over a growable list of fixed-size pages.
///
/// Items are identified by a string key. Inserting a key that is already live bumps its
/// reference count and returns the existing placement; the slot is given back to its page
/// once every reference has been released.
///
/// Pages are created on demand and never removed. The atlas is single-threaded; wrap it in a
/// lock to share it.
#[derive(Debug, Clone)]
pub struct Atlas {
    config: AtlasConfig,
    pages: Vec<Page>,
    strategy: Option<FitStrategy>,
    allocations: HashMap<String, Allocation>,
}

impl Atlas {
    pub fn new(config: AtlasConfig) -> Result<Self> {
        config.validate()?;
        let strategy = Some(config.strategy);
        Ok(Self {
            config,
            pages: Vec::new(),
            strategy,
            allocations: HashMap::new(),
        })
    }

    /// Place a `w` x `h` item under `key`, or take another reference to it if already placed.
    ///
    /// Fails with [`AtlasError::OversizedItem`] when the item is larger than a page; no page
    /// is created in that case. Otherwise the atlas grows as needed and the insert succeeds.
    #[instrument(skip(self), level = "trace")]
    pub fn insert(&mut self, key: &str, w: u32, h: u32) -> Result<Placement> {
        let strategy = self.strategy.ok_or(AtlasError::Detached)?;
        if w > self.config.page_width || h > self.config.page_height {
            warn!(key, w, h, "item is larger than an atlas page");
            return Err(AtlasError::OversizedItem {
                key: key.to_string(),
                width: w,
                height: h,
                max_width: self.config.page_width,
                max_height: self.config.page_height,
            });
        }
        if w == 0 || h == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: w,
                height: h,
            });
        }

        if let Some(alloc) = self.allocations.get_mut(key) {
            alloc.ref_count = alloc.ref_count.saturating_add(1);
            debug!(key, refs = alloc.ref_count, "insert hit");
            return Ok(alloc.placement());
        }

        let pad = self.config.padding;
        let requested = Rect::new(0, 0, w.saturating_add(pad), h.saturating_add(pad));
        let (page_idx, slot) = self.find_or_grow(&requested, &strategy);

        let page = &mut self.pages[page_idx];
        let placed = requested.at(slot.x, slot.y);
        let footprint = placed.intersection(&page.bounds()).unwrap_or(slot);
        page.carve(&placed);
        page.normalize();

        let alloc = Allocation {
            key: key.to_string(),
            page: page_idx,
            region: Rect::new(slot.x, slot.y, w, h),
            footprint,
            ref_count: 1,
        };
        let placement = alloc.placement();
        debug!(key, page = page_idx, x = slot.x, y = slot.y, w, h, "placed");
        self.allocations.insert(alloc.key.clone(), alloc);
        Ok(placement)
    }

    fn find_or_grow(&mut self, requested: &Rect, strategy: &FitStrategy) -> (usize, Rect) {
        for page in &self.pages {
            if let Some(slot) = page.try_find_fit(requested, strategy) {
                return (page.index(), slot);
            }
        }
        let index = self.pages.len();
        let page = Page::new(index, self.config.page_width, self.config.page_height);
        let slot = page.bounds();
        debug!(
            page = index,
            width = page.width(),
            height = page.height(),
            "atlas grew a page"
        );
        self.pages.push(page);
        (index, slot)
    }

    /// Find a live item and take a new reference to it.
    ///
    /// A miss returns `None` and changes nothing.
    pub fn lookup(&mut self, key: &str) -> Option<Placement> {
        let alloc = self.allocations.get_mut(key)?;
        alloc.ref_count = alloc.ref_count.saturating_add(1);
        Some(alloc.placement())
    }

    /// Read-only view of a live allocation; does not touch its reference count.
    pub fn get(&self, key: &str) -> Option<&Allocation> {
        self.allocations.get(key)
    }

    /// Drop one reference to `key`. The last release returns the slot to its page.
    ///
    /// Releasing an unknown key (including one already released to zero) is a no-op.
    #[instrument(skip(self), level = "trace")]
    pub fn release(&mut self, key: &str) -> ReleaseOutcome {
        let mut entry = match self.allocations.entry(key.to_string()) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => return ReleaseOutcome::Unknown,
        };
        let alloc = entry.get_mut();
        alloc.ref_count = alloc.ref_count.saturating_sub(1);
        if alloc.ref_count > 0 {
            return ReleaseOutcome::Retained {
                remaining: alloc.ref_count,
            };
        }
        let alloc = entry.remove();
        if let Some(page) = self.pages.get_mut(alloc.page) {
            page.reclaim(alloc.footprint);
            if self.config.coalesce_free {
                page.coalesce();
            }
            page.normalize();
        }
        debug!(key, page = alloc.page, "reclaimed");
        ReleaseOutcome::Reclaimed(alloc.placement())
    }

    /// Drop all pages and allocations and detach the fit strategy.
    ///
    /// This is terminal: every later `insert` fails with [`AtlasError::Detached`].
    /// Use [`Atlas::reset`] to empty the atlas and keep using it.
    pub fn clear(&mut self) {
        info!(
            pages = self.pages.len(),
            allocations = self.allocations.len(),
            "atlas cleared"
        );
        self.pages.clear();
        self.allocations.clear();
        self.strategy = None;
    }

    /// Drop all pages and allocations, keeping the configured strategy.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.allocations.clear();
        self.strategy = Some(self.config.strategy);
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn strategy(&self) -> Option<FitStrategy> {
        self.strategy
    }

    pub fn is_detached(&self) -> bool {
        self.strategy.is_none()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.allocations.contains_key(key)
    }

    pub fn ref_count(&self, key: &str) -> Option<u32> {
        self.allocations.get(key).map(|a| a.ref_count)
    }

    /// Number of live allocations.
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Live keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.allocations.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Live allocations on `page`, sorted by key.
    pub fn allocations_on(&self, page: usize) -> Vec<&Allocation> {
        let mut list: Vec<&Allocation> = self
            .allocations
            .values()
            .filter(|a| a.page == page)
            .collect();
        list.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        list
    }

    pub fn stats(&self) -> AtlasStats {
        let total_page_area = self.config.page_area() * self.pages.len() as u64;
        let used_area: u64 = self.allocations.values().map(|a| a.footprint.area()).sum();
        let free_area: u64 = self.pages.iter().map(Page::free_area).sum();
        let free_regions: usize = self.pages.iter().map(|p| p.free_regions().len()).sum();
        let total_refs: u64 = self.allocations.values().map(|a| a.ref_count as u64).sum();
        let occupancy = if total_page_area > 0 {
            used_area as f64 / total_page_area as f64
        } else {
            0.0
        };
        AtlasStats {
            num_pages: self.pages.len(),
            num_allocations: self.allocations.len(),
            total_refs,
            total_page_area,
            used_area,
            free_area,
            free_regions,
            occupancy,
        }
    }

    pub fn snapshot(&self) -> AtlasSnapshot {
        let pages = self
            .pages
            .iter()
            .map(|p| PageSnapshot {
                index: p.index(),
                width: p.width(),
                height: p.height(),
                free_regions: p.free_regions().to_vec(),
                allocations: self.allocations_on(p.index()).into_iter().cloned().collect(),
            })
            .collect();
        AtlasSnapshot {
            page_width: self.config.page_width,
            page_height: self.config.page_height,
            padding: self.config.padding,
            strategy: self.strategy.map(|s| s.name().to_string()),
            pages,
        }
    }
}
