use tracing::{debug, error};

use crate::atlas::Atlas;
use crate::config::AtlasConfig;
use crate::error::Result;
use crate::model::{Placement, Rect, ReleaseOutcome, UpdateRegion};

/// Pixel storage behind an [`Atlas`], one surface per page.
///
/// The allocator never reads pixels; it only tells the store where to copy an item and which
/// rectangle to wipe once the item's last reference is gone.
pub trait BackingStore {
    /// Item payload copied into a page (e.g. an RGBA image).
    type Item: ?Sized;

    /// Width and height of an item's payload.
    fn item_size(item: &Self::Item) -> (u32, u32);

    /// Make sure a `width` x `height` surface exists for `page`.
    fn ensure_page(&mut self, page: usize, width: u32, height: u32) -> Result<()>;

    /// Copy `item` onto `page` with its origin at `(x, y)`.
    fn copy_in(&mut self, page: usize, x: u32, y: u32, item: &Self::Item) -> Result<()>;

    /// Reset `region` of `page` to the store's empty colour.
    fn clear_region(&mut self, page: usize, region: &Rect) -> Result<()>;

    /// Drop every surface.
    fn discard_all(&mut self);
}

/// An [`Atlas`] paired with the store holding its pixels.
///
/// Copies happen once per newly placed item (a cache hit copies nothing) and clears once per
/// item whose last reference is released.
#[derive(Debug)]
pub struct SurfaceAtlas<S: BackingStore> {
    atlas: Atlas,
    store: S,
}

impl<S: BackingStore> SurfaceAtlas<S> {
    pub fn new(config: AtlasConfig, store: S) -> Result<Self> {
        Ok(Self {
            atlas: Atlas::new(config)?,
            store,
        })
    }

    /// Insert `item` under `key`. Returns the placement and, if pixels were written, the
    /// region that changed.
    pub fn insert(
        &mut self,
        key: &str,
        item: &S::Item,
    ) -> Result<(Placement, Option<UpdateRegion>)> {
        let (w, h) = S::item_size(item);
        let was_live = self.atlas.contains(key);
        let placement = self.atlas.insert(key, w, h)?;
        if was_live {
            return Ok((placement, None));
        }

        if let Err(e) = self.write(&placement, item) {
            error!(key, page = placement.page, error = %e, "copy into page failed");
            self.atlas.release(key);
            return Err(e);
        }
        Ok((placement, Some(UpdateRegion::from_placement(&placement))))
    }

    fn write(&mut self, placement: &Placement, item: &S::Item) -> Result<()> {
        let cfg = self.atlas.config();
        self.store
            .ensure_page(placement.page, cfg.page_width, cfg.page_height)?;
        self.store
            .copy_in(placement.page, placement.region.x, placement.region.y, item)
    }

    /// Same as [`Atlas::lookup`].
    pub fn lookup(&mut self, key: &str) -> Option<Placement> {
        self.atlas.lookup(key)
    }

    /// Drop one reference; clears the item's pixels when the last one goes.
    ///
    /// Pixels are cleared before the slot is given back. If the clear fails the allocation
    /// keeps its last reference, so the release can be retried.
    pub fn release(&mut self, key: &str) -> Result<ReleaseOutcome> {
        if let Some(alloc) = self.atlas.get(key).filter(|a| a.ref_count <= 1) {
            debug!(key, page = alloc.page, "clearing released region");
            if let Err(e) = self.store.clear_region(alloc.page, &alloc.region) {
                error!(key, page = alloc.page, error = %e, "clearing page region failed");
                return Err(e);
            }
        }
        Ok(self.atlas.release(key))
    }

    /// Terminal clear of both the allocator and its surfaces. See [`Atlas::clear`].
    pub fn clear(&mut self) {
        self.atlas.clear();
        self.store.discard_all();
    }

    /// Empty the allocator and its surfaces, keeping both usable.
    pub fn reset(&mut self) {
        self.atlas.reset();
        self.store.discard_all();
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_parts(self) -> (Atlas, S) {
        (self.atlas, self.store)
    }
}
