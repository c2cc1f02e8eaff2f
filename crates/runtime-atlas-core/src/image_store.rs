use image::{imageops, Rgba, RgbaImage};

use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{Placement, Rect, UpdateRegion};
use crate::surface::{BackingStore, SurfaceAtlas};

/// RGBA page surfaces kept in memory.
///
/// New pages are filled with the background colour, which is also what released regions are
/// cleared back to.
#[derive(Debug, Clone)]
pub struct ImageStore {
    pages: Vec<RgbaImage>,
    background_color: Rgba<u8>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            background_color: Rgba([0, 0, 0, 0]), // Transparent by default
        }
    }

    /// Set the background colour for new pages and cleared regions.
    pub fn with_background_color(mut self, color: Rgba<u8>) -> Self {
        self.background_color = color;
        self
    }

    pub fn background_color(&self) -> Rgba<u8> {
        self.background_color
    }

    /// Pixel data of a page.
    pub fn page_image(&self, page: usize) -> Option<&RgbaImage> {
        self.pages.get(page)
    }

    pub fn page_image_mut(&mut self, page: usize) -> Option<&mut RgbaImage> {
        self.pages.get_mut(page)
    }

    pub fn pages(&self) -> &[RgbaImage] {
        &self.pages
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }
}

impl BackingStore for ImageStore {
    type Item = RgbaImage;

    fn item_size(item: &RgbaImage) -> (u32, u32) {
        item.dimensions()
    }

    fn ensure_page(&mut self, page: usize, width: u32, height: u32) -> Result<()> {
        while self.pages.len() <= page {
            self.pages
                .push(RgbaImage::from_pixel(width, height, self.background_color));
        }
        Ok(())
    }

    fn copy_in(&mut self, page: usize, x: u32, y: u32, item: &RgbaImage) -> Result<()> {
        let surface = self
            .pages
            .get_mut(page)
            .ok_or(AtlasError::MissingSurface(page))?;
        imageops::replace(surface, item, x as i64, y as i64);
        Ok(())
    }

    fn clear_region(&mut self, page: usize, region: &Rect) -> Result<()> {
        let background = self.background_color;
        let surface = self
            .pages
            .get_mut(page)
            .ok_or(AtlasError::MissingSurface(page))?;
        for y in region.y..region.top().min(surface.height()) {
            for x in region.x..region.right().min(surface.width()) {
                surface.put_pixel(x, y, background);
            }
        }
        Ok(())
    }

    fn discard_all(&mut self) {
        self.pages.clear();
    }
}

/// Runtime atlas with RGBA pixel data management.
///
/// Useful for game engines that upload dirty regions to GPU textures.
pub type ImageAtlas = SurfaceAtlas<ImageStore>;

impl ImageAtlas {
    /// Atlas with transparent RGBA pages.
    pub fn with_image_store(config: AtlasConfig) -> Result<Self> {
        SurfaceAtlas::new(config, ImageStore::new())
    }

    /// Insert an image keyed by `key`. Returns the placement and the pixel region written
    /// (`None` when the key was already live and nothing was copied).
    pub fn insert_image(
        &mut self,
        key: &str,
        image: &RgbaImage,
    ) -> Result<(Placement, Option<UpdateRegion>)> {
        self.insert(key, image)
    }

    /// Pixel data of a page.
    pub fn page_image(&self, page: usize) -> Option<&RgbaImage> {
        self.store().page_image(page)
    }

    /// Save every page as `<dir>/<name>_<index>.png` and return the written paths.
    pub fn save_pages(
        &self,
        dir: &std::path::Path,
        name: &str,
    ) -> Result<Vec<std::path::PathBuf>> {
        let mut written = Vec::with_capacity(self.store().num_pages());
        for (i, page) in self.store().pages().iter().enumerate() {
            let path = dir.join(format!("{}_{}.png", name, i));
            page.save(&path)?;
            written.push(path);
        }
        Ok(written)
    }
}
