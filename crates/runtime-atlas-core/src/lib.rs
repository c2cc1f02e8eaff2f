//! Dynamic 2D space allocator for runtime texture atlases.
//!
//! - Pages: fixed-size surfaces with a maximal-rectangles free list (carve + normalize)
//! - Strategy: best-area-fit selection of the free region an item goes into
//! - Atlas: key → allocation map with reference counting; grows by appending pages
//! - Surfaces: optional pixel stores behind a small trait; an RGBA store ships with the
//!   default `image` feature
//!
//! Quick example:
//! ```ignore
//! use runtime_atlas_core::prelude::*;
//! # fn main() -> runtime_atlas_core::Result<()> {
//! let cfg = AtlasConfig::builder().with_page_size(512, 512).padding(1).build();
//! let mut atlas = Atlas::new(cfg)?;
//! let icon = atlas.insert("icons/save.png", 32, 32)?;
//! let again = atlas.insert("icons/save.png", 32, 32)?; // same slot, ref count 2
//! assert_eq!(icon, again);
//! atlas.release("icons/save.png");
//! atlas.release("icons/save.png"); // slot returns to page 0
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod config;
pub mod error;
pub mod export;
#[cfg(feature = "image")]
pub mod image_store;
pub mod model;
pub mod page;
pub mod strategy;
pub mod surface;

pub use atlas::*;
pub use config::*;
pub use error::*;
pub use export::*;
#[cfg(feature = "image")]
pub use image_store::*;
pub use model::*;
pub use page::*;
pub use strategy::*;
pub use surface::*;

/// Convenience prelude for common types and functions.
/// Importing `runtime_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::Atlas;
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder};
    pub use crate::error::{AtlasError, Result};
    #[cfg(feature = "image")]
    pub use crate::image_store::{ImageAtlas, ImageStore};
    pub use crate::model::{
        Allocation, AtlasSnapshot, AtlasStats, Placement, Rect, ReleaseOutcome, UpdateRegion,
    };
    pub use crate::page::Page;
    pub use crate::strategy::FitStrategy;
    pub use crate::surface::{BackingStore, SurfaceAtlas};
    pub use crate::{to_json_snapshot, write_json_snapshot};
}
