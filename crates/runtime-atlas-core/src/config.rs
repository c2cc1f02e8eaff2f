use serde::{Deserialize, Serialize};

use crate::strategy::FitStrategy;

/// Atlas configuration.
/// Key notes:
///   - every page has the same fixed `page_width` x `page_height`; pages never grow
///   - `padding` is added to each item's width and height before fitting
///   - `strategy` picks the free region an item goes into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Page width in pixels.
    #[serde(default = "default_page_size")]
    pub page_width: u32,
    /// Page height in pixels.
    #[serde(default = "default_page_size")]
    pub page_height: u32,
    /// Pixels reserved to the right of and above every item.
    #[serde(default = "default_padding")]
    pub padding: u32,
    #[serde(default)]
    pub strategy: FitStrategy,
    /// Merge edge-aligned free regions when a slot is released.
    /// Off by default: released slots are only appended and normalized.
    #[serde(default)]
    pub coalesce_free: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_size(),
            page_height: default_page_size(),
            padding: default_padding(),
            strategy: FitStrategy::default(),
            coalesce_free: false,
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - A page dimension is zero
    /// - Padding alone would fill a page
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.page_width == 0 || self.page_height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.page_width,
                height: self.page_height,
            });
        }

        if self.padding >= self.page_width || self.padding >= self.page_height {
            return Err(AtlasError::InvalidConfig(format!(
                "padding ({}) leaves no usable space on a {}x{} page",
                self.padding, self.page_width, self.page_height
            )));
        }

        Ok(())
    }

    /// Area of one page in pixels.
    pub fn page_area(&self) -> u64 {
        (self.page_width as u64) * (self.page_height as u64)
    }
}

fn default_page_size() -> u32 {
    1024
}
fn default_padding() -> u32 {
    1
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn with_page_size(mut self, w: u32, h: u32) -> Self {
        self.cfg.page_width = w;
        self.cfg.page_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn strategy(mut self, v: FitStrategy) -> Self {
        self.cfg.strategy = v;
        self
    }
    pub fn coalesce_free(mut self, v: bool) -> Self {
        self.cfg.coalesce_free = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

impl AtlasConfig {
    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}
