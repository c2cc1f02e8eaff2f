use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::Rect;
use crate::page::Page;

/// Policies for choosing which free region of a page receives an item.
///
/// A strategy only reads the page; carving the chosen region is the page's job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitStrategy {
    /// Smallest-area free region that still holds the request.
    #[default]
    BestAreaFit,
}

impl FitStrategy {
    /// Pick a free region of `page` at least as large as `requested`, or `None`.
    ///
    /// `requested` must already include padding.
    pub fn select_free_region(&self, requested: &Rect, page: &Page) -> Option<Rect> {
        match self {
            FitStrategy::BestAreaFit => best_area_fit(requested, page.free_regions()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FitStrategy::BestAreaFit => "best_area_fit",
        }
    }
}

// Ties keep the earliest region in list order.
fn best_area_fit(requested: &Rect, free: &[Rect]) -> Option<Rect> {
    let mut best: Option<Rect> = None;
    for fr in free {
        if !fr.can_hold(requested) {
            continue;
        }
        match best {
            Some(b) if fr.area() >= b.area() => {}
            _ => best = Some(*fr),
        }
    }
    best
}

impl FromStr for FitStrategy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" | "best_area_fit" => Ok(Self::BestAreaFit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
