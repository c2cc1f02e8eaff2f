use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::error::Result;
use crate::model::{AtlasSnapshot, Rect};

/// Schema version of the snapshot JSON. Bumped on breaking layout changes only.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1";

fn rect_json(r: &Rect) -> Value {
    json!({"x": r.x, "y": r.y, "w": r.w, "h": r.h})
}

/// Serialize a snapshot as `{ pages, meta }`.
///
/// Each page lists its free regions and allocations (key, region, footprint, refCount).
/// Intended for debugging and visualisation tools; the allocator never reads it back.
pub fn to_json_snapshot(snapshot: &AtlasSnapshot) -> Value {
    let pages_val = snapshot
        .pages
        .iter()
        .map(|p| {
            let free: Vec<Value> = p.free_regions.iter().map(rect_json).collect();
            let allocations: Vec<Value> = p
                .allocations
                .iter()
                .map(|a| {
                    json!({
                        "key": a.key,
                        "region": rect_json(&a.region),
                        "footprint": rect_json(&a.footprint),
                        "refCount": a.ref_count,
                    })
                })
                .collect();
            json!({
                "index": p.index,
                "width": p.width,
                "height": p.height,
                "freeRegions": free,
                "allocations": allocations,
            })
        })
        .collect::<Vec<_>>();
    let meta = json!({
        "schemaVersion": SNAPSHOT_SCHEMA_VERSION,
        "app": "runtime-atlas",
        "version": env!("CARGO_PKG_VERSION"),
        "pageSize": {"w": snapshot.page_width, "h": snapshot.page_height},
        "padding": snapshot.padding,
        "strategy": snapshot.strategy,
    });
    json!({"pages": pages_val, "meta": meta})
}

/// Write [`to_json_snapshot`] output, pretty-printed, to `path`.
pub fn write_json_snapshot(path: &Path, snapshot: &AtlasSnapshot) -> Result<()> {
    let text = serde_json::to_string_pretty(&to_json_snapshot(snapshot))?;
    fs::write(path, text)?;
    Ok(())
}
