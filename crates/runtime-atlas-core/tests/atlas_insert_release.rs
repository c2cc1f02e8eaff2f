use runtime_atlas_core::prelude::*;

fn atlas(w: u32, h: u32, padding: u32) -> Atlas {
    let cfg = AtlasConfig::builder()
        .with_page_size(w, h)
        .padding(padding)
        .build();
    Atlas::new(cfg).expect("valid config")
}

#[test]
fn first_insert_creates_page_zero() {
    let mut a = atlas(256, 256, 1);
    assert_eq!(a.num_pages(), 0);
    let p = a.insert("hero", 64, 32).expect("insert");
    assert_eq!(a.num_pages(), 1);
    assert_eq!(p.page, 0);
    assert_eq!(p.region, Rect::new(0, 0, 64, 32));
    assert_eq!(a.ref_count("hero"), Some(1));
}

#[test]
fn reported_region_is_unpadded_at_padded_origin() {
    let mut a = atlas(64, 64, 2);
    let first = a.insert("a", 10, 10).expect("a");
    assert_eq!(first.region, Rect::new(0, 0, 10, 10));
    assert_eq!(a.get("a").map(|r| r.footprint), Some(Rect::new(0, 0, 12, 12)));

    // Both residuals are 3328 px; the right one is listed first.
    let second = a.insert("b", 10, 10).expect("b");
    assert_eq!(second.page, 0);
    assert_eq!(second.region, Rect::new(12, 0, 10, 10));
}

#[test]
fn insert_same_key_is_idempotent() {
    let mut a = atlas(128, 128, 1);
    let p1 = a.insert("icon", 20, 20).expect("first");
    let free_before = a.page(0).map(|p| p.free_regions().to_vec());
    let p2 = a.insert("icon", 20, 20).expect("second");
    assert_eq!(p1, p2);
    assert_eq!(a.ref_count("icon"), Some(2));
    assert_eq!(a.num_pages(), 1);
    assert_eq!(a.page(0).map(|p| p.free_regions().to_vec()), free_before);
}

#[test]
fn insert_hit_ignores_new_size() {
    let mut a = atlas(128, 128, 0);
    let p1 = a.insert("icon", 20, 20).expect("first");
    let p2 = a.insert("icon", 50, 50).expect("second");
    assert_eq!(p1, p2);
    assert_eq!(p2.region.w, 20);
}

#[test]
fn lookup_hit_takes_a_reference() {
    let mut a = atlas(128, 128, 1);
    let p = a.insert("icon", 20, 20).expect("insert");
    assert_eq!(a.lookup("icon"), Some(p));
    assert_eq!(a.ref_count("icon"), Some(2));
}

#[test]
fn lookup_miss_has_no_side_effect() {
    let mut a = atlas(128, 128, 1);
    assert_eq!(a.lookup("ghost"), None);
    assert_eq!(a.num_pages(), 0);
    assert!(a.is_empty());
}

#[test]
fn get_does_not_change_ref_count() {
    let mut a = atlas(128, 128, 1);
    a.insert("icon", 20, 20).expect("insert");
    assert_eq!(a.get("icon").map(|r| r.ref_count), Some(1));
    assert_eq!(a.ref_count("icon"), Some(1));
}

#[test]
fn release_counts_down_then_reclaims() {
    let mut a = atlas(128, 128, 1);
    let p = a.insert("icon", 20, 20).expect("insert");
    a.insert("icon", 20, 20).expect("insert again");

    assert_eq!(a.release("icon"), ReleaseOutcome::Retained { remaining: 1 });
    assert!(a.contains("icon"));
    assert_eq!(a.release("icon"), ReleaseOutcome::Reclaimed(p));
    assert!(!a.contains("icon"));
    assert_eq!(a.page(0).map(Page::free_area), Some(128 * 128));
}

#[test]
fn release_past_zero_is_a_noop() {
    let mut a = atlas(128, 128, 1);
    a.insert("icon", 20, 20).expect("insert");
    a.insert("other", 30, 30).expect("other");
    assert!(a.release("icon").is_reclaimed());

    let free_before = a.page(0).map(|p| p.free_regions().to_vec());
    assert_eq!(a.release("icon"), ReleaseOutcome::Unknown);
    assert_eq!(a.page(0).map(|p| p.free_regions().to_vec()), free_before);
    assert_eq!(a.ref_count("other"), Some(1));
}

#[test]
fn release_unknown_key_changes_nothing() {
    let mut a = atlas(128, 128, 1);
    a.insert("icon", 20, 20).expect("insert");
    a.lookup("icon");
    let snapshot_before = to_json_snapshot(&a.snapshot());
    assert_eq!(a.release("never-inserted"), ReleaseOutcome::Unknown);
    assert_eq!(to_json_snapshot(&a.snapshot()), snapshot_before);
    assert_eq!(a.ref_count("icon"), Some(2));
}

#[test]
fn freed_slot_is_reused() {
    let mut a = atlas(100, 100, 0);
    let first = a.insert("a", 100, 60).expect("a");
    a.insert("b", 100, 40).expect("b");
    assert!(a.release("a").is_reclaimed());
    let c = a.insert("c", 100, 60).expect("c");
    assert_eq!(a.num_pages(), 1);
    assert_eq!(c, Placement { page: 0, region: first.region });
}

#[test]
fn oversized_item_is_rejected_without_mutation() {
    let mut a = atlas(100, 100, 1);
    match a.insert("wide", 101, 1) {
        Err(AtlasError::OversizedItem {
            key,
            width,
            height,
            max_width,
            max_height,
        }) => {
            assert_eq!(key, "wide");
            assert_eq!((width, height), (101, 1));
            assert_eq!((max_width, max_height), (100, 100));
        }
        other => panic!("Expected OversizedItem, got {:?}", other),
    }
    assert!(matches!(
        a.insert("tall", 1, 101),
        Err(AtlasError::OversizedItem { .. })
    ));
    assert_eq!(a.num_pages(), 0);
    assert!(!a.contains("wide"));
    assert!(a.is_empty());
}

#[test]
fn zero_sized_item_is_rejected() {
    let mut a = atlas(100, 100, 1);
    assert!(matches!(
        a.insert("empty", 0, 10),
        Err(AtlasError::InvalidDimensions { width: 0, height: 10 })
    ));
    assert_eq!(a.num_pages(), 0);
}

#[test]
fn second_large_item_grows_a_page() {
    let mut a = atlas(100, 100, 0);
    let first = a.insert("a", 80, 80).expect("a");
    let second = a.insert("b", 80, 80).expect("b");
    assert_eq!(first.page, 0);
    assert_eq!(second.page, 1);
    assert_eq!(second.region, Rect::new(0, 0, 80, 80));
    assert_eq!(a.num_pages(), 2);
}

#[test]
fn earlier_pages_are_preferred_once_space_frees_up() {
    let mut a = atlas(100, 100, 0);
    a.insert("a", 80, 80).expect("a");
    a.insert("b", 80, 80).expect("b");
    let small = a.insert("c", 10, 10).expect("c");
    assert_eq!(small.page, 0);
}

#[test]
fn full_page_item_with_padding_still_fits_on_a_new_page() {
    let mut a = atlas(100, 100, 1);
    let p = a.insert("full", 100, 100).expect("full");
    assert_eq!(p.region, Rect::new(0, 0, 100, 100));
    assert_eq!(a.get("full").map(|r| r.footprint), Some(Rect::new(0, 0, 100, 100)));
    assert_eq!(a.page(0).map(|p| p.free_regions().len()), Some(0));

    let next = a.insert("next", 5, 5).expect("next");
    assert_eq!(next.page, 1);
}

#[test]
fn pages_are_never_removed() {
    let mut a = atlas(100, 100, 0);
    a.insert("a", 80, 80).expect("a");
    a.insert("b", 80, 80).expect("b");
    a.release("a");
    a.release("b");
    assert_eq!(a.num_pages(), 2);
    assert!(a.is_empty());
}

#[test]
fn coalesce_lets_a_released_page_take_a_full_size_item() {
    let cfg = AtlasConfig::builder()
        .with_page_size(100, 100)
        .padding(0)
        .coalesce_free(true)
        .build();
    let mut merged = Atlas::new(cfg).expect("cfg");
    merged.insert("a", 100, 50).expect("a");
    merged.release("a");
    assert_eq!(merged.insert("b", 100, 100).expect("b").page, 0);

    let mut plain = atlas(100, 100, 0);
    plain.insert("a", 100, 50).expect("a");
    plain.release("a");
    assert_eq!(plain.insert("b", 100, 100).expect("b").page, 1);
}

#[test]
fn clear_detaches_the_atlas() {
    let mut a = atlas(100, 100, 1);
    a.insert("a", 10, 10).expect("a");
    a.clear();
    assert_eq!(a.num_pages(), 0);
    assert!(a.is_empty());
    assert!(a.is_detached());
    assert!(matches!(a.insert("b", 10, 10), Err(AtlasError::Detached)));
    assert_eq!(a.snapshot().strategy, None);
    assert_eq!(a.release("a"), ReleaseOutcome::Unknown);
}

#[test]
fn reset_empties_but_keeps_the_atlas_usable() {
    let mut a = atlas(100, 100, 1);
    a.insert("a", 10, 10).expect("a");
    a.reset();
    assert_eq!(a.num_pages(), 0);
    assert!(!a.is_detached());
    let p = a.insert("b", 10, 10).expect("b");
    assert_eq!(p, Placement { page: 0, region: Rect::new(0, 0, 10, 10) });
}

#[test]
fn keys_and_allocations_are_sorted() {
    let mut a = atlas(256, 256, 1);
    for k in ["delta", "alpha", "charlie", "bravo"] {
        a.insert(k, 16, 16).expect("insert");
    }
    assert_eq!(a.keys(), vec!["alpha", "bravo", "charlie", "delta"]);
    let on_page: Vec<&str> = a.allocations_on(0).iter().map(|r| r.key.as_str()).collect();
    assert_eq!(on_page, vec!["alpha", "bravo", "charlie", "delta"]);
    assert_eq!(a.len(), 4);
}

#[test]
fn stats_account_for_every_pixel() {
    let mut a = atlas(128, 128, 1);
    a.insert("a", 31, 31).expect("a");
    a.insert("b", 15, 63).expect("b");
    a.insert("b", 15, 63).expect("b again");
    let s = a.stats();
    assert_eq!(s.num_pages, 1);
    assert_eq!(s.num_allocations, 2);
    assert_eq!(s.total_refs, 3);
    assert_eq!(s.used_area, 32 * 32 + 16 * 64);
    assert_eq!(s.used_area + s.free_area, s.total_page_area);
    assert!((s.occupancy - (2048.0 / 16384.0)).abs() < 1e-9);
    assert_eq!(s.wasted_area(), 16384 - 2048);
    assert!(s.summary().contains("Pages: 1"));
}

#[test]
fn invalid_config_is_refused() {
    let cfg = AtlasConfig::builder().with_page_size(0, 64).build();
    assert!(matches!(
        Atlas::new(cfg),
        Err(AtlasError::InvalidDimensions { width: 0, height: 64 })
    ));
}
