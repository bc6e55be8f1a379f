//! Universal invariants (spec §8.1) and round-trip laws (§8.2), run against every backend
//! through the public façade rather than one backend's internals.

use lispheap_gc::{BackendKind, GcConfig, ObjectTag, RootSet, Runtime};

fn every_backend() -> Vec<GcConfig> {
    vec![
        GcConfig::new(BackendKind::MarkSweep, 256 * 1024),
        GcConfig::new(BackendKind::Copying, 128 * 1024),
        GcConfig::new(BackendKind::Generational, 256 * 1024),
    ]
}

// Invariant 1: allocation contract — fresh memory reads as zero.
#[test]
fn allocation_is_always_zeroed() {
    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        let p = rt.allocate(64);
        unsafe {
            for i in 0..64 {
                assert_eq!(*p.add(i), 0, "backend {} returned non-zeroed memory", rt.name());
            }
        }
    }
}

// Invariant 5: conservation — current_bytes never exceeds allocated minus freed.
#[test]
fn current_bytes_never_exceeds_allocated_minus_freed() {
    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        for _ in 0..500 {
            rt.allocate(32);
        }
        rt.collect();
        let stats = rt.get_stats();
        assert!(
            stats.current_bytes <= stats.allocated_bytes.saturating_sub(stats.freed_bytes) + 64,
            "backend {} violated conservation: current={} allocated={} freed={}",
            rt.name(),
            stats.current_bytes,
            stats.allocated_bytes,
            stats.freed_bytes
        );
    }
}

// Invariant 4: stats monotonicity across repeated collections.
#[test]
fn cumulative_stats_never_decrease() {
    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        let mut prev = rt.get_stats();
        for _ in 0..5 {
            for _ in 0..200 {
                rt.allocate(16);
            }
            rt.collect();
            let cur = rt.get_stats();
            assert!(cur.collections >= prev.collections);
            assert!(cur.allocated_bytes >= prev.allocated_bytes);
            assert!(cur.freed_bytes >= prev.freed_bytes);
            assert!(cur.total_gc_time_ms >= prev.total_gc_time_ms);
            assert!(cur.objects_scanned >= prev.objects_scanned);
            assert!(cur.peak_fragmentation_index >= prev.peak_fragmentation_index);
            prev = cur;
        }
    }
}

// Invariant 10: fragmentation index stays within the unit interval.
#[test]
fn fragmentation_index_stays_in_unit_range() {
    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        for _ in 0..300 {
            rt.allocate(if rt.get_stats().collections % 2 == 0 { 24 } else { 48 });
        }
        rt.collect();
        let f = rt.get_stats().fragmentation_index;
        assert!((0.0..=1.0).contains(&f), "fragmentation_index {} out of range", f);
    }
}

// §8.2: add-root then remove-root restores the prior root set.
#[test]
fn add_then_remove_root_is_a_no_op() {
    let mut roots = RootSet::new();
    let before = roots.len();
    let mut cell: *mut u8 = 0x1000 as *mut u8;
    roots.add_root(&mut cell as *mut *mut u8);
    roots.remove_root(&mut cell as *mut *mut u8);
    assert_eq!(roots.len(), before);
}

// §8.2: a second collection with no new garbage frees nothing further.
#[test]
fn second_collection_is_a_no_op_on_current_bytes() {
    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        for _ in 0..500 {
            rt.allocate(16);
        }
        rt.collect();
        let before = rt.get_stats().current_bytes;
        rt.collect();
        let after = rt.get_stats().current_bytes;
        assert_eq!(before, after, "backend {} freed more on a second collection", rt.name());
    }
}

// Invariant tag round-trip: whatever tag the mutator installs is what the snapshot reports.
#[test]
fn snapshot_tag_matches_what_the_mutator_installed() {
    use lispheap_gc::{Generation, SnapshotRecord};

    for cfg in every_backend() {
        let mut rt = Runtime::init(cfg);
        let p = rt.allocate(16);
        rt.set_tag(p, ObjectTag::Symbol);
        let mut root_cell = p;
        rt.add_root(&mut root_cell as *mut *mut u8);

        let mut buf = vec![
            SnapshotRecord { addr: 0, size: 0, generation: Generation::Unknown, tag: ObjectTag::Unknown };
            64
        ];
        let n = rt.heap_snapshot(&mut buf);
        let record = buf[..n]
            .iter()
            .find(|r| r.addr == root_cell as usize)
            .expect("rooted object should appear in its own backend's snapshot");
        assert_eq!(record.tag, ObjectTag::Symbol);
    }
}
