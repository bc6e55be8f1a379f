//! Cumulative statistics exported by every backend (spec §3.5 / §6.3).
//!
//! Grounded on comet's `statistics.rs` (`HeapStatistics` + a `Display` impl that formats
//! byte counts as `B`/`K`/`M`/`G`); field names here instead follow spec §6.3 verbatim since
//! this is the part of the contract external consumers (benchmarks, the visualizer) decode.

use std::fmt;
use std::time::Duration;

/// Snapshot of a backend's cumulative counters. All byte/count fields are monotonically
/// non-decreasing across the lifetime of an initialized backend (spec §8.1 property 4),
/// except `current_bytes`, which can fall after a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GcStats {
    pub collections: u64,
    pub allocated_bytes: u64,
    pub freed_bytes: u64,
    pub current_bytes: u64,
    pub objects_scanned: u64,
    pub objects_copied: u64,
    pub objects_promoted: u64,
    pub survival_rate: f64,
    pub metadata_bytes: u64,
    pub wasted_bytes: u64,
    pub last_gc_pause_ms: f64,
    pub avg_gc_pause_ms: f64,
    pub max_gc_pause_ms: f64,
    pub total_gc_time_ms: f64,

    // Free-list backends only (mark-sweep, generational tenured); zero elsewhere.
    pub largest_free_block: u64,
    pub total_free_memory: u64,
    pub free_blocks_count: u64,
    pub average_free_block_size: f64,
    pub fragmentation_index: f64,
    pub peak_fragmentation_index: f64,
    pub internal_fragmentation_ratio: f64,
    pub average_padding_per_object: f64,
    pub fragmentation_growth_rate: f64,
}

/// Mutable accumulator a backend updates in place; `snapshot()` hands a `GcStats` copy to
/// callers of `get-stats`.
#[derive(Clone, Debug, Default)]
pub struct StatsAccumulator {
    pub inner: GcStats,
    pause_history_count: u64,
    pause_history_sum_ms: f64,
    prior_fragmentation_index: f64,
}

impl StatsAccumulator {
    pub fn new() -> StatsAccumulator {
        StatsAccumulator::default()
    }

    pub fn record_allocation(&mut self, bytes: u64) {
        self.inner.allocated_bytes += bytes;
        self.inner.current_bytes += bytes;
    }

    pub fn record_free(&mut self, bytes: u64) {
        self.inner.freed_bytes += bytes;
        self.inner.current_bytes = self.inner.current_bytes.saturating_sub(bytes);
    }

    /// Record one completed collection's pause duration, maintaining last/avg/max/total.
    pub fn record_pause(&mut self, pause: Duration) {
        let ms = pause.as_secs_f64() * 1000.0;
        self.inner.collections += 1;
        self.inner.last_gc_pause_ms = ms;
        self.inner.max_gc_pause_ms = self.inner.max_gc_pause_ms.max(ms);
        self.inner.total_gc_time_ms += ms;
        self.pause_history_count += 1;
        self.pause_history_sum_ms += ms;
        self.inner.avg_gc_pause_ms = self.pause_history_sum_ms / self.pause_history_count as f64;
    }

    pub fn record_scanned(&mut self, n: u64) {
        self.inner.objects_scanned += n;
    }

    pub fn record_copied(&mut self, n: u64) {
        self.inner.objects_copied += n;
    }

    pub fn record_promoted(&mut self, n: u64) {
        self.inner.objects_promoted += n;
    }

    pub fn update_survival_rate(&mut self) {
        self.inner.survival_rate = if self.inner.objects_scanned == 0 {
            0.0
        } else {
            self.inner.objects_copied as f64 / self.inner.objects_scanned as f64
        };
    }

    /// Recompute every free-list fragmentation metric from the free list's current shape.
    /// `block_sizes` is every free block's size in address order; `allocated_bytes` is the
    /// heap's currently allocated (non-free) payload+header total; `live_objects` is the
    /// number of currently allocated objects, used to average `wasted_bytes` per object.
    pub fn recompute_fragmentation(&mut self, block_sizes: &[u64], allocated_bytes: u64, live_objects: u64) {
        let total_free: u64 = block_sizes.iter().sum();
        let largest = block_sizes.iter().copied().max().unwrap_or(0);
        let count = block_sizes.len() as u64;

        self.inner.total_free_memory = total_free;
        self.inner.largest_free_block = largest;
        self.inner.free_blocks_count = count;
        self.inner.average_free_block_size = if count == 0 {
            0.0
        } else {
            total_free as f64 / count as f64
        };
        self.inner.fragmentation_index = if total_free == 0 {
            0.0
        } else {
            1.0 - (largest as f64 / total_free as f64)
        };
        self.inner.internal_fragmentation_ratio = if allocated_bytes == 0 {
            0.0
        } else {
            self.inner.wasted_bytes as f64 / allocated_bytes as f64
        };
        self.inner.average_padding_per_object = if live_objects == 0 {
            0.0
        } else {
            self.inner.wasted_bytes as f64 / live_objects as f64
        };
        self.inner.peak_fragmentation_index =
            self.inner.peak_fragmentation_index.max(self.inner.fragmentation_index);
        self.inner.fragmentation_growth_rate =
            self.inner.fragmentation_index - self.prior_fragmentation_index;
        self.prior_fragmentation_index = self.inner.fragmentation_index;
    }

    pub fn snapshot(&self) -> GcStats {
        self.inner
    }
}

struct FormattedSize(u64);

impl fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = self.0 as f64 / 1024.0;
        if k < 1.0 {
            return write!(f, "{}B", self.0);
        }
        let m = k / 1024.0;
        if m < 1.0 {
            return write!(f, "{:.1}K", k);
        }
        let g = m / 1024.0;
        if g < 1.0 {
            write!(f, "{:.1}M", m)
        } else {
            write!(f, "{:.1}G", g)
        }
    }
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GC statistics:")?;
        writeln!(f, "  collections: {}", self.collections)?;
        writeln!(
            f,
            "  live: {} (allocated {}, freed {})",
            FormattedSize(self.current_bytes),
            FormattedSize(self.allocated_bytes),
            FormattedSize(self.freed_bytes)
        )?;
        writeln!(
            f,
            "  scanned {} / copied {} / promoted {} (survival {:.1}%)",
            self.objects_scanned,
            self.objects_copied,
            self.objects_promoted,
            self.survival_rate * 100.0
        )?;
        writeln!(
            f,
            "  pause last {:.3}ms avg {:.3}ms max {:.3}ms total {:.3}ms",
            self.last_gc_pause_ms, self.avg_gc_pause_ms, self.max_gc_pause_ms, self.total_gc_time_ms
        )?;
        if self.total_free_memory > 0 || self.free_blocks_count > 0 {
            writeln!(
                f,
                "  free: {} across {} blocks (largest {}, fragmentation {:.3})",
                FormattedSize(self.total_free_memory),
                self.free_blocks_count,
                FormattedSize(self.largest_free_block),
                self.fragmentation_index
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragmentation_index_is_zero_when_contiguous() {
        let mut acc = StatsAccumulator::new();
        acc.recompute_fragmentation(&[4096], 0, 0);
        assert_eq!(acc.inner.fragmentation_index, 0.0);
    }

    #[test]
    fn fragmentation_index_in_unit_range() {
        let mut acc = StatsAccumulator::new();
        acc.recompute_fragmentation(&[32, 64, 16, 128], 1000, 10);
        assert!(acc.inner.fragmentation_index >= 0.0 && acc.inner.fragmentation_index <= 1.0);
    }

    #[test]
    fn peak_fragmentation_never_decreases() {
        let mut acc = StatsAccumulator::new();
        acc.recompute_fragmentation(&[32, 64, 16, 128], 1000, 10);
        let peak_after_first = acc.inner.peak_fragmentation_index;
        acc.recompute_fragmentation(&[1000], 1000, 10);
        assert!(acc.inner.peak_fragmentation_index >= peak_after_first);
    }

    #[test]
    fn average_padding_per_object_divides_wasted_bytes_by_live_count() {
        let mut acc = StatsAccumulator::new();
        acc.inner.wasted_bytes = 80;
        acc.recompute_fragmentation(&[32], 1000, 10);
        assert_eq!(acc.inner.average_padding_per_object, 8.0);

        acc.recompute_fragmentation(&[32], 1000, 0);
        assert_eq!(acc.inner.average_padding_per_object, 0.0);
    }
}
