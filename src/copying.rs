//! Semi-space copying backend: two equal-sized regions, a bump allocator in whichever region
//! is active, and a Cheney scan that evacuates everything reachable from the roots into the
//! other region on every collection.

use std::alloc::{alloc, dealloc, Layout};
use std::mem::size_of;
use std::ptr::{null_mut, NonNull};
use std::time::Instant;

use crate::backend::GcBackend;
use crate::config::GcConfig;
use crate::error::GcError;
use crate::header::{align_up, Generation, ObjectMeta, ObjectTag, SnapshotRecord, TraceFn, Tracer};
use crate::roots::RootSet;
use crate::stats::{GcStats, StatsAccumulator};

#[repr(C)]
struct CpHeader {
    meta: ObjectMeta,
    /// Null until this object has been evacuated during the collection currently in
    /// progress; then the new payload address in to-space.
    forward: *mut u8,
}

struct Space {
    start: *mut u8,
    end: *mut u8,
    bump: *mut u8,
    layout: Layout,
}

impl Space {
    fn new(size: usize) -> Space {
        let layout = Layout::from_size_align(size, 8).expect("valid semispace layout");
        let start = unsafe { alloc(layout) };
        assert!(!start.is_null(), "failed to allocate semispace");
        Space { start, end: unsafe { start.add(size) }, bump: start, layout }
    }

    fn reset(&mut self) {
        self.bump = self.start;
    }

    fn contains(&self, ptr: *mut u8) -> bool {
        let a = ptr as usize;
        a >= self.start as usize && a < self.end as usize
    }

    fn used(&self) -> usize {
        self.bump as usize - self.start as usize
    }

    fn capacity(&self) -> usize {
        self.end as usize - self.start as usize
    }
}

impl Drop for Space {
    fn drop(&mut self) {
        unsafe { dealloc(self.start, self.layout) };
    }
}

pub struct Copying {
    active: Space,
    inactive: Space,
    roots: RootSet,
    collecting: bool,
    threshold: usize,
    stats: StatsAccumulator,
}

impl Copying {
    fn header_from_payload(payload: *mut u8) -> *mut CpHeader {
        unsafe { payload.sub(size_of::<CpHeader>()) as *mut CpHeader }
    }

    fn payload_from_header(header: *mut u8) -> *mut u8 {
        unsafe { header.add(size_of::<CpHeader>()) }
    }

    fn block_size_of(header: *mut CpHeader) -> usize {
        let payload_size = unsafe { (*header).meta.payload_size } as usize;
        align_up(size_of::<CpHeader>() + payload_size)
    }

    /// Evacuate `ptr` into the inactive (to-space) region if it hasn't been already.
    fn evacuate(&mut self, ptr: *mut u8) -> *mut u8 {
        if ptr.is_null() || !self.collecting || !self.active.contains(ptr) {
            return ptr;
        }
        let header = Self::header_from_payload(ptr);
        unsafe {
            if !(*header).forward.is_null() {
                return (*header).forward;
            }
            let block_size = Self::block_size_of(header);
            let dest = self.inactive.bump;
            std::ptr::copy_nonoverlapping(header as *const u8, dest, block_size);
            self.inactive.bump = self.inactive.bump.add(block_size);
            let new_payload = Self::payload_from_header(dest);
            (*(dest as *mut CpHeader)).forward = null_mut();
            (*header).forward = new_payload;
            self.stats.record_copied(1);
            new_payload
        }
    }

    /// Scans every object copied into to-space so far, tracing its children (which may
    /// extend the to-space bump pointer with further copies), and returns the total live
    /// payload bytes found: the header overhead those objects carry is tracked separately
    /// via `wasted_bytes`/`metadata_bytes`, not folded into `current_bytes`.
    fn scan_to_space(&mut self) -> u64 {
        let mut live_payload_bytes = 0u64;
        let mut scan = self.inactive.start;
        while (scan as usize) < (self.inactive.bump as usize) {
            let header = scan as *mut CpHeader;
            let block_size = Self::block_size_of(header);
            let trace = unsafe { (*header).meta.trace };
            let payload_size = unsafe { (*header).meta.payload_size } as usize;
            if let Some(trace) = trace {
                let payload = Self::payload_from_header(scan);
                let payload = unsafe { NonNull::new_unchecked(payload) };
                trace(payload, self);
            }
            self.stats.record_scanned(1);
            let padding = block_size - size_of::<CpHeader>() - payload_size;
            self.stats.inner.wasted_bytes += padding as u64;
            self.stats.inner.metadata_bytes += size_of::<CpHeader>() as u64;
            live_payload_bytes += payload_size as u64;
            scan = unsafe { scan.add(block_size) };
        }
        live_payload_bytes
    }

    fn in_heap(&self, ptr: *mut u8) -> bool {
        if ptr.is_null() {
            return false;
        }
        self.active.contains(ptr) || self.inactive.contains(ptr)
    }
}

impl Tracer for Copying {
    fn mark_pointer(&mut self, ptr: *mut u8) -> *mut u8 {
        self.evacuate(ptr)
    }
}

impl GcBackend for Copying {
    const NAME: &'static str = "copying";

    fn init(config: &GcConfig) -> Copying {
        let space_size = align_up(config.initial_heap_size.max(size_of::<CpHeader>() * 4));

        #[cfg(feature = "gc_logging")]
        tracing::debug!(space_size, "copying backend initialized");

        Copying {
            active: Space::new(space_size),
            inactive: Space::new(space_size),
            roots: RootSet::new(),
            collecting: false,
            threshold: space_size,
            stats: StatsAccumulator::new(),
        }
    }

    fn allocate(&mut self, size: usize) -> Result<*mut u8, GcError> {
        let needed = align_up(size_of::<CpHeader>() + size);

        if self.active.used() + needed > self.active.capacity() {
            self.collect();
            if self.active.used() + needed > self.active.capacity() {
                return Err(GcError::OutOfMemory { requested: size, backend: Self::NAME });
            }
        }

        let header = self.active.bump as *mut CpHeader;
        unsafe {
            self.active.bump = self.active.bump.add(needed);
            (*header).meta = ObjectMeta::new(size as u32);
            (*header).forward = null_mut();
        }
        let payload = Self::payload_from_header(header as *mut u8);
        unsafe { std::ptr::write_bytes(payload, 0, size) };

        self.stats.record_allocation(size as u64);
        Ok(payload)
    }

    fn set_trace(&mut self, payload: *mut u8, trace: TraceFn) {
        if payload.is_null() {
            return;
        }
        let header = Self::header_from_payload(payload);
        unsafe { (*header).meta.trace = Some(trace) };
    }

    fn set_tag(&mut self, payload: *mut u8, tag: ObjectTag) {
        if payload.is_null() {
            return;
        }
        let header = Self::header_from_payload(payload);
        unsafe { (*header).meta.tag = tag };
    }

    fn add_root(&mut self, slot: *mut *mut u8) {
        self.roots.add_root(slot);
    }

    fn remove_root(&mut self, slot: *mut *mut u8) {
        self.roots.remove_root(slot);
    }

    fn write_barrier(&mut self, _owner: *mut u8, _slot: *mut *mut u8, _child: *mut u8) {
        // No-op: every collection is a full collection, so no remembered set is kept
        // between cycles.
    }

    fn collect(&mut self) {
        if self.collecting {
            return;
        }
        self.collecting = true;
        let start = Instant::now();
        // `current_bytes` is kept as live payload bytes only (consistent with the other
        // backends), so the payload total before this collection is whatever it already
        // was after the last `record_allocation`/`record_free` call.
        let payload_before = self.stats.inner.current_bytes;

        #[cfg(feature = "gc_logging")]
        tracing::debug!("copying collection starting");

        self.inactive.reset();
        self.stats.inner.wasted_bytes = 0;
        self.stats.inner.metadata_bytes = 0;

        let roots: Vec<*mut *mut u8> = self.roots.iter().collect();
        for slot in roots {
            unsafe {
                let val = *slot;
                if !val.is_null() {
                    let new_val = self.evacuate(val);
                    *slot = new_val;
                }
            }
        }

        let live_payload_bytes = self.scan_to_space();
        self.stats.inner.current_bytes = live_payload_bytes;
        self.stats.inner.freed_bytes += payload_before.saturating_sub(live_payload_bytes);
        self.stats.update_survival_rate();

        self.active.reset();
        std::mem::swap(&mut self.active, &mut self.inactive);

        self.stats.record_pause(start.elapsed());
        self.collecting = false;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(live_payload_bytes, "copying collection finished");
    }

    fn free(&mut self, _payload: *mut u8) {
        // No-op between collections: a single object cannot be reclaimed without
        // invalidating every forwarding pointer a concurrent scan might still rely on.
    }

    fn set_threshold(&mut self, bytes: usize) {
        self.threshold = bytes;
    }

    fn get_threshold(&self) -> usize {
        self.threshold
    }

    fn get_stats(&self) -> GcStats {
        self.stats.snapshot()
    }

    fn heap_snapshot(&self, buf: &mut [SnapshotRecord]) -> usize {
        let mut n = 0;
        let mut scan = self.active.start;
        while (scan as usize) < (self.active.bump as usize) && n < buf.len() {
            let header = scan as *mut CpHeader;
            let meta = unsafe { (*header).meta };
            buf[n] = SnapshotRecord {
                addr: Self::payload_from_header(scan) as usize,
                size: meta.payload_size,
                generation: Generation::Unknown,
                tag: meta.tag,
            };
            n += 1;
            scan = unsafe { scan.add(Self::block_size_of(header)) };
        }
        n
    }
}
