//! Generational backend: a copying nursery over a mark-sweep tenured heap, linked by a
//! write barrier and a remembered set of tenured slots that still point into the nursery.
//!
//! The write barrier is a bounds check (is the owner tenured and the child in the active
//! nursery?) followed by a remembered-set insert on the slow path. The remembered set tracks
//! slots (`*mut *mut u8`), not owning objects, since a moving nursery must rewrite the slot
//! itself after evacuation, not just revisit the object that holds it.

use std::alloc::{alloc, dealloc, Layout};
use std::mem::size_of;
use std::ptr::{null_mut, NonNull};
use std::time::Instant;

use crate::backend::GcBackend;
use crate::config::{
    GcConfig, DEFAULT_NURSERY_SIZE, DEFAULT_PROMOTE_AGE, TENURED_THRESHOLD_GROWTH,
    THRESHOLD_GROWTH_CONSTANT,
};
use crate::error::GcError;
use crate::header::{align_up, Generation, ObjectMeta, ObjectTag, SnapshotRecord, TraceFn, Tracer};
use crate::roots::RootSet;
use crate::stats::{GcStats, StatsAccumulator};

/// Shared by both regions: nursery objects use `forward`/`age`, tenured objects use
/// `mark`/`block_size`/`prev`/`next`. Keeping one layout means a promotion copy is a
/// straight byte copy, and the major mark phase can walk either region with the same
/// pointer arithmetic.
#[repr(C)]
struct GenHeader {
    meta: ObjectMeta,
    forward: *mut u8,
    age: u8,
    mark: bool,
    block_size: u32,
    prev: *mut GenHeader,
    next: *mut GenHeader,
}

struct NurserySpace {
    start: *mut u8,
    end: *mut u8,
    bump: *mut u8,
    layout: Layout,
}

impl NurserySpace {
    fn new(size: usize) -> NurserySpace {
        let layout = Layout::from_size_align(size, 8).expect("valid nursery layout");
        let start = unsafe { alloc(layout) };
        assert!(!start.is_null(), "failed to allocate nursery space");
        NurserySpace { start, end: unsafe { start.add(size) }, bump: start, layout }
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

impl Drop for NurserySpace {
    fn drop(&mut self) {
        unsafe { dealloc(self.start, self.layout) };
    }
}

struct FreeHeader {
    size: usize,
    next: *mut FreeHeader,
}

const fn min_tenured_block() -> usize {
    let a = size_of::<FreeHeader>();
    let b = size_of::<GenHeader>();
    if a > b {
        a
    } else {
        b
    }
}

const MIN_TENURED_BLOCK: usize = min_tenured_block();

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Idle,
    Minor,
    Major,
}

pub struct Generational {
    nursery_active: NurserySpace,
    nursery_inactive: NurserySpace,

    tenured_heap: *mut u8,
    tenured_size: usize,
    tenured_layout: Layout,
    tenured_free_head: *mut FreeHeader,
    tenured_object_list: *mut GenHeader,

    roots: RootSet,
    remembered_set: Vec<*mut *mut u8>,

    promote_age: u8,
    state: State,
    force_promote: bool,

    promotion_worklist: Vec<*mut GenHeader>,
    mark_worklist: Vec<*mut GenHeader>,

    tenured_threshold: usize,
    tenured_allocated_since_major: usize,

    // Payload bytes currently resident in the active nursery, tracked separately from
    // `stats.inner.current_bytes` (which spans both generations) so a minor collection can
    // tell how much of what it allocated since the last sweep was never reclaimed as a
    // survivor or a promotion and charge exactly that much to `freed_bytes`.
    nursery_resident_bytes: u64,
    promoted_bytes_this_minor: u64,

    stats: StatsAccumulator,
}

impl Generational {
    fn header_from_payload(payload: *mut u8) -> *mut GenHeader {
        unsafe { payload.sub(size_of::<GenHeader>()) as *mut GenHeader }
    }

    fn payload_from_header(header: *mut u8) -> *mut u8 {
        unsafe { header.add(size_of::<GenHeader>()) }
    }

    fn block_size_for(payload_size: usize) -> usize {
        align_up(size_of::<GenHeader>() + payload_size).max(MIN_TENURED_BLOCK)
    }

    fn tenured_contains(&self, ptr: *mut u8) -> bool {
        if ptr.is_null() {
            return false;
        }
        let header = Self::header_from_payload(ptr) as usize;
        let start = self.tenured_heap as usize;
        header >= start && header < start + self.tenured_size
    }

    /// Whether `ptr` is a live payload address the major mark phase should consider:
    /// the current nursery (not yet collected this cycle) or tenured. The inactive
    /// nursery half is collector-internal scratch space between minor collections and
    /// is never reachable from a root or a tenured field.
    fn managed(&self, ptr: *mut u8) -> bool {
        !ptr.is_null() && (self.nursery_active.contains(ptr) || self.tenured_contains(ptr))
    }

    // ---- tenured free list: first-fit with split, address-ordered with coalescing ----

    fn tenured_alloc_raw(&mut self, needed: usize) -> Option<(*mut GenHeader, usize)> {
        let mut prev: *mut FreeHeader = null_mut();
        let mut cur = self.tenured_free_head;
        while !cur.is_null() {
            let block_size = unsafe { (*cur).size };
            if block_size >= needed {
                let next = unsafe { (*cur).next };
                if block_size >= needed + MIN_TENURED_BLOCK {
                    let remainder = ((cur as usize) + needed) as *mut FreeHeader;
                    unsafe {
                        (*remainder).size = block_size - needed;
                        (*remainder).next = next;
                    }
                    if prev.is_null() {
                        self.tenured_free_head = remainder;
                    } else {
                        unsafe { (*prev).next = remainder };
                    }
                    return Some((cur as *mut GenHeader, needed));
                } else {
                    if prev.is_null() {
                        self.tenured_free_head = next;
                    } else {
                        unsafe { (*prev).next = next };
                    }
                    return Some((cur as *mut GenHeader, block_size));
                }
            }
            prev = cur;
            cur = unsafe { (*cur).next };
        }
        None
    }

    fn tenured_free_block(&mut self, block: *mut u8, block_size: usize) {
        let addr = block as usize;
        let mut prev: *mut FreeHeader = null_mut();
        let mut cur = self.tenured_free_head;
        while !cur.is_null() && (cur as usize) < addr {
            prev = cur;
            cur = unsafe { (*cur).next };
        }
        let node = block as *mut FreeHeader;
        unsafe {
            (*node).size = block_size;
            (*node).next = cur;
        }
        if prev.is_null() {
            self.tenured_free_head = node;
        } else {
            unsafe { (*prev).next = node };
        }
        unsafe {
            if !cur.is_null() && addr + (*node).size == cur as usize {
                (*node).size += (*cur).size;
                (*node).next = (*cur).next;
            }
            if !prev.is_null() && (prev as usize) + (*prev).size == node as usize {
                (*prev).size += (*node).size;
                (*prev).next = (*node).next;
            }
        }
    }

    fn link_into_tenured_list(&mut self, header: *mut GenHeader) {
        unsafe {
            (*header).prev = null_mut();
            (*header).next = self.tenured_object_list;
            if !self.tenured_object_list.is_null() {
                (*self.tenured_object_list).prev = header;
            }
            self.tenured_object_list = header;
        }
    }

    /// Allocate a new tenured object directly (used for allocations too large for an
    /// empty nursery). Not counted as a promotion: it was never in the nursery.
    fn tenure_fresh(&mut self, size: usize) -> Result<*mut u8, GcError> {
        let needed = Self::block_size_for(size);
        let (header, block_size) = match self.tenured_alloc_raw(needed) {
            Some(found) => found,
            None => {
                self.major_mark_sweep_tenured();
                self.tenured_alloc_raw(needed).ok_or(GcError::OutOfMemory {
                    requested: size,
                    backend: Generational::NAME,
                })?
            }
        };
        unsafe {
            (*header).meta = ObjectMeta::new(size as u32);
            (*header).forward = null_mut();
            (*header).age = self.promote_age;
            (*header).mark = false;
            (*header).block_size = block_size as u32;
        }
        self.link_into_tenured_list(header);
        let payload = Generational::payload_from_header(header as *mut u8);
        unsafe { std::ptr::write_bytes(payload, 0, size) };

        self.stats.record_allocation(size as u64);
        self.stats.inner.metadata_bytes += size_of::<GenHeader>() as u64;
        self.tenured_allocated_since_major += block_size;
        Ok(payload)
    }

    /// Copy a surviving nursery object into the tenured free list during a minor
    /// collection's promotion path.
    fn promote(&mut self, nursery_header: *mut GenHeader) -> *mut u8 {
        let payload_size = unsafe { (*nursery_header).meta.payload_size } as usize;
        let needed = Self::block_size_for(payload_size);
        let (dest, block_size) = match self.tenured_alloc_raw(needed) {
            Some(found) => found,
            None => {
                // The tenured heap is exhausted mid-minor-collection; this is unrecoverable
                // without relocating live data a second time, so treat it the same as any
                // other fatal allocation failure.
                #[cfg(feature = "gc_logging")]
                tracing::error!("tenured heap exhausted while promoting a nursery survivor");
                std::process::abort();
            }
        };
        unsafe {
            std::ptr::copy_nonoverlapping(
                nursery_header as *const u8,
                dest as *mut u8,
                size_of::<GenHeader>() + payload_size,
            );
            (*dest).block_size = block_size as u32;
            (*dest).mark = false;
            (*dest).forward = null_mut();
        }
        self.link_into_tenured_list(dest);
        self.tenured_allocated_since_major += block_size;
        self.stats.inner.metadata_bytes += size_of::<GenHeader>() as u64;
        self.stats.record_promoted(1);
        self.promoted_bytes_this_minor += payload_size as u64;
        self.promotion_worklist.push(dest);
        Generational::payload_from_header(dest as *mut u8)
    }

    // ---- minor collection: Cheney-evacuate the nursery, deep-promoting old survivors ----

    fn evacuate(&mut self, ptr: *mut u8, force_promote: bool) -> *mut u8 {
        if ptr.is_null() || !self.nursery_active.contains(ptr) {
            return ptr;
        }
        let header = Self::header_from_payload(ptr);
        unsafe {
            if !(*header).forward.is_null() {
                return (*header).forward;
            }
            let age = (*header).age;
            let promote_now = force_promote || age as u32 + 1 >= self.promote_age as u32;
            let new_payload = if promote_now {
                self.promote(header)
            } else {
                let payload_size = (*header).meta.payload_size as usize;
                let block_size = align_up(size_of::<GenHeader>() + payload_size);
                let dest = self.nursery_inactive.bump;
                std::ptr::copy_nonoverlapping(header as *const u8, dest, block_size);
                self.nursery_inactive.bump = self.nursery_inactive.bump.add(block_size);
                let dest_header = dest as *mut GenHeader;
                (*dest_header).age = age + 1;
                (*dest_header).forward = null_mut();
                Generational::payload_from_header(dest)
            };
            (*header).forward = new_payload;
            self.stats.record_copied(1);
            new_payload
        }
    }

    fn scan_nursery_survivors(&mut self) -> u64 {
        self.force_promote = false;
        let mut survivor_payload_bytes = 0u64;
        let mut scan = self.nursery_inactive.start;
        while (scan as usize) < (self.nursery_inactive.bump as usize) {
            let header = scan as *mut GenHeader;
            let payload_size = unsafe { (*header).meta.payload_size } as usize;
            let block_size = align_up(size_of::<GenHeader>() + payload_size);
            let trace = unsafe { (*header).meta.trace };
            if let Some(trace) = trace {
                let payload = Generational::payload_from_header(scan);
                let payload = unsafe { NonNull::new_unchecked(payload) };
                trace(payload, self);
            }
            self.stats.record_scanned(1);
            survivor_payload_bytes += payload_size as u64;
            scan = unsafe { scan.add(block_size) };
        }
        survivor_payload_bytes
    }

    fn drain_promotion_worklist(&mut self) {
        self.force_promote = true;
        while let Some(header) = self.promotion_worklist.pop() {
            let trace = unsafe { (*header).meta.trace };
            if let Some(trace) = trace {
                let payload = Generational::payload_from_header(header as *mut u8);
                let payload = unsafe { NonNull::new_unchecked(payload) };
                trace(payload, self);
            }
        }
    }

    fn minor_collection(&mut self, check_major_trigger: bool) {
        if self.state != State::Idle {
            return;
        }
        self.state = State::Minor;
        let start = Instant::now();

        #[cfg(feature = "gc_logging")]
        tracing::debug!("minor collection starting");

        self.nursery_inactive.reset();
        let nursery_resident_before = self.nursery_resident_bytes;
        self.promoted_bytes_this_minor = 0;

        self.force_promote = false;
        let roots: Vec<*mut *mut u8> = self.roots.iter().collect();
        for slot in &roots {
            unsafe {
                let val = **slot;
                if !val.is_null() {
                    let new_val = self.evacuate(val, false);
                    **slot = new_val;
                }
            }
        }

        let remembered: Vec<*mut *mut u8> = self.remembered_set.clone();
        for slot in &remembered {
            unsafe {
                let val = **slot;
                if !val.is_null() && self.nursery_active.contains(val) {
                    let new_val = self.evacuate(val, false);
                    **slot = new_val;
                }
            }
        }

        let survivor_payload_bytes = self.scan_nursery_survivors();
        self.drain_promotion_worklist();

        self.stats.update_survival_rate();

        // Bytes allocated into the outgoing nursery that are neither a surviving nursery
        // object nor a promoted one were never traced from a root or the remembered set:
        // true garbage. Charge it to `freed_bytes` here, since nothing else in this backend
        // ever will.
        self.nursery_resident_bytes = survivor_payload_bytes;
        let reclaimed = nursery_resident_before
            .saturating_sub(survivor_payload_bytes)
            .saturating_sub(self.promoted_bytes_this_minor);
        self.stats.record_free(reclaimed);

        self.nursery_active.reset();
        std::mem::swap(&mut self.nursery_active, &mut self.nursery_inactive);

        // Drop remembered-set entries that no longer point into the (now current) nursery:
        // promoted children were deep-promoted alongside their parent, so only entries whose
        // child genuinely survived as a nursery object remain relevant.
        let active = &self.nursery_active;
        self.remembered_set.retain(|&slot| {
            let v = unsafe { *slot };
            !v.is_null() && active.contains(v)
        });

        self.stats.record_pause(start.elapsed());
        self.state = State::Idle;

        #[cfg(feature = "gc_logging")]
        tracing::debug!("minor collection finished");

        if check_major_trigger && self.tenured_allocated_since_major > self.tenured_threshold {
            self.major_mark_sweep_tenured();
        }
    }

    // ---- major collection: mark-sweep over tenured, tracing through live nursery too ----

    fn mark_during_major(&mut self, ptr: *mut u8) -> *mut u8 {
        if !self.managed(ptr) {
            return ptr;
        }
        let header = Self::header_from_payload(ptr);
        unsafe {
            if !(*header).mark {
                (*header).mark = true;
                self.stats.record_scanned(1);
                self.mark_worklist.push(header);
            }
        }
        ptr
    }

    fn clear_nursery_marks(&mut self) {
        let mut scan = self.nursery_active.start;
        while (scan as usize) < (self.nursery_active.bump as usize) {
            let header = scan as *mut GenHeader;
            let payload_size = unsafe { (*header).meta.payload_size } as usize;
            unsafe { (*header).mark = false };
            scan = unsafe { scan.add(align_up(size_of::<GenHeader>() + payload_size)) };
        }
    }

    fn sweep_tenured(&mut self) {
        let mut cur = self.tenured_object_list;
        let mut new_head: *mut GenHeader = null_mut();
        while !cur.is_null() {
            let next = unsafe { (*cur).next };
            let header = unsafe { &mut *cur };
            if header.mark {
                header.mark = false;
                header.prev = null_mut();
                header.next = new_head;
                if !new_head.is_null() {
                    unsafe { (*new_head).prev = cur };
                }
                new_head = cur;
            } else {
                let payload_size = header.meta.payload_size as u64;
                let block_size = header.block_size as usize;
                self.stats.record_free(payload_size);
                self.stats.inner.metadata_bytes =
                    self.stats.inner.metadata_bytes.saturating_sub(size_of::<GenHeader>() as u64);
                self.tenured_free_block(cur as *mut u8, block_size);
            }
            cur = next;
        }
        self.tenured_object_list = new_head;
    }

    fn tenured_free_block_sizes(&self) -> Vec<u64> {
        let mut sizes = Vec::new();
        let mut cur = self.tenured_free_head;
        while !cur.is_null() {
            sizes.push(unsafe { (*cur).size } as u64);
            cur = unsafe { (*cur).next };
        }
        sizes
    }

    fn tenured_object_count(&self) -> u64 {
        let mut n = 0u64;
        let mut cur = self.tenured_object_list;
        while !cur.is_null() {
            n += 1;
            cur = unsafe { (*cur).next };
        }
        n
    }

    fn major_mark_sweep_tenured(&mut self) {
        if self.state != State::Idle {
            return;
        }
        self.state = State::Major;
        let start = Instant::now();

        #[cfg(feature = "gc_logging")]
        tracing::debug!("major collection starting");

        let roots: Vec<*mut *mut u8> = self.roots.iter().collect();
        for slot in roots {
            unsafe {
                let val = *slot;
                if !val.is_null() {
                    let new_val = self.mark_during_major(val);
                    *slot = new_val;
                }
            }
        }

        while let Some(header) = self.mark_worklist.pop() {
            let trace = unsafe { (*header).meta.trace };
            if let Some(trace) = trace {
                let payload = Generational::payload_from_header(header as *mut u8);
                let payload = unsafe { NonNull::new_unchecked(payload) };
                trace(payload, self);
            }
        }

        self.sweep_tenured();
        self.clear_nursery_marks();

        let sizes = self.tenured_free_block_sizes();
        let current_bytes = self.stats.inner.current_bytes;
        let live_objects = self.tenured_object_count();
        self.stats.recompute_fragmentation(&sizes, current_bytes, live_objects);

        self.tenured_allocated_since_major = 0;
        let grown = (self.tenured_threshold as f64 * TENURED_THRESHOLD_GROWTH) as usize
            + THRESHOLD_GROWTH_CONSTANT;
        self.tenured_threshold = grown.min(self.tenured_size);

        self.stats.record_pause(start.elapsed());
        self.state = State::Idle;

        #[cfg(feature = "gc_logging")]
        tracing::debug!("major collection finished");
    }
}

impl Tracer for Generational {
    fn mark_pointer(&mut self, ptr: *mut u8) -> *mut u8 {
        match self.state {
            State::Minor => {
                let force = self.force_promote;
                self.evacuate(ptr, force)
            }
            State::Major => self.mark_during_major(ptr),
            State::Idle => ptr,
        }
    }
}

impl GcBackend for Generational {
    const NAME: &'static str = "generational";

    fn init(config: &GcConfig) -> Generational {
        let nursery_size = align_up(DEFAULT_NURSERY_SIZE);
        let tenured_size = align_up(config.initial_heap_size.max(MIN_TENURED_BLOCK));
        let tenured_layout = Layout::from_size_align(tenured_size, 8).expect("valid tenured layout");
        let tenured_heap = unsafe { alloc(tenured_layout) };
        assert!(!tenured_heap.is_null(), "failed to allocate tenured heap");

        let tenured_free_head = tenured_heap as *mut FreeHeader;
        unsafe {
            (*tenured_free_head).size = tenured_size;
            (*tenured_free_head).next = null_mut();
        }

        #[cfg(feature = "gc_logging")]
        tracing::debug!(nursery_size, tenured_size, "generational backend initialized");

        Generational {
            nursery_active: NurserySpace::new(nursery_size),
            nursery_inactive: NurserySpace::new(nursery_size),
            tenured_heap,
            tenured_size,
            tenured_layout,
            tenured_free_head,
            tenured_object_list: null_mut(),
            roots: RootSet::new(),
            remembered_set: Vec::new(),
            promote_age: DEFAULT_PROMOTE_AGE,
            state: State::Idle,
            force_promote: false,
            promotion_worklist: Vec::new(),
            mark_worklist: Vec::new(),
            tenured_threshold: tenured_size / 2,
            tenured_allocated_since_major: 0,
            nursery_resident_bytes: 0,
            promoted_bytes_this_minor: 0,
            stats: StatsAccumulator::new(),
        }
    }

    fn allocate(&mut self, size: usize) -> Result<*mut u8, GcError> {
        let needed = align_up(size_of::<GenHeader>() + size);

        if needed > self.nursery_active.capacity() {
            return self.tenure_fresh(size);
        }

        if self.nursery_active.used() + needed > self.nursery_active.capacity() {
            self.minor_collection(true);
            if self.nursery_active.used() + needed > self.nursery_active.capacity() {
                return self.tenure_fresh(size);
            }
        }

        let header = self.nursery_active.bump as *mut GenHeader;
        unsafe {
            self.nursery_active.bump = self.nursery_active.bump.add(needed);
            (*header).meta = ObjectMeta::new(size as u32);
            (*header).forward = null_mut();
            (*header).age = 0;
            (*header).mark = false;
            (*header).block_size = needed as u32;
        }
        let payload = Generational::payload_from_header(header as *mut u8);
        unsafe { std::ptr::write_bytes(payload, 0, size) };

        self.stats.record_allocation(size as u64);
        self.nursery_resident_bytes += size as u64;
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

    fn write_barrier(&mut self, owner: *mut u8, slot: *mut *mut u8, child: *mut u8) {
        if self.tenured_contains(owner) && self.nursery_active.contains(child) {
            if !self.remembered_set.iter().any(|&s| s == slot) {
                self.remembered_set.push(slot);
            }
        }
    }

    fn collect(&mut self) {
        self.minor_collection(false);
        self.major_mark_sweep_tenured();
    }

    fn free(&mut self, payload: *mut u8) {
        if payload.is_null() || !self.tenured_contains(payload) {
            return;
        }
        let header = Self::header_from_payload(payload);
        unsafe {
            let prev = (*header).prev;
            let next = (*header).next;
            if prev.is_null() {
                self.tenured_object_list = next;
            } else {
                (*prev).next = next;
            }
            if !next.is_null() {
                (*next).prev = prev;
            }
            let payload_size = (*header).meta.payload_size as u64;
            let block_size = (*header).block_size as usize;
            self.stats.record_free(payload_size);
            self.stats.inner.metadata_bytes =
                self.stats.inner.metadata_bytes.saturating_sub(size_of::<GenHeader>() as u64);
            self.tenured_free_block(header as *mut u8, block_size);
        }
    }

    fn set_threshold(&mut self, bytes: usize) {
        self.tenured_threshold = bytes;
    }

    fn get_threshold(&self) -> usize {
        self.tenured_threshold
    }

    fn get_stats(&self) -> GcStats {
        let mut stats = self.stats.clone();
        let sizes = self.tenured_free_block_sizes();
        let current_bytes = stats.inner.current_bytes;
        let live_objects = self.tenured_object_count();
        stats.recompute_fragmentation(&sizes, current_bytes, live_objects);
        stats.snapshot()
    }

    fn heap_snapshot(&self, buf: &mut [SnapshotRecord]) -> usize {
        let mut n = 0;

        let mut scan = self.nursery_active.start;
        while (scan as usize) < (self.nursery_active.bump as usize) && n < buf.len() {
            let header = scan as *mut GenHeader;
            let meta = unsafe { (*header).meta };
            buf[n] = SnapshotRecord {
                addr: Generational::payload_from_header(scan) as usize,
                size: meta.payload_size,
                generation: Generation::Nursery,
                tag: meta.tag,
            };
            n += 1;
            scan = unsafe { scan.add(align_up(size_of::<GenHeader>() + meta.payload_size as usize)) };
        }

        let mut cur = self.tenured_object_list;
        while !cur.is_null() && n < buf.len() {
            let header = unsafe { &*cur };
            buf[n] = SnapshotRecord {
                addr: Generational::payload_from_header(cur as *mut u8) as usize,
                size: header.meta.payload_size,
                generation: Generation::Old,
                tag: header.meta.tag,
            };
            n += 1;
            cur = header.next;
        }

        n
    }
}

impl Drop for Generational {
    fn drop(&mut self) {
        unsafe { dealloc(self.tenured_heap, self.tenured_layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(tenured: usize) -> GcConfig {
        GcConfig::new(crate::config::BackendKind::Generational, tenured)
    }

    #[test]
    fn small_allocation_starts_in_nursery() {
        let mut gc = Generational::init(&cfg(1024 * 1024));
        let p = gc.allocate(16).unwrap();
        assert!(gc.nursery_active.contains(p));
    }

    #[test]
    fn unrooted_nursery_garbage_is_reclaimed_on_minor_collection() {
        let mut gc = Generational::init(&cfg(1024 * 1024));
        for _ in 0..2000 {
            gc.allocate(32).unwrap();
        }
        gc.minor_collection(false);
        let mut live = 0;
        let mut cap = vec![SnapshotRecord { addr: 0, size: 0, generation: Generation::Unknown, tag: ObjectTag::Unknown }; 4096];
        live += gc.heap_snapshot(&mut cap);
        assert!(live < 10);
    }

    #[test]
    fn survivor_is_promoted_after_enough_minor_collections() {
        let mut gc = Generational::init(&cfg(1024 * 1024));
        let a = gc.allocate(16).unwrap();
        let mut root_cell = a;
        gc.add_root(&mut root_cell as *mut *mut u8);

        for _ in 0..(DEFAULT_PROMOTE_AGE as usize + 1) {
            for _ in 0..200 {
                gc.allocate(32).unwrap();
            }
            gc.minor_collection(false);
        }

        assert!(gc.tenured_contains(root_cell), "survivor should have been promoted by now");
    }

    fn trace_cons(payload: NonNull<u8>, vis: &mut dyn Tracer) {
        unsafe {
            let slot = payload.as_ptr() as *mut *mut u8;
            let child = *slot;
            *slot = vis.mark_pointer(child);
        }
    }

    #[test]
    fn write_barrier_records_tenured_to_nursery_edge() {
        let mut gc = Generational::init(&cfg(1024 * 1024));
        let tenured_owner = gc.tenure_fresh(16).unwrap();
        gc.set_trace(tenured_owner, trace_cons as TraceFn);

        let nursery_child = gc.allocate(8).unwrap();
        let slot = tenured_owner as *mut *mut u8;
        unsafe { *slot = nursery_child };
        gc.write_barrier(tenured_owner, slot, nursery_child);

        assert_eq!(gc.remembered_set.len(), 1);

        gc.minor_collection(false);
        let survived = unsafe { *slot };
        assert!(!survived.is_null());
        assert!(gc.nursery_active.contains(survived) || gc.tenured_contains(survived));
    }

    #[test]
    fn full_collection_runs_minor_and_major() {
        let mut gc = Generational::init(&cfg(256 * 1024));
        for _ in 0..500 {
            gc.allocate(32).unwrap();
        }
        gc.collect();
        let stats = gc.get_stats();
        assert!(stats.collections >= 2);
    }
}
