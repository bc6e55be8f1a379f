//! The runtime façade: selects one of the three backends at `init` and forwards every
//! mutator-facing operation to it, so the rest of a host program never matches on which
//! backend is live.
//!
//! A single entry point dispatches on [`GcConfig::backend`] rather than exposing one
//! constructor per backend. The façade is an enum over the three backend structs rather than
//! `Box<dyn GcBackend>`: `GcBackend::init` returns `Self`, not a trait object, and a backend
//! never needs to change identity after `init`.

use crate::backend::GcBackend;
use crate::config::GcConfig;
use crate::copying::Copying;
use crate::error::GcError;
use crate::generational::Generational;
use crate::header::{Generation, ObjectTag, SnapshotRecord, TraceFn, Tracer};
use crate::mark_sweep::MarkSweep;
use crate::stats::GcStats;

enum Backend {
    MarkSweep(MarkSweep),
    Copying(Copying),
    Generational(Generational),
}

/// Owns exactly one backend for the lifetime of the process. Fatal errors (spec §4.5,
/// §7's fatal-kind table) abort rather than propagate: a GC that cannot satisfy an
/// allocation or grow its root set has no well-defined way to keep running.
pub struct Runtime {
    backend: Backend,
    config: GcConfig,
}

impl Runtime {
    pub fn init(config: GcConfig) -> Runtime {
        let backend = match config.backend {
            crate::config::BackendKind::MarkSweep => Backend::MarkSweep(MarkSweep::init(&config)),
            crate::config::BackendKind::Copying => Backend::Copying(Copying::init(&config)),
            crate::config::BackendKind::Generational => {
                Backend::Generational(Generational::init(&config))
            }
        };
        Runtime { backend, config }
    }

    pub fn name(&self) -> &'static str {
        match &self.backend {
            Backend::MarkSweep(_) => MarkSweep::NAME,
            Backend::Copying(_) => Copying::NAME,
            Backend::Generational(_) => Generational::NAME,
        }
    }

    fn fatal(&self, err: GcError) -> ! {
        #[cfg(feature = "gc_logging")]
        tracing::error!(backend = self.name(), error = %err, "fatal gc error, aborting");
        #[cfg(not(feature = "gc_logging"))]
        let _ = &err;
        std::process::abort();
    }

    /// Allocates `size` bytes. Aborts the process on [`GcError::OutOfMemory`] (spec §4.5):
    /// there is no mutator-visible recovery from an allocator that cannot keep the heap
    /// consistent.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        let result = match &mut self.backend {
            Backend::MarkSweep(b) => b.allocate(size),
            Backend::Copying(b) => b.allocate(size),
            Backend::Generational(b) => b.allocate(size),
        };
        match result {
            Ok(p) => p,
            Err(e) => self.fatal(e),
        }
    }

    pub fn mark_pointer(&mut self, ptr: *mut u8) -> *mut u8 {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.mark_pointer(ptr),
            Backend::Copying(b) => b.mark_pointer(ptr),
            Backend::Generational(b) => b.mark_pointer(ptr),
        }
    }

    pub fn set_trace(&mut self, payload: *mut u8, trace: TraceFn) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.set_trace(payload, trace),
            Backend::Copying(b) => b.set_trace(payload, trace),
            Backend::Generational(b) => b.set_trace(payload, trace),
        }
    }

    pub fn set_tag(&mut self, payload: *mut u8, tag: ObjectTag) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.set_tag(payload, tag),
            Backend::Copying(b) => b.set_tag(payload, tag),
            Backend::Generational(b) => b.set_tag(payload, tag),
        }
    }

    pub fn add_root(&mut self, slot: *mut *mut u8) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.add_root(slot),
            Backend::Copying(b) => b.add_root(slot),
            Backend::Generational(b) => b.add_root(slot),
        }
    }

    pub fn remove_root(&mut self, slot: *mut *mut u8) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.remove_root(slot),
            Backend::Copying(b) => b.remove_root(slot),
            Backend::Generational(b) => b.remove_root(slot),
        }
    }

    pub fn write_barrier(&mut self, owner: *mut u8, slot: *mut *mut u8, child: *mut u8) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.write_barrier(owner, slot, child),
            Backend::Copying(b) => b.write_barrier(owner, slot, child),
            Backend::Generational(b) => b.write_barrier(owner, slot, child),
        }
    }

    pub fn collect(&mut self) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.collect(),
            Backend::Copying(b) => b.collect(),
            Backend::Generational(b) => b.collect(),
        }
    }

    pub fn free(&mut self, payload: *mut u8) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.free(payload),
            Backend::Copying(b) => b.free(payload),
            Backend::Generational(b) => b.free(payload),
        }
    }

    pub fn set_threshold(&mut self, bytes: usize) {
        match &mut self.backend {
            Backend::MarkSweep(b) => b.set_threshold(bytes),
            Backend::Copying(b) => b.set_threshold(bytes),
            Backend::Generational(b) => b.set_threshold(bytes),
        }
    }

    pub fn get_threshold(&self) -> usize {
        match &self.backend {
            Backend::MarkSweep(b) => b.get_threshold(),
            Backend::Copying(b) => b.get_threshold(),
            Backend::Generational(b) => b.get_threshold(),
        }
    }

    pub fn get_stats(&self) -> GcStats {
        match &self.backend {
            Backend::MarkSweep(b) => b.get_stats(),
            Backend::Copying(b) => b.get_stats(),
            Backend::Generational(b) => b.get_stats(),
        }
    }

    pub fn heap_snapshot(&self, buf: &mut [SnapshotRecord]) -> usize {
        match &self.backend {
            Backend::MarkSweep(b) => b.heap_snapshot(buf),
            Backend::Copying(b) => b.heap_snapshot(buf),
            Backend::Generational(b) => b.heap_snapshot(buf),
        }
    }

    /// Convenience over [`Runtime::heap_snapshot`] for out-of-process consumers (the
    /// visualizer, per spec §6.1): every live object flattened to four `u32` words
    /// (`addr`, `size`, `generation`, `tag`), capped at `max_objects` records.
    pub fn heap_snapshot_flat(&self, max_objects: usize) -> Vec<u32> {
        let mut records = vec![
            SnapshotRecord { addr: 0, size: 0, generation: Generation::Unknown, tag: ObjectTag::Unknown };
            max_objects
        ];
        let n = self.heap_snapshot(&mut records);
        let mut words = Vec::with_capacity(n * 4);
        for rec in &records[..n] {
            words.extend_from_slice(&rec.to_flat_words());
        }
        words
    }

    pub fn get_initial_heap_size(&self) -> usize {
        self.config.initial_heap_size
    }

    /// Updates the recorded configuration value only; it does not resize a region a
    /// backend has already allocated (spec §6.2: each backend's regions are sized once,
    /// at `init`).
    pub fn set_initial_heap_size(&mut self, bytes: usize) {
        self.config.initial_heap_size = bytes;
    }
}
