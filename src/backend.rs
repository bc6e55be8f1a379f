//! The backend contract: every operation a GC backend must provide, with identical
//! signatures across mark-sweep, copying, and generational.
//!
//! The surface is a flat function list over untyped `*mut u8` payloads rather than a
//! type-generic embedding API, since it is meant to be called from an external evaluator
//! across an opaque-pointer boundary, not linked against directly by a Rust-generic caller.

use crate::config::GcConfig;
use crate::error::GcError;
use crate::header::{ObjectTag, SnapshotRecord, TraceFn, Tracer};
use crate::stats::GcStats;

/// Operations every backend implements identically; the `Runtime` façade forwards to
/// whichever backend `init` selected.
pub trait GcBackend: Tracer {
    /// Human-readable name used in diagnostics (`GcError::OutOfMemory.backend`).
    const NAME: &'static str;

    /// Idempotent: allocates the heap, resets roots/remembered-set/stats.
    fn init(config: &GcConfig) -> Self;

    /// Returns an aligned, zero-initialized payload pointer for `size` bytes. May trigger a
    /// collection; if the request still cannot be satisfied afterward this is
    /// [`GcError::OutOfMemory`], which is fatal for this backend instance (spec §4.5).
    fn allocate(&mut self, size: usize) -> Result<*mut u8, GcError>;

    /// Installs the object's trace callback. No-op on a null payload.
    fn set_trace(&mut self, payload: *mut u8, trace: TraceFn);

    /// Installs the diagnostic tag. Safe to call before or after `set_trace`.
    fn set_tag(&mut self, payload: *mut u8, tag: ObjectTag);

    /// Registers the address of a pointer cell as a root. Idempotent.
    fn add_root(&mut self, slot: *mut *mut u8);

    /// Unregisters a previously registered root slot. No-op if not registered.
    fn remove_root(&mut self, slot: *mut *mut u8);

    /// Informs the backend that `*slot` (a field inside `owner`) now holds `child`.
    /// No-op for non-moving/non-generational backends.
    fn write_barrier(&mut self, owner: *mut u8, slot: *mut *mut u8, child: *mut u8);

    /// Forces a full collection cycle (minor+major for generational).
    fn collect(&mut self);

    /// Optional manual free, used for defensive cleanup paths. No-op on null; a no-op
    /// between collections for moving backends.
    fn free(&mut self, payload: *mut u8);

    /// Sets the bytes-allocated watermark that opportunistically triggers collection.
    fn set_threshold(&mut self, bytes: usize);

    /// Returns the current threshold. For the copying backend this is the semi-space size.
    fn get_threshold(&self) -> usize;

    /// Snapshots the statistics record, recomputing fragmentation metrics where relevant.
    fn get_stats(&self) -> GcStats;

    /// Fills up to `buf.len()` snapshot records describing live allocated objects and
    /// returns the number written. Order is backend-defined but stable within one call.
    fn heap_snapshot(&self, buf: &mut [SnapshotRecord]) -> usize;
}
