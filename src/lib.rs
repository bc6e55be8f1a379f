//! A pluggable tracing garbage collector for a didactic Lisp runtime.
//!
//! This crate is the GC core only: three interchangeable backends behind one contract
//! ([`GcBackend`]), a runtime façade ([`Runtime`]) that dispatches to whichever backend
//! `init` selected, and the shared statistics/configuration/root-set machinery they all
//! use. The lexer, parser, evaluator, REPL, and standard library that would embed this
//! crate are out of scope here; [`mutator_obligations`] documents the contract such a
//! host is expected to uphold.
//!
//! Backends:
//! - [`mark_sweep::MarkSweep`]: non-moving, free-list heap.
//! - [`copying::Copying`]: semi-space (Cheney) copying collector.
//! - [`generational::Generational`]: copying nursery over a mark-sweep tenured heap.

pub mod backend;
pub mod config;
pub mod copying;
pub mod error;
pub mod generational;
pub mod header;
pub mod mark_sweep;
pub mod roots;
pub mod runtime;
pub mod stats;

pub use backend::GcBackend;
pub use config::{BackendKind, GcConfig};
pub use copying::Copying;
pub use error::GcError;
pub use generational::Generational;
pub use header::{align_up, Generation, ObjectMeta, ObjectTag, SnapshotRecord, TraceFn, Tracer};
pub use mark_sweep::MarkSweep;
pub use roots::RootSet;
pub use runtime::Runtime;
pub use stats::{GcStats, StatsAccumulator};

/// What a host evaluator embedding this crate must do that the GC itself cannot enforce
/// at compile time. Nothing in this module is executable; it exists so the
/// contract between this crate and its (out-of-scope) mutator lives somewhere other than
/// a comment buried in `backend.rs`.
///
/// - **Precise roots.** Every managed pointer reachable from the mutator's stack, active
///   environments, or registers must be registered with [`GcBackend::add_root`], as the
///   address of the pointer cell, not the pointer's value, for as long as it is live, and
///   unregistered with [`GcBackend::remove_root`] before that cell's storage is reused or
///   goes out of scope. A root slot whose contents the mutator mutates directly (without
///   going through a write barrier) between collections is sound; a stale or dangling root
///   slot is not.
/// - **Complete trace callbacks.** [`GcBackend::set_trace`] must be given a function that
///   visits every managed pointer field an object holds, via [`Tracer::mark_pointer`], and
///   writes the returned pointer back into the field it was read from. A moving backend
///   silently corrupts any field a trace callback misses.
/// - **Write barriers on every store.** Whenever the mutator stores a managed pointer
///   into a field of an already-allocated object, it must call [`GcBackend::write_barrier`]
///   with the owning object, the address of the field, and the new value, even on
///   backends where this is currently a no-op, since a program portable across backend
///   choices cannot special-case the generational one.
/// - **No raw payload pointers across a potential collection point.** Only a backend
///   itself may dereference a payload pointer while a collection is in progress; the
///   mutator must re-read any pointer it needs after a call that could trigger one
///   (`allocate`, `collect`) from wherever it rooted it, since a moving backend may have
///   relocated the object the pointer used to name.
pub mod mutator_obligations {}
