//! Failure kinds. Both variants are fatal: the runtime façade logs the error and aborts
//! rather than propagating it back through `allocate`. The type exists so the abort path
//! has a structured, logged diagnostic, not so a caller can recover.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GcError {
    #[error("out of memory: backend `{backend}` could not satisfy a {requested}-byte allocation after collection")]
    OutOfMemory { requested: usize, backend: &'static str },

    #[error("root set could not grow to accommodate a new root slot")]
    RootSetGrowth,
}
