//! Configuration surface: a plain options struct with sensible `Default`s, shared by all
//! three backends, plus a recognized-string-key constructor.

/// Which backend the runtime façade should select at `init`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BackendKind {
    #[default]
    MarkSweep,
    Copying,
    Generational,
}

impl BackendKind {
    /// Parse one of the recognized configuration strings. Unrecognized or absent values fall
    /// back to mark-sweep.
    pub fn from_config_str(s: &str) -> BackendKind {
        match s {
            "copying" | "copy" | "semispace" => BackendKind::Copying,
            "generational" | "gen" => BackendKind::Generational,
            _ => BackendKind::MarkSweep,
        }
    }
}

pub const DEFAULT_MARK_SWEEP_HEAP: usize = 4 * 1024 * 1024;
pub const DEFAULT_SEMISPACE_SIZE: usize = 32 * 1024 * 1024;
pub const DEFAULT_NURSERY_SIZE: usize = 512 * 1024;
pub const DEFAULT_TENURED_HEAP: usize = 4 * 1024 * 1024;

/// Number of minor collections a nursery object survives before it is promoted.
pub const DEFAULT_PROMOTE_AGE: u8 = 2;

/// Growth factor applied to the mark-sweep allocation threshold after each collection,
/// clamped to the heap size.
pub const MARK_SWEEP_THRESHOLD_GROWTH: f64 = 1.5;
/// Growth factor applied to the generational tenured major-collection threshold.
pub const TENURED_THRESHOLD_GROWTH: f64 = 2.0;
/// Small additive constant applied alongside the multiplicative growth factor.
pub const THRESHOLD_GROWTH_CONSTANT: usize = 4096;

/// Recognized configuration for `Runtime::init`.
///
/// `initial_heap_size` is applied to whichever region is the primary region of the
/// selected backend: the mark-sweep heap, each copying semi-space, or the generational
/// tenured heap. It does not resize the mark-sweep/copying backends' other regions; each
/// backend provides its own defaults for the regions the config doesn't name.
#[derive(Clone, Copy, Debug)]
pub struct GcConfig {
    pub backend: BackendKind,
    pub initial_heap_size: usize,
}

impl GcConfig {
    pub fn new(backend: BackendKind, initial_heap_size: usize) -> GcConfig {
        GcConfig { backend, initial_heap_size }
    }

    /// Build a config from the two recognized environment-style string keys.
    pub fn from_str_keys(backend: &str, initial_heap_size: Option<usize>) -> GcConfig {
        let kind = BackendKind::from_config_str(backend);
        let heap = initial_heap_size.unwrap_or(match kind {
            BackendKind::MarkSweep => DEFAULT_MARK_SWEEP_HEAP,
            BackendKind::Copying => DEFAULT_SEMISPACE_SIZE,
            BackendKind::Generational => DEFAULT_TENURED_HEAP,
        });
        GcConfig::new(kind, heap)
    }
}

impl Default for GcConfig {
    fn default() -> GcConfig {
        GcConfig::new(BackendKind::MarkSweep, DEFAULT_MARK_SWEEP_HEAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_backend_falls_back_to_mark_sweep() {
        assert_eq!(BackendKind::from_config_str("quantum"), BackendKind::MarkSweep);
        assert_eq!(BackendKind::from_config_str(""), BackendKind::MarkSweep);
    }

    #[test]
    fn recognizes_all_aliases() {
        for s in ["copying", "copy", "semispace"] {
            assert_eq!(BackendKind::from_config_str(s), BackendKind::Copying);
        }
        for s in ["generational", "gen"] {
            assert_eq!(BackendKind::from_config_str(s), BackendKind::Generational);
        }
    }
}
