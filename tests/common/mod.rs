use std::ptr::NonNull;

use lispheap_gc::Tracer;

/// Trace callback for a two-slot cons cell (`car` at offset 0, `cdr` at offset 8).
pub fn trace_cons(payload: NonNull<u8>, vis: &mut dyn Tracer) {
    unsafe {
        let slots = payload.as_ptr() as *mut *mut u8;
        let car = *slots;
        *slots = vis.mark_pointer(car);
        let cdr = *slots.add(1);
        *slots.add(1) = vis.mark_pointer(cdr);
    }
}

/// Trace callback for a single-slot cell (one managed pointer field at offset 0).
pub fn trace_one_slot(payload: NonNull<u8>, vis: &mut dyn Tracer) {
    unsafe {
        let slot = payload.as_ptr() as *mut *mut u8;
        let child = *slot;
        *slot = vis.mark_pointer(child);
    }
}
