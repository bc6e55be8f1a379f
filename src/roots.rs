//! Root set: the address-keyed hash table every backend scans at the start of a mark phase.
//!
//! An open-addressed hash set over root-slot addresses, chosen over a flat `Vec` so that
//! `add_root`/`remove_root` stay amortized O(1) under the add/remove churn a deep call stack
//! produces, rather than a linear scan per mutation.
//!
//! A root slot is the address of a memory cell that stores a managed pointer (`*mut *mut
//! u8`), not the pointer itself. Duplicate registrations collapse (`add_root` is idempotent);
//! removing an unregistered slot is a no-op.

const INITIAL_CAPACITY: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Occupied(usize),
}

/// Open-addressed hash set of root-slot addresses.
///
/// - Power-of-two capacity, linear probing.
/// - Grows (doubles) when occupancy would exceed load factor 1/2.
/// - Deletion uses backward-shift so no tombstones are needed, which is what spec §4.2 means
///   by "deletion rehashes the probe cluster".
pub struct RootSet {
    table: Vec<Slot>,
    len: usize,
}

impl RootSet {
    pub fn new() -> RootSet {
        RootSet {
            table: vec![Slot::Empty; INITIAL_CAPACITY],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn hash(addr: usize, cap: usize) -> usize {
        // Fibonacci hashing; cap is always a power of two so `& (cap - 1)` is a fast modulo.
        addr.wrapping_mul(0x9E37_79B9_7F4A_7C15) & (cap - 1)
    }

    fn find_slot(table: &[Slot], addr: usize) -> Result<usize, usize> {
        let cap = table.len();
        let mut idx = Self::hash(addr, cap);
        loop {
            match table[idx] {
                Slot::Empty => return Err(idx),
                Slot::Occupied(a) if a == addr => return Ok(idx),
                Slot::Occupied(_) => idx = (idx + 1) & (cap - 1),
            }
        }
    }

    fn grow(&mut self) {
        let new_cap = self.table.len() * 2;
        let mut new_table = vec![Slot::Empty; new_cap];
        for slot in &self.table {
            if let Slot::Occupied(addr) = *slot {
                let idx = Self::find_slot(&new_table, addr).unwrap_err();
                new_table[idx] = Slot::Occupied(addr);
            }
        }
        self.table = new_table;
    }

    /// Register `slot`. Idempotent: registering the same address twice is a no-op.
    pub fn add_root(&mut self, slot: *mut *mut u8) {
        let addr = slot as usize;
        if addr == 0 {
            return;
        }
        if (self.len + 1) * 2 > self.table.len() {
            self.grow();
        }
        match Self::find_slot(&self.table, addr) {
            Ok(_) => {}
            Err(idx) => {
                self.table[idx] = Slot::Occupied(addr);
                self.len += 1;
            }
        }
    }

    /// Unregister `slot`. No-op if it was never registered.
    pub fn remove_root(&mut self, slot: *mut *mut u8) {
        let addr = slot as usize;
        let found = match Self::find_slot(&self.table, addr) {
            Ok(idx) => idx,
            Err(_) => return,
        };
        let cap = self.table.len();
        self.table[found] = Slot::Empty;
        self.len -= 1;

        // Backward-shift: walk the probe cluster after the hole and pull back any entry
        // that can still reach its home slot without crossing the hole.
        let mut hole = found;
        let mut idx = (found + 1) & (cap - 1);
        loop {
            match self.table[idx] {
                Slot::Empty => break,
                Slot::Occupied(a) => {
                    let home = Self::hash(a, cap);
                    // Can this entry move into `hole`? True iff the hole lies on the
                    // cyclic path from `home` to `idx`.
                    let dist_to_idx = (idx + cap - home) % cap;
                    let dist_to_hole = (hole + cap - home) % cap;
                    if dist_to_hole <= dist_to_idx {
                        self.table[hole] = Slot::Occupied(a);
                        self.table[idx] = Slot::Empty;
                        hole = idx;
                    }
                }
            }
            idx = (idx + 1) & (cap - 1);
        }
    }

    /// Iterate every registered root slot address, reinterpreted as a pointer-to-pointer.
    pub fn iter(&self) -> impl Iterator<Item = *mut *mut u8> + '_ {
        self.table.iter().filter_map(|s| match *s {
            Slot::Occupied(addr) => Some(addr as *mut *mut u8),
            Slot::Empty => None,
        })
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_at(addr: usize) -> *mut *mut u8 {
        addr as *mut *mut u8
    }

    #[test]
    fn add_is_idempotent() {
        let mut roots = RootSet::new();
        roots.add_root(slot_at(8));
        roots.add_root(slot_at(8));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn remove_unregistered_is_noop() {
        let mut roots = RootSet::new();
        roots.remove_root(slot_at(16));
        assert_eq!(roots.len(), 0);
    }

    #[test]
    fn add_then_remove_restores_prior_state() {
        let mut roots = RootSet::new();
        roots.add_root(slot_at(8));
        roots.add_root(slot_at(16));
        roots.add_root(slot_at(8));
        roots.remove_root(slot_at(8));
        assert_eq!(roots.len(), 1);
        let remaining: Vec<_> = roots.iter().collect();
        assert_eq!(remaining, vec![slot_at(16)]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut roots = RootSet::new();
        for i in 0..200 {
            roots.add_root(slot_at((i + 1) * 8));
        }
        assert_eq!(roots.len(), 200);
        for i in 0..200 {
            assert!(roots.iter().any(|s| s as usize == (i + 1) * 8));
        }
    }

    #[test]
    fn survives_cluster_deletion() {
        let mut roots = RootSet::new();
        // Force collisions by adding slots that hash into a tight neighborhood.
        for i in 0..10 {
            roots.add_root(slot_at((i + 1) * 8));
        }
        roots.remove_root(slot_at(5 * 8));
        roots.remove_root(slot_at(2 * 8));
        assert_eq!(roots.len(), 8);
        for i in 0..10 {
            let present = roots.iter().any(|s| s as usize == (i + 1) * 8);
            assert_eq!(present, i != 4 && i != 1);
        }
    }
}
