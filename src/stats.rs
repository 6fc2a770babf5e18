//! Per-table probe and rehash counters, enabled by the `dump-stats` feature.

use core::cell::Cell;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accesses: u64,
    /// Lookups that needed more than one probe.
    pub collisions: u64,
    pub collision_probes: u64,
    pub max_collisions: u64,
    pub rehashes: u64,
    pub reinserts: u64,
    pub removes: u64,
}

#[derive(Debug, Default)]
pub struct HashTableStats {
    accesses: Cell<u64>,
    collisions: Cell<u64>,
    collision_probes: Cell<u64>,
    max_collisions: Cell<u64>,
    rehashes: Cell<u64>,
    reinserts: Cell<u64>,
    removes: Cell<u64>,
}

fn bump(cell: &Cell<u64>, by: u64) {
    cell.set(cell.get().saturating_add(by));
}

impl HashTableStats {
    pub(crate) fn record_access(&self, probes: usize) {
        bump(&self.accesses, 1);
        if probes > 0 {
            let probes = probes as u64;
            bump(&self.collisions, 1);
            bump(&self.collision_probes, probes);
            if probes > self.max_collisions.get() {
                self.max_collisions.set(probes);
            }
        }
    }

    pub(crate) fn record_rehash(&self) {
        bump(&self.rehashes, 1);
    }

    pub(crate) fn record_reinsert(&self) {
        bump(&self.reinserts, 1);
    }

    pub(crate) fn record_remove(&self) {
        bump(&self.removes, 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accesses: self.accesses.get(),
            collisions: self.collisions.get(),
            collision_probes: self.collision_probes.get(),
            max_collisions: self.max_collisions.get(),
            rehashes: self.rehashes.get(),
            reinserts: self.reinserts.get(),
            removes: self.removes.get(),
        }
    }

    pub fn dump(&self) {
        let s = self.snapshot();
        log::info!(
            target: "hash_table",
            "{} accesses, {} collisions ({} probes, max {}), {} rehashes, {} reinserts, {} removes",
            s.accesses,
            s.collisions,
            s.collision_probes,
            s.max_collisions,
            s.rehashes,
            s.reinserts,
            s.removes
        );
    }
}
