// src/counter.rs

use crate::vehicle_classes::VehicleClass;
use std::collections::HashSet;
use tracing::debug;

/// Read-only copy of the per-class tallies at some point in the run.
/// The total is derived on demand so it can never diverge from the sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub car: u64,
    pub bicycle: u64,
    pub motorcycle: u64,
    pub truck: u64,
}

impl TallySnapshot {
    pub fn get(&self, class: VehicleClass) -> u64 {
        match class {
            VehicleClass::Car => self.car,
            VehicleClass::Bicycle => self.bicycle,
            VehicleClass::Motorcycle => self.motorcycle,
            VehicleClass::Truck => self.truck,
        }
    }

    pub fn total(&self) -> u64 {
        self.car + self.bicycle + self.motorcycle + self.truck
    }
}

/// Tallies each track identifier at most once for the whole run.
///
/// Owns the set of already-counted ids and the per-class counts; both only
/// ever grow. Track-id reuse by the tracker would break the counted-once
/// guarantee, so the tracker must hand out fresh ids for new objects.
#[derive(Debug, Default)]
pub struct DedupCounter {
    counted_ids: HashSet<u32>,
    tally: TallySnapshot,
}

impl DedupCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `track_id` as one vehicle of `class`, unless it was already
    /// counted. Returns true iff this call incremented a tally.
    pub fn admit(&mut self, track_id: u32, class: VehicleClass) -> bool {
        if !self.counted_ids.insert(track_id) {
            return false;
        }

        let slot = match class {
            VehicleClass::Car => &mut self.tally.car,
            VehicleClass::Bicycle => &mut self.tally.bicycle,
            VehicleClass::Motorcycle => &mut self.tally.motorcycle,
            VehicleClass::Truck => &mut self.tally.truck,
        };
        *slot += 1;

        debug!("Counted {} with track id {}", class.label(), track_id);
        true
    }

    pub fn snapshot(&self) -> TallySnapshot {
        self.tally
    }

    pub fn total(&self) -> u64 {
        self.tally.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_admission_counts() {
        let mut counter = DedupCounter::new();
        assert!(counter.admit(5, VehicleClass::Car));
        assert_eq!(counter.snapshot().car, 1);
        assert_eq!(counter.total(), 1);
    }

    #[test]
    fn test_readmission_is_idempotent() {
        let mut counter = DedupCounter::new();
        assert!(counter.admit(5, VehicleClass::Car));

        // Same id over many more frames: no further increments
        for _ in 0..100 {
            assert!(!counter.admit(5, VehicleClass::Car));
        }
        assert_eq!(counter.snapshot().car, 1);
        assert_eq!(counter.total(), 1);
    }

    #[test]
    fn test_same_id_different_class_not_recounted() {
        // An id is counted once, period, even if the detector flickers
        // the class on a later frame.
        let mut counter = DedupCounter::new();
        assert!(counter.admit(9, VehicleClass::Truck));
        assert!(!counter.admit(9, VehicleClass::Car));
        assert_eq!(counter.snapshot().truck, 1);
        assert_eq!(counter.snapshot().car, 0);
    }

    #[test]
    fn test_total_equals_sum_of_classes() {
        let mut counter = DedupCounter::new();
        counter.admit(1, VehicleClass::Car);
        counter.admit(2, VehicleClass::Car);
        counter.admit(3, VehicleClass::Bicycle);
        counter.admit(4, VehicleClass::Motorcycle);
        counter.admit(5, VehicleClass::Truck);
        counter.admit(3, VehicleClass::Bicycle); // duplicate

        let tally = counter.snapshot();
        assert_eq!(tally.car, 2);
        assert_eq!(tally.bicycle, 1);
        assert_eq!(tally.motorcycle, 1);
        assert_eq!(tally.truck, 1);
        assert_eq!(
            counter.total(),
            tally.car + tally.bicycle + tally.motorcycle + tally.truck
        );
    }

    #[test]
    fn test_fresh_counter_is_all_zero() {
        let counter = DedupCounter::new();
        for class in VehicleClass::ALL {
            assert_eq!(counter.snapshot().get(class), 0);
        }
        assert_eq!(counter.total(), 0);
    }
}
