//! Barrier for the squad's DESCEND step
//!
//! Collects "descend finished" reports from distinct roster slots during one
//! DESCEND epoch. Reporting is idempotent, and reports from members that die or
//! break away are forgotten so they never count towards the release.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct DescendBarrier {
    epoch: u32,
    reported: BTreeSet<usize>,
}

impl DescendBarrier {
    /// Start a new DESCEND epoch, discarding all reports
    pub fn open_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.reported.clear();
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Record a report; false if this slot already reported this epoch
    pub fn report(&mut self, index: usize) -> bool {
        self.reported.insert(index)
    }

    /// Drop a slot's report (member destroyed or left formation)
    pub fn forget(&mut self, index: usize) {
        self.reported.remove(&index);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.reported.len()
    }

    pub fn reset(&mut self) {
        self.reported.clear();
    }
}
