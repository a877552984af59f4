use crate::TransferError;
use crate::types::PartProgress;

/// Percentage of a part that has been handed to the transport.
///
/// A zero-length part has nothing to send, so it counts as done.
pub fn part_percentage(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = u128::from(loaded.min(total)) * 100 / u128::from(total);
    pct as u8
}

/// Whether an aggregate value is passed to a progress callback.
///
/// Only even values below 100 are reported. Completion (100) is signalled
/// by the success callback instead.
pub fn is_reportable(aggregate: u8) -> bool {
    aggregate < 100 && aggregate % 2 == 0
}

/// Fixed set of per-part progress entries for one file.
///
/// Entries are created up front, one per part, and only ever updated in
/// place.
#[derive(Debug, Clone)]
pub struct PartProgressList {
    parts: Vec<PartProgress>,
}

impl PartProgressList {
    /// Creates `total_parts` entries at 0 %.
    pub fn new(file_name: &str, total_parts: u32) -> Self {
        let parts = (1..=total_parts)
            .map(|part_number| PartProgress {
                file_name: file_name.to_string(),
                part_number,
                total_parts,
                percentage: 0,
            })
            .collect();
        Self { parts }
    }

    /// Records a part's percentage and returns the new aggregate.
    ///
    /// A part never moves backwards.
    pub fn update(&mut self, part_number: u32, percentage: u8) -> Result<u8, TransferError> {
        let total = self.total_parts();
        let entry = part_number
            .checked_sub(1)
            .and_then(|i| self.parts.get_mut(i as usize))
            .ok_or(TransferError::PartOutOfRange {
                part: part_number,
                total,
            })?;
        entry.percentage = entry.percentage.max(percentage.min(100));
        Ok(self.aggregate())
    }

    /// Floor of the mean of every part's percentage.
    pub fn aggregate(&self) -> u8 {
        if self.parts.is_empty() {
            return 0;
        }
        let sum: u64 = self.parts.iter().map(|p| u64::from(p.percentage)).sum();
        (sum / self.parts.len() as u64) as u8
    }

    /// Entries in part-number order.
    pub fn entries(&self) -> &[PartProgress] {
        &self.parts
    }

    pub fn total_parts(&self) -> u32 {
        self.parts.len() as u32
    }
}
