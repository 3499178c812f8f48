//! Sector-range and mass erase

use crate::bus::BusDriver;
use crate::error::Result;

use super::{DeviceState, FlashDevice, NoProgress, WriteProgress};

/// Sectors touched by an inclusive `(start, end)` range
///
/// Iteration starts at `start` rounded down to a sector boundary and steps
/// one sector at a time while the sector address is `<= end`, so an `end`
/// below the aligned start yields nothing.
#[derive(Debug, Clone)]
pub struct EraseRange {
    next: Option<u32>,
    end: u32,
    sector_size: u32,
}

impl EraseRange {
    /// Plan the erase of the sectors touching `[start, end]`
    pub fn new(start: u32, end: u32, sector_size: u32) -> Self {
        let aligned_start = start - start % sector_size;
        Self {
            next: (aligned_start <= end).then_some(aligned_start),
            end,
            sector_size,
        }
    }

    /// First sector address, if any
    pub fn aligned_start(&self) -> Option<u32> {
        self.next
    }
}

impl Iterator for EraseRange {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let sector = self.next?;
        self.next = sector
            .checked_add(self.sector_size)
            .filter(|&next| next <= self.end);
        Some(sector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self.next {
            Some(sector) => ((self.end - sector) / self.sector_size + 1) as usize,
            None => 0,
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for EraseRange {}

impl<B: BusDriver> FlashDevice<B> {
    /// Erase every sector touching the inclusive range `[start, end]`
    ///
    /// Leaves memory-mapped mode first. Returns the number of sectors
    /// erased.
    pub fn erase_range(&mut self, start: u32, end: u32) -> Result<usize> {
        self.erase_range_with_progress(start, end, &mut NoProgress)
    }

    /// Erase every sector touching `[start, end]`, reporting each sector
    pub fn erase_range_with_progress<P: WriteProgress + ?Sized>(
        &mut self,
        start: u32,
        end: u32,
        progress: &mut P,
    ) -> Result<usize> {
        let start_offset = self.profile.to_offset(start, 1)?;
        let end_offset = self.profile.to_offset(end, 1)?;
        self.prepare_modify()?;

        let sectors = EraseRange::new(start_offset, end_offset, self.profile.sector_size);
        let total = sectors.len();
        log::debug!(
            "Erasing {} sector(s) from {:#010x} to {:#010x}",
            total,
            start_offset,
            end_offset
        );
        progress.erasing(total);

        let opcode = self.profile.opcodes.sector_erase.select(self.iface.address_width);
        let timeout = self.profile.timeouts.sector_erase_ms;
        self.run(DeviceState::Erasing, |dev| {
            for (done, sector) in sectors.enumerate() {
                dev.erase_at(opcode, sector, timeout)?;
                progress.erase_progress(done + 1);
            }
            Ok(total)
        })
    }

    /// Erase the whole chip
    ///
    /// Leaves memory-mapped mode first.
    pub fn mass_erase(&mut self) -> Result<()> {
        self.prepare_modify()?;
        self.erase_chip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn sectors(start: u32, end: u32) -> Vec<u32> {
        EraseRange::new(start, end, 0x1000).collect()
    }

    #[test]
    fn test_start_is_rounded_down() {
        assert_eq!(sectors(0x1800, 0x2000), [0x1000, 0x2000]);
    }

    #[test]
    fn test_end_on_sector_start_includes_that_sector() {
        assert_eq!(sectors(0, 0x3000), [0, 0x1000, 0x2000, 0x3000]);
        assert_eq!(sectors(0, 0x2FFF), [0, 0x1000, 0x2000]);
    }

    #[test]
    fn test_single_address_erases_its_sector() {
        assert_eq!(sectors(0x1234, 0x1234), [0x1000]);
    }

    #[test]
    fn test_end_below_aligned_start_is_empty() {
        let range = EraseRange::new(0x2000, 0x1FFF, 0x1000);
        assert_eq!(range.len(), 0);
        assert_eq!(range.count(), 0);
        // end below start but inside the same sector still erases it
        assert_eq!(sectors(0x2800, 0x2400), [0x2000]);
    }

    #[test]
    fn test_matches_sector_set_definition() {
        for &(start, end) in &[(0u32, 0u32), (0x10, 0x5FFF), (0x3FFF, 0x4000), (0x7000, 0x7FFF)] {
            let aligned = start - start % 0x1000;
            let expected: Vec<u32> = (0..16u32)
                .map(|s| s * 0x1000)
                .filter(|&s| s <= end && s >= aligned)
                .collect();
            let range = EraseRange::new(start, end, 0x1000);
            assert_eq!(range.len(), expected.len());
            assert_eq!(range.collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn test_stops_at_top_of_address_space() {
        let last = EraseRange::new(0xFFFF_F000, u32::MAX, 0x1000).collect::<Vec<_>>();
        assert_eq!(last, [0xFFFF_F000]);
    }
}
