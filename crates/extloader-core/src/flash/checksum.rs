//! Additive checksum over a memory range
//!
//! The checksum is the 32-bit wrapping sum of the bytes in
//! `[start, start + size)`. Memory is read as aligned little-endian words;
//! bytes of the boundary words that lie outside the range are skipped.

use crate::bus::BusDriver;
use crate::error::{Error, Result};

use super::FlashDevice;

/// Readable memory the checksum and verify passes run over
pub trait MemoryWindow {
    /// Read `buf.len()` bytes starting at `address`
    fn read_bytes(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Read one little-endian 32-bit word
    fn read_word(&mut self, address: u32) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_bytes(address, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

impl<W: MemoryWindow + ?Sized> MemoryWindow for &mut W {
    fn read_bytes(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(address, buf)
    }
}

/// Byte slice placed at a base address
///
/// Bytes outside the slice read as `0xFF`, like erased flash.
#[derive(Debug, Clone, Copy)]
pub struct SliceWindow<'a> {
    base: u32,
    data: &'a [u8],
}

impl<'a> SliceWindow<'a> {
    /// Place `data` at `base`
    pub const fn new(base: u32, data: &'a [u8]) -> Self {
        Self { base, data }
    }
}

impl MemoryWindow for SliceWindow<'_> {
    fn read_bytes(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        for (i, byte) in buf.iter_mut().enumerate() {
            let index = (address as u64 + i as u64).checked_sub(self.base as u64);
            *byte = index
                .and_then(|index| self.data.get(index as usize))
                .copied()
                .unwrap_or(0xFF);
        }
        Ok(())
    }
}

impl<B: BusDriver> MemoryWindow for FlashDevice<B> {
    fn read_bytes(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.read_mapped(address, buf)
    }
}

/// Running 32-bit wrapping byte sum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumAccumulator {
    sum: u32,
}

impl ChecksumAccumulator {
    /// Start from `init`
    pub const fn new(init: u32) -> Self {
        Self { sum: init }
    }

    /// Add the bytes of `word` from `head_skip` up to `4 - tail_skip`
    ///
    /// Byte 0 is the least significant byte.
    pub fn add_word(&mut self, word: u32, head_skip: u32, tail_skip: u32) {
        for i in head_skip..4u32.saturating_sub(tail_skip) {
            self.sum = self.sum.wrapping_add((word >> (8 * i)) & 0xFF);
        }
    }

    /// Current sum
    pub const fn value(&self) -> u32 {
        self.sum
    }
}

/// Words read per window access
const BLOCK_WORDS: usize = 64;

/// Sum the bytes in `[start, start + size)` seeded with `init`
pub fn checksum<W: MemoryWindow + ?Sized>(
    window: &mut W,
    start: u32,
    size: u32,
    init: u32,
) -> Result<u32> {
    let mut acc = ChecksumAccumulator::new(init);
    if size == 0 {
        return Ok(acc.value());
    }

    let end = start as u64 + size as u64;
    if end > 1 << 32 {
        return Err(Error::InvalidRange {
            address: start,
            len: size,
        });
    }
    let aligned_start = (start & !3) as u64;
    let aligned_end = (end + 3) & !3;
    let head_skip = start & 3;
    let tail_skip = (aligned_end - end) as u32;

    let mut block = [0u8; BLOCK_WORDS * 4];
    let mut addr = aligned_start;
    while addr < aligned_end {
        let len = ((aligned_end - addr) as usize).min(block.len());
        window.read_bytes(addr as u32, &mut block[..len])?;
        for (i, word) in block[..len].chunks_exact(4).enumerate() {
            let word_addr = addr + (i * 4) as u64;
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            let head = if word_addr == aligned_start { head_skip } else { 0 };
            let tail = if word_addr + 4 == aligned_end { tail_skip } else { 0 };
            acc.add_word(word, head, tail);
        }
        addr += len as u64;
    }

    Ok(acc.value())
}

impl<B: BusDriver> FlashDevice<B> {
    /// Checksum of `[start, start + size)` read through the mapped window
    ///
    /// Enables memory-mapped mode if needed.
    pub fn checksum(&mut self, start: u32, size: u32, init: u32) -> Result<u32> {
        checksum(self, start, size, init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_bytes_beyond_range_are_skipped() {
        let mem = [0x01, 0x02, 0x03, 0x04, 0x05, 0xFF, 0xFF, 0xFF];
        let mut window = SliceWindow::new(0x1000, &mem);
        assert_eq!(checksum(&mut window, 0x1000, 5, 0), Ok(15));
    }

    #[test]
    fn test_head_bytes_before_range_are_skipped() {
        let mem = [0xAA, 0xBB, 0x01, 0x02, 0x03, 0xCC, 0xDD, 0xEE];
        let mut window = SliceWindow::new(0x1000, &mem);
        assert_eq!(checksum(&mut window, 0x1002, 3, 0), Ok(6));
    }

    #[test]
    fn test_range_inside_one_word() {
        let mem = [0xAA, 0x07, 0x08, 0xBB];
        let mut window = SliceWindow::new(0, &mem);
        assert_eq!(checksum(&mut window, 1, 2, 0), Ok(15));
    }

    #[test]
    fn test_matches_plain_byte_sum() {
        let mem: std::vec::Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
        let mut window = SliceWindow::new(0x9000_0000, &mem);
        for &(start, size) in &[(0u32, 1000u32), (1, 998), (3, 517), (256, 256), (999, 1)] {
            let expected = mem[start as usize..(start + size) as usize]
                .iter()
                .fold(0x1234u32, |acc, &b| acc.wrapping_add(b as u32));
            let got = checksum(&mut window, 0x9000_0000 + start, size, 0x1234).unwrap();
            assert_eq!(got, expected, "start={} size={}", start, size);
        }
    }

    #[test]
    fn test_deterministic() {
        let mem = [0x5Au8; 300];
        let mut window = SliceWindow::new(0, &mem);
        let a = checksum(&mut window, 3, 290, 0).unwrap();
        let b = checksum(&mut window, 3, 290, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 290 * 0x5A);
    }

    #[test]
    fn test_empty_range_returns_seed() {
        let mut window = SliceWindow::new(0, &[]);
        assert_eq!(checksum(&mut window, 0x40, 0, 77), Ok(77));
    }

    #[test]
    fn test_sum_wraps() {
        let mut acc = ChecksumAccumulator::new(u32::MAX);
        acc.add_word(0x0000_0002, 0, 0);
        assert_eq!(acc.value(), 1);
    }

    #[test]
    fn test_range_past_address_space_is_rejected() {
        let mut window = SliceWindow::new(0, &[]);
        assert_eq!(
            checksum(&mut window, 0xFFFF_FFF0, 0x20, 0),
            Err(Error::InvalidRange {
                address: 0xFFFF_FFF0,
                len: 0x20
            })
        );
    }
}
