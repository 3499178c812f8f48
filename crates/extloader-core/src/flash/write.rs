//! Page-aligned programming
//!
//! A page program command that runs past the end of a page wraps around
//! and overwrites the start of the same page. Writes are therefore split
//! into chunks that each stay inside one page.

use crate::bus::BusDriver;
use crate::error::{Error, Result};

use super::{DeviceState, FlashDevice};

/// One page-bounded piece of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Device offset of the first byte
    pub offset: u32,
    /// Offset of the first byte within the source buffer
    pub buffer_offset: usize,
    /// Number of bytes
    pub len: usize,
}

/// Iterator splitting `(offset, len)` into page-bounded chunks
///
/// The first chunk runs to the next page boundary (or the end of the
/// write), every following chunk is `min(page_size, remaining)`. No chunk
/// is empty, so an empty write yields nothing.
#[derive(Debug, Clone)]
pub struct PageChunks {
    page_size: u32,
    offset: u32,
    buffer_offset: usize,
    remaining: usize,
}

impl PageChunks {
    /// Plan a write of `len` bytes at device `offset`
    ///
    /// `page_size` must be a power of two.
    pub fn new(offset: u32, len: usize, page_size: u32) -> Self {
        Self {
            page_size,
            offset,
            buffer_offset: 0,
            remaining: len,
        }
    }
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let to_boundary = (self.page_size - self.offset % self.page_size) as usize;
        let len = self.remaining.min(to_boundary);
        let chunk = PageChunk {
            offset: self.offset,
            buffer_offset: self.buffer_offset,
            len,
        };
        self.offset = self.offset.wrapping_add(len as u32);
        self.buffer_offset += len;
        self.remaining -= len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining == 0 {
            return (0, Some(0));
        }
        let page = self.page_size as usize;
        let head = self.offset as usize % page;
        let n = (head + self.remaining).div_ceil(page);
        (n, Some(n))
    }
}

impl ExactSizeIterator for PageChunks {}

/// Callback for progress reporting during erase and write
pub trait WriteProgress {
    /// Called when starting erase operations
    fn erasing(&mut self, sectors_to_erase: usize);

    /// Called after each sector is erased
    fn erase_progress(&mut self, sectors_erased: usize);

    /// Called once before the first chunk is programmed
    fn writing(&mut self, bytes_to_write: usize);

    /// Called after each chunk with the running byte count
    fn write_progress(&mut self, bytes_written: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl WriteProgress for NoProgress {
    fn erasing(&mut self, _sectors_to_erase: usize) {}
    fn erase_progress(&mut self, _sectors_erased: usize) {}
    fn writing(&mut self, _bytes_to_write: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
}

impl<B: BusDriver> FlashDevice<B> {
    /// Program `data` at `address`
    ///
    /// The target range must be erased. Leaves memory-mapped mode first,
    /// even for an empty write, which sends no other command. On error the
    /// pages programmed so far stay programmed.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.write_with_progress(address, data, &mut NoProgress)
    }

    /// Program `data` at `address`, reporting each chunk to `progress`
    pub fn write_with_progress<P: WriteProgress + ?Sized>(
        &mut self,
        address: u32,
        data: &[u8],
        progress: &mut P,
    ) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::InvalidRange {
            address,
            len: u32::MAX,
        })?;
        let offset = self.profile.to_offset(address, len)?;
        self.prepare_modify()?;
        if data.is_empty() {
            return Ok(());
        }

        log::debug!("Writing {} bytes at {:#010x}", data.len(), offset);
        progress.writing(data.len());
        let chunks = PageChunks::new(offset, data.len(), self.profile.page_size);
        self.run(DeviceState::Programming, |dev| {
            let mut written = 0;
            for chunk in chunks {
                let bytes = &data[chunk.buffer_offset..chunk.buffer_offset + chunk.len];
                dev.program_at(chunk.offset, bytes)?;
                written += chunk.len;
                progress.write_progress(written);
            }
            Ok(())
        })
    }
}
