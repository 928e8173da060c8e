#![forbid(unsafe_code)]

use std::fmt;

use memmap2::MmapMut;
use tracing::debug;

use crate::primitives::bytes::be;
use crate::types::{MapError, Result};

/// A fixed-size byte region addressed by explicit offsets.
///
/// No operation keeps a cursor on the region itself; every access names its
/// offset, so shared references may be read from several places at once.
pub trait Region: Send + Sync + fmt::Debug {
    /// Size of the region in bytes.
    fn len(&self) -> usize;

    /// Returns true if the region holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the backing store, used in logs.
    fn backing(&self) -> &'static str;

    /// Borrows the whole region.
    fn as_bytes(&self) -> &[u8];

    /// Mutably borrows the whole region.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Borrows `len` bytes starting at `off`.
    fn read(&self, off: usize, len: usize) -> Result<&[u8]> {
        let end = checked_end(off, len, self.len())?;
        Ok(&self.as_bytes()[off..end])
    }

    /// Reads a big-endian `u32` at `off`.
    fn read_u32(&self, off: usize) -> Result<u32> {
        let raw = self.read(off, be::U32_LEN)?;
        be::get_u32_be(raw).ok_or(MapError::OutOfBounds {
            offset: off,
            len: be::U32_LEN,
            size: self.len(),
        })
    }

    /// Copies `src` into the region at `off`.
    fn write(&mut self, off: usize, src: &[u8]) -> Result<()> {
        let end = checked_end(off, src.len(), self.len())?;
        self.as_bytes_mut()[off..end].copy_from_slice(src);
        Ok(())
    }

    /// Writes a big-endian `u32` at `off`.
    fn write_u32(&mut self, off: usize, v: u32) -> Result<()> {
        self.write(off, &v.to_be_bytes())
    }

    /// Sets `len` bytes starting at `off` to `byte`.
    fn fill(&mut self, off: usize, len: usize, byte: u8) -> Result<()> {
        let end = checked_end(off, len, self.len())?;
        self.as_bytes_mut()[off..end].fill(byte);
        Ok(())
    }

    /// Gives the memory back. Consuming the box makes a second release impossible.
    fn release(self: Box<Self>) {
        debug!(bytes = self.len(), backing = self.backing(), "region released");
        drop(self);
    }
}

fn checked_end(off: usize, len: usize, size: usize) -> Result<usize> {
    match off.checked_add(len) {
        Some(end) if end <= size => Ok(end),
        _ => Err(MapError::OutOfBounds {
            offset: off,
            len,
            size,
        }),
    }
}

/// Produces initialized regions for a map.
pub trait RegionAllocator: Send + Sync + fmt::Debug {
    /// Allocates `size` bytes with every byte set to `fill`.
    fn allocate(&self, size: usize, fill: u8) -> Result<Box<dyn Region>>;

    /// Largest single region this allocator can hand out.
    fn max_region_bytes(&self) -> u64 {
        isize::MAX as u64
    }
}

/// Region backed by a boxed slice on the global allocator.
pub struct HeapRegion {
    bytes: Box<[u8]>,
}

impl fmt::Debug for HeapRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapRegion")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Region for HeapRegion {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn backing(&self) -> &'static str {
        "heap"
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Allocates [`HeapRegion`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl RegionAllocator for HeapAllocator {
    fn allocate(&self, size: usize, fill: u8) -> Result<Box<dyn Region>> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|err| {
            MapError::config(format!("cannot reserve {size} bytes for region: {err}"))
        })?;
        bytes.resize(size, fill);
        debug!(bytes = size, backing = "heap", "region allocated");
        Ok(Box::new(HeapRegion {
            bytes: bytes.into_boxed_slice(),
        }))
    }
}

/// Region backed by an anonymous memory mapping, outside the Rust heap.
pub struct AnonMmapRegion {
    map: MmapMut,
}

impl fmt::Debug for AnonMmapRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnonMmapRegion")
            .field("len", &self.map.len())
            .finish()
    }
}

impl Region for AnonMmapRegion {
    fn len(&self) -> usize {
        self.map.len()
    }

    fn backing(&self) -> &'static str {
        "anon-mmap"
    }

    fn as_bytes(&self) -> &[u8] {
        &self.map
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

/// Allocates [`AnonMmapRegion`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonMmapAllocator;

impl RegionAllocator for AnonMmapAllocator {
    fn allocate(&self, size: usize, fill: u8) -> Result<Box<dyn Region>> {
        if size == 0 {
            return Err(MapError::config("anonymous mapping must be non-empty"));
        }
        let mut map = MmapMut::map_anon(size)?;
        // fresh anonymous pages are zeroed
        if fill != 0 {
            map.fill(fill);
        }
        debug!(bytes = size, backing = "anon-mmap", "region allocated");
        Ok(Box::new(AnonMmapRegion { map }))
    }
}
