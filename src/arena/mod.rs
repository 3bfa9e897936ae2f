//! Append-only paged arena backing the compressed records.
//!
//! Construction is split in two phases. While building, an [`ArenaBuilder`] is shared by all
//! workers; each worker owns an [`ArenaAllocator`] which obtains whole pages from the builder
//! through an atomic page counter and fills them privately. A page is handed back to the builder
//! once full (or when the allocator is dropped). [`ArenaBuilder::freeze`] then gathers every page
//! into an immutable [`Arena`].
//!
//! Records are addressed through [`ArenaAddress`] handles, never through raw pointers.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{AdjacencyError, Result};

/// Default page size, 1 MiB.
pub const DEFAULT_PAGE_SIZE: usize = 1 << 20;

/// Opaque handle locating a record: page index in the upper 32 bits, byte offset within the
/// page in the lower 32 bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArenaAddress(u64);

impl ArenaAddress {
    #[inline(always)]
    pub(crate) fn new(page: u32, offset: u32) -> Self {
        ArenaAddress(((page as u64) << 32) | offset as u64)
    }

    #[inline(always)]
    pub fn page(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline(always)]
    pub fn offset(self) -> u32 {
        self.0 as u32
    }

    #[inline(always)]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ArenaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaAddress({}:{})", self.page(), self.offset())
    }
}

/// The shared, growing side of the arena.
#[derive(Debug)]
pub struct ArenaBuilder {
    page_size: usize,
    next_page: AtomicU32,
    sealed: Mutex<Vec<(u32, Box<[u8]>)>>,
}

impl ArenaBuilder {
    /// Creates an empty arena handing out pages of `page_size` bytes.
    ///
    /// Records larger than a page are stored in a dedicated page of their exact size.
    pub fn new(page_size: usize) -> Self {
        assert!(
            page_size > 0 && page_size <= u32::MAX as usize,
            "Page size has to be in [1, 2^32)"
        );

        ArenaBuilder {
            page_size,
            next_page: AtomicU32::new(0),
            sealed: Mutex::new(Vec::new()),
        }
    }

    /// Returns a new allocator writing into this arena.
    pub fn allocator(self: &Arc<Self>) -> ArenaAllocator {
        ArenaAllocator {
            arena: Arc::clone(self),
            page: None,
        }
    }

    #[inline(always)]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages handed out so far.
    pub fn allocated_pages(&self) -> u32 {
        self.next_page.load(Ordering::Acquire)
    }

    fn next_page_id(&self) -> Result<u32> {
        let id = self.next_page.fetch_add(1, Ordering::AcqRel);
        if id == u32::MAX {
            return Err(AdjacencyError::CapacityExhausted { requested: self.page_size });
        }
        Ok(id)
    }

    fn seal(&self, id: u32, page: Vec<u8>) {
        trace!(page = id, bytes = page.len(), "sealing arena page");
        self.sealed.lock().push((id, page.into_boxed_slice()));
    }

    /// Collects all sealed pages into an immutable arena.
    ///
    /// Fails with [`AdjacencyError::UnsealedArena`] if a page was handed out to an allocator
    /// that has not been dropped yet.
    pub fn freeze(&self) -> Result<Arena> {
        let mut sealed = std::mem::take(&mut *self.sealed.lock());
        sealed.sort_unstable_by_key(|(id, _)| *id);

        let expected = self.allocated_pages();
        for (i, (id, _)) in sealed.iter().enumerate() {
            if *id != i as u32 {
                return Err(AdjacencyError::UnsealedArena(i as u32));
            }
        }
        if sealed.len() as u32 != expected {
            return Err(AdjacencyError::UnsealedArena(sealed.len() as u32));
        }

        let pages: Vec<Box<[u8]>> = sealed.into_iter().map(|(_, page)| page).collect();
        debug!(pages = pages.len(), "arena frozen");

        Ok(Arena { pages })
    }
}

/// A worker-local allocator. Dropping it seals its current page.
#[derive(Debug)]
pub struct ArenaAllocator {
    arena: Arc<ArenaBuilder>,
    page: Option<(u32, Vec<u8>)>,
}

impl ArenaAllocator {
    /// Copies `bytes` into the arena and returns where they landed.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<ArenaAddress> {
        let page_size = self.arena.page_size;

        let fits = matches!(&self.page, Some((_, page)) if page.len() + bytes.len() <= page_size);
        if !fits {
            self.seal();

            let capacity = bytes.len().max(page_size);
            let mut page = Vec::new();
            page.try_reserve_exact(capacity)
                .map_err(|_| AdjacencyError::CapacityExhausted { requested: capacity })?;
            let id = self.arena.next_page_id()?;
            self.page = Some((id, page));
        }

        match self.page.as_mut() {
            Some((id, page)) => {
                let offset = page.len();
                page.extend_from_slice(bytes);
                Ok(ArenaAddress::new(*id, offset as u32))
            }
            None => unreachable!("a page has just been acquired"),
        }
    }

    /// Hands the current page back to the arena.
    pub fn seal(&mut self) {
        if let Some((id, page)) = self.page.take() {
            self.arena.seal(id, page);
        }
    }
}

impl Drop for ArenaAllocator {
    fn drop(&mut self) {
        self.seal();
    }
}

/// The frozen, read-only arena.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    pages: Vec<Box<[u8]>>,
}

impl Arena {
    /// Returns the bytes from `address` to the end of its page.
    #[inline(always)]
    pub fn bytes_at(&self, address: ArenaAddress) -> &[u8] {
        &self.pages[address.page() as usize][address.offset() as usize..]
    }

    /// Like [`Arena::bytes_at`], `None` if `address` lies outside of the arena.
    pub fn try_bytes_at(&self, address: ArenaAddress) -> Option<&[u8]> {
        self.pages.get(address.page() as usize)?.get(address.offset() as usize..)
    }

    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of bytes stored.
    pub fn size_in_bytes(&self) -> usize {
        self.pages.iter().map(|p| p.len()).sum()
    }
}

#[cfg(test)]
mod tests;
