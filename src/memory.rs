//! Raw access to a module image that is already mapped into this process.
//!
//! [`LoadedModule`] is a non-owning handle to an image base address. All
//! reads through it are unaligned little-endian reads relative to the base.
//! [`MemoryProbe`] answers whether a NUL-terminated name may be dereferenced
//! and whether it is purely alphanumeric.

use std::ptr::NonNull;

/// Non-owning handle to the base of a mapped image.
///
/// The handle never frees or unmaps the memory it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadedModule {
    base: NonNull<u8>,
}

// SAFETY: the handle is only ever used for reads of memory whose validity is
// guaranteed by the `from_ptr` contract, so sharing it across threads is sound.
unsafe impl Send for LoadedModule {}
unsafe impl Sync for LoadedModule {}

impl LoadedModule {
    /// Wrap a raw base address, returning `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `base` must point to an image that stays mapped and readable for as
    /// long as the handle, or any resolver built from it, is in use. Every
    /// header offset the validator follows (the DOS header, the NT headers at
    /// `e_lfanew`, the export directory and its arrays) must be readable.
    /// Once the NT headers validate, all `SizeOfImage` bytes from the base,
    /// as declared in the optional header, must be readable too; export
    /// names are probed across that whole range.
    pub unsafe fn from_ptr(base: *const u8) -> Option<Self> {
        NonNull::new(base as *mut u8).map(|base| Self { base })
    }

    /// Base address as an integer.
    pub fn base(&self) -> usize {
        self.base.as_ptr() as usize
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// Absolute address of a relative virtual address.
    #[inline(always)]
    pub fn address_at(&self, rva: u32) -> usize {
        self.base().wrapping_add(rva as usize)
    }

    /// # Safety
    ///
    /// `offset..offset + 2` must be readable relative to the base.
    #[inline(always)]
    pub(crate) unsafe fn read_u16_at(&self, offset: usize) -> u16 {
        let raw = unsafe { self.as_ptr().add(offset).cast::<[u8; 2]>().read_unaligned() };
        u16::from_le_bytes(raw)
    }

    /// # Safety
    ///
    /// `offset..offset + 4` must be readable relative to the base.
    #[inline(always)]
    pub(crate) unsafe fn read_u32_at(&self, offset: usize) -> u32 {
        let raw = unsafe { self.as_ptr().add(offset).cast::<[u8; 4]>().read_unaligned() };
        u32::from_le_bytes(raw)
    }
}

/// Read the bytes of a NUL-terminated string, excluding the terminator.
///
/// Returns `None` when no terminator occurs within `max_len` bytes.
///
/// # Safety
///
/// Every byte from `address` up to and including the first NUL, or the first
/// `max_len` bytes if that comes sooner, must be readable.
pub unsafe fn c_str_bytes<'a>(address: usize, max_len: usize) -> Option<&'a [u8]> {
    let ptr = address as *const u8;
    let mut len = 0;
    while len < max_len {
        // Byte-at-a-time so nothing past the terminator is touched.
        if unsafe { ptr.add(len).read() } == 0 {
            return Some(unsafe { std::slice::from_raw_parts(ptr, len) });
        }
        len += 1;
    }
    None
}

/// True for a non-empty run of ASCII letters and digits.
pub fn is_alphanumeric_name(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_alphanumeric)
}

/// Memory-probe service consulted for every export name.
///
/// # Safety
///
/// Implementors promise that whenever `is_readable(address)` returns true,
/// every byte from `address` through the first NUL terminator is readable.
/// The resolver dereferences such addresses without further checks.
pub unsafe trait MemoryProbe {
    /// Whether the NUL-terminated string at `address` can be read.
    fn is_readable(&self, address: usize) -> bool;

    /// Whether the string at `address` is non-empty and purely alphanumeric.
    ///
    /// Only called for addresses that `is_readable` accepted.
    fn is_alphanumeric(&self, address: usize) -> bool;
}

/// Probe that accepts names lying entirely inside the image.
///
/// A name is readable when it starts inside `[base, base + size_of_image)`
/// and its terminator occurs within `max_name_len` bytes without leaving
/// that range.
#[derive(Debug, Clone, Copy)]
pub struct ImageBoundsProbe {
    start: usize,
    end: usize,
    max_name_len: usize,
}

impl ImageBoundsProbe {
    /// # Safety
    ///
    /// All `size_of_image` bytes starting at the module base must be readable.
    pub unsafe fn new(module: LoadedModule, size_of_image: u32, max_name_len: usize) -> Self {
        let start = module.base();
        Self {
            start,
            end: start.saturating_add(size_of_image as usize),
            max_name_len,
        }
    }

    /// Bytes of the name at `address`, terminator excluded.
    fn name_bytes(&self, address: usize) -> Option<&[u8]> {
        if address < self.start || address >= self.end {
            return None;
        }
        let limit = self.end.min(address.saturating_add(self.max_name_len));
        // SAFETY: `address..limit` lies inside the image range promised
        // readable at construction.
        let window = unsafe { std::slice::from_raw_parts(address as *const u8, limit - address) };
        memchr::memchr(0, window).map(|len| &window[..len])
    }
}

unsafe impl MemoryProbe for ImageBoundsProbe {
    fn is_readable(&self, address: usize) -> bool {
        self.name_bytes(address).is_some()
    }

    fn is_alphanumeric(&self, address: usize) -> bool {
        self.name_bytes(address).is_some_and(is_alphanumeric_name)
    }
}
