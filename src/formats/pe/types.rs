//! Core PE layout constants and read-only header views

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const NT_SIGNATURE: u32 = 0x0000_4550; // PE\0\0
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

// Data directory indices
pub const IMAGE_DIRECTORY_ENTRY_EXPORT: usize = 0;

// Offsets relative to the DOS header
pub const DOS_HEADER_SIZE: usize = 64;
pub const E_LFANEW_OFFSET: usize = 0x3C;

// Offsets relative to the NT headers
pub const OPTIONAL_HEADER_OFFSET: usize = 24; // 4 (signature) + 20 (COFF)

// Offsets relative to the optional header
pub const SIZE_OF_IMAGE_OFFSET: usize = 56;
pub const DATA_DIRECTORY_OFFSET_PE32: usize = 96;
pub const DATA_DIRECTORY_OFFSET_PE32PLUS: usize = 112;
pub const DATA_DIRECTORY_ENTRY_SIZE: usize = 8;

/// Size of `IMAGE_EXPORT_DIRECTORY`
pub const EXPORT_DIRECTORY_SIZE: usize = 40;

/// Optional header magic matching this process's pointer width.
#[cfg(target_pointer_width = "64")]
pub const HOST_OPTIONAL_MAGIC: u16 = PE32PLUS_MAGIC;
#[cfg(not(target_pointer_width = "64"))]
pub const HOST_OPTIONAL_MAGIC: u16 = PE32_MAGIC;

/// Data directory table offset for this process's optional header layout.
#[cfg(target_pointer_width = "64")]
pub const HOST_DATA_DIRECTORY_OFFSET: usize = DATA_DIRECTORY_OFFSET_PE32PLUS;
#[cfg(not(target_pointer_width = "64"))]
pub const HOST_DATA_DIRECTORY_OFFSET: usize = DATA_DIRECTORY_OFFSET_PE32;

/// Data directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    /// Whether `rva` falls inside the directory's range.
    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && (rva as u64) < self.virtual_address as u64 + self.size as u64
    }
}

/// Header fields read while validating an image.
///
/// Each field is only read after the header it lives in passed its
/// signature check.
#[derive(Debug, Clone, Copy)]
pub struct ImageHeaders {
    pub(crate) e_lfanew: u32,
    pub(crate) optional_magic: u16,
    pub(crate) size_of_image: u32,
    pub(crate) export: DataDirectory,
}

impl ImageHeaders {
    /// Offset of the NT headers from the image base
    pub fn nt_offset(&self) -> u32 {
        self.e_lfanew
    }

    pub fn optional_magic(&self) -> u16 {
        self.optional_magic
    }

    pub fn size_of_image(&self) -> u32 {
        self.size_of_image
    }

    /// The export data directory entry
    pub fn export_directory(&self) -> DataDirectory {
        self.export
    }
}

/// `IMAGE_EXPORT_DIRECTORY` fields used by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct ExportDirectory {
    pub(crate) name_rva: u32,
    pub(crate) ordinal_base: u32,
    pub(crate) number_of_functions: u32,
    pub(crate) number_of_names: u32,
    pub(crate) address_of_functions: u32,
    pub(crate) address_of_names: u32,
    pub(crate) address_of_name_ordinals: u32,
}

/// Validated view of an image's export directory.
///
/// Only produced by [`crate::formats::pe::headers::validate`], so holding
/// one means the DOS and NT signatures were checked and the export
/// directory entry is present.
#[derive(Debug, Clone, Copy)]
pub struct ExportDirectoryView {
    pub(crate) headers: ImageHeaders,
    pub(crate) directory: ExportDirectory,
}

impl ExportDirectoryView {
    pub fn headers(&self) -> &ImageHeaders {
        &self.headers
    }

    /// RVA of the module's own name string, 0 if absent
    pub fn name_rva(&self) -> u32 {
        self.directory.name_rva
    }

    pub fn ordinal_base(&self) -> u32 {
        self.directory.ordinal_base
    }

    pub fn number_of_functions(&self) -> u32 {
        self.directory.number_of_functions
    }

    pub fn number_of_names(&self) -> u32 {
        self.directory.number_of_names
    }

    /// RVA of the function address array
    pub fn address_of_functions(&self) -> u32 {
        self.directory.address_of_functions
    }

    /// RVA of the name pointer array
    pub fn address_of_names(&self) -> u32 {
        self.directory.address_of_names
    }

    /// RVA of the name-to-ordinal array
    pub fn address_of_name_ordinals(&self) -> u32 {
        self.directory.address_of_name_ordinals
    }

    /// Number of name entries the scan visits.
    ///
    /// The declared function count, clamped to the name count so reads stay
    /// inside the name and ordinal arrays, and to `max_exports`.
    pub fn scan_count(&self, max_exports: usize) -> usize {
        (self.directory.number_of_functions as usize)
            .min(self.directory.number_of_names as usize)
            .min(max_exports)
    }
}
