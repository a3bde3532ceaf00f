//! PE header validation for images mapped in memory

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{ImportError, Result};
use crate::formats::pe::types::*;
use crate::memory::LoadedModule;

/// Validate the image at `module` and locate its export directory.
///
/// Checks run in order, each one gating the reads of the next: DOS
/// signature, NT signature, then a non-zero export directory entry. With
/// `enforce_image_bounds` set, the NT headers, the export directory and its
/// three arrays must also lie inside `SizeOfImage`.
pub fn validate(
    module: LoadedModule,
    module_name: &str,
    config: &ResolverConfig,
) -> Result<ExportDirectoryView> {
    // SAFETY: the DOS header is readable per the `LoadedModule` contract.
    let e_magic = unsafe { module.read_u16_at(0) };
    if e_magic != DOS_SIGNATURE {
        return Err(ImportError::InvalidDosSignature {
            module: module_name.to_string(),
        });
    }

    let e_lfanew = unsafe { module.read_u32_at(E_LFANEW_OFFSET) };
    let nt = e_lfanew as usize;

    let signature = unsafe { module.read_u32_at(nt) };
    if signature != NT_SIGNATURE {
        return Err(ImportError::InvalidNtSignature {
            module: module_name.to_string(),
        });
    }

    let opt = nt + OPTIONAL_HEADER_OFFSET;
    let optional_magic = unsafe { module.read_u16_at(opt) };
    if optional_magic != HOST_OPTIONAL_MAGIC {
        warn!(
            module = %module_name,
            magic = optional_magic,
            "Optional header magic does not match host; reading host layout"
        );
    }
    let size_of_image = unsafe { module.read_u32_at(opt + SIZE_OF_IMAGE_OFFSET) };

    let export_slot =
        opt + HOST_DATA_DIRECTORY_OFFSET + IMAGE_DIRECTORY_ENTRY_EXPORT * DATA_DIRECTORY_ENTRY_SIZE;
    if config.enforce_image_bounds {
        check_bounds(
            module_name,
            "NT headers",
            e_lfanew as u64,
            (export_slot + DATA_DIRECTORY_ENTRY_SIZE - nt) as u64,
            size_of_image,
        )?;
    }

    let export = DataDirectory {
        virtual_address: unsafe { module.read_u32_at(export_slot) },
        size: unsafe { module.read_u32_at(export_slot + 4) },
    };
    if export.virtual_address == 0 {
        return Err(ImportError::NoExportDirectory {
            module: module_name.to_string(),
        });
    }

    let headers = ImageHeaders {
        e_lfanew,
        optional_magic,
        size_of_image,
        export,
    };

    if config.enforce_image_bounds {
        check_bounds(
            module_name,
            "export directory",
            export.virtual_address as u64,
            EXPORT_DIRECTORY_SIZE as u64,
            size_of_image,
        )?;
    }

    let directory = parse_export_directory(module, export.virtual_address as usize);

    if config.enforce_image_bounds {
        let names = directory.number_of_names as u64;
        check_bounds(
            module_name,
            "function address array",
            directory.address_of_functions as u64,
            directory.number_of_functions as u64 * 4,
            size_of_image,
        )?;
        check_bounds(
            module_name,
            "name pointer array",
            directory.address_of_names as u64,
            names * 4,
            size_of_image,
        )?;
        check_bounds(
            module_name,
            "name ordinal array",
            directory.address_of_name_ordinals as u64,
            names * 2,
            size_of_image,
        )?;
    }

    debug!(
        module = %module_name,
        export_rva = export.virtual_address,
        functions = directory.number_of_functions,
        names = directory.number_of_names,
        "Validated image headers"
    );

    Ok(ExportDirectoryView { headers, directory })
}

/// Read `IMAGE_EXPORT_DIRECTORY` at `offset` from the base.
fn parse_export_directory(module: LoadedModule, offset: usize) -> ExportDirectory {
    // SAFETY: the export directory is readable per the `LoadedModule` contract.
    unsafe {
        ExportDirectory {
            name_rva: module.read_u32_at(offset + 12),
            ordinal_base: module.read_u32_at(offset + 16),
            number_of_functions: module.read_u32_at(offset + 20),
            number_of_names: module.read_u32_at(offset + 24),
            address_of_functions: module.read_u32_at(offset + 28),
            address_of_names: module.read_u32_at(offset + 32),
            address_of_name_ordinals: module.read_u32_at(offset + 36),
        }
    }
}

fn check_bounds(
    module_name: &str,
    what: &'static str,
    rva: u64,
    len: u64,
    size_of_image: u32,
) -> Result<()> {
    if rva + len > size_of_image as u64 {
        return Err(ImportError::OutOfImageBounds {
            module: module_name.to_string(),
            what,
            rva,
            size_of_image,
        });
    }
    Ok(())
}
