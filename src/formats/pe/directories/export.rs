//! Export table resolution over a mapped image

use std::collections::hash_map;
use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::config::ResolverConfig;
use crate::formats::pe::types::ExportDirectoryView;
use crate::memory::{c_str_bytes, LoadedModule, MemoryProbe};

/// A resolved export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportEntry {
    /// Biased ordinal (`OrdinalBase + index` into the function array)
    pub ordinal: u32,
    pub rva: u32,
    /// Absolute address in this process
    pub address: usize,
    /// The RVA points inside the export directory, i.e. at a forwarder
    /// string rather than code
    pub forwarded: bool,
}

/// Name to export mapping, immutable once resolved.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    by_name: HashMap<String, ExportEntry>,
}

impl ExportTable {
    /// Get export by name
    pub fn get(&self, name: &str) -> Option<&ExportEntry> {
        self.by_name.get(name)
    }

    /// Get export together with the stored key
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &ExportEntry)> {
        self.by_name
            .get_key_value(name)
            .map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Count of exports
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Get all export names, in no particular order
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.by_name.iter(),
        }
    }
}

/// Iterator over `(name, entry)` pairs of an [`ExportTable`]
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, String, ExportEntry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a ExportEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, entry)| (name.as_str(), entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a ExportTable {
    type Item = (&'a str, &'a ExportEntry);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walk the export directory's parallel arrays and build the name table.
///
/// For each name slot, in order:
/// - an unreadable name pointer, or a name with no terminator within
///   `max_name_len`, ends the scan for the whole module; later slots are
///   never inspected
/// - a name that is not purely alphanumeric is skipped
/// - an ordinal past the function array is skipped
/// - otherwise the name maps to `base + functions[ordinal]`; a repeated name
///   overwrites the earlier entry
///
/// Never fails. An empty table is for the caller to reject.
pub fn resolve(
    module: LoadedModule,
    view: &ExportDirectoryView,
    probe: &dyn MemoryProbe,
    config: &ResolverConfig,
) -> ExportTable {
    let functions = view.address_of_functions() as usize;
    let names = view.address_of_names() as usize;
    let ordinals = view.address_of_name_ordinals() as usize;
    let number_of_functions = view.number_of_functions();
    let export_dir = view.headers().export_directory();

    let count = view.scan_count(config.max_exports);
    let mut by_name = HashMap::with_capacity(count);

    for i in 0..count {
        // SAFETY: `i` is below the declared name count, so the slot lies in
        // the name pointer array, readable per the `LoadedModule` contract.
        let name_rva = unsafe { module.read_u32_at(names + i * 4) };
        let name_ptr = module.address_at(name_rva);

        if !probe.is_readable(name_ptr) {
            warn!(
                index = i,
                name_rva, "Unreadable export name; stopping export scan"
            );
            break;
        }

        if !probe.is_alphanumeric(name_ptr) {
            trace!(index = i, "Skipping decorated export name");
            continue;
        }

        // SAFETY: the probe vouched for the bytes up to the terminator.
        let Some(name) = (unsafe { c_str_bytes(name_ptr, config.max_name_len) }) else {
            warn!(
                index = i,
                name_rva, "Export name exceeds length limit; stopping export scan"
            );
            break;
        };
        let name = String::from_utf8_lossy(name).into_owned();

        let ordinal_index = unsafe { module.read_u16_at(ordinals + i * 2) } as u32;
        if ordinal_index >= number_of_functions {
            debug!(%name, ordinal_index, "Export ordinal outside function array");
            continue;
        }

        let rva = unsafe { module.read_u32_at(functions + ordinal_index as usize * 4) };
        let entry = ExportEntry {
            ordinal: view.ordinal_base().wrapping_add(ordinal_index),
            rva,
            address: module.address_at(rva),
            forwarded: export_dir.contains(rva),
        };
        trace!(%name, rva, "Resolved export");

        by_name.insert(name, entry);
    }

    ExportTable { by_name }
}
