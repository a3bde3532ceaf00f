//! Per-module export resolver.
//!
//! Construction validates the image, scans its export table once and keeps
//! the resulting name table. Lookups afterwards only consult that table; the
//! image headers are never walked again.
//!
//! A constructed [`Resolver`] is immutable and may be shared across threads.
//! Constructing several resolvers over the same module concurrently is left
//! to the caller to coordinate.

use tracing::{debug, debug_span, info};

use crate::config::ResolverConfig;
use crate::error::{ImportError, Result};
use crate::formats::pe::{self, ExportDirectoryView, ExportEntry, ExportTable};
use crate::invoke::{Export, FnPtr};
use crate::loader::ModuleLoader;
use crate::memory::{c_str_bytes, ImageBoundsProbe, LoadedModule, MemoryProbe};

/// Resolved exports of one loaded module.
#[derive(Debug)]
pub struct Resolver {
    module_name: String,
    module: LoadedModule,
    declared_name: Option<String>,
    exports: ExportTable,
}

impl Resolver {
    /// Load `module_name` through `loader` and resolve its exports with the
    /// default configuration.
    pub fn new<L>(module_name: &str, loader: &L) -> Result<Self>
    where
        L: ModuleLoader + ?Sized,
    {
        Self::with_config(module_name, loader, ResolverConfig::default())
    }

    /// Like [`Resolver::new`], with an explicit configuration.
    ///
    /// Export names are probed with an [`ImageBoundsProbe`] over the image's
    /// declared `SizeOfImage`.
    pub fn with_config<L>(module_name: &str, loader: &L, config: ResolverConfig) -> Result<Self>
    where
        L: ModuleLoader + ?Sized,
    {
        let module = load(module_name, loader)?;
        Self::build(module_name, module, None, &config)
    }

    /// Resolve with a caller-supplied memory probe.
    pub fn with_probe<L, P>(
        module_name: &str,
        loader: &L,
        probe: &P,
        config: ResolverConfig,
    ) -> Result<Self>
    where
        L: ModuleLoader + ?Sized,
        P: MemoryProbe,
    {
        let module = load(module_name, loader)?;
        Self::build(module_name, module, Some(probe as &dyn MemoryProbe), &config)
    }

    /// Resolve an already obtained module handle, bypassing the loader.
    pub fn from_module(
        module_name: &str,
        module: LoadedModule,
        config: ResolverConfig,
    ) -> Result<Self> {
        Self::build(module_name, module, None, &config)
    }

    fn build(
        module_name: &str,
        module: LoadedModule,
        probe: Option<&dyn MemoryProbe>,
        config: &ResolverConfig,
    ) -> Result<Self> {
        let span = debug_span!("resolve_module", module = %module_name, base = module.base());
        let _guard = span.enter();

        let view = pe::validate(module, module_name, config)?;

        // SAFETY: `LoadedModule::from_ptr` requires all `SizeOfImage` bytes
        // from the base to be readable.
        let bounds = unsafe {
            ImageBoundsProbe::new(module, view.headers().size_of_image(), config.max_name_len)
        };
        let probe = probe.unwrap_or(&bounds as &dyn MemoryProbe);

        let exports = pe::resolve(module, &view, probe, config);
        if exports.is_empty() {
            return Err(ImportError::NoExportsResolved {
                module: module_name.to_string(),
            });
        }

        let declared_name = read_declared_name(module, &view, probe, config);
        info!(
            module = %module_name,
            exports = exports.len(),
            declared = view.number_of_functions(),
            scanned = view.scan_count(config.max_exports),
            "Resolved module exports"
        );

        Ok(Self {
            module_name: module_name.to_string(),
            module,
            declared_name,
            exports,
        })
    }

    /// Bind the export `function` to the signature `F`.
    ///
    /// Repeated lookups of the same name yield equal handles.
    pub fn lookup<F: FnPtr>(&self, function: &str) -> Result<Export<'_, F>> {
        let (name, entry) =
            self.exports
                .get_key_value(function)
                .ok_or_else(|| ImportError::SymbolNotFound {
                    function: function.to_string(),
                    module: self.module_name.clone(),
                })?;
        debug!(function = name, address = entry.address, "Bound export");
        Ok(Export::new(name, entry.address))
    }

    /// Absolute address of an export
    pub fn address_of(&self, function: &str) -> Option<usize> {
        self.exports.get(function).map(|e| e.address)
    }

    pub fn entry(&self, function: &str) -> Option<&ExportEntry> {
        self.exports.get(function)
    }

    pub fn contains(&self, function: &str) -> bool {
        self.exports.contains(function)
    }

    /// Name the resolver was constructed with
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Module name recorded in the export directory, if readable
    pub fn declared_name(&self) -> Option<&str> {
        self.declared_name.as_deref()
    }

    pub fn module(&self) -> LoadedModule {
        self.module
    }

    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    pub fn names(&self) -> Vec<&str> {
        self.exports.names()
    }

    /// Count of resolved exports; never zero
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    pub fn iter(&self) -> pe::directories::export::Iter<'_> {
        self.exports.iter()
    }
}

fn load<L>(module_name: &str, loader: &L) -> Result<LoadedModule>
where
    L: ModuleLoader + ?Sized,
{
    loader.load(module_name).ok_or_else(|| ImportError::ModuleLoad {
        module: module_name.to_string(),
    })
}

fn read_declared_name(
    module: LoadedModule,
    view: &ExportDirectoryView,
    probe: &dyn MemoryProbe,
    config: &ResolverConfig,
) -> Option<String> {
    if view.name_rva() == 0 {
        return None;
    }
    let address = module.address_at(view.name_rva());
    if !probe.is_readable(address) {
        return None;
    }
    // SAFETY: the probe vouched for the bytes up to the terminator.
    unsafe { c_str_bytes(address, config.max_name_len) }
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}
