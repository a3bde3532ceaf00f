//! Loader service: maps a module name to the base of its mapped image.

use std::collections::HashMap;

use crate::memory::LoadedModule;

/// Source of module base addresses.
///
/// Returning `None` means the module could not be loaded.
pub trait ModuleLoader {
    fn load(&self, name: &str) -> Option<LoadedModule>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&str) -> Option<LoadedModule>,
{
    fn load(&self, name: &str) -> Option<LoadedModule> {
        self(name)
    }
}

/// In-process table of already mapped modules.
///
/// Names are matched ASCII case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, LoadedModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, returning the handle it replaced, if any.
    pub fn register(&mut self, name: &str, module: LoadedModule) -> Option<LoadedModule> {
        self.modules.insert(name.to_ascii_lowercase(), module)
    }

    pub fn unregister(&mut self, name: &str) -> Option<LoadedModule> {
        self.modules.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, name: &str) -> Option<LoadedModule> {
        self.modules.get(&name.to_ascii_lowercase()).copied()
    }
}
