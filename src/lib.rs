//! Resolve exported functions of an already loaded PE module by walking its
//! export table in memory, and bind them to typed function pointers.
//!
//! ```no_run
//! use peimport::{LoadedModule, ModuleRegistry, Resolver};
//!
//! # fn base_of_kernel32() -> *const u8 { std::ptr::null() }
//! let mut registry = ModuleRegistry::new();
//! // SAFETY: the module stays mapped for the life of the resolver.
//! if let Some(module) = unsafe { LoadedModule::from_ptr(base_of_kernel32()) } {
//!     registry.register("kernel32.dll", module);
//! }
//!
//! let kernel32 = Resolver::new("kernel32.dll", &registry)?;
//! let tick = kernel32.lookup::<unsafe extern "system" fn() -> u32>("GetTickCount")?;
//! let uptime = unsafe { (tick.get())() };
//! # let _ = uptime;
//! # Ok::<(), peimport::ImportError>(())
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod invoke;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::{ImportError, Result};
pub use formats::pe::{ExportDirectoryView, ExportEntry, ExportTable};
pub use invoke::{Export, FnPtr};
pub use loader::{ModuleLoader, ModuleRegistry};
pub use memory::{ImageBoundsProbe, LoadedModule, MemoryProbe};
pub use resolver::Resolver;
