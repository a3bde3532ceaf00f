//! Typed handles to resolved exports.
//!
//! An [`Export`] binds a resolved address to a caller-chosen function
//! pointer type. Nothing checks that the chosen signature matches the real
//! function; calling through a mismatched signature is undefined behavior
//! and entirely the caller's responsibility.

use std::fmt;
use std::marker::PhantomData;

/// Function pointer types an export can be bound to.
///
/// Implemented for `extern "system"` and `unsafe extern "system"` function
/// pointers of up to eight parameters, the calling convention of OS API
/// entry points.
///
/// # Safety
///
/// Implementors must be plain function pointers of pointer width.
pub unsafe trait FnPtr: Copy {
    /// # Safety
    ///
    /// `address` must be the entry point of a function whose parameters,
    /// return type and calling convention match `Self`.
    unsafe fn from_address(address: usize) -> Self;
}

macro_rules! impl_fn_ptr {
    ($($arg:ident),*) => {
        unsafe impl<R, $($arg),*> FnPtr for extern "system" fn($($arg),*) -> R {
            #[inline(always)]
            unsafe fn from_address(address: usize) -> Self {
                unsafe { std::mem::transmute_copy::<usize, Self>(&address) }
            }
        }

        unsafe impl<R, $($arg),*> FnPtr for unsafe extern "system" fn($($arg),*) -> R {
            #[inline(always)]
            unsafe fn from_address(address: usize) -> Self {
                unsafe { std::mem::transmute_copy::<usize, Self>(&address) }
            }
        }
    };
}

impl_fn_ptr!();
impl_fn_ptr!(A);
impl_fn_ptr!(A, B);
impl_fn_ptr!(A, B, C);
impl_fn_ptr!(A, B, C, D);
impl_fn_ptr!(A, B, C, D, E);
impl_fn_ptr!(A, B, C, D, E, F);
impl_fn_ptr!(A, B, C, D, E, F, G);
impl_fn_ptr!(A, B, C, D, E, F, G, H);

const _: () = assert!(std::mem::size_of::<extern "system" fn()>() == std::mem::size_of::<usize>());

/// A resolved export bound to the signature `F`.
///
/// Borrowed from the resolver that produced it, so it cannot outlive the
/// table it was looked up in. Two handles are equal when they point at the
/// same address.
pub struct Export<'r, F: FnPtr> {
    name: &'r str,
    address: usize,
    _signature: PhantomData<F>,
}

impl<'r, F: FnPtr> Export<'r, F> {
    pub(crate) fn new(name: &'r str, address: usize) -> Self {
        Self {
            name,
            address,
            _signature: PhantomData,
        }
    }

    pub fn name(&self) -> &'r str {
        self.name
    }

    pub fn address(&self) -> usize {
        self.address
    }

    /// The export as a callable function pointer.
    ///
    /// # Safety
    ///
    /// `F` must match the exported function's real signature and calling
    /// convention, and the module must still be mapped when it is called.
    pub unsafe fn get(&self) -> F {
        unsafe { F::from_address(self.address) }
    }
}

impl<F: FnPtr> Clone for Export<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: FnPtr> Copy for Export<'_, F> {}

impl<F: FnPtr> PartialEq for Export<'_, F> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<F: FnPtr> Eq for Export<'_, F> {}

impl<F: FnPtr> fmt::Debug for Export<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("name", &self.name)
            .field("address", &format_args!("{:#x}", self.address))
            .finish()
    }
}
