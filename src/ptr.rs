//! Ownership-tagged pointers
//!
//! Every pointer that crosses the boundary is one of four kinds:
//!
//! | Type | Meaning | Release obligation |
//! |---|---|---|
//! | [`Borrowed<T>`] | valid for the call (or the documented scope) | none |
//! | [`Owned<T>`] | uniquely owned boxed object | receiver frees it once |
//! | [`BorrowedRc<T>`] | borrowed ref-counted object | none; `to_arc` acquires a new reference |
//! | [`OwnedRc<T>`] | one strong reference of a ref-counted object | receiver releases it once |
//!
//! All four are `#[repr(transparent)]` over a raw pointer, so they can appear
//! directly in `extern "C"` signatures. `Owned` and `OwnedRc` are move-only
//! and release on drop: the one reference they carry is released exactly once,
//! either by Rust code dropping it or by foreign code calling the matching
//! `rtc_bridge_release_*` function.
//!
//! [`Context`] is the opaque boundary-side pointer that callback tables receive
//! as their first argument. The bridge never dereferences it.

use libc::c_void;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Pointer valid only for a documented scope; never released by the receiver
#[repr(transparent)]
pub struct Borrowed<T>(*const T);

impl<T> Borrowed<T> {
    pub const fn null() -> Self {
        Self(std::ptr::null())
    }

    pub fn from_ptr(ptr: *const T) -> Self {
        Self(ptr)
    }

    pub fn from_ref(value: &T) -> Self {
        Self(value as *const T)
    }

    pub fn as_ptr(&self) -> *const T {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Dereference the pointer
    ///
    /// # Safety
    ///
    /// The pointer must be null or point to a live `T` for all of `'a`.
    pub unsafe fn as_ref<'a>(&self) -> Option<&'a T> {
        self.0.as_ref()
    }
}

impl<T> Clone for Borrowed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Borrowed<T> {}

impl<T> fmt::Debug for Borrowed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Borrowed({:p})", self.0)
    }
}

// The boundary guarantees the pointee is usable from engine threads.
unsafe impl<T: Sync> Send for Borrowed<T> {}
unsafe impl<T: Sync> Sync for Borrowed<T> {}

/// Uniquely owned boxed object; dropping it frees the object
#[repr(transparent)]
pub struct Owned<T>(*mut T);

impl<T> Owned<T> {
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    pub fn from_box(value: Box<T>) -> Self {
        Self(Box::into_raw(value))
    }

    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn borrow(&self) -> Borrowed<T> {
        Borrowed::from_ptr(self.0)
    }

    /// Take the object back; `None` for a null pointer
    pub fn into_box(self) -> Option<Box<T>> {
        let ptr = self.0;
        mem::forget(self);
        if ptr.is_null() {
            None
        } else {
            // Non-null `Owned` pointers only come from `Box::into_raw`.
            Some(unsafe { Box::from_raw(ptr) })
        }
    }
}

impl<T> Drop for Owned<T> {
    fn drop(&mut self) {
        if !self.0.is_null() {
            drop(unsafe { Box::from_raw(self.0) });
        }
    }
}

impl<T> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned({:p})", self.0)
    }
}

unsafe impl<T: Send> Send for Owned<T> {}
unsafe impl<T: Sync> Sync for Owned<T> {}

/// Borrowed pointer to an `Arc`-managed object
#[repr(transparent)]
pub struct BorrowedRc<T>(*const T);

impl<T> BorrowedRc<T> {
    pub const fn null() -> Self {
        Self(std::ptr::null())
    }

    pub fn from_arc(value: &Arc<T>) -> Self {
        Self(Arc::as_ptr(value))
    }

    pub fn from_ptr(ptr: *const T) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *const T {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Dereference the pointer
    ///
    /// # Safety
    ///
    /// The pointer must be null or come from a live `Arc<T>` that outlives `'a`.
    pub unsafe fn as_ref<'a>(&self) -> Option<&'a T> {
        self.0.as_ref()
    }

    /// Acquire an independent strong reference
    ///
    /// # Safety
    ///
    /// The pointer must be null or come from a live `Arc<T>`.
    pub unsafe fn to_arc(&self) -> Option<Arc<T>> {
        if self.0.is_null() {
            return None;
        }
        Arc::increment_strong_count(self.0);
        Some(Arc::from_raw(self.0))
    }
}

impl<T> Clone for BorrowedRc<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BorrowedRc<T> {}

impl<T> fmt::Debug for BorrowedRc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BorrowedRc({:p})", self.0)
    }
}

unsafe impl<T: Send + Sync> Send for BorrowedRc<T> {}
unsafe impl<T: Send + Sync> Sync for BorrowedRc<T> {}

/// One strong reference to an `Arc`-managed object, transferred to the holder
#[repr(transparent)]
#[must_use = "dropping an OwnedRc releases the reference it carries"]
pub struct OwnedRc<T>(*const T);

impl<T> OwnedRc<T> {
    pub fn from_arc(value: Arc<T>) -> Self {
        Self(Arc::into_raw(value))
    }

    pub const fn null() -> Self {
        Self(std::ptr::null())
    }

    /// Adopt a reference produced by [`OwnedRc::into_raw`]
    ///
    /// # Safety
    ///
    /// `ptr` must be null or carry one strong reference that nobody else
    /// will release.
    pub unsafe fn from_raw(ptr: *const T) -> Self {
        Self(ptr)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *const T {
        self.0
    }

    pub fn borrow(&self) -> BorrowedRc<T> {
        BorrowedRc::from_ptr(self.0)
    }

    pub fn as_ref(&self) -> Option<&T> {
        // We hold a strong reference, so the pointee is alive.
        unsafe { self.0.as_ref() }
    }

    /// Convert back into an `Arc` without touching the count
    pub fn into_arc(self) -> Option<Arc<T>> {
        let ptr = self.into_raw();
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { Arc::from_raw(ptr) })
        }
    }

    /// Hand the reference to foreign code, which must release it later
    pub fn into_raw(self) -> *const T {
        let ptr = self.0;
        mem::forget(self);
        ptr
    }
}

impl<T> Drop for OwnedRc<T> {
    fn drop(&mut self) {
        if !self.0.is_null() {
            drop(unsafe { Arc::from_raw(self.0) });
        }
    }
}

impl<T> fmt::Debug for OwnedRc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnedRc({:p})", self.0)
    }
}

unsafe impl<T: Send + Sync> Send for OwnedRc<T> {}
unsafe impl<T: Send + Sync> Sync for OwnedRc<T> {}

/// Opaque boundary context passed back to every callback
///
/// The boundary guarantees it outlives the object it was registered with and
/// that its callbacks may be invoked from any engine thread.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Context(*mut c_void);

impl Context {
    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({:p})", self.0)
    }
}

unsafe impl Send for Context {}
unsafe impl Sync for Context {}
