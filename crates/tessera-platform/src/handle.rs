// SPDX-License-Identifier: CEPL-1.0
//! Opaque native identifiers. Raw value `0` is the null handle of every kind.

use std::ffi::c_void;
use std::ptr::NonNull;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const NULL: Self = Self(0);

            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

native_handle!(
    /// Connection to the native display.
    DisplayId
);
native_handle!(
    /// Negotiated framebuffer configuration.
    ConfigId
);
native_handle!(
    /// Rendering context owned by a platform.
    ContextId
);
native_handle!(
    /// Window-bound or off-screen surface.
    SurfaceId
);
native_handle!(
    /// GPU/CPU sync object.
    SyncId
);

/// A native context owned by someone else, passed through untouched at
/// context creation so that both contexts share objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedContext(NonNull<c_void>);

impl SharedContext {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl From<NonNull<c_void>> for SharedContext {
    fn from(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }
}
