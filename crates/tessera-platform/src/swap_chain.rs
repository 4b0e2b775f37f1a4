// SPDX-License-Identifier: CEPL-1.0
use bitflags::bitflags;
use raw_window_handle::RawWindowHandle;

use crate::SurfaceId;

bitflags! {
    /// Capabilities requested for a swap chain. Platforms clear the bits they
    /// cannot honour, so callers should read the flags back after creation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SwapChainFlags: u64 {
        /// Alpha-composited with the content behind the window.
        const TRANSPARENT = 1 << 0;
        /// Contents can be read back with `glReadPixels`.
        const READABLE = 1 << 1;
        /// Native window is an XCB window rather than Xlib.
        const ENABLE_XCB = 1 << 2;
    }
}

/// A window handed over by the windowing system, with its current extent.
#[derive(Clone, Copy, Debug)]
pub struct NativeWindow {
    pub handle: RawWindowHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapChainKind {
    Window,
    Headless { width: u32, height: u32 },
}

/// A presentable surface. Not `Clone`: it is consumed by
/// [`OpenGlPlatform::destroy_swap_chain`](crate::OpenGlPlatform::destroy_swap_chain).
#[derive(Debug)]
pub struct SwapChain {
    surface: SurfaceId,
    kind: SwapChainKind,
}

impl SwapChain {
    /// For platform implementations wrapping a freshly created surface.
    /// Applications get swap chains from [`OpenGlPlatform`](crate::OpenGlPlatform).
    #[doc(hidden)]
    pub fn new(surface: SurfaceId, kind: SwapChainKind) -> Self {
        Self { surface, kind }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn kind(&self) -> SwapChainKind {
        self.kind
    }
}
