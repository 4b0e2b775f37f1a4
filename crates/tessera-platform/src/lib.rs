// SPDX-License-Identifier: CEPL-1.0
//! Backend-agnostic contract between the GL driver and a native
//! context/surface platform.
use std::ffi::{c_void, CStr};
use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

mod fence;
mod handle;
mod swap_chain;

pub use fence::{Fence, FenceStatus};
pub use handle::{ConfigId, ContextId, DisplayId, SharedContext, SurfaceId, SyncId};
pub use swap_chain::{NativeWindow, SwapChain, SwapChainFlags, SwapChainKind};

/// Optional platform capabilities beyond swap chains and fences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    Streams,
    ExternalTextures,
    PresentationTime,
    OsVersion,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feature::Streams => "video streams",
            Feature::ExternalTextures => "external texture storage",
            Feature::PresentationTime => "presentation time hints",
            Feature::OsVersion => "OS version query",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{0} not supported by this platform")]
    Unsupported(Feature),
    #[error("binding GL entry points failed: {0}")]
    EntryPoints(String),
}

/// Native producer of stream frames (e.g. a camera or decoder surface).
#[derive(Clone, Copy, Debug)]
pub struct NativeStream(pub NonNull<c_void>);

#[derive(Debug)]
pub struct Stream(u64);

impl Stream {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct ExternalTexture(u64);

impl ExternalTexture {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// What the GL driver needs from the platform once it is running.
///
/// All calls happen on the thread that owns the rendering context.
/// Failures are logged by the platform and reported as `None`, `false`
/// or a status value.
pub trait OpenGlPlatform {
    /// Releases everything the platform owns. Later calls are no-ops.
    fn terminate(&mut self);

    /// Window-bound swap chain. Flags the platform cannot honour are cleared.
    fn create_swap_chain(
        &mut self,
        window: &NativeWindow,
        flags: &mut SwapChainFlags,
    ) -> Option<SwapChain>;

    /// Off-screen swap chain of the given size.
    fn create_headless_swap_chain(
        &mut self,
        width: u32,
        height: u32,
        flags: &mut SwapChainFlags,
    ) -> Option<SwapChain>;

    fn destroy_swap_chain(&mut self, swap_chain: SwapChain);

    /// Binds `draw`/`read` to the context. Both `None` leaves the binding alone.
    fn make_current(&mut self, draw: Option<&SwapChain>, read: Option<&SwapChain>) -> bool;

    /// Presents the last rendered frame of `swap_chain`.
    fn commit(&mut self, swap_chain: &SwapChain);

    fn can_create_fence(&self) -> bool {
        false
    }

    fn create_fence(&mut self) -> Fence {
        Fence::null()
    }

    fn destroy_fence(&mut self, _fence: Fence) {}

    fn wait_fence(&mut self, _fence: &Fence, _timeout: Duration) -> FenceStatus {
        FenceStatus::Error
    }

    fn supports(&self, _feature: Feature) -> bool {
        false
    }

    fn set_presentation_time(&mut self, _time_ns: i64) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(Feature::PresentationTime))
    }

    fn create_stream(&mut self, _native: NativeStream) -> Result<Stream, PlatformError> {
        Err(PlatformError::Unsupported(Feature::Streams))
    }

    fn destroy_stream(&mut self, _stream: Stream) {}

    fn attach(&mut self, _stream: &Stream, _texture: u32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(Feature::Streams))
    }

    fn detach(&mut self, _stream: &Stream) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(Feature::Streams))
    }

    /// Latches the newest stream frame, returning its timestamp.
    fn update_tex_image(&mut self, _stream: &Stream) -> Result<i64, PlatformError> {
        Err(PlatformError::Unsupported(Feature::Streams))
    }

    fn create_external_texture_storage(&mut self) -> Result<ExternalTexture, PlatformError> {
        Err(PlatformError::Unsupported(Feature::ExternalTextures))
    }

    fn destroy_external_texture_storage(&mut self, _texture: ExternalTexture) {}

    fn os_version(&self) -> Result<u32, PlatformError> {
        Err(PlatformError::Unsupported(Feature::OsVersion))
    }
}

/// Builds the GL driver once a platform has a current context.
pub trait DriverFactory {
    type Driver;

    /// Resolves GL entry points through `loader`. Called once, right after
    /// the context first becomes current.
    fn bind_entry_points(
        &mut self,
        loader: &dyn Fn(&CStr) -> *const c_void,
    ) -> Result<(), PlatformError>;

    /// Returns `None` if the driver cannot be created.
    fn create_driver(
        self,
        platform: &mut dyn OpenGlPlatform,
        shared_context: Option<SharedContext>,
    ) -> Option<Self::Driver>;
}
