// SPDX-License-Identifier: CEPL-1.0
//! The slice of EGL the platform drives. Everything native goes through
//! [`EglApi`], so the lifecycle logic can run against a recording double.
use std::ffi::{c_void, CStr};

use tessera_platform::{
    ConfigId, ContextId, DisplayId, NativeWindow, SharedContext, SurfaceId, SyncId,
};

use crate::EglError;

/// `EGL_FOREVER_KHR`.
pub const FOREVER_NS: u64 = u64::MAX;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EglVersion {
    pub major: i32,
    pub minor: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderApi {
    /// Desktop OpenGL.
    OpenGl,
}

/// Framebuffer configuration requested from `eglChooseConfig`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigRequest {
    pub api: RenderApi,
    /// Requires pbuffer support rather than window support.
    pub offscreen: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    pub depth: u8,
}

impl ConfigRequest {
    pub const DEFAULT: Self = Self {
        api: RenderApi::OpenGl,
        offscreen: true,
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
        depth: 24,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextVersion {
    pub major: u8,
    pub minor: u8,
}

/// `EGL_SWAP_BEHAVIOR` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapBehavior {
    /// Color buffer contents are undefined after a swap.
    BufferDestroyed,
}

/// Outcome of `eglClientWaitSync`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncWait {
    ConditionSatisfied,
    TimeoutExpired,
    Failed(EglError),
}

pub trait EglApi {
    /// The default display, or [`DisplayId::NULL`] if there is none.
    fn get_display(&mut self) -> DisplayId;

    fn initialize(&mut self, display: DisplayId) -> Result<EglVersion, EglError>;

    /// First config matching `request`.
    fn choose_config(
        &mut self,
        display: DisplayId,
        request: &ConfigRequest,
    ) -> Result<ConfigId, EglError>;

    fn bind_api(&mut self, api: RenderApi) -> Result<(), EglError>;

    fn create_pbuffer_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId, EglError>;

    fn create_window_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        window: &NativeWindow,
    ) -> Result<SurfaceId, EglError>;

    fn set_swap_behavior(
        &mut self,
        display: DisplayId,
        surface: SurfaceId,
        behavior: SwapBehavior,
    ) -> Result<(), EglError>;

    fn create_context(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        shared: Option<SharedContext>,
        version: ContextVersion,
    ) -> Result<ContextId, EglError>;

    /// A null `context` with null surfaces releases the current context.
    fn make_current(
        &mut self,
        display: DisplayId,
        draw: SurfaceId,
        read: SurfaceId,
        context: ContextId,
    ) -> Result<(), EglError>;

    fn destroy_surface(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError>;

    fn destroy_context(&mut self, display: DisplayId, context: ContextId) -> Result<(), EglError>;

    fn swap_buffers(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError>;

    fn terminate(&mut self, display: DisplayId) -> Result<(), EglError>;

    fn release_thread(&mut self);

    /// A fence sync, or [`SyncId::NULL`] if fence syncs are unavailable.
    fn create_sync(&mut self, display: DisplayId) -> SyncId;

    fn destroy_sync(&mut self, display: DisplayId, sync: SyncId) -> Result<(), EglError>;

    fn client_wait_sync(&mut self, display: DisplayId, sync: SyncId, timeout_ns: u64) -> SyncWait;

    /// Null when `name` cannot be resolved.
    fn get_proc_address(&self, name: &CStr) -> *const c_void;
}
