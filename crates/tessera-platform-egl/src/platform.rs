// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;
use std::time::Duration;

use tessera_platform::{
    ConfigId, ContextId, DisplayId, DriverFactory, Fence, FenceStatus, NativeWindow,
    OpenGlPlatform, PlatformError, SharedContext, SurfaceId, SwapChain, SwapChainFlags,
    SwapChainKind,
};
use tracing::{debug, error, info, warn};

use crate::api::{
    ConfigRequest, ContextVersion, EglApi, EglVersion, RenderApi, SwapBehavior, SyncWait,
    FOREVER_NS,
};
use crate::EglError;

pub const CONTEXT_VERSION: ContextVersion = ContextVersion { major: 4, minor: 1 };

/// Size of the pbuffer kept bound while no swap chain is.
const DUMMY_EXTENT: u32 = 1;

/// The (draw, read) pair last bound to the context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentBinding {
    pub draw: SurfaceId,
    pub read: SurfaceId,
}

impl CurrentBinding {
    pub const NONE: Self = Self {
        draw: SurfaceId::NULL,
        read: SurfaceId::NULL,
    };
}

#[derive(Debug, thiserror::Error)]
enum BringUpError {
    #[error("{call} failed with {source}")]
    Egl {
        call: &'static str,
        source: EglError,
    },
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("driver factory produced no driver")]
    NoDriver,
}

fn failed(call: &'static str) -> impl FnOnce(EglError) -> BringUpError {
    move |source| BringUpError::Egl { call, source }
}

fn timeout_ns(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(FOREVER_NS)
}

/// EGL-backed [`OpenGlPlatform`] for Linux.
///
/// Owns the display connection, the config, one GL 4.1 context and a 1x1
/// pbuffer that stays bound whenever no swap chain is. Must only be used
/// from the thread the context is current on.
pub struct PlatformEgl<E: EglApi> {
    egl: E,
    display: DisplayId,
    version: Option<EglVersion>,
    config: ConfigId,
    context: ContextId,
    dummy_surface: SurfaceId,
    current: CurrentBinding,
}

impl<E: EglApi> PlatformEgl<E> {
    pub fn new(egl: E) -> Self {
        Self {
            egl,
            display: DisplayId::NULL,
            version: None,
            config: ConfigId::NULL,
            context: ContextId::NULL,
            dummy_surface: SurfaceId::NULL,
            current: CurrentBinding::NONE,
        }
    }

    pub fn egl(&self) -> &E {
        &self.egl
    }

    #[cfg(test)]
    pub(crate) fn egl_mut(&mut self) -> &mut E {
        &mut self.egl
    }

    pub fn version(&self) -> Option<EglVersion> {
        self.version
    }

    pub fn current_binding(&self) -> CurrentBinding {
        self.current
    }

    pub fn is_initialized(&self) -> bool {
        !self.context.is_null()
    }

    /// Brings up display, config and context, then hands the platform to
    /// `factory`. Returns `None` after releasing everything if any step fails.
    ///
    /// # Panics
    ///
    /// If the system has no EGL display at all.
    pub fn create_driver<F: DriverFactory>(
        &mut self,
        shared_context: Option<SharedContext>,
        mut factory: F,
    ) -> Option<F::Driver> {
        self.display = self.egl.get_display();
        assert!(
            !self.display.is_null(),
            "no EGL display available; an EGL implementation is required"
        );

        match self.egl.initialize(self.display) {
            Ok(version) => {
                info!("EGL {}.{} initialized", version.major, version.minor);
                self.version = Some(version);
            }
            Err(err) => {
                error!("eglInitialize failed with {err}");
                self.display = DisplayId::NULL;
                return None;
            }
        }

        let result = self
            .bring_up(shared_context, &mut factory)
            .and_then(|()| {
                factory
                    .create_driver(self, shared_context)
                    .ok_or(BringUpError::NoDriver)
            });

        match result {
            Ok(driver) => Some(driver),
            Err(err) => {
                error!("EGL bring-up aborted: {err}");
                self.release(false);
                None
            }
        }
    }

    fn bring_up<F: DriverFactory>(
        &mut self,
        shared_context: Option<SharedContext>,
        factory: &mut F,
    ) -> Result<(), BringUpError> {
        self.config = self
            .egl
            .choose_config(self.display, &ConfigRequest::DEFAULT)
            .map_err(failed("eglChooseConfig"))?;

        if let Err(err) = self.egl.bind_api(RenderApi::OpenGl) {
            warn!("eglBindAPI failed with {err}");
        }

        self.dummy_surface = self
            .egl
            .create_pbuffer_surface(self.display, self.config, DUMMY_EXTENT, DUMMY_EXTENT)
            .map_err(failed("eglCreatePbufferSurface"))?;

        self.context = self
            .egl
            .create_context(self.display, self.config, shared_context, CONTEXT_VERSION)
            .map_err(failed("eglCreateContext"))?;

        self.bind(self.dummy_surface, self.dummy_surface)
            .map_err(failed("eglMakeCurrent"))?;

        let egl = &self.egl;
        factory.bind_entry_points(&|name: &CStr| egl.get_proc_address(name))?;

        debug!("EGL context {:?} current on dummy surface", self.context);
        Ok(())
    }

    /// Single choke point for context binding. Skips the native call when
    /// the pair is already bound. The requested pair is recorded before the
    /// native call, so the tracked pair never names a surface that a failed
    /// rebind left behind.
    fn bind(&mut self, draw: SurfaceId, read: SurfaceId) -> Result<(), EglError> {
        let requested = CurrentBinding { draw, read };
        if requested == self.current {
            return Ok(());
        }
        self.current = requested;
        self.egl
            .make_current(self.display, draw, read, self.context)
    }

    /// Tears down everything acquired so far, in reverse order.
    fn release(&mut self, force_unbind: bool) {
        if force_unbind || self.current != CurrentBinding::NONE {
            if let Err(err) = self.egl.make_current(
                self.display,
                SurfaceId::NULL,
                SurfaceId::NULL,
                ContextId::NULL,
            ) {
                warn!("eglMakeCurrent(EGL_NO_CONTEXT) failed with {err}");
            }
            self.current = CurrentBinding::NONE;
        }
        if !self.dummy_surface.is_null() {
            if let Err(err) = self.egl.destroy_surface(self.display, self.dummy_surface) {
                warn!("eglDestroySurface failed with {err}");
            }
        }
        if !self.context.is_null() {
            if let Err(err) = self.egl.destroy_context(self.display, self.context) {
                warn!("eglDestroyContext failed with {err}");
            }
        }
        self.dummy_surface = SurfaceId::NULL;
        self.context = ContextId::NULL;
        self.config = ConfigId::NULL;

        if let Err(err) = self.egl.terminate(self.display) {
            warn!("eglTerminate failed with {err}");
        }
        self.egl.release_thread();
        self.display = DisplayId::NULL;
        self.version = None;
    }
}

impl<E: EglApi> OpenGlPlatform for PlatformEgl<E> {
    fn terminate(&mut self) {
        if self.display.is_null() {
            return;
        }
        self.release(true);
    }

    fn create_swap_chain(
        &mut self,
        window: &NativeWindow,
        flags: &mut SwapChainFlags,
    ) -> Option<SwapChain> {
        // transparent swap chains are not supported
        flags.remove(SwapChainFlags::TRANSPARENT);

        let surface = match self
            .egl
            .create_window_surface(self.display, self.config, window)
        {
            Ok(surface) => surface,
            Err(err) => {
                error!("eglCreateWindowSurface failed with {err}");
                return None;
            }
        };

        if let Err(err) =
            self.egl
                .set_swap_behavior(self.display, surface, SwapBehavior::BufferDestroyed)
        {
            warn!("eglSurfaceAttrib(EGL_SWAP_BEHAVIOR, EGL_BUFFER_DESTROYED) failed with {err}");
        }

        Some(SwapChain::new(surface, SwapChainKind::Window))
    }

    fn create_headless_swap_chain(
        &mut self,
        width: u32,
        height: u32,
        flags: &mut SwapChainFlags,
    ) -> Option<SwapChain> {
        flags.remove(SwapChainFlags::TRANSPARENT);

        match self
            .egl
            .create_pbuffer_surface(self.display, self.config, width, height)
        {
            Ok(surface) => Some(SwapChain::new(
                surface,
                SwapChainKind::Headless { width, height },
            )),
            Err(err) => {
                error!("eglCreatePbufferSurface({width}x{height}) failed with {err}");
                None
            }
        }
    }

    fn destroy_swap_chain(&mut self, swap_chain: SwapChain) {
        let surface = swap_chain.surface();
        if surface.is_null() {
            return;
        }
        if surface == self.dummy_surface {
            warn!("refusing to destroy the dummy surface outside terminate");
            return;
        }
        if let Err(err) = self.bind(self.dummy_surface, self.dummy_surface) {
            error!("eglMakeCurrent(dummy) failed with {err}");
        }
        if let Err(err) = self.egl.destroy_surface(self.display, surface) {
            error!("eglDestroySurface failed with {err}");
        }
    }

    fn make_current(&mut self, draw: Option<&SwapChain>, read: Option<&SwapChain>) -> bool {
        let draw = draw.map_or(SurfaceId::NULL, SwapChain::surface);
        let read = read.map_or(SurfaceId::NULL, SwapChain::surface);
        if draw.is_null() && read.is_null() {
            return true;
        }
        match self.bind(draw, read) {
            Ok(()) => true,
            Err(err) => {
                error!("eglMakeCurrent failed with {err}");
                false
            }
        }
    }

    fn commit(&mut self, swap_chain: &SwapChain) {
        let surface = swap_chain.surface();
        if surface.is_null() {
            return;
        }
        if let Err(err) = self.egl.swap_buffers(self.display, surface) {
            error!("eglSwapBuffers failed with {err}");
        }
    }

    fn can_create_fence(&self) -> bool {
        true
    }

    fn create_fence(&mut self) -> Fence {
        Fence::new(self.egl.create_sync(self.display))
    }

    fn destroy_fence(&mut self, fence: Fence) {
        if fence.is_null() {
            return;
        }
        if let Err(err) = self.egl.destroy_sync(self.display, fence.sync()) {
            error!("eglDestroySync failed with {err}");
        }
    }

    fn wait_fence(&mut self, fence: &Fence, timeout: Duration) -> FenceStatus {
        if fence.is_null() {
            return FenceStatus::Error;
        }
        match self
            .egl
            .client_wait_sync(self.display, fence.sync(), timeout_ns(timeout))
        {
            SyncWait::ConditionSatisfied => FenceStatus::ConditionSatisfied,
            SyncWait::TimeoutExpired => FenceStatus::TimeoutExpired,
            SyncWait::Failed(err) => {
                debug!("eglClientWaitSync failed with {err}");
                FenceStatus::Error
            }
        }
    }
}

impl<E: EglApi> Drop for PlatformEgl<E> {
    fn drop(&mut self) {
        self.terminate();
    }
}
