// SPDX-License-Identifier: CEPL-1.0
//! [`EglApi`] on top of glutin's EGL backend.
//!
//! glutin owns the EGL objects; this side hands out slot-map keys as raw
//! handles. Calls glutin does not wrap (surface attributes, fence syncs,
//! terminate) go through `eglGetProcAddress`.
use std::ffi::{c_void, CStr};
use std::num::NonZeroU32;
use std::ptr;

use glutin::api::egl::config::Config;
use glutin::api::egl::context::PossiblyCurrentContext;
use glutin::api::egl::device::Device;
use glutin::api::egl::display::Display;
use glutin::api::egl::surface::Surface;
use glutin::config::{Api, ColorBufferType, ConfigSurfaceTypes, ConfigTemplateBuilder};
use glutin::context::{AsRawContext, ContextApi, ContextAttributesBuilder, RawContext, Version};
use glutin::display::{AsRawDisplay, RawDisplay};
use glutin::error::ErrorKind;
use glutin::prelude::*;
use glutin::surface::{
    AsRawSurface, PbufferSurface, RawSurface, SurfaceAttributesBuilder, WindowSurface,
};
use raw_window_handle::RawDisplayHandle;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use tessera_platform::{
    ConfigId, ContextId, DisplayId, NativeWindow, SharedContext, SurfaceId, SyncId,
};
use tracing::debug;

use crate::api::{
    ConfigRequest, ContextVersion, EglApi, EglVersion, RenderApi, SwapBehavior, SyncWait,
};
use crate::EglError;

const EGL_NONE: i32 = 0x3038;
const EGL_SWAP_BEHAVIOR: i32 = 0x3093;
const EGL_BUFFER_DESTROYED: i32 = 0x3095;
const EGL_SYNC_FENCE_KHR: u32 = 0x30F9;
const EGL_TIMEOUT_EXPIRED_KHR: i32 = 0x30F5;
const EGL_CONDITION_SATISFIED_KHR: i32 = 0x30F6;

/// The only display id this backend hands out.
const DISPLAY: DisplayId = DisplayId::from_raw(1);

new_key_type! {
    struct ConfigKey;
    struct SurfaceKey;
    struct ContextKey;
    struct SyncKey;
}

fn raw_of<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

fn key_of<K: Key>(raw: u64) -> K {
    K::from(KeyData::from_ffi(raw))
}

type GetErrorFn = unsafe extern "system" fn() -> i32;
type SurfaceAttribFn = unsafe extern "system" fn(*const c_void, *const c_void, i32, i32) -> u32;
type TerminateFn = unsafe extern "system" fn(*const c_void) -> u32;
type ReleaseThreadFn = unsafe extern "system" fn() -> u32;
type CreateSyncFn = unsafe extern "system" fn(*const c_void, u32, *const i32) -> *const c_void;
type DestroySyncFn = unsafe extern "system" fn(*const c_void, *const c_void) -> u32;
type ClientWaitSyncFn = unsafe extern "system" fn(*const c_void, *const c_void, i32, u64) -> i32;

/// EGL entry points glutin does not expose.
#[derive(Default)]
struct EntryPoints {
    get_error: Option<GetErrorFn>,
    surface_attrib: Option<SurfaceAttribFn>,
    terminate: Option<TerminateFn>,
    release_thread: Option<ReleaseThreadFn>,
    create_sync: Option<CreateSyncFn>,
    destroy_sync: Option<DestroySyncFn>,
    client_wait_sync: Option<ClientWaitSyncFn>,
}

/// # Safety
///
/// `F` must be the function pointer type matching the prototype of `name`.
unsafe fn lookup<F: Copy>(display: &Display, name: &CStr) -> Option<F> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*const c_void>());
    let addr = display.get_proc_address(name);
    if addr.is_null() {
        debug!("{} unavailable", name.to_string_lossy());
        return None;
    }
    // SAFETY: non-null, and the caller guarantees `F` matches the prototype.
    Some(unsafe { std::mem::transmute_copy::<*const c_void, F>(&addr) })
}

impl EntryPoints {
    fn resolve(display: &Display) -> Self {
        // SAFETY: prototypes from EGL 1.4 and EGL_KHR_fence_sync.
        unsafe {
            Self {
                get_error: lookup(display, c"eglGetError"),
                surface_attrib: lookup(display, c"eglSurfaceAttrib"),
                terminate: lookup(display, c"eglTerminate"),
                release_thread: lookup(display, c"eglReleaseThread"),
                create_sync: lookup(display, c"eglCreateSyncKHR"),
                destroy_sync: lookup(display, c"eglDestroySyncKHR"),
                client_wait_sync: lookup(display, c"eglClientWaitSyncKHR"),
            }
        }
    }

    fn last_error(&self) -> EglError {
        match self.get_error {
            // SAFETY: eglGetError takes no arguments and is always callable.
            Some(get_error) => EglError::from_code(unsafe { get_error() }),
            None => EglError::NotSupported("eglGetError"),
        }
    }
}

fn egl_display_ptr(display: &Display) -> *const c_void {
    match display.raw_display() {
        RawDisplay::Egl(ptr) => ptr,
        #[allow(unreachable_patterns)]
        _ => ptr::null(),
    }
}

enum SurfaceSlot {
    Window(Surface<WindowSurface>),
    Pbuffer(Surface<PbufferSurface>),
}

impl SurfaceSlot {
    fn egl_ptr(&self) -> *const c_void {
        let raw = match self {
            SurfaceSlot::Window(surface) => surface.raw_surface(),
            SurfaceSlot::Pbuffer(surface) => surface.raw_surface(),
        };
        match raw {
            RawSurface::Egl(ptr) => ptr,
            #[allow(unreachable_patterns)]
            _ => ptr::null(),
        }
    }
}

/// A context created elsewhere, shared with ours.
struct ForeignContext(*const c_void);

impl AsRawContext for ForeignContext {
    fn raw_context(&self) -> RawContext {
        RawContext::Egl(self.0)
    }
}

impl From<glutin::error::Error> for EglError {
    fn from(err: glutin::error::Error) -> Self {
        if let Some(code) = err.raw_code().and_then(|c| i32::try_from(c).ok()) {
            return EglError::from_code(code);
        }
        match err.error_kind() {
            ErrorKind::NotFound => EglError::NoMatchingConfig,
            ErrorKind::InitializationFailed => EglError::NotInitialized,
            ErrorKind::NotSupported(what) => EglError::NotSupported(what),
            _ => EglError::Unknown(0),
        }
    }
}

enum DisplaySource {
    /// First EGL device; no window system needed.
    Device(Option<Device>),
    Native(RawDisplayHandle),
}

pub struct GlutinEgl {
    source: DisplaySource,
    display: Option<Display>,
    entry: EntryPoints,
    api: RenderApi,
    configs: SlotMap<ConfigKey, Config>,
    surfaces: SlotMap<SurfaceKey, SurfaceSlot>,
    contexts: SlotMap<ContextKey, PossiblyCurrentContext>,
    syncs: SlotMap<SyncKey, *const c_void>,
}

impl GlutinEgl {
    /// Uses the first EGL device, for rendering without a window system.
    pub fn headless() -> Self {
        Self::from_source(DisplaySource::Device(None))
    }

    /// Uses the display of a running window system.
    ///
    /// # Safety
    ///
    /// `raw` must stay valid until the platform using this backend is
    /// terminated.
    pub unsafe fn with_display_handle(raw: RawDisplayHandle) -> Self {
        Self::from_source(DisplaySource::Native(raw))
    }

    fn from_source(source: DisplaySource) -> Self {
        Self {
            source,
            display: None,
            entry: EntryPoints::default(),
            api: RenderApi::OpenGl,
            configs: SlotMap::with_key(),
            surfaces: SlotMap::with_key(),
            contexts: SlotMap::with_key(),
            syncs: SlotMap::with_key(),
        }
    }

    fn display(&self, display: DisplayId) -> Result<&Display, EglError> {
        if display != DISPLAY {
            return Err(EglError::BadDisplay);
        }
        self.display.as_ref().ok_or(EglError::NotInitialized)
    }

    fn config(&self, config: ConfigId) -> Result<&Config, EglError> {
        self.configs
            .get(key_of::<ConfigKey>(config.as_raw()))
            .ok_or(EglError::BadConfig)
    }

    fn surface(&self, surface: SurfaceId) -> Result<&SurfaceSlot, EglError> {
        self.surfaces
            .get(key_of::<SurfaceKey>(surface.as_raw()))
            .ok_or(EglError::BadSurface)
    }

    fn insert_surface(&mut self, surface: SurfaceSlot) -> SurfaceId {
        SurfaceId::from_raw(raw_of(self.surfaces.insert(surface)))
    }
}

fn extent(value: u32) -> Result<NonZeroU32, EglError> {
    NonZeroU32::new(value).ok_or(EglError::BadParameter)
}

/// Pulls `major.minor` out of an EGL version string such as `"1.5 Mesa"`.
fn parse_version(version: &str) -> Option<EglVersion> {
    version.split_whitespace().find_map(|token| {
        let (major, rest) = token.split_once('.')?;
        let minor = rest.split(|c: char| !c.is_ascii_digit()).next()?;
        Some(EglVersion {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    })
}

impl EglApi for GlutinEgl {
    fn get_display(&mut self) -> DisplayId {
        match &mut self.source {
            DisplaySource::Native(_) => DISPLAY,
            DisplaySource::Device(device) => {
                if device.is_none() {
                    *device = Device::query_devices()
                        .ok()
                        .and_then(|mut devices| devices.next());
                }
                if device.is_some() {
                    DISPLAY
                } else {
                    DisplayId::NULL
                }
            }
        }
    }

    fn initialize(&mut self, display: DisplayId) -> Result<EglVersion, EglError> {
        if display != DISPLAY {
            return Err(EglError::BadDisplay);
        }
        let egl_display = match &self.source {
            // SAFETY: validity of `raw` is the contract of `with_display_handle`.
            DisplaySource::Native(raw) => unsafe { Display::new(*raw) },
            // SAFETY: the device came from `Device::query_devices`.
            DisplaySource::Device(Some(device)) => unsafe { Display::with_device(device, None) },
            DisplaySource::Device(None) => return Err(EglError::BadDisplay),
        }?;

        let version_string = egl_display.version_string();
        let version = parse_version(&version_string).unwrap_or_else(|| {
            debug!("unrecognized EGL version string {version_string:?}");
            EglVersion::default()
        });
        self.entry = EntryPoints::resolve(&egl_display);
        self.display = Some(egl_display);
        Ok(version)
    }

    fn choose_config(
        &mut self,
        display: DisplayId,
        request: &ConfigRequest,
    ) -> Result<ConfigId, EglError> {
        let display = self.display(display)?;
        let template = ConfigTemplateBuilder::new()
            .with_api(match request.api {
                RenderApi::OpenGl => Api::OPENGL,
            })
            .with_surface_type(if request.offscreen {
                ConfigSurfaceTypes::PBUFFER
            } else {
                ConfigSurfaceTypes::WINDOW
            })
            .with_buffer_type(ColorBufferType::Rgb {
                r_size: request.red,
                g_size: request.green,
                b_size: request.blue,
            })
            .with_alpha_size(request.alpha)
            .with_depth_size(request.depth)
            .build();

        // SAFETY: no native window is referenced by the template.
        let config = unsafe { display.find_configs(template) }?
            .next()
            .ok_or(EglError::NoMatchingConfig)?;
        Ok(ConfigId::from_raw(raw_of(self.configs.insert(config))))
    }

    fn bind_api(&mut self, api: RenderApi) -> Result<(), EglError> {
        // glutin calls eglBindAPI itself when a context is created
        self.api = api;
        Ok(())
    }

    fn create_pbuffer_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId, EglError> {
        let attrs =
            SurfaceAttributesBuilder::<PbufferSurface>::new().build(extent(width)?, extent(height)?);
        let display = self.display(display)?;
        let config = self.config(config)?;
        // SAFETY: pbuffers reference no native resources.
        let surface = unsafe { display.create_pbuffer_surface(config, &attrs) }?;
        Ok(self.insert_surface(SurfaceSlot::Pbuffer(surface)))
    }

    fn create_window_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        window: &NativeWindow,
    ) -> Result<SurfaceId, EglError> {
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window.handle,
            extent(window.width.max(1))?,
            extent(window.height.max(1))?,
        );
        let display = self.display(display)?;
        let config = self.config(config)?;
        // SAFETY: the window system keeps the window alive while its swap
        // chain exists.
        let surface = unsafe { display.create_window_surface(config, &attrs) }?;
        Ok(self.insert_surface(SurfaceSlot::Window(surface)))
    }

    fn set_swap_behavior(
        &mut self,
        display: DisplayId,
        surface: SurfaceId,
        behavior: SwapBehavior,
    ) -> Result<(), EglError> {
        let display = egl_display_ptr(self.display(display)?);
        let surface = self.surface(surface)?.egl_ptr();
        let surface_attrib = self
            .entry
            .surface_attrib
            .ok_or(EglError::NotSupported("eglSurfaceAttrib"))?;
        let value = match behavior {
            SwapBehavior::BufferDestroyed => EGL_BUFFER_DESTROYED,
        };
        // SAFETY: display and surface are live objects owned by glutin.
        if unsafe { surface_attrib(display, surface, EGL_SWAP_BEHAVIOR, value) } == 0 {
            return Err(self.entry.last_error());
        }
        Ok(())
    }

    fn create_context(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        shared: Option<SharedContext>,
        version: ContextVersion,
    ) -> Result<ContextId, EglError> {
        let gl_version = Version::new(version.major, version.minor);
        let mut attrs = ContextAttributesBuilder::new().with_context_api(match self.api {
            RenderApi::OpenGl => ContextApi::OpenGl(Some(gl_version)),
        });
        if let Some(shared) = shared {
            attrs = attrs.with_sharing(&ForeignContext(shared.as_ptr()));
        }
        let attrs = attrs.build(None);

        let display = self.display(display)?;
        let config = self.config(config)?;
        // SAFETY: a shared context, if any, is owned and kept alive by the caller.
        let context = unsafe { display.create_context(config, &attrs) }?;
        let key = self.contexts.insert(context.treat_as_possibly_current());
        Ok(ContextId::from_raw(raw_of(key)))
    }

    fn make_current(
        &mut self,
        display: DisplayId,
        draw: SurfaceId,
        read: SurfaceId,
        context: ContextId,
    ) -> Result<(), EglError> {
        self.display(display)?;

        if context.is_null() {
            if !draw.is_null() || !read.is_null() {
                return Err(EglError::BadMatch);
            }
            for context in self.contexts.values().filter(|c| c.is_current()) {
                context.make_not_current_in_place()?;
            }
            return Ok(());
        }

        let context = self
            .contexts
            .get(key_of::<ContextKey>(context.as_raw()))
            .ok_or(EglError::BadContext)?;
        // glutin cannot bind a surface together with EGL_NO_SURFACE, nor mix
        // window and pbuffer surfaces in one call
        match (self.surface(draw)?, self.surface(read)?) {
            (SurfaceSlot::Window(draw), SurfaceSlot::Window(read)) => {
                context.make_current_draw_read(draw, read)?
            }
            (SurfaceSlot::Pbuffer(draw), SurfaceSlot::Pbuffer(read)) => {
                context.make_current_draw_read(draw, read)?
            }
            _ => return Err(EglError::BadMatch),
        }
        Ok(())
    }

    fn destroy_surface(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError> {
        self.display(display)?;
        self.surfaces
            .remove(key_of::<SurfaceKey>(surface.as_raw()))
            .map(drop)
            .ok_or(EglError::BadSurface)
    }

    fn destroy_context(&mut self, display: DisplayId, context: ContextId) -> Result<(), EglError> {
        self.display(display)?;
        self.contexts
            .remove(key_of::<ContextKey>(context.as_raw()))
            .map(drop)
            .ok_or(EglError::BadContext)
    }

    fn swap_buffers(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError> {
        self.display(display)?;
        let context = self
            .contexts
            .values()
            .find(|c| c.is_current())
            .ok_or(EglError::BadContext)?;
        match self.surface(surface)? {
            SurfaceSlot::Window(surface) => surface.swap_buffers(context)?,
            SurfaceSlot::Pbuffer(surface) => surface.swap_buffers(context)?,
        }
        Ok(())
    }

    fn terminate(&mut self, display: DisplayId) -> Result<(), EglError> {
        self.display(display)?;
        let Some(egl_display) = self.display.take() else {
            return Err(EglError::NotInitialized);
        };
        let raw = egl_display_ptr(&egl_display);

        if let Some(destroy_sync) = self.entry.destroy_sync {
            for (_, sync) in self.syncs.drain() {
                // SAFETY: every stored sync was created on this display.
                unsafe { destroy_sync(raw, sync) };
            }
        }
        self.syncs.clear();
        self.surfaces.clear();
        self.contexts.clear();
        self.configs.clear();

        if let Some(terminate) = self.entry.terminate {
            // SAFETY: all objects created on the display are gone.
            if unsafe { terminate(raw) } == 0 {
                return Err(self.entry.last_error());
            }
        }
        Ok(())
    }

    fn release_thread(&mut self) {
        if let Some(release_thread) = self.entry.release_thread {
            // SAFETY: valid on any thread at any time.
            unsafe { release_thread() };
        }
        self.entry = EntryPoints::default();
    }

    fn create_sync(&mut self, display: DisplayId) -> SyncId {
        let Ok(egl_display) = self.display(display) else {
            return SyncId::NULL;
        };
        let Some(create_sync) = self.entry.create_sync else {
            return SyncId::NULL;
        };
        let attribs = [EGL_NONE];
        // SAFETY: live display, attribute list terminated with EGL_NONE.
        let sync = unsafe {
            create_sync(
                egl_display_ptr(egl_display),
                EGL_SYNC_FENCE_KHR,
                attribs.as_ptr(),
            )
        };
        if sync.is_null() {
            debug!("eglCreateSyncKHR failed with {}", self.entry.last_error());
            return SyncId::NULL;
        }
        SyncId::from_raw(raw_of(self.syncs.insert(sync)))
    }

    fn destroy_sync(&mut self, display: DisplayId, sync: SyncId) -> Result<(), EglError> {
        let egl_display = egl_display_ptr(self.display(display)?);
        let destroy_sync = self
            .entry
            .destroy_sync
            .ok_or(EglError::NotSupported("eglDestroySyncKHR"))?;
        let sync = self
            .syncs
            .remove(key_of::<SyncKey>(sync.as_raw()))
            .ok_or(EglError::BadParameter)?;
        // SAFETY: the sync was created on this display and is destroyed once.
        if unsafe { destroy_sync(egl_display, sync) } == 0 {
            return Err(self.entry.last_error());
        }
        Ok(())
    }

    fn client_wait_sync(&mut self, display: DisplayId, sync: SyncId, timeout_ns: u64) -> SyncWait {
        let egl_display = match self.display(display) {
            Ok(display) => egl_display_ptr(display),
            Err(err) => return SyncWait::Failed(err),
        };
        let Some(client_wait_sync) = self.entry.client_wait_sync else {
            return SyncWait::Failed(EglError::NotSupported("eglClientWaitSyncKHR"));
        };
        let Some(&sync) = self.syncs.get(key_of::<SyncKey>(sync.as_raw())) else {
            return SyncWait::Failed(EglError::BadParameter);
        };
        // SAFETY: live display and sync.
        match unsafe { client_wait_sync(egl_display, sync, 0, timeout_ns) } {
            EGL_CONDITION_SATISFIED_KHR => SyncWait::ConditionSatisfied,
            EGL_TIMEOUT_EXPIRED_KHR => SyncWait::TimeoutExpired,
            _ => SyncWait::Failed(self.entry.last_error()),
        }
    }

    fn get_proc_address(&self, name: &CStr) -> *const c_void {
        self.display
            .as_ref()
            .map_or(ptr::null(), |display| display.get_proc_address(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings_parse() {
        assert_eq!(
            parse_version("1.5"),
            Some(EglVersion { major: 1, minor: 5 })
        );
        assert_eq!(
            parse_version("EGL 1.4 (Mesa 24.0.1)"),
            Some(EglVersion { major: 1, minor: 4 })
        );
        assert_eq!(parse_version("unknown"), None);
    }

    #[test]
    fn slot_keys_round_trip_through_raw_handles() {
        let mut map: SlotMap<SurfaceKey, u8> = SlotMap::with_key();
        let key = map.insert(3);
        let raw = raw_of(key);
        assert_ne!(raw, 0);
        assert_eq!(map.get(key_of::<SurfaceKey>(raw)), Some(&3));
        assert_eq!(map.get(key_of::<SurfaceKey>(SurfaceId::NULL.as_raw())), None);
    }

    #[test]
    fn headless_backend_without_display_refuses_calls() {
        let mut egl = GlutinEgl::headless();
        assert_eq!(
            egl.choose_config(DISPLAY, &ConfigRequest::DEFAULT),
            Err(EglError::NotInitialized)
        );
        assert_eq!(egl.create_sync(DISPLAY), SyncId::NULL);
        assert_eq!(
            egl.client_wait_sync(DISPLAY, SyncId::NULL, 0),
            SyncWait::Failed(EglError::NotInitialized)
        );
        assert!(egl.get_proc_address(c"glClear").is_null());
    }
}
