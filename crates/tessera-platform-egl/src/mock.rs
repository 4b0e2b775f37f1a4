// SPDX-License-Identifier: CEPL-1.0
//! Recording [`EglApi`] double. Tracks live objects and panics on what EGL
//! would treat as a bug: destroying a dead object or the current context.
//! Destroying a bound surface is legal EGL (deletion is deferred until
//! unbind), so it is only recorded.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CStr};

use raw_window_handle::{RawWindowHandle, XlibWindowHandle};
use tessera_platform::{
    ConfigId, ContextId, DisplayId, NativeWindow, SharedContext, SurfaceId, SyncId,
};

use crate::api::{
    ConfigRequest, ContextVersion, EglApi, EglVersion, RenderApi, SwapBehavior, SyncWait,
};
use crate::EglError;

const DISPLAY: DisplayId = DisplayId::from_raw(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    GetDisplay,
    Initialize,
    ChooseConfig,
    BindApi,
    CreatePbufferSurface,
    CreateWindowSurface,
    SetSwapBehavior,
    CreateContext,
    MakeCurrent,
    DestroySurface,
    DestroyContext,
    SwapBuffers,
    Terminate,
    ReleaseThread,
    CreateSync,
    DestroySync,
    ClientWaitSync,
}

type Binding = (SurfaceId, SurfaceId, ContextId);

pub struct MockEgl {
    no_display: bool,
    sync_unsupported: bool,
    signaled: bool,
    failures: HashMap<Call, EglError>,
    calls: Vec<Call>,
    next_id: u64,
    initialized: bool,
    surfaces: HashSet<SurfaceId>,
    contexts: HashSet<ContextId>,
    syncs: HashSet<SyncId>,
    destroyed_surfaces: Vec<SurfaceId>,
    destroyed_while_bound: Vec<SurfaceId>,
    binds: Vec<Binding>,
    bound: Binding,
    api: Option<RenderApi>,
    config_request: Option<ConfigRequest>,
    context_request: Option<(Option<SharedContext>, ContextVersion)>,
    pbuffer_sizes: Vec<(u32, u32)>,
    swap_behaviors: Vec<(SurfaceId, SwapBehavior)>,
    last_timeout: Option<u64>,
    lookups: RefCell<Vec<(String, bool)>>,
}

impl MockEgl {
    pub fn new() -> Self {
        Self {
            no_display: false,
            sync_unsupported: false,
            signaled: true,
            failures: HashMap::new(),
            calls: Vec::new(),
            next_id: 0,
            initialized: false,
            surfaces: HashSet::new(),
            contexts: HashSet::new(),
            syncs: HashSet::new(),
            destroyed_surfaces: Vec::new(),
            destroyed_while_bound: Vec::new(),
            binds: Vec::new(),
            bound: (SurfaceId::NULL, SurfaceId::NULL, ContextId::NULL),
            api: None,
            config_request: None,
            context_request: None,
            pbuffer_sizes: Vec::new(),
            swap_behaviors: Vec::new(),
            last_timeout: None,
            lookups: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(call: Call) -> Self {
        let mut egl = Self::new();
        egl.fail(call);
        egl
    }

    pub fn window() -> NativeWindow {
        NativeWindow {
            handle: RawWindowHandle::Xlib(XlibWindowHandle::new(0x2a)),
            width: 640,
            height: 480,
        }
    }

    pub fn fail(&mut self, call: Call) {
        self.failures.insert(call, EglError::BadAlloc);
    }

    pub fn heal(&mut self, call: Call) {
        self.failures.remove(&call);
    }

    pub fn set_no_display(&mut self) {
        self.no_display = true;
    }

    pub fn set_sync_unsupported(&mut self) {
        self.sync_unsupported = true;
    }

    pub fn set_signaled(&mut self, signaled: bool) {
        self.signaled = signaled;
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn live_surfaces(&self) -> &HashSet<SurfaceId> {
        &self.surfaces
    }

    pub fn live_contexts(&self) -> &HashSet<ContextId> {
        &self.contexts
    }

    pub fn live_syncs(&self) -> &HashSet<SyncId> {
        &self.syncs
    }

    pub fn destroyed_surfaces(&self) -> &[SurfaceId] {
        &self.destroyed_surfaces
    }

    pub fn destroyed_while_bound(&self) -> &[SurfaceId] {
        &self.destroyed_while_bound
    }

    pub fn binds(&self) -> &[Binding] {
        &self.binds
    }

    pub fn bound(&self) -> Binding {
        self.bound
    }

    pub fn bound_api(&self) -> Option<RenderApi> {
        self.api
    }

    pub fn config_request(&self) -> Option<ConfigRequest> {
        self.config_request
    }

    pub fn context_request(&self) -> Option<(Option<SharedContext>, ContextVersion)> {
        self.context_request
    }

    pub fn pbuffer_sizes(&self) -> &[(u32, u32)] {
        &self.pbuffer_sizes
    }

    pub fn swap_behaviors(&self) -> &[(SurfaceId, SwapBehavior)] {
        &self.swap_behaviors
    }

    pub fn last_timeout(&self) -> Option<u64> {
        self.last_timeout
    }

    pub fn lookups(&self) -> Vec<(String, bool)> {
        self.lookups.borrow().clone()
    }

    fn enter(&mut self, call: Call) -> Result<(), EglError> {
        self.calls.push(call);
        match self.failures.get(&call) {
            Some(&err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, display: DisplayId) -> Result<(), EglError> {
        if display != DISPLAY {
            return Err(EglError::BadDisplay);
        }
        if !self.initialized {
            return Err(EglError::NotInitialized);
        }
        Ok(())
    }

    fn new_surface(&mut self) -> SurfaceId {
        let surface = SurfaceId::from_raw(self.next_id());
        self.surfaces.insert(surface);
        surface
    }
}

impl EglApi for MockEgl {
    fn get_display(&mut self) -> DisplayId {
        self.calls.push(Call::GetDisplay);
        if self.no_display {
            DisplayId::NULL
        } else {
            DISPLAY
        }
    }

    fn initialize(&mut self, display: DisplayId) -> Result<EglVersion, EglError> {
        self.enter(Call::Initialize)?;
        assert_eq!(display, DISPLAY);
        self.initialized = true;
        Ok(EglVersion { major: 1, minor: 5 })
    }

    fn choose_config(
        &mut self,
        display: DisplayId,
        request: &ConfigRequest,
    ) -> Result<ConfigId, EglError> {
        self.enter(Call::ChooseConfig)?;
        self.check(display)?;
        self.config_request = Some(*request);
        Ok(ConfigId::from_raw(self.next_id()))
    }

    fn bind_api(&mut self, api: RenderApi) -> Result<(), EglError> {
        self.enter(Call::BindApi)?;
        self.api = Some(api);
        Ok(())
    }

    fn create_pbuffer_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        width: u32,
        height: u32,
    ) -> Result<SurfaceId, EglError> {
        self.enter(Call::CreatePbufferSurface)?;
        self.check(display)?;
        assert!(!config.is_null());
        self.pbuffer_sizes.push((width, height));
        Ok(self.new_surface())
    }

    fn create_window_surface(
        &mut self,
        display: DisplayId,
        config: ConfigId,
        _window: &NativeWindow,
    ) -> Result<SurfaceId, EglError> {
        self.enter(Call::CreateWindowSurface)?;
        self.check(display)?;
        assert!(!config.is_null());
        Ok(self.new_surface())
    }

    fn set_swap_behavior(
        &mut self,
        display: DisplayId,
        surface: SurfaceId,
        behavior: SwapBehavior,
    ) -> Result<(), EglError> {
        self.enter(Call::SetSwapBehavior)?;
        self.check(display)?;
        assert!(self.surfaces.contains(&surface));
        self.swap_behaviors.push((surface, behavior));
        Ok(())
    }

    fn create_context(
        &mut self,
        display: DisplayId,
        _config: ConfigId,
        shared: Option<SharedContext>,
        version: ContextVersion,
    ) -> Result<ContextId, EglError> {
        self.enter(Call::CreateContext)?;
        self.check(display)?;
        self.context_request = Some((shared, version));
        let context = ContextId::from_raw(self.next_id());
        self.contexts.insert(context);
        Ok(context)
    }

    fn make_current(
        &mut self,
        display: DisplayId,
        draw: SurfaceId,
        read: SurfaceId,
        context: ContextId,
    ) -> Result<(), EglError> {
        self.enter(Call::MakeCurrent)?;
        self.check(display)?;
        if context.is_null() {
            if !draw.is_null() || !read.is_null() {
                return Err(EglError::BadMatch);
            }
        } else {
            assert!(self.contexts.contains(&context), "binding a dead context");
            assert!(self.surfaces.contains(&draw), "binding a dead draw surface");
            assert!(self.surfaces.contains(&read), "binding a dead read surface");
        }
        self.binds.push((draw, read, context));
        self.bound = (draw, read, context);
        Ok(())
    }

    fn destroy_surface(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError> {
        self.enter(Call::DestroySurface)?;
        self.check(display)?;
        assert!(self.surfaces.remove(&surface), "surface destroyed twice");
        if self.bound.0 == surface || self.bound.1 == surface {
            self.destroyed_while_bound.push(surface);
        }
        self.destroyed_surfaces.push(surface);
        Ok(())
    }

    fn destroy_context(&mut self, display: DisplayId, context: ContextId) -> Result<(), EglError> {
        self.enter(Call::DestroyContext)?;
        self.check(display)?;
        assert!(self.contexts.remove(&context), "context destroyed twice");
        assert_ne!(self.bound.2, context, "destroying the current context");
        Ok(())
    }

    fn swap_buffers(&mut self, display: DisplayId, surface: SurfaceId) -> Result<(), EglError> {
        self.enter(Call::SwapBuffers)?;
        self.check(display)?;
        assert!(self.surfaces.contains(&surface));
        Ok(())
    }

    fn terminate(&mut self, display: DisplayId) -> Result<(), EglError> {
        self.enter(Call::Terminate)?;
        self.check(display)?;
        self.initialized = false;
        Ok(())
    }

    fn release_thread(&mut self) {
        self.calls.push(Call::ReleaseThread);
    }

    fn create_sync(&mut self, display: DisplayId) -> SyncId {
        if self.enter(Call::CreateSync).is_err()
            || self.sync_unsupported
            || self.check(display).is_err()
        {
            return SyncId::NULL;
        }
        let sync = SyncId::from_raw(self.next_id());
        self.syncs.insert(sync);
        sync
    }

    fn destroy_sync(&mut self, display: DisplayId, sync: SyncId) -> Result<(), EglError> {
        self.enter(Call::DestroySync)?;
        self.check(display)?;
        assert!(self.syncs.remove(&sync), "sync destroyed twice");
        Ok(())
    }

    fn client_wait_sync(&mut self, display: DisplayId, sync: SyncId, timeout_ns: u64) -> SyncWait {
        if let Err(err) = self.enter(Call::ClientWaitSync).and(self.check(display)) {
            return SyncWait::Failed(err);
        }
        self.last_timeout = Some(timeout_ns);
        if !self.syncs.contains(&sync) {
            SyncWait::Failed(EglError::BadParameter)
        } else if self.signaled {
            SyncWait::ConditionSatisfied
        } else {
            SyncWait::TimeoutExpired
        }
    }

    fn get_proc_address(&self, name: &CStr) -> *const c_void {
        let current = !self.bound.2.is_null();
        self.lookups
            .borrow_mut()
            .push((name.to_string_lossy().into_owned(), current));
        std::ptr::null()
    }
}
