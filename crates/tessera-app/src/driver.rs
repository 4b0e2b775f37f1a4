// SPDX-License-Identifier: CEPL-1.0
//! Minimal GL driver: enough to clear a swap chain and flush.
use std::ffi::{c_void, CStr};

use glow::HasContext as _;
use tessera_platform::{DriverFactory, OpenGlPlatform, PlatformError, SharedContext};
use tracing::info;

#[derive(Default)]
pub struct GlDriverFactory {
    gl: Option<glow::Context>,
}

impl DriverFactory for GlDriverFactory {
    type Driver = GlDriver;

    fn bind_entry_points(
        &mut self,
        loader: &dyn Fn(&CStr) -> *const c_void,
    ) -> Result<(), PlatformError> {
        if loader(c"glClear").is_null() {
            return Err(PlatformError::EntryPoints("glClear did not resolve".into()));
        }
        // SAFETY: the platform calls this with its context current.
        let gl = unsafe { glow::Context::from_loader_function_cstr(|name| loader(name)) };
        self.gl = Some(gl);
        Ok(())
    }

    fn create_driver(
        self,
        platform: &mut dyn OpenGlPlatform,
        shared_context: Option<SharedContext>,
    ) -> Option<GlDriver> {
        let gl = self.gl?;
        let version = gl.version();
        info!(
            "GL {}.{} {} (fences: {}, shared: {})",
            version.major,
            version.minor,
            version.vendor_info,
            platform.can_create_fence(),
            shared_context.is_some()
        );
        Some(GlDriver { gl })
    }
}

pub struct GlDriver {
    gl: glow::Context,
}

impl GlDriver {
    pub fn clear(&self, rgba: [f32; 4], width: u32, height: u32) {
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
            self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            self.gl.flush();
        }
    }
}
