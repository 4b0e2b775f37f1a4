// SPDX-License-Identifier: CEPL-1.0
use anyhow::{anyhow, Result};
use tessera_platform::{NativeWindow, OpenGlPlatform, SwapChain};
use tessera_platform_egl::{GlutinEgl, PlatformEgl};
use tracing::{error, info, warn};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    raw_window_handle::{HasDisplayHandle, HasWindowHandle},
    window::{Window, WindowId},
};

use crate::config::AppCfg;
use crate::driver::{GlDriver, GlDriverFactory};
use crate::present_frame;

/// Platform, driver and swap chain for one window.
struct GlWindow {
    platform: PlatformEgl<GlutinEgl>,
    driver: GlDriver,
    swap_chain: Option<SwapChain>,
    size: PhysicalSize<u32>,
}

impl GlWindow {
    fn new(window: &Window, cfg: &AppCfg) -> Result<Self> {
        let display = window
            .display_handle()
            .map_err(|e| anyhow!("{e}"))?
            .as_raw();
        let handle = window
            .window_handle()
            .map_err(|e| anyhow!("{e}"))?
            .as_raw();

        // SAFETY: GlWindow is torn down before the window and event loop.
        let egl = unsafe { GlutinEgl::with_display_handle(display) };
        let mut platform = PlatformEgl::new(egl);
        let driver = platform
            .create_driver(None, GlDriverFactory::default())
            .ok_or_else(|| anyhow!("EGL bring-up failed"))?;

        let size = window.inner_size();
        let native = NativeWindow {
            handle,
            width: size.width,
            height: size.height,
        };
        let mut flags = cfg.render.swap_chain_flags();
        let swap_chain = platform
            .create_swap_chain(&native, &mut flags)
            .ok_or_else(|| anyhow!("window swap chain creation failed"))?;
        if cfg.render.transparent && flags.is_empty() {
            warn!("transparent swap chains are unsupported; rendering opaque");
        }

        Ok(Self {
            platform,
            driver,
            swap_chain: Some(swap_chain),
            size,
        })
    }

    fn shutdown(&mut self) {
        if let Some(swap_chain) = self.swap_chain.take() {
            self.platform.destroy_swap_chain(swap_chain);
        }
        self.platform.terminate();
    }
}

pub struct WindowApp {
    cfg: AppCfg,
    frames_left: u32,
    frame: u32,
    // dropped before the window
    gl: Option<GlWindow>,
    window: Option<Window>,
}

impl WindowApp {
    pub fn new(cfg: AppCfg, frames: u32) -> Self {
        Self {
            cfg,
            frames_left: frames,
            frame: 0,
            gl: None,
            window: None,
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut gl) = self.gl.take() {
            gl.shutdown();
        }
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("tessera")
            .with_inner_size(PhysicalSize::new(
                self.cfg.surface.width,
                self.cfg.surface.height,
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => window,
            Err(e) => {
                error!("create_window: {e}");
                event_loop.exit();
                return;
            }
        };

        match GlWindow::new(&window, &self.cfg) {
            Ok(gl) => self.gl = Some(gl),
            Err(e) => {
                error!("{e:#}");
                event_loop.exit();
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.close(event_loop);
            }

            WindowEvent::Resized(size) => {
                if let Some(gl) = &mut self.gl {
                    gl.size = size;
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(gl) = &mut self.gl else {
                    return;
                };
                if gl.size.width == 0 || gl.size.height == 0 {
                    return;
                }
                if let Some(swap_chain) = &gl.swap_chain {
                    let extent = (gl.size.width, gl.size.height);
                    if !present_frame(
                        &mut gl.platform,
                        &gl.driver,
                        swap_chain,
                        &self.cfg.render,
                        extent,
                        self.frame,
                    ) {
                        self.close(event_loop);
                        return;
                    }
                }
                self.frame += 1;
                self.frames_left = self.frames_left.saturating_sub(1);
                if self.frames_left == 0 {
                    info!("rendered {} frame(s)", self.frame);
                    self.close(event_loop);
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}
