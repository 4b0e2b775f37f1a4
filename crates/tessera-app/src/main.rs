// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use tessera_core::init_tracing;
use tessera_platform::{FenceStatus, OpenGlPlatform, SwapChain};
use tessera_platform_egl::{GlutinEgl, PlatformEgl};
use tracing::{debug, info, warn};
use winit::event_loop::{ControlFlow, EventLoop};

mod config;
mod driver;
mod window;

use config::{load_cfg, AppCfg, RenderCfg};
use driver::{GlDriver, GlDriverFactory};
use window::WindowApp;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Render into an offscreen pbuffer.
    Headless,
    /// Render into a winit window.
    Window,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where frames go
    #[arg(long, value_enum, default_value = "headless")]
    mode: Mode,

    /// Frames to render before exiting (overrides the config file)
    #[arg(long)]
    frames: Option<u32>,

    /// Path to the TOML config
    #[arg(long, default_value = "tessera.toml")]
    config: PathBuf,
}

/// Binds `swap_chain`, clears it, fences the frame and presents.
/// Returns false if the swap chain could not be made current.
pub(crate) fn present_frame(
    platform: &mut dyn OpenGlPlatform,
    driver: &GlDriver,
    swap_chain: &SwapChain,
    render: &RenderCfg,
    (width, height): (u32, u32),
    frame: u32,
) -> bool {
    if !platform.make_current(Some(swap_chain), Some(swap_chain)) {
        warn!("frame {frame}: could not bind swap chain");
        return false;
    }

    driver.clear(render.clear_color, width, height);

    let fence = platform.create_fence();
    platform.commit(swap_chain);

    if !fence.is_null() {
        let timeout = Duration::from_millis(render.fence_timeout_ms);
        match platform.wait_fence(&fence, timeout) {
            FenceStatus::ConditionSatisfied => debug!("frame {frame}: fence signaled"),
            FenceStatus::TimeoutExpired => warn!("frame {frame}: fence wait timed out"),
            FenceStatus::Error => warn!("frame {frame}: fence wait failed"),
        }
    }
    platform.destroy_fence(fence);
    true
}

fn run_headless(cfg: &AppCfg, frames: u32) -> Result<()> {
    let mut platform = PlatformEgl::new(GlutinEgl::headless());
    let driver = platform
        .create_driver(None, GlDriverFactory::default())
        .ok_or_else(|| anyhow!("EGL bring-up failed"))?;

    let (width, height) = (cfg.surface.width, cfg.surface.height);
    let mut flags = cfg.render.swap_chain_flags();
    let swap_chain = platform
        .create_headless_swap_chain(width, height, &mut flags)
        .ok_or_else(|| anyhow!("pbuffer swap chain creation failed"))?;
    if cfg.render.transparent && flags.is_empty() {
        warn!("transparent swap chains are unsupported; rendering opaque");
    }

    let mut rendered = 0;
    for frame in 0..frames {
        if !present_frame(
            &mut platform,
            &driver,
            &swap_chain,
            &cfg.render,
            (width, height),
            frame,
        ) {
            break;
        }
        rendered += 1;
    }
    info!("rendered {rendered} frame(s) at {width}x{height}");

    platform.destroy_swap_chain(swap_chain);
    drop(driver);
    platform.terminate();
    Ok(())
}

fn run_window(cfg: AppCfg, frames: u32) -> Result<()> {
    let event_loop: EventLoop<()> = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = WindowApp::new(cfg, frames);
    event_loop.run_app(&mut app)?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);
    let frames = args.frames.unwrap_or(cfg.render.frames);
    info!("mode={:?} frames={frames}", args.mode);

    match args.mode {
        Mode::Headless => run_headless(&cfg, frames),
        Mode::Window => run_window(cfg, frames),
    }
}
