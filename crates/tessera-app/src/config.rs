// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tessera_platform::SwapChainFlags;
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub surface: SurfaceCfg,
    #[serde(default)]
    pub render: RenderCfg,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SurfaceCfg {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RenderCfg {
    #[serde(default = "default_clear")]
    pub clear_color: [f32; 4],
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(default = "default_fence_timeout_ms")]
    pub fence_timeout_ms: u64,
    /// Ask for a transparent swap chain. EGL on Linux always clears this.
    #[serde(default)]
    pub transparent: bool,
}

impl RenderCfg {
    pub fn swap_chain_flags(&self) -> SwapChainFlags {
        if self.transparent {
            SwapChainFlags::TRANSPARENT
        } else {
            SwapChainFlags::empty()
        }
    }
}

impl Default for SurfaceCfg {
    fn default() -> Self {
        SurfaceCfg {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: default_clear(),
            frames: default_frames(),
            fence_timeout_ms: default_fence_timeout_ms(),
            transparent: false,
        }
    }
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_clear() -> [f32; 4] {
    [0.02, 0.02, 0.04, 1.0]
}
fn default_frames() -> u32 {
    3
}
fn default_fence_timeout_ms() -> u64 {
    1000
}

/// Missing file means defaults; a broken file is reported and ignored.
pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str::<AppCfg>(&s).unwrap_or_else(|e| {
            warn!("ignoring {}: {e}", path.display());
            AppCfg::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => AppCfg::default(),
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            AppCfg::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: AppCfg = toml::from_str(
            r#"
            [surface]
            width = 1280

            [render]
            transparent = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.surface.width, 1280);
        assert_eq!(cfg.surface.height, 600);
        assert_eq!(cfg.render.frames, 3);
        assert_eq!(cfg.render.swap_chain_flags(), SwapChainFlags::TRANSPARENT);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_cfg(Path::new("does/not/exist.toml"));
        assert_eq!(cfg.surface.width, 800);
        assert_eq!(cfg.render.fence_timeout_ms, 1000);
        assert!(cfg.render.swap_chain_flags().is_empty());
    }
}
