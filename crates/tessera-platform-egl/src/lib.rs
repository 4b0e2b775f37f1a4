// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! EGL implementation of the tessera OpenGL platform.

pub mod api;
mod error;
mod glutin_egl;
#[cfg(test)]
mod mock;
mod platform;

pub use api::{EglApi, EglVersion};
pub use error::EglError;
pub use glutin_egl::GlutinEgl;
pub use platform::{CurrentBinding, PlatformEgl, CONTEXT_VERSION};
