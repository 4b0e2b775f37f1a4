// SPDX-License-Identifier: CEPL-1.0

/// A failed EGL call, printed with the symbolic EGL name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EglError {
    #[error("EGL_NOT_INITIALIZED")]
    NotInitialized,
    #[error("EGL_BAD_ACCESS")]
    BadAccess,
    #[error("EGL_BAD_ALLOC")]
    BadAlloc,
    #[error("EGL_BAD_ATTRIBUTE")]
    BadAttribute,
    #[error("EGL_BAD_CONTEXT")]
    BadContext,
    #[error("EGL_BAD_CONFIG")]
    BadConfig,
    #[error("EGL_BAD_CURRENT_SURFACE")]
    BadCurrentSurface,
    #[error("EGL_BAD_DISPLAY")]
    BadDisplay,
    #[error("EGL_BAD_SURFACE")]
    BadSurface,
    #[error("EGL_BAD_MATCH")]
    BadMatch,
    #[error("EGL_BAD_PARAMETER")]
    BadParameter,
    #[error("EGL_BAD_NATIVE_PIXMAP")]
    BadNativePixmap,
    #[error("EGL_BAD_NATIVE_WINDOW")]
    BadNativeWindow,
    #[error("EGL_CONTEXT_LOST")]
    ContextLost,
    /// eglChooseConfig succeeded but matched nothing.
    #[error("no matching config")]
    NoMatchingConfig,
    #[error("{0} not supported")]
    NotSupported(&'static str),
    #[error("unknown (0x{0:04x})")]
    Unknown(i32),
}

impl EglError {
    /// Maps an `eglGetError` code. `EGL_SUCCESS` and unknown values land in
    /// [`EglError::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0x3001 => EglError::NotInitialized,
            0x3002 => EglError::BadAccess,
            0x3003 => EglError::BadAlloc,
            0x3004 => EglError::BadAttribute,
            0x3005 => EglError::BadConfig,
            0x3006 => EglError::BadContext,
            0x3007 => EglError::BadCurrentSurface,
            0x3008 => EglError::BadDisplay,
            0x3009 => EglError::BadMatch,
            0x300A => EglError::BadNativePixmap,
            0x300B => EglError::BadNativeWindow,
            0x300C => EglError::BadParameter,
            0x300D => EglError::BadSurface,
            0x300E => EglError::ContextLost,
            other => EglError::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_codes_print_symbolic_names() {
        assert_eq!(EglError::from_code(0x3003).to_string(), "EGL_BAD_ALLOC");
        assert_eq!(EglError::from_code(0x3009), EglError::BadMatch);
        assert_eq!(
            EglError::from_code(0x300E).to_string(),
            "EGL_CONTEXT_LOST"
        );
    }

    #[test]
    fn success_and_garbage_are_unknown() {
        assert_eq!(EglError::from_code(0x3000), EglError::Unknown(0x3000));
        assert_eq!(EglError::from_code(-1).to_string(), "unknown (0xffffffff)");
    }
}
