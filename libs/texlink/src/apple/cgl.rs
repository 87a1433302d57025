// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Borrowed handle to the host display pipeline's CGL context.

use super::corevideo_ffi::{CGLContextObj, CGLPixelFormatObj};

/// The host's OpenGL rendering context and its pixel format descriptor.
///
/// texlink never owns these: the host created the context (typically via
/// `NSOpenGLContext`, whose `CGLContextObj` / `CGLPixelFormatObj` accessors
/// hand out exactly these pointers) and keeps it alive for as long as the
/// display pipeline runs.
///
/// The pixel format may be null when the context carries no descriptor;
/// interop texture construction reports that as
/// [`ContextFormatUnavailable`](crate::core::InteropError::ContextFormatUnavailable).
pub struct CglContext {
    context: CGLContextObj,
    pixel_format: CGLPixelFormatObj,
}

impl CglContext {
    /// Wrap the host's raw CGL handles.
    ///
    /// # Safety
    ///
    /// `context` must be a valid CGL context that outlives this wrapper and
    /// every interop texture created against it. `pixel_format` must be the
    /// context's pixel format object, or null when it has none.
    pub unsafe fn from_raw(context: CGLContextObj, pixel_format: CGLPixelFormatObj) -> Self {
        Self {
            context,
            pixel_format,
        }
    }

    /// Raw CGL context pointer.
    pub fn context_ptr(&self) -> CGLContextObj {
        self.context
    }

    /// Raw CGL pixel format pointer; may be null.
    pub fn pixel_format_ptr(&self) -> CGLPixelFormatObj {
        self.pixel_format
    }
}

// The context is owned by the host's render thread; the wrapper can move
// with the service but GL calls against it stay thread-bound.
unsafe impl Send for CglContext {}

/// Non-owning copy of the context's pixel format descriptor.
#[derive(Clone, Copy)]
pub struct CglPixelFormat(pub(crate) CGLPixelFormatObj);

unsafe impl Send for CglPixelFormat {}

#[link(name = "OpenGL", kind = "framework")]
unsafe extern "C" {
    fn CGLChoosePixelFormat(attribs: *const i32, pix: *mut CGLPixelFormatObj, npix: *mut i32)
        -> i32;
    fn CGLCreateContext(
        pix: CGLPixelFormatObj,
        share: CGLContextObj,
        ctx: *mut CGLContextObj,
    ) -> i32;
    fn CGLDestroyContext(ctx: CGLContextObj) -> i32;
    fn CGLDestroyPixelFormat(pix: CGLPixelFormatObj) -> i32;
}

// CGL pixel format attributes
const K_CGL_PFA_ACCELERATED: i32 = 73;
const K_CGL_PFA_ALLOW_OFFLINE_RENDERERS: i32 = 96;
const K_CGL_PFA_COLOR_SIZE: i32 = 8;
const K_CGL_PFA_ALPHA_SIZE: i32 = 11;

/// A self-owned CGL context for running the interop path without a host
/// window, e.g. in tests or headless tooling.
pub struct OffscreenGlContext {
    context: CGLContextObj,
    pixel_format: CGLPixelFormatObj,
}

impl OffscreenGlContext {
    pub fn new() -> crate::core::Result<Self> {
        use crate::core::InteropError;

        unsafe {
            let attributes: [i32; 7] = [
                K_CGL_PFA_ACCELERATED,
                K_CGL_PFA_ALLOW_OFFLINE_RENDERERS,
                K_CGL_PFA_COLOR_SIZE,
                24,
                K_CGL_PFA_ALPHA_SIZE,
                8,
                0, // terminator
            ];

            let mut pixel_format: CGLPixelFormatObj = std::ptr::null_mut();
            let mut num_formats: i32 = 0;
            let err = CGLChoosePixelFormat(attributes.as_ptr(), &mut pixel_format, &mut num_formats);
            if err != 0 || pixel_format.is_null() {
                return Err(InteropError::Initialization(format!(
                    "CGLChoosePixelFormat failed with error {err}"
                )));
            }

            let mut context: CGLContextObj = std::ptr::null_mut();
            let err = CGLCreateContext(pixel_format, std::ptr::null_mut(), &mut context);
            if err != 0 || context.is_null() {
                CGLDestroyPixelFormat(pixel_format);
                return Err(InteropError::Initialization(format!(
                    "CGLCreateContext failed with error {err}"
                )));
            }

            tracing::debug!("created offscreen CGL context");
            Ok(Self {
                context,
                pixel_format,
            })
        }
    }

    /// Borrowed view suitable for the interop driver.
    pub fn as_cgl_context(&self) -> CglContext {
        CglContext {
            context: self.context,
            pixel_format: self.pixel_format,
        }
    }
}

impl Drop for OffscreenGlContext {
    fn drop(&mut self) {
        unsafe {
            if !self.context.is_null() {
                CGLDestroyContext(self.context);
            }
            if !self.pixel_format.is_null() {
                CGLDestroyPixelFormat(self.pixel_format);
            }
        }
    }
}

unsafe impl Send for OffscreenGlContext {}
