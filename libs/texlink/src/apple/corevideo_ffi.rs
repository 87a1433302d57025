// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! CoreVideo and CoreFoundation FFI bindings for the interop texture path.
//!
//! Covers exactly what the driver needs: shared pixel buffer creation with
//! GL/Metal compatibility, and the two texture caches that view a pixel
//! buffer as an OpenGL texture and a Metal texture respectively.

#![allow(non_snake_case, non_upper_case_globals)]

use std::ffi::c_void;

// Type aliases for CoreVideo opaque types
pub type CVPixelBufferRef = *mut c_void;
pub type CVOpenGLTextureCacheRef = *mut c_void;
pub type CVOpenGLTextureRef = *mut c_void;
pub type CVMetalTextureCacheRef = *mut c_void;
pub type CVMetalTextureRef = *mut c_void;
pub type CFDictionaryRef = *const c_void;
pub type CFStringRef = *const c_void;
pub type CFBooleanRef = *const c_void;

// CGL types for the host OpenGL context
pub type CGLContextObj = *mut c_void;
pub type CGLPixelFormatObj = *mut c_void;

// CVReturn codes
pub const kCVReturnSuccess: i32 = 0;

#[link(name = "CoreVideo", kind = "framework")]
unsafe extern "C" {
    /// Creates a pixel buffer with the given dimensions and FourCC format.
    /// `pixel_buffer_attributes` carries the API compatibility keys.
    pub fn CVPixelBufferCreate(
        allocator: *const c_void,
        width: usize,
        height: usize,
        pixel_format_type: u32,
        pixel_buffer_attributes: CFDictionaryRef,
        pixel_buffer_out: *mut CVPixelBufferRef,
    ) -> i32;

    pub fn CVPixelBufferGetWidth(pixel_buffer: CVPixelBufferRef) -> usize;
    pub fn CVPixelBufferGetHeight(pixel_buffer: CVPixelBufferRef) -> usize;
    pub fn CVPixelBufferGetPixelFormatType(pixel_buffer: CVPixelBufferRef) -> u32;

    /// Creates a texture cache that materializes OpenGL textures from pixel
    /// buffers. Tied to the CGL context; use only from the thread where
    /// that context is current.
    pub fn CVOpenGLTextureCacheCreate(
        allocator: *const c_void,
        cache_attributes: CFDictionaryRef,
        cgl_context: CGLContextObj,
        cgl_pixel_format: CGLPixelFormatObj,
        texture_attributes: CFDictionaryRef,
        cache_out: *mut CVOpenGLTextureCacheRef,
    ) -> i32;

    /// Creates a pixel-buffer-backed OpenGL texture image.
    /// The resulting texture uses the GL_TEXTURE_RECTANGLE target on macOS.
    pub fn CVOpenGLTextureCacheCreateTextureFromImage(
        allocator: *const c_void,
        texture_cache: CVOpenGLTextureCacheRef,
        source_image: CVPixelBufferRef,
        texture_attributes: CFDictionaryRef,
        texture_out: *mut CVOpenGLTextureRef,
    ) -> i32;

    /// OpenGL texture name (ID) of a materialized image; zero on failure.
    pub fn CVOpenGLTextureGetName(texture: CVOpenGLTextureRef) -> u32;

    /// OpenGL texture target of a materialized image
    /// (GL_TEXTURE_RECTANGLE, 0x84F5, on macOS).
    pub fn CVOpenGLTextureGetTarget(texture: CVOpenGLTextureRef) -> u32;

    /// Creates a texture cache that materializes Metal textures from pixel
    /// buffers.
    pub fn CVMetalTextureCacheCreate(
        allocator: *const c_void,
        cache_attributes: *const c_void,
        metal_device: *const c_void,
        texture_attributes: *const c_void,
        cache_out: *mut CVMetalTextureCacheRef,
    ) -> i32;

    /// Creates a pixel-buffer-backed Metal texture image.
    /// `pixel_format` is the raw MTLPixelFormat value.
    pub fn CVMetalTextureCacheCreateTextureFromImage(
        allocator: *const c_void,
        texture_cache: CVMetalTextureCacheRef,
        source_image: CVPixelBufferRef,
        texture_attributes: *const c_void,
        pixel_format: u64,
        width: usize,
        height: usize,
        plane_index: usize,
        texture_out: *mut CVMetalTextureRef,
    ) -> i32;

    /// The MTLTexture behind a materialized image; null on failure.
    pub fn CVMetalTextureGetTexture(texture: CVMetalTextureRef) -> *mut c_void;
}

#[link(name = "CoreVideo", kind = "framework")]
unsafe extern "C" {
    // Compatibility keys - request a backing layout both drivers can address
    pub static kCVPixelBufferOpenGLCompatibilityKey: CFStringRef;
    pub static kCVPixelBufferMetalCompatibilityKey: CFStringRef;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    pub fn CFRelease(cf: *const c_void);

    pub fn CFDictionaryCreate(
        allocator: *const c_void,
        keys: *const *const c_void,
        values: *const *const c_void,
        num_values: isize,
        key_callbacks: *const c_void,
        value_callbacks: *const c_void,
    ) -> CFDictionaryRef;

    pub static kCFBooleanTrue: CFBooleanRef;
}
