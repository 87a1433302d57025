// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The real macOS interop driver: CoreVideo pixel buffers viewed through
//! CVOpenGLTextureCache and CVMetalTextureCache.

use std::ffi::c_void;
use std::ptr;

use anyhow::anyhow;
use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_metal::{
    MTLCommandBuffer, MTLCommandEncoder, MTLCommandQueue, MTLDevice, MTLLibrary,
    MTLRenderPassDescriptor, MTLRenderPipelineState, MTLTexture,
};

use super::cgl::{CglContext, CglPixelFormat};
use super::corevideo_ffi::{
    kCFBooleanTrue, kCVPixelBufferMetalCompatibilityKey, kCVPixelBufferOpenGLCompatibilityKey,
    kCVReturnSuccess, CFDictionaryCreate, CFRelease, CVMetalTextureCacheCreate,
    CVMetalTextureCacheCreateTextureFromImage, CVMetalTextureCacheRef, CVMetalTextureGetTexture,
    CVMetalTextureRef, CVOpenGLTextureCacheCreate, CVOpenGLTextureCacheCreateTextureFromImage,
    CVOpenGLTextureCacheRef, CVOpenGLTextureGetName, CVOpenGLTextureGetTarget, CVOpenGLTextureRef,
    CVPixelBufferCreate, CVPixelBufferGetHeight, CVPixelBufferGetPixelFormatType,
    CVPixelBufferGetWidth, CVPixelBufferRef,
};
use super::metal;
use crate::core::{
    BufferCompat, ClearColor, InteropConfig, InteropDriver, InteropError, PixelFormat, Result,
    TextureFormat,
};

/// Shared CoreVideo pixel buffer; releases the platform reference on drop.
pub struct CvPixelBuffer {
    raw: CVPixelBufferRef,
}

impl CvPixelBuffer {
    /// Raw CVPixelBufferRef for platform calls.
    pub fn as_ptr(&self) -> CVPixelBufferRef {
        self.raw
    }

    pub fn width(&self) -> u32 {
        unsafe { CVPixelBufferGetWidth(self.raw) as u32 }
    }

    pub fn height(&self) -> u32 {
        unsafe { CVPixelBufferGetHeight(self.raw) as u32 }
    }

    /// FourCC of the buffer's pixel format.
    pub fn format_type(&self) -> u32 {
        unsafe { CVPixelBufferGetPixelFormatType(self.raw) }
    }
}

impl Drop for CvPixelBuffer {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { CFRelease(self.raw as *const c_void) };
        }
    }
}

// CVPixelBuffer is thread-safe
unsafe impl Send for CvPixelBuffer {}
unsafe impl Sync for CvPixelBuffer {}

/// CVOpenGLTextureCache wrapper. Tied to the host GL context's thread.
pub struct GlTextureCache {
    raw: CVOpenGLTextureCacheRef,
}

impl Drop for GlTextureCache {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { CFRelease(self.raw as *const c_void) };
        }
    }
}

unsafe impl Send for GlTextureCache {}

/// Pixel-buffer-backed OpenGL texture image.
pub struct GlTextureImage {
    raw: CVOpenGLTextureRef,
}

impl GlTextureImage {
    /// OpenGL texture target; GL_TEXTURE_RECTANGLE on macOS, so the host
    /// must bind the name with that target.
    pub fn target(&self) -> u32 {
        unsafe { CVOpenGLTextureGetTarget(self.raw) }
    }
}

impl Drop for GlTextureImage {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { CFRelease(self.raw as *const c_void) };
        }
    }
}

unsafe impl Send for GlTextureImage {}

/// CVMetalTextureCache wrapper.
pub struct MetalTextureCache {
    raw: CVMetalTextureCacheRef,
}

impl Drop for MetalTextureCache {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { CFRelease(self.raw as *const c_void) };
        }
    }
}

// CVMetalTextureCache is thread-safe
unsafe impl Send for MetalTextureCache {}
unsafe impl Sync for MetalTextureCache {}

/// Pixel-buffer-backed Metal texture image.
pub struct MetalTextureImage {
    raw: CVMetalTextureRef,
}

impl Drop for MetalTextureImage {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe { CFRelease(self.raw as *const c_void) };
        }
    }
}

// CVMetalTexture is thread-safe
unsafe impl Send for MetalTextureImage {}
unsafe impl Sync for MetalTextureImage {}

/// [`InteropDriver`] over CoreVideo, CGL, and Metal.
///
/// Stateless: every resource it creates is owned by the interop texture or
/// the service, never by the driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreVideoDriver;

impl CoreVideoDriver {
    pub fn new() -> Self {
        Self
    }
}

impl InteropDriver for CoreVideoDriver {
    type GlContext = CglContext;
    type GlContextFormat = CglPixelFormat;
    type PixelBuffer = CvPixelBuffer;
    type GlCache = GlTextureCache;
    type GlTexture = GlTextureImage;
    type NativeCache = MetalTextureCache;
    type NativeImage = MetalTextureImage;
    type NativeTexture = Retained<ProtocolObject<dyn MTLTexture>>;
    type Device = Retained<ProtocolObject<dyn MTLDevice>>;
    type ShaderLibrary = Retained<ProtocolObject<dyn MTLLibrary>>;
    type CommandQueue = Retained<ProtocolObject<dyn MTLCommandQueue>>;
    type PipelineState = Retained<ProtocolObject<dyn MTLRenderPipelineState>>;
    type RenderPass = Retained<MTLRenderPassDescriptor>;
    type CommandBuffer = Retained<ProtocolObject<dyn MTLCommandBuffer>>;
    type Submission = Retained<ProtocolObject<dyn MTLCommandBuffer>>;

    fn create_device(&self) -> Result<Self::Device> {
        metal::create_system_device()
    }

    fn device_name(&self, device: &Self::Device) -> String {
        device.name().to_string()
    }

    fn load_shader_library(&self, device: &Self::Device) -> Result<Self::ShaderLibrary> {
        metal::load_default_library(device)
    }

    fn create_command_queue(&self, device: &Self::Device) -> Result<Self::CommandQueue> {
        metal::create_command_queue(device)
    }

    fn create_pipeline_state(
        &self,
        device: &Self::Device,
        library: &Self::ShaderLibrary,
        config: &InteropConfig,
    ) -> Result<Self::PipelineState> {
        metal::create_pipeline_state(device, library, config)
    }

    fn create_render_pass(&self, clear_color: ClearColor) -> Result<Self::RenderPass> {
        metal::create_render_pass(clear_color)
    }

    fn gl_context_format(&self, context: &CglContext) -> Result<CglPixelFormat> {
        let pixel_format = context.pixel_format_ptr();
        if pixel_format.is_null() {
            tracing::error!("host GL context carries no CGL pixel format");
            return Err(InteropError::ContextFormatUnavailable);
        }
        Ok(CglPixelFormat(pixel_format))
    }

    fn allocate_pixel_buffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        compat: BufferCompat,
    ) -> Result<CvPixelBuffer> {
        let mut keys: Vec<*const c_void> = Vec::with_capacity(2);
        unsafe {
            if compat.contains(BufferCompat::GL) {
                keys.push(kCVPixelBufferOpenGLCompatibilityKey);
            }
            if compat.contains(BufferCompat::NATIVE) {
                keys.push(kCVPixelBufferMetalCompatibilityKey);
            }
        }
        let values: Vec<*const c_void> = keys.iter().map(|_| unsafe { kCFBooleanTrue }).collect();

        let mut raw: CVPixelBufferRef = ptr::null_mut();
        let status = unsafe {
            let attributes = CFDictionaryCreate(
                ptr::null(),
                keys.as_ptr(),
                values.as_ptr(),
                keys.len() as isize,
                ptr::null(),
                ptr::null(),
            );
            let status = CVPixelBufferCreate(
                ptr::null(),
                width as usize,
                height as usize,
                format.as_fourcc(),
                attributes,
                &mut raw,
            );
            CFRelease(attributes);
            status
        };

        if status != kCVReturnSuccess || raw.is_null() {
            tracing::error!(width, height, status, "CVPixelBufferCreate failed");
            return Err(InteropError::BufferAllocation(format!(
                "CVPixelBufferCreate returned status {status}"
            )));
        }

        let buffer = CvPixelBuffer { raw };
        if buffer.width() != width || buffer.height() != height {
            return Err(InteropError::BufferAllocation(format!(
                "allocated {}x{}, requested {width}x{height}",
                buffer.width(),
                buffer.height()
            )));
        }
        Ok(buffer)
    }

    fn create_gl_cache(
        &self,
        context: &CglContext,
        context_format: &CglPixelFormat,
    ) -> Result<GlTextureCache> {
        let mut raw: CVOpenGLTextureCacheRef = ptr::null_mut();
        let status = unsafe {
            CVOpenGLTextureCacheCreate(
                ptr::null(),
                ptr::null(),
                context.context_ptr(),
                context_format.0,
                ptr::null(),
                &mut raw,
            )
        };
        if status != kCVReturnSuccess || raw.is_null() {
            tracing::error!(status, "CVOpenGLTextureCacheCreate failed");
            return Err(InteropError::GlCacheCreation(format!(
                "CVOpenGLTextureCacheCreate returned status {status}"
            )));
        }
        Ok(GlTextureCache { raw })
    }

    fn create_gl_texture(
        &self,
        cache: &GlTextureCache,
        buffer: &CvPixelBuffer,
    ) -> Result<GlTextureImage> {
        let mut raw: CVOpenGLTextureRef = ptr::null_mut();
        let status = unsafe {
            CVOpenGLTextureCacheCreateTextureFromImage(
                ptr::null(),
                cache.raw,
                buffer.raw,
                ptr::null(),
                &mut raw,
            )
        };
        if status != kCVReturnSuccess || raw.is_null() {
            tracing::error!(status, "CVOpenGLTextureCacheCreateTextureFromImage failed");
            return Err(InteropError::GlTextureCreation(format!(
                "CVOpenGLTextureCacheCreateTextureFromImage returned status {status}"
            )));
        }
        Ok(GlTextureImage { raw })
    }

    fn gl_texture_id(&self, texture: &GlTextureImage) -> u32 {
        unsafe { CVOpenGLTextureGetName(texture.raw) }
    }

    fn create_native_cache(&self, device: &Self::Device) -> Result<MetalTextureCache> {
        let device_ptr = &**device as *const ProtocolObject<dyn MTLDevice> as *const c_void;
        let mut raw: CVMetalTextureCacheRef = ptr::null_mut();
        let status = unsafe {
            CVMetalTextureCacheCreate(ptr::null(), ptr::null(), device_ptr, ptr::null(), &mut raw)
        };
        if status != kCVReturnSuccess || raw.is_null() {
            tracing::error!(status, "CVMetalTextureCacheCreate failed");
            return Err(InteropError::NativeCacheCreation(format!(
                "CVMetalTextureCacheCreate returned status {status}"
            )));
        }
        Ok(MetalTextureCache { raw })
    }

    fn create_native_image(
        &self,
        cache: &MetalTextureCache,
        buffer: &CvPixelBuffer,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<MetalTextureImage> {
        let mut raw: CVMetalTextureRef = ptr::null_mut();
        let status = unsafe {
            CVMetalTextureCacheCreateTextureFromImage(
                ptr::null(),
                cache.raw,
                buffer.raw,
                ptr::null(),
                format.to_mtl_pixel_format(),
                width as usize,
                height as usize,
                0, // plane index
                &mut raw,
            )
        };
        if status != kCVReturnSuccess || raw.is_null() {
            tracing::error!(status, "CVMetalTextureCacheCreateTextureFromImage failed");
            return Err(InteropError::NativeTextureCreation(format!(
                "CVMetalTextureCacheCreateTextureFromImage returned status {status}"
            )));
        }
        Ok(MetalTextureImage { raw })
    }

    fn native_texture(&self, image: &MetalTextureImage) -> Option<Self::NativeTexture> {
        let ptr = unsafe { CVMetalTextureGetTexture(image.raw) };
        if ptr.is_null() {
            return None;
        }
        unsafe { Retained::retain(ptr as *mut ProtocolObject<dyn MTLTexture>) }
    }

    fn create_command_buffer(&self, queue: &Self::CommandQueue) -> Result<Self::CommandBuffer> {
        queue
            .commandBuffer()
            .ok_or_else(|| InteropError::Other(anyhow!("failed to create Metal command buffer")))
    }

    fn encode_clear_pass(
        &self,
        command_buffer: &Self::CommandBuffer,
        render_pass: &Self::RenderPass,
        target: &Self::NativeTexture,
    ) -> Result<()> {
        unsafe {
            let attachment = render_pass.colorAttachments().objectAtIndexedSubscript(0);
            attachment.setTexture(Some(&**target));
        }
        let encoder = command_buffer
            .renderCommandEncoderWithDescriptor(render_pass)
            .ok_or_else(|| InteropError::Other(anyhow!("failed to begin interop render pass")))?;
        // Clear-and-store only; effect draw calls slot in here later.
        encoder.endEncoding();
        Ok(())
    }

    fn commit(&self, command_buffer: Self::CommandBuffer) -> Self::Submission {
        command_buffer.commit();
        command_buffer
    }

    fn wait_for_submission(&self, submission: &Self::Submission) {
        submission.waitUntilCompleted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apple::cgl::OffscreenGlContext;
    use crate::core::texture::InteropTexture;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_device_name_is_nonempty() {
        let driver = CoreVideoDriver::new();
        let device = driver.create_device().expect("Metal device");
        assert!(!driver.device_name(&device).is_empty());
    }

    #[test]
    #[serial]
    fn test_pixel_buffer_allocation() {
        let driver = CoreVideoDriver::new();
        let buffer = driver
            .allocate_pixel_buffer(
                64,
                64,
                PixelFormat::Bgra32,
                BufferCompat::GL | BufferCompat::NATIVE,
            )
            .expect("pixel buffer");
        assert_eq!(buffer.width(), 64);
        assert_eq!(buffer.height(), 64);
        assert_eq!(buffer.format_type(), PixelFormat::Bgra32.as_fourcc());
    }

    #[test]
    #[serial]
    fn test_metal_view_of_pixel_buffer() {
        let driver = CoreVideoDriver::new();
        let device = driver.create_device().expect("Metal device");
        let buffer = driver
            .allocate_pixel_buffer(
                128,
                128,
                PixelFormat::Bgra32,
                BufferCompat::GL | BufferCompat::NATIVE,
            )
            .expect("pixel buffer");

        let cache = driver.create_native_cache(&device).expect("texture cache");
        let image = driver
            .create_native_image(&cache, &buffer, TextureFormat::Bgra8Unorm, 128, 128)
            .expect("texture image");
        let texture = driver.native_texture(&image).expect("texture object");
        assert_eq!(texture.width(), 128);
        assert_eq!(texture.height(), 128);
    }

    #[test]
    #[serial]
    fn test_full_interop_texture_against_offscreen_context() {
        let driver = CoreVideoDriver::new();
        let device = driver.create_device().expect("Metal device");
        let offscreen = OffscreenGlContext::new().expect("offscreen GL context");
        let context = offscreen.as_cgl_context();

        let texture = InteropTexture::create(
            &driver,
            &device,
            &context,
            256,
            256,
            TextureFormat::Bgra8Unorm,
        )
        .expect("interop texture");
        assert_ne!(texture.gl_texture_id().get(), 0);
        assert_eq!(texture.width(), 256);
        assert_eq!(texture.height(), 256);
    }
}
