// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Driver seam between the interop logic and the platform GPU stacks.
//!
//! Three subsystems sit behind this trait: the platform video-buffer
//! framework (shared allocations), the GL driver (the host display
//! pipeline's API), and the native explicit GPU API (device, queue,
//! pipeline, render pass). The interop service and texture only ever talk
//! to these through an [`InteropDriver`], which keeps the construction and
//! caching logic testable without a GPU and keeps platform bindings in one
//! place.

use super::config::{ClearColor, InteropConfig};
use super::error::Result;
use super::format::{BufferCompat, PixelFormat, TextureFormat};

/// Platform capability provider for cross-API texture sharing.
///
/// Each method corresponds to one platform operation and returns the error
/// variant named for that step, so failures stay attributable. Methods must
/// not retry or fall back to different formats; that policy belongs to the
/// caller.
pub trait InteropDriver {
    /// Host GL rendering context. Borrowed from the host, never owned.
    type GlContext;
    /// Low-level pixel format descriptor extracted from the GL context.
    type GlContextFormat;
    /// Shared GPU-addressable pixel storage.
    type PixelBuffer;
    /// GL-side cache converting pixel buffers into GL textures.
    type GlCache;
    /// GL texture image materialized from a pixel buffer.
    type GlTexture;
    /// Native-side cache converting pixel buffers into native textures.
    type NativeCache;
    /// Native texture image materialized from a pixel buffer.
    type NativeImage;
    /// Native texture object, bindable as a render target.
    type NativeTexture: Clone;
    /// Native GPU device handle.
    type Device: Clone;
    /// Compiled shader library bundled with the application.
    type ShaderLibrary;
    /// Command submission queue.
    type CommandQueue;
    /// Compiled render pipeline state.
    type PipelineState;
    /// Reusable render pass configuration; the color target is rebound per
    /// render.
    type RenderPass;
    /// Single-use command buffer.
    type CommandBuffer;
    /// Handle for one committed command buffer, waitable for completion.
    type Submission;

    // Device and pipeline setup.

    /// Acquire the default system GPU device.
    fn create_device(&self) -> Result<Self::Device>;

    /// Human-readable device name for diagnostics.
    fn device_name(&self, device: &Self::Device) -> String;

    /// Load the precompiled shader library bundled with the application.
    fn load_shader_library(&self, device: &Self::Device) -> Result<Self::ShaderLibrary>;

    /// Create the command submission queue.
    fn create_command_queue(&self, device: &Self::Device) -> Result<Self::CommandQueue>;

    /// Compile the render pipeline from the configured vertex/fragment pair,
    /// targeting the configured color format.
    fn create_pipeline_state(
        &self,
        device: &Self::Device,
        library: &Self::ShaderLibrary,
        config: &InteropConfig,
    ) -> Result<Self::PipelineState>;

    /// Build the reusable clear-and-store render pass configuration.
    fn create_render_pass(&self, clear_color: ClearColor) -> Result<Self::RenderPass>;

    // Interop texture construction.

    /// Extract the pixel format descriptor from the host GL context.
    fn gl_context_format(&self, context: &Self::GlContext) -> Result<Self::GlContextFormat>;

    /// Allocate shared pixel storage addressable by every driver named in
    /// `compat`.
    fn allocate_pixel_buffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        compat: BufferCompat,
    ) -> Result<Self::PixelBuffer>;

    /// Create a GL texture cache bound to the host context and its pixel
    /// format descriptor.
    fn create_gl_cache(
        &self,
        context: &Self::GlContext,
        context_format: &Self::GlContextFormat,
    ) -> Result<Self::GlCache>;

    /// Materialize a GL texture image from the shared buffer.
    fn create_gl_texture(
        &self,
        cache: &Self::GlCache,
        buffer: &Self::PixelBuffer,
    ) -> Result<Self::GlTexture>;

    /// GL texture name of a materialized image. Zero means the driver handed
    /// back an unusable texture.
    fn gl_texture_id(&self, texture: &Self::GlTexture) -> u32;

    /// Create a native texture cache bound to the device.
    fn create_native_cache(&self, device: &Self::Device) -> Result<Self::NativeCache>;

    /// Materialize a native texture image from the shared buffer.
    fn create_native_image(
        &self,
        cache: &Self::NativeCache,
        buffer: &Self::PixelBuffer,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self::NativeImage>;

    /// Extract the native texture object from a materialized image, `None`
    /// when the driver produced an empty image.
    fn native_texture(&self, image: &Self::NativeImage) -> Option<Self::NativeTexture>;

    // Rendering.

    /// Create one single-use command buffer.
    fn create_command_buffer(&self, queue: &Self::CommandQueue) -> Result<Self::CommandBuffer>;

    /// Encode the clear pass with `target` bound as the color attachment.
    fn encode_clear_pass(
        &self,
        command_buffer: &Self::CommandBuffer,
        render_pass: &Self::RenderPass,
        target: &Self::NativeTexture,
    ) -> Result<()>;

    /// Submit the command buffer. Fire-and-forget; the returned handle can
    /// be waited on via [`wait_for_submission`](Self::wait_for_submission).
    fn commit(&self, command_buffer: Self::CommandBuffer) -> Self::Submission;

    /// Block until the submission has completed on the GPU.
    fn wait_for_submission(&self, submission: &Self::Submission);
}
