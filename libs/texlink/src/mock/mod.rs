// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-memory interop driver for tests and headless development.
//!
//! Behaves like the platform stack without touching a GPU: "pixel buffers"
//! are byte vectors, the GL and native views share the buffer's storage (so
//! the same-memory invariant is observable), and every resource kind is
//! counted on creation and drop so leak checks are exact. Failures can be
//! injected at any single step via [`MockDriver::fail_next`].

use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::core::config::{ClearColor, InteropConfig};
use crate::core::driver::InteropDriver;
use crate::core::error::{InteropError, Result};
use crate::core::format::{BufferCompat, PixelFormat, TextureFormat};

/// One injectable failure site, matching the driver operation of the same
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Device,
    ShaderLibrary,
    CommandQueue,
    PipelineState,
    RenderPass,
    ContextFormat,
    BufferAllocation,
    GlCache,
    GlTexture,
    GlTextureId,
    NativeCache,
    NativeImage,
    NativeTextureObject,
    CommandBuffer,
}

/// Creation and liveness counters, snapshot via [`MockDriver::stats`].
#[derive(Debug, Default, Clone)]
pub struct MockStats {
    pub devices_created: usize,
    pub libraries_created: usize,
    pub queues_created: usize,
    pub pipelines_created: usize,
    pub render_passes_created: usize,
    pub buffers_created: usize,
    pub live_buffers: usize,
    pub gl_caches_created: usize,
    pub live_gl_caches: usize,
    pub gl_textures_created: usize,
    pub live_gl_textures: usize,
    pub native_caches_created: usize,
    pub live_native_caches: usize,
    pub native_images_created: usize,
    pub live_native_images: usize,
    pub command_buffers_created: usize,
    pub commits: usize,
    pub completed_waits: usize,
    pub last_buffer_compat: Option<BufferCompat>,
}

#[derive(Default)]
struct MockState {
    fail: Option<FailPoint>,
    next_id: u64,
    stats: MockStats,
}

type SharedState = Arc<Mutex<MockState>>;

/// Headless [`InteropDriver`] implementation.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: SharedState,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure at `point`; the next operation hitting that
    /// point fails and the arming is consumed.
    pub fn fail_next(&self, point: FailPoint) {
        self.state.lock().fail = Some(point);
    }

    /// Disarm any pending failure.
    pub fn clear_failure(&self) {
        self.state.lock().fail = None;
    }

    /// Snapshot of the creation/liveness counters.
    pub fn stats(&self) -> MockStats {
        self.state.lock().stats.clone()
    }

    fn take_fail(&self, point: FailPoint) -> bool {
        let mut state = self.state.lock();
        if state.fail == Some(point) {
            state.fail = None;
            true
        } else {
            false
        }
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state.lock();
        state.next_id += 1;
        state.next_id
    }
}

/// Stand-in for the host GL rendering context.
#[derive(Debug, Clone)]
pub struct MockGlContext {
    has_format: bool,
}

impl MockGlContext {
    /// A context carrying a pixel format descriptor, the normal case.
    pub fn new() -> Self {
        Self { has_format: true }
    }

    /// A context with no pixel format descriptor attached.
    pub fn without_format() -> Self {
        Self { has_format: false }
    }
}

impl Default for MockGlContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque descriptor extracted from a [`MockGlContext`].
#[derive(Debug, Clone, Copy)]
pub struct MockContextFormat;

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub id: u64,
}

pub struct MockShaderLibrary {
    #[allow(dead_code)]
    id: u64,
}

pub struct MockCommandQueue {
    #[allow(dead_code)]
    id: u64,
}

pub struct MockPipelineState {
    #[allow(dead_code)]
    id: u64,
}

pub struct MockRenderPass {
    clear_color: ClearColor,
}

pub struct MockCommandBuffer {
    #[allow(dead_code)]
    id: u64,
}

/// Committed command buffer; waiting bumps the `completed_waits` counter.
pub struct MockSubmission {
    state: SharedState,
}

/// Shared pixel storage; both texture views alias `storage`.
pub struct MockBuffer {
    id: u64,
    width: u32,
    height: u32,
    format: PixelFormat,
    storage: Arc<Mutex<Vec<u8>>>,
    state: SharedState,
}

impl MockBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Copy of the backing bytes.
    pub fn contents(&self) -> Vec<u8> {
        self.storage.lock().clone()
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.state.lock().stats.live_buffers -= 1;
    }
}

pub struct MockGlCache {
    #[allow(dead_code)]
    id: u64,
    state: SharedState,
}

impl Drop for MockGlCache {
    fn drop(&mut self) {
        self.state.lock().stats.live_gl_caches -= 1;
    }
}

/// GL-side texture view; reads go straight to the shared storage.
pub struct MockGlTexture {
    gl_name: u32,
    storage: Arc<Mutex<Vec<u8>>>,
    state: SharedState,
}

impl MockGlTexture {
    /// What a GL read-back of the texture would return.
    pub fn contents(&self) -> Vec<u8> {
        self.storage.lock().clone()
    }
}

impl Drop for MockGlTexture {
    fn drop(&mut self) {
        self.state.lock().stats.live_gl_textures -= 1;
    }
}

pub struct MockNativeCache {
    #[allow(dead_code)]
    id: u64,
    state: SharedState,
}

impl Drop for MockNativeCache {
    fn drop(&mut self) {
        self.state.lock().stats.live_native_caches -= 1;
    }
}

/// Native-side texture view over the shared storage.
#[derive(Clone)]
pub struct MockNativeTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
    storage: Arc<Mutex<Vec<u8>>>,
}

impl MockNativeTexture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Write `pixel` over the whole texture, as a native-API render would.
    pub fn fill(&self, pixel: [u8; 4]) {
        let mut storage = self.storage.lock();
        for chunk in storage.chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }
}

pub struct MockNativeImage {
    texture: MockNativeTexture,
    state: SharedState,
}

impl Drop for MockNativeImage {
    fn drop(&mut self) {
        self.state.lock().stats.live_native_images -= 1;
    }
}

fn clear_color_bytes(color: ClearColor) -> [u8; 4] {
    let to_byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        to_byte(color.red),
        to_byte(color.green),
        to_byte(color.blue),
        to_byte(color.alpha),
    ]
}

impl InteropDriver for MockDriver {
    type GlContext = MockGlContext;
    type GlContextFormat = MockContextFormat;
    type PixelBuffer = MockBuffer;
    type GlCache = MockGlCache;
    type GlTexture = MockGlTexture;
    type NativeCache = MockNativeCache;
    type NativeImage = MockNativeImage;
    type NativeTexture = MockNativeTexture;
    type Device = MockDevice;
    type ShaderLibrary = MockShaderLibrary;
    type CommandQueue = MockCommandQueue;
    type PipelineState = MockPipelineState;
    type RenderPass = MockRenderPass;
    type CommandBuffer = MockCommandBuffer;
    type Submission = MockSubmission;

    fn create_device(&self) -> Result<MockDevice> {
        if self.take_fail(FailPoint::Device) {
            return Err(InteropError::Initialization(
                "mock device unavailable".into(),
            ));
        }
        let id = self.next_id();
        self.state.lock().stats.devices_created += 1;
        Ok(MockDevice { id })
    }

    fn device_name(&self, _device: &MockDevice) -> String {
        "Mock GPU".to_string()
    }

    fn load_shader_library(&self, _device: &MockDevice) -> Result<MockShaderLibrary> {
        if self.take_fail(FailPoint::ShaderLibrary) {
            return Err(InteropError::Initialization(
                "mock shader library missing".into(),
            ));
        }
        let id = self.next_id();
        self.state.lock().stats.libraries_created += 1;
        Ok(MockShaderLibrary { id })
    }

    fn create_command_queue(&self, _device: &MockDevice) -> Result<MockCommandQueue> {
        if self.take_fail(FailPoint::CommandQueue) {
            return Err(InteropError::Initialization(
                "mock command queue refused".into(),
            ));
        }
        let id = self.next_id();
        self.state.lock().stats.queues_created += 1;
        Ok(MockCommandQueue { id })
    }

    fn create_pipeline_state(
        &self,
        _device: &MockDevice,
        _library: &MockShaderLibrary,
        _config: &InteropConfig,
    ) -> Result<MockPipelineState> {
        if self.take_fail(FailPoint::PipelineState) {
            return Err(InteropError::Initialization(
                "mock pipeline compile failed".into(),
            ));
        }
        let id = self.next_id();
        self.state.lock().stats.pipelines_created += 1;
        Ok(MockPipelineState { id })
    }

    fn create_render_pass(&self, clear_color: ClearColor) -> Result<MockRenderPass> {
        if self.take_fail(FailPoint::RenderPass) {
            return Err(InteropError::Initialization(
                "mock render pass refused".into(),
            ));
        }
        self.state.lock().stats.render_passes_created += 1;
        Ok(MockRenderPass { clear_color })
    }

    fn gl_context_format(&self, context: &MockGlContext) -> Result<MockContextFormat> {
        if !context.has_format || self.take_fail(FailPoint::ContextFormat) {
            return Err(InteropError::ContextFormatUnavailable);
        }
        Ok(MockContextFormat)
    }

    fn allocate_pixel_buffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        compat: BufferCompat,
    ) -> Result<MockBuffer> {
        if self.take_fail(FailPoint::BufferAllocation) {
            return Err(InteropError::BufferAllocation(
                "mock pixel buffer allocation refused".into(),
            ));
        }
        let id = self.next_id();
        let bytes = width as usize * height as usize * (format.bits_per_pixel() / 8) as usize;
        let mut state = self.state.lock();
        state.stats.buffers_created += 1;
        state.stats.live_buffers += 1;
        state.stats.last_buffer_compat = Some(compat);
        Ok(MockBuffer {
            id,
            width,
            height,
            format,
            storage: Arc::new(Mutex::new(vec![0u8; bytes])),
            state: Arc::clone(&self.state),
        })
    }

    fn create_gl_cache(
        &self,
        _context: &MockGlContext,
        _context_format: &MockContextFormat,
    ) -> Result<MockGlCache> {
        if self.take_fail(FailPoint::GlCache) {
            return Err(InteropError::GlCacheCreation("mock GL cache refused".into()));
        }
        let id = self.next_id();
        let mut state = self.state.lock();
        state.stats.gl_caches_created += 1;
        state.stats.live_gl_caches += 1;
        Ok(MockGlCache {
            id,
            state: Arc::clone(&self.state),
        })
    }

    fn create_gl_texture(&self, _cache: &MockGlCache, buffer: &MockBuffer) -> Result<MockGlTexture> {
        if self.take_fail(FailPoint::GlTexture) {
            return Err(InteropError::GlTextureCreation(
                "mock GL texture refused".into(),
            ));
        }
        let gl_name = self.next_id() as u32;
        let mut state = self.state.lock();
        state.stats.gl_textures_created += 1;
        state.stats.live_gl_textures += 1;
        Ok(MockGlTexture {
            gl_name,
            storage: Arc::clone(&buffer.storage),
            state: Arc::clone(&self.state),
        })
    }

    fn gl_texture_id(&self, texture: &MockGlTexture) -> u32 {
        if self.take_fail(FailPoint::GlTextureId) {
            return 0;
        }
        texture.gl_name
    }

    fn create_native_cache(&self, _device: &MockDevice) -> Result<MockNativeCache> {
        if self.take_fail(FailPoint::NativeCache) {
            return Err(InteropError::NativeCacheCreation(
                "mock native cache refused".into(),
            ));
        }
        let id = self.next_id();
        let mut state = self.state.lock();
        state.stats.native_caches_created += 1;
        state.stats.live_native_caches += 1;
        Ok(MockNativeCache {
            id,
            state: Arc::clone(&self.state),
        })
    }

    fn create_native_image(
        &self,
        _cache: &MockNativeCache,
        buffer: &MockBuffer,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<MockNativeImage> {
        if self.take_fail(FailPoint::NativeImage) {
            return Err(InteropError::NativeTextureCreation(
                "mock native image refused".into(),
            ));
        }
        let mut state = self.state.lock();
        state.stats.native_images_created += 1;
        state.stats.live_native_images += 1;
        Ok(MockNativeImage {
            texture: MockNativeTexture {
                width,
                height,
                format,
                storage: Arc::clone(&buffer.storage),
            },
            state: Arc::clone(&self.state),
        })
    }

    fn native_texture(&self, image: &MockNativeImage) -> Option<MockNativeTexture> {
        if self.take_fail(FailPoint::NativeTextureObject) {
            return None;
        }
        Some(image.texture.clone())
    }

    fn create_command_buffer(&self, _queue: &MockCommandQueue) -> Result<MockCommandBuffer> {
        if self.take_fail(FailPoint::CommandBuffer) {
            return Err(InteropError::Other(anyhow!(
                "mock command buffer refused"
            )));
        }
        let id = self.next_id();
        self.state.lock().stats.command_buffers_created += 1;
        Ok(MockCommandBuffer { id })
    }

    fn encode_clear_pass(
        &self,
        _command_buffer: &MockCommandBuffer,
        render_pass: &MockRenderPass,
        target: &MockNativeTexture,
    ) -> Result<()> {
        target.fill(clear_color_bytes(render_pass.clear_color));
        Ok(())
    }

    fn commit(&self, _command_buffer: MockCommandBuffer) -> MockSubmission {
        self.state.lock().stats.commits += 1;
        MockSubmission {
            state: Arc::clone(&self.state),
        }
    }

    fn wait_for_submission(&self, submission: &MockSubmission) {
        submission.state.lock().stats.completed_waits += 1;
    }
}
