// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The interop service: device/pipeline ownership, the single-slot texture
//! cache, and the render-to-texture entry point.

use std::sync::Arc;

use parking_lot::Mutex;

use super::config::InteropConfig;
use super::driver::InteropDriver;
use super::error::{InteropError, Result};
use super::texture::{GlTextureId, InteropTexture};

/// GPU objects created once per service lifetime.
pub struct GpuContext<D: InteropDriver> {
    pub(crate) device: D::Device,
    #[allow(dead_code)]
    pub(crate) library: D::ShaderLibrary,
    pub(crate) queue: D::CommandQueue,
    #[allow(dead_code)]
    pub(crate) pipeline: D::PipelineState,
    pub(crate) render_pass: D::RenderPass,
}

/// Initialization status of the native GPU stack.
///
/// A failed initialization is sticky: the service reports the failure on
/// every subsequent call instead of limping along with a half-built context.
enum GpuState<D: InteropDriver> {
    Uninitialized,
    Ready(GpuContext<D>),
    Failed,
}

/// Owns the native GPU stack and at most one cached [`InteropTexture`].
///
/// Construct one per host display pipeline and keep it for the process
/// lifetime; all GPU objects are created lazily on first use and torn down
/// by [`shutdown`](Self::shutdown) or drop.
///
/// Not thread-safe by design: the host calls it from its render thread
/// only. Hosts that render from several threads wrap it in
/// [`SharedInteropService`].
pub struct InteropService<D: InteropDriver> {
    driver: D,
    config: InteropConfig,
    gpu: GpuState<D>,
    cached: Option<InteropTexture<D>>,
    last_submission: Option<D::Submission>,
}

impl<D: InteropDriver> InteropService<D> {
    /// Create a service with default configuration. No GPU work happens
    /// until the first render or query.
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, InteropConfig::default())
    }

    /// Create a service with an explicit configuration.
    pub fn with_config(driver: D, config: InteropConfig) -> Self {
        Self {
            driver,
            config,
            gpu: GpuState::Uninitialized,
            cached: None,
            last_submission: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &InteropConfig {
        &self.config
    }

    /// Whether the GPU stack is up.
    pub fn is_initialized(&self) -> bool {
        matches!(self.gpu, GpuState::Ready(_))
    }

    /// Whether an interop texture is currently cached.
    pub fn has_cached_texture(&self) -> bool {
        self.cached.is_some()
    }

    /// Bring up the native GPU stack if it is not up already.
    ///
    /// Idempotent: once ready, nothing is re-created. Once failed, the
    /// failure is reported on every call for the service's lifetime.
    pub fn ensure_initialized(&mut self) -> Result<()> {
        match &self.gpu {
            GpuState::Ready(_) => Ok(()),
            GpuState::Failed => Err(InteropError::Initialization(
                "GPU initialization previously failed".into(),
            )),
            GpuState::Uninitialized => match Self::initialize(&self.driver, &self.config) {
                Ok(context) => {
                    self.gpu = GpuState::Ready(context);
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(error = %err, "GPU initialization failed");
                    self.gpu = GpuState::Failed;
                    Err(err)
                }
            },
        }
    }

    fn initialize(driver: &D, config: &InteropConfig) -> Result<GpuContext<D>> {
        let device = driver.create_device()?;
        let library = driver.load_shader_library(&device)?;
        let queue = driver.create_command_queue(&device)?;
        let pipeline = driver.create_pipeline_state(&device, &library, config)?;
        let render_pass = driver.create_render_pass(config.clear_color)?;

        tracing::debug!(
            device = %driver.device_name(&device),
            "initialized GPU stack for texture interop"
        );

        Ok(GpuContext {
            device,
            library,
            queue,
            pipeline,
            render_pass,
        })
    }

    fn gpu(&self) -> Result<&GpuContext<D>> {
        match &self.gpu {
            GpuState::Ready(context) => Ok(context),
            _ => Err(InteropError::Initialization(
                "GPU stack is not initialized".into(),
            )),
        }
    }

    /// Device name for diagnostic display, initializing on demand.
    pub fn device_name(&mut self) -> Result<String> {
        self.ensure_initialized()?;
        Ok(self.driver.device_name(&self.gpu()?.device))
    }

    /// The interop texture for the requested dimensions.
    ///
    /// Single-slot cache: an exact `(width, height)` match returns the
    /// cached texture untouched. Anything else builds a replacement first
    /// and only then releases the previous one; a failed rebuild leaves the
    /// previous texture in place and propagates the error.
    pub fn interop_texture(
        &mut self,
        context: &D::GlContext,
        width: u32,
        height: u32,
    ) -> Result<&InteropTexture<D>> {
        self.ensure_initialized()?;
        match self.cached.take() {
            Some(texture) if texture.width() == width && texture.height() == height => {
                Ok(self.cached.insert(texture))
            }
            previous => {
                let device = self.gpu()?.device.clone();
                match InteropTexture::create(
                    &self.driver,
                    &device,
                    context,
                    width,
                    height,
                    self.config.texture_format,
                ) {
                    Ok(texture) => {
                        if previous.is_some() {
                            tracing::debug!(width, height, "replacing cached interop texture");
                        }
                        drop(previous);
                        Ok(self.cached.insert(texture))
                    }
                    Err(err) => {
                        self.cached = previous;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Render a clear pass into the interop texture for `width` x `height`
    /// and return the GL texture name for the host to composite.
    ///
    /// Submission is fire-and-forget: the command buffer is committed and
    /// the call returns without waiting for the GPU. Hosts that need the
    /// content to be visible before binding the name call
    /// [`wait_for_gpu`](Self::wait_for_gpu) first.
    pub fn render_to_texture(
        &mut self,
        context: &D::GlContext,
        width: u32,
        height: u32,
    ) -> Result<GlTextureId> {
        self.ensure_initialized()?;
        let (gl_texture_id, target) = {
            let texture = self.interop_texture(context, width, height)?;
            (texture.gl_texture_id(), texture.native_texture().clone())
        };

        let gpu = self.gpu()?;
        let command_buffer = self.driver.create_command_buffer(&gpu.queue)?;
        self.driver
            .encode_clear_pass(&command_buffer, &gpu.render_pass, &target)?;
        let submission = self.driver.commit(command_buffer);
        self.last_submission = Some(submission);

        tracing::trace!(
            width,
            height,
            gl_texture_id = gl_texture_id.get(),
            "submitted interop clear pass"
        );
        Ok(gl_texture_id)
    }

    /// Block until the most recent submission has completed on the GPU.
    ///
    /// No-op when nothing is pending.
    pub fn wait_for_gpu(&mut self) {
        if let Some(submission) = self.last_submission.take() {
            self.driver.wait_for_submission(&submission);
        }
    }

    /// Release the cached texture and the GPU context, returning the
    /// service to its uninitialized state. Dropping the service releases
    /// the same resources, but without waiting for in-flight GPU work.
    pub fn shutdown(&mut self) {
        self.wait_for_gpu();
        self.cached = None;
        self.gpu = GpuState::Uninitialized;
        tracing::debug!("interop service shut down");
    }
}

/// Thread-safe handle over an [`InteropService`] for hosts that issue
/// effect renders from more than one thread.
///
/// Every operation takes the internal lock for its full duration, so a
/// texture can never be observed mid-replacement.
pub struct SharedInteropService<D: InteropDriver> {
    inner: Arc<Mutex<InteropService<D>>>,
}

impl<D: InteropDriver> Clone for SharedInteropService<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: InteropDriver> SharedInteropService<D> {
    pub fn new(service: InteropService<D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// See [`InteropService::render_to_texture`].
    pub fn render_to_texture(
        &self,
        context: &D::GlContext,
        width: u32,
        height: u32,
    ) -> Result<GlTextureId> {
        self.inner.lock().render_to_texture(context, width, height)
    }

    /// See [`InteropService::device_name`].
    pub fn device_name(&self) -> Result<String> {
        self.inner.lock().device_name()
    }

    /// See [`InteropService::wait_for_gpu`].
    pub fn wait_for_gpu(&self) {
        self.inner.lock().wait_for_gpu();
    }

    /// See [`InteropService::shutdown`].
    pub fn shutdown(&self) {
        self.inner.lock().shutdown();
    }

    /// Run `f` with exclusive access to the underlying service.
    pub fn with<R>(&self, f: impl FnOnce(&mut InteropService<D>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailPoint, MockDriver, MockGlContext};

    #[test]
    fn test_initialization_is_idempotent() {
        let driver = MockDriver::new();
        let mut service = InteropService::new(driver.clone());

        for _ in 0..5 {
            service.ensure_initialized().expect("init");
        }

        let stats = driver.stats();
        assert_eq!(stats.devices_created, 1);
        assert_eq!(stats.libraries_created, 1);
        assert_eq!(stats.queues_created, 1);
        assert_eq!(stats.pipelines_created, 1);
        assert_eq!(stats.render_passes_created, 1);
    }

    #[test]
    fn test_initialization_failure_is_sticky() {
        let driver = MockDriver::new();
        driver.fail_next(FailPoint::PipelineState);
        let mut service = InteropService::new(driver.clone());

        service
            .ensure_initialized()
            .expect_err("armed pipeline failure");
        assert!(!service.is_initialized());

        // The fail point was consumed; a retry would succeed if the service
        // allowed one. It must not.
        let err = service.ensure_initialized().expect_err("sticky failure");
        assert!(matches!(err, InteropError::Initialization(_)));
        assert_eq!(driver.stats().devices_created, 1);
        assert_eq!(driver.stats().pipelines_created, 0);
    }

    #[test]
    fn test_device_failure_marks_service_failed() {
        let driver = MockDriver::new();
        driver.fail_next(FailPoint::Device);
        let mut service = InteropService::new(driver.clone());

        service.ensure_initialized().expect_err("no device");
        let err = service.ensure_initialized().expect_err("sticky failure");
        assert!(matches!(err, InteropError::Initialization(_)));
        assert_eq!(driver.stats().devices_created, 0);
    }

    #[test]
    fn test_device_name_reports_mock_gpu() {
        let driver = MockDriver::new();
        let mut service = InteropService::new(driver);
        assert_eq!(service.device_name().expect("name"), "Mock GPU");
        assert!(service.is_initialized());
    }

    #[test]
    fn test_cache_hit_returns_same_texture() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        let first_id = service
            .interop_texture(&context, 512, 512)
            .expect("texture")
            .gl_texture_id();
        let second_id = service
            .interop_texture(&context, 512, 512)
            .expect("texture")
            .gl_texture_id();

        assert_eq!(first_id, second_id);
        assert_eq!(driver.stats().buffers_created, 1, "no reconstruction on hit");
    }

    #[test]
    fn test_cache_replaces_on_size_change() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        let first_id = service
            .interop_texture(&context, 512, 512)
            .expect("texture")
            .gl_texture_id();
        let texture = service
            .interop_texture(&context, 256, 256)
            .expect("replacement");
        assert_eq!(texture.width(), 256);
        assert_eq!(texture.height(), 256);
        assert_ne!(texture.gl_texture_id(), first_id);

        let stats = driver.stats();
        assert_eq!(stats.buffers_created, 2);
        assert_eq!(stats.live_buffers, 1, "old texture released");
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_texture() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        let first_id = service
            .interop_texture(&context, 512, 512)
            .expect("texture")
            .gl_texture_id();

        driver.fail_next(FailPoint::BufferAllocation);
        service
            .interop_texture(&context, 256, 256)
            .expect_err("armed allocation failure");

        assert!(service.has_cached_texture());
        let texture = service
            .interop_texture(&context, 512, 512)
            .expect("cached texture still valid");
        assert_eq!(texture.gl_texture_id(), first_id);
        assert_eq!(driver.stats().live_buffers, 1);
    }

    #[test]
    fn test_render_to_texture_clears_with_configured_color() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        let id = service
            .render_to_texture(&context, 64, 64)
            .expect("render");
        assert_ne!(id.get(), 0);

        // Default clear color is opaque green; the mock writes it through
        // the native view, so it must be visible through the shared buffer.
        let contents = service
            .interop_texture(&context, 64, 64)
            .expect("cached texture")
            .pixel_buffer()
            .contents();
        assert_eq!(&contents[..4], &[0, 255, 0, 255]);

        let stats = driver.stats();
        assert_eq!(stats.command_buffers_created, 1);
        assert_eq!(stats.commits, 1);
    }

    #[test]
    fn test_each_render_uses_fresh_command_buffer() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        for _ in 0..3 {
            service.render_to_texture(&context, 64, 64).expect("render");
        }
        let stats = driver.stats();
        assert_eq!(stats.command_buffers_created, 3);
        assert_eq!(stats.commits, 3);
        assert_eq!(stats.buffers_created, 1, "texture cache reused across renders");
    }

    #[test]
    fn test_wait_for_gpu_consumes_pending_submission() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        service.render_to_texture(&context, 64, 64).expect("render");
        assert_eq!(driver.stats().completed_waits, 0);

        service.wait_for_gpu();
        assert_eq!(driver.stats().completed_waits, 1);

        // Nothing pending: no second wait.
        service.wait_for_gpu();
        assert_eq!(driver.stats().completed_waits, 1);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver.clone());

        service.render_to_texture(&context, 128, 128).expect("render");
        assert!(service.is_initialized());
        assert!(service.has_cached_texture());

        service.shutdown();
        assert!(!service.is_initialized());
        assert!(!service.has_cached_texture());
        assert_eq!(driver.stats().live_buffers, 0);
        assert_eq!(driver.stats().live_gl_caches, 0);
        assert_eq!(driver.stats().live_native_caches, 0);
    }

    #[test]
    fn test_shared_service_renders_from_clones() {
        let driver = MockDriver::new();
        let context = MockGlContext::new();
        let shared = SharedInteropService::new(InteropService::new(driver.clone()));

        let id = shared
            .render_to_texture(&context, 64, 64)
            .expect("render through shared handle");
        assert_ne!(id.get(), 0);

        let clone = shared.clone();
        assert_eq!(clone.device_name().expect("name"), "Mock GPU");
        assert_eq!(driver.stats().devices_created, 1);

        clone.shutdown();
        assert!(shared.with(|service| !service.is_initialized()));
    }
}
