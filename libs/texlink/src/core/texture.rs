// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The shared interop texture: one pixel buffer, two API-native views.

use super::driver::InteropDriver;
use super::error::{InteropError, Result};
use super::format::{interop_format_info, BufferCompat, TextureFormat};

/// Non-zero GL texture name handed to the host display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlTextureId(u32);

impl GlTextureId {
    /// Wrap a raw GL texture name; zero is not a valid name.
    pub fn new(id: u32) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    /// Raw GL texture name, bindable by the host.
    pub fn get(self) -> u32 {
        self.0
    }
}

/// One GPU allocation viewed as both a GL texture and a native texture.
///
/// Owns five platform resources: the shared pixel buffer, one texture cache
/// per API, and the two texture images derived through those caches. The GL
/// name and the native texture object both alias the buffer's memory; that
/// aliasing is the entire point of the type.
///
/// Built all-or-nothing by [`create`](Self::create) and torn down as a unit:
/// fields are declared in reverse order of acquisition, so drop glue
/// releases the native view first, then the GL view, then the buffer.
pub struct InteropTexture<D: InteropDriver> {
    native_texture: D::NativeTexture,
    #[allow(dead_code)]
    native_image: D::NativeImage,
    #[allow(dead_code)]
    native_cache: D::NativeCache,
    gl_texture_id: GlTextureId,
    gl_texture: D::GlTexture,
    #[allow(dead_code)]
    gl_cache: D::GlCache,
    buffer: D::PixelBuffer,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl<D: InteropDriver> InteropTexture<D> {
    /// Build the full interop bundle for one buffer.
    ///
    /// Every step can fail independently; on failure everything acquired so
    /// far is released and the error names the step that refused. The caller
    /// never observes a partially constructed texture.
    pub fn create(
        driver: &D,
        device: &D::Device,
        context: &D::GlContext,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InteropError::InvalidDimensions { width, height });
        }

        let context_format = driver.gl_context_format(context)?;

        let info = interop_format_info(format).ok_or_else(|| {
            tracing::error!(?format, "no interop format table entry");
            InteropError::UnsupportedFormat(format)
        })?;

        let buffer = driver.allocate_pixel_buffer(
            width,
            height,
            info.pixel_format,
            BufferCompat::GL | BufferCompat::NATIVE,
        )?;

        let gl_cache = driver.create_gl_cache(context, &context_format)?;
        let gl_texture = driver.create_gl_texture(&gl_cache, &buffer)?;
        let gl_texture_id = GlTextureId::new(driver.gl_texture_id(&gl_texture)).ok_or_else(|| {
            tracing::error!(width, height, "GL driver returned texture name 0");
            InteropError::GlTextureIdInvalid
        })?;

        let native_cache = driver.create_native_cache(device)?;
        let native_image =
            driver.create_native_image(&native_cache, &buffer, format, width, height)?;
        let native_texture = driver.native_texture(&native_image).ok_or_else(|| {
            tracing::error!(width, height, "native image holds no texture object");
            InteropError::NativeTextureInvalid
        })?;

        tracing::debug!(
            width,
            height,
            ?format,
            gl_texture_id = gl_texture_id.get(),
            "created interop texture"
        );

        Ok(Self {
            native_texture,
            native_image,
            native_cache,
            gl_texture_id,
            gl_texture,
            gl_cache,
            buffer,
            width,
            height,
            format,
        })
    }

    /// Width in pixels, fixed at construction.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, fixed at construction.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Native texture format chosen at construction.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// GL texture name for the host display pipeline. Valid for as long as
    /// this texture lives; the name is owned by the GL cache, not released
    /// individually.
    pub fn gl_texture_id(&self) -> GlTextureId {
        self.gl_texture_id
    }

    /// Native texture object, bindable as a render target.
    pub fn native_texture(&self) -> &D::NativeTexture {
        &self.native_texture
    }

    /// The materialized GL texture image, for drivers that expose more than
    /// the name (e.g. the texture target).
    pub fn gl_texture(&self) -> &D::GlTexture {
        &self.gl_texture
    }

    /// The shared pixel buffer backing both views.
    pub fn pixel_buffer(&self) -> &D::PixelBuffer {
        &self.buffer
    }
}

impl<D: InteropDriver> std::fmt::Debug for InteropTexture<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteropTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("gl_texture_id", &self.gl_texture_id)
            .finish()
    }
}
