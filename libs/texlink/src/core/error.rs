// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use super::format::TextureFormat;

/// Errors produced while building or rendering into a shared interop texture.
///
/// Construction failures map one-to-one onto the steps of
/// [`InteropTexture::create`](crate::core::texture::InteropTexture::create),
/// so a caller (or a log line) can always tell which subsystem refused.
#[derive(Error, Debug)]
pub enum InteropError {
    #[error("GL context has no pixel format descriptor")]
    ContextFormatUnavailable,

    #[error("no interop format table entry for {0:?}")]
    UnsupportedFormat(TextureFormat),

    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("shared pixel buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("GL texture cache creation failed: {0}")]
    GlCacheCreation(String),

    #[error("GL texture creation from pixel buffer failed: {0}")]
    GlTextureCreation(String),

    #[error("GL texture name is zero")]
    GlTextureIdInvalid,

    #[error("native texture cache creation failed: {0}")]
    NativeCacheCreation(String),

    #[error("native texture creation from pixel buffer failed: {0}")]
    NativeTextureCreation(String),

    #[error("native texture object unavailable")]
    NativeTextureInvalid,

    #[error("GPU initialization failed: {0}")]
    Initialization(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, InteropError>;
