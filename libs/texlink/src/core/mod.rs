// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Platform-agnostic interop logic: formats, errors, the driver seam, the
//! shared texture, and the service that caches it.

pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod service;
pub mod texture;

pub use config::{ClearColor, InteropConfig};
pub use driver::InteropDriver;
pub use error::{InteropError, Result};
pub use format::{
    gl_constants, interop_format_info, BufferCompat, InteropFormatInfo, PixelFormat,
    TextureFormat, INTEROP_FORMAT_TABLE,
};
pub use service::{GpuContext, InteropService, SharedInteropService};
pub use texture::{GlTextureId, InteropTexture};
