// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! texlink - zero-copy texture sharing between the host's GL display
//! pipeline and the platform's native explicit GPU API.
//!
//! The host display pipeline draws with OpenGL; certain effects are
//! produced with the native API (Metal on macOS). The two cannot share GPU
//! memory directly, so texlink allocates a single platform pixel buffer and
//! views it through both drivers at once: the host gets a plain GL texture
//! name to composite, the effect renderer gets a native texture to draw
//! into, and no pixels are ever copied between them.
//!
//! Entry point is [`InteropService`]: construct one over a platform driver,
//! call [`InteropService::render_to_texture`] each frame, and bind the
//! returned name like any other GL texture.
//!
//! ```
//! use texlink::{InteropService, mock::{MockDriver, MockGlContext}};
//!
//! let mut service = InteropService::new(MockDriver::new());
//! let context = MockGlContext::new();
//! let texture_id = service.render_to_texture(&context, 512, 512)?;
//! # let _ = texture_id;
//! # Ok::<(), texlink::InteropError>(())
//! ```

pub mod core;
pub mod mock;

#[cfg(target_os = "macos")]
pub mod apple;

pub use core::{
    gl_constants, interop_format_info, BufferCompat, ClearColor, GlTextureId, InteropConfig,
    InteropDriver, InteropError, InteropFormatInfo, InteropService, InteropTexture, PixelFormat,
    Result, SharedInteropService, TextureFormat, INTEROP_FORMAT_TABLE,
};

#[cfg(target_os = "macos")]
pub use apple::{CglContext, CoreVideoDriver};

/// The interop service over the platform's real driver stack.
#[cfg(target_os = "macos")]
pub type PlatformInteropService = InteropService<CoreVideoDriver>;
