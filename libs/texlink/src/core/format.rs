// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel formats and the cross-API format translation table.
//!
//! One shared pixel buffer is viewed through two drivers at once, so a
//! format is only usable for interop when the video-buffer framework, the
//! GL driver, and the native GPU API all agree on the memory layout. The
//! [`INTEROP_FORMAT_TABLE`] records the layouts for which that agreement
//! holds.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Video-buffer pixel format identifiers.
///
/// Enum values ARE the platform FourCC codes (CVPixelFormatType on macOS),
/// so conversion to platform APIs is a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    /// 32-bit BGRA, 8 bits per channel. kCVPixelFormatType_32BGRA = 'BGRA'
    Bgra32 = 0x4247_5241,
    /// 10-10-10-2 packed ARGB, little endian.
    /// kCVPixelFormatType_ARGB2101010LEPacked = 'l10r'
    Argb2101010 = 0x6C31_3072,
    /// 64-bit RGBA, 16-bit half float per channel.
    /// kCVPixelFormatType_64RGBAHalf = 'RGhA'
    Rgba64Half = 0x5247_6841,
}

impl PixelFormat {
    /// Raw FourCC value for platform buffer APIs.
    #[inline]
    pub const fn as_fourcc(self) -> u32 {
        self as u32
    }

    /// Create from a raw FourCC value.
    pub fn from_fourcc(code: u32) -> Option<Self> {
        match code {
            0x4247_5241 => Some(Self::Bgra32),
            0x6C31_3072 => Some(Self::Argb2101010),
            0x5247_6841 => Some(Self::Rgba64Half),
            _ => None,
        }
    }

    /// Bits per pixel for this format.
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Bgra32 | Self::Argb2101010 => 32,
            Self::Rgba64Half => 64,
        }
    }

    /// FourCC string representation for debugging.
    pub fn fourcc_string(self) -> String {
        let bytes = (self as u32).to_be_bytes();
        bytes
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }
}

/// Texture pixel formats on the native (explicit) GPU API side.
///
/// Only a subset has an interop table entry; see [`interop_format_info`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized. The canonical interop format.
    #[default]
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB.
    Bgra8UnormSrgb,
    /// 10-10-10-2 BGRA, unsigned normalized.
    Bgr10a2Unorm,
    /// 16-bit float RGBA.
    Rgba16Float,
}

impl TextureFormat {
    /// Bytes per pixel for this format.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Bgr10a2Unorm => 4,
            Self::Rgba16Float => 8,
        }
    }

    /// Whether this format has an sRGB transfer function.
    pub const fn is_srgb(self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }
}

/// OpenGL constants used by the translation table and the GL-side binding.
pub mod gl_constants {
    /// GL_RGBA - unsized RGBA internal format.
    pub const GL_RGBA: u32 = 0x1908;
    /// GL_BGRA - BGRA component order.
    pub const GL_BGRA: u32 = 0x80E1;
    /// GL_RGB10_A2 - 10-10-10-2 internal format.
    pub const GL_RGB10_A2: u32 = 0x8059;
    /// GL_SRGB8_ALPHA8 - 8-bit sRGB internal format with alpha.
    pub const GL_SRGB8_ALPHA8: u32 = 0x8C43;
    /// GL_UNSIGNED_INT_8_8_8_8_REV - packed reversed 8-bit components.
    pub const GL_UNSIGNED_INT_8_8_8_8_REV: u32 = 0x8367;
    /// GL_UNSIGNED_INT_2_10_10_10_REV - packed reversed 10-10-10-2.
    pub const GL_UNSIGNED_INT_2_10_10_10_REV: u32 = 0x8368;
    /// GL_HALF_FLOAT - 16-bit float components.
    pub const GL_HALF_FLOAT: u32 = 0x140B;
    /// GL_TEXTURE_RECTANGLE - target used for video-buffer textures on macOS.
    pub const GL_TEXTURE_RECTANGLE: u32 = 0x84F5;
}

bitflags! {
    /// Compatibility requested when allocating a shared pixel buffer.
    ///
    /// Both flags must be set for interop; the platform allocator picks a
    /// backing layout every requested driver can address.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferCompat: u32 {
        /// Buffer must be bindable as a GL texture.
        const GL = 1 << 0;
        /// Buffer must be bindable as a native-API texture.
        const NATIVE = 1 << 1;
    }
}

/// One row of the cross-API format translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteropFormatInfo {
    /// Video-buffer format the shared allocation is made with.
    pub pixel_format: PixelFormat,
    /// Native-API texture format viewing that allocation.
    pub texture_format: TextureFormat,
    /// GL internal format for the GL-side texture view.
    pub gl_internal_format: u32,
    /// GL component-order format.
    pub gl_format: u32,
    /// GL component type.
    pub gl_type: u32,
}

/// Equivalent formats across the video-buffer framework, the native GPU API,
/// and OpenGL. Exactly one row per supported native texture format.
pub const INTEROP_FORMAT_TABLE: [InteropFormatInfo; 4] = [
    InteropFormatInfo {
        pixel_format: PixelFormat::Bgra32,
        texture_format: TextureFormat::Bgra8Unorm,
        gl_internal_format: gl_constants::GL_RGBA,
        gl_format: gl_constants::GL_BGRA,
        gl_type: gl_constants::GL_UNSIGNED_INT_8_8_8_8_REV,
    },
    InteropFormatInfo {
        pixel_format: PixelFormat::Argb2101010,
        texture_format: TextureFormat::Bgr10a2Unorm,
        gl_internal_format: gl_constants::GL_RGB10_A2,
        gl_format: gl_constants::GL_BGRA,
        gl_type: gl_constants::GL_UNSIGNED_INT_2_10_10_10_REV,
    },
    InteropFormatInfo {
        pixel_format: PixelFormat::Bgra32,
        texture_format: TextureFormat::Bgra8UnormSrgb,
        gl_internal_format: gl_constants::GL_SRGB8_ALPHA8,
        gl_format: gl_constants::GL_BGRA,
        gl_type: gl_constants::GL_UNSIGNED_INT_8_8_8_8_REV,
    },
    InteropFormatInfo {
        pixel_format: PixelFormat::Rgba64Half,
        texture_format: TextureFormat::Rgba16Float,
        gl_internal_format: gl_constants::GL_RGBA,
        gl_format: gl_constants::GL_RGBA,
        gl_type: gl_constants::GL_HALF_FLOAT,
    },
];

/// Look up the translation table row for a native texture format.
///
/// Returns the first matching row, or `None` when the format has no
/// cross-API equivalent.
pub fn interop_format_info(format: TextureFormat) -> Option<&'static InteropFormatInfo> {
    INTEROP_FORMAT_TABLE
        .iter()
        .find(|info| info.texture_format == format)
}
