// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Metal device, pipeline, and render pass creation.

use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2_foundation::NSString;
use objc2_metal::{
    MTLClearColor, MTLCommandQueue, MTLCreateSystemDefaultDevice, MTLDevice, MTLLibrary,
    MTLLoadAction, MTLPixelFormat, MTLRenderPassDescriptor, MTLRenderPipelineDescriptor,
    MTLRenderPipelineState, MTLStoreAction,
};

use crate::core::{ClearColor, InteropConfig, InteropError, Result, TextureFormat};

impl TextureFormat {
    /// Raw MTLPixelFormat value, for the CoreVideo texture cache FFI.
    pub(crate) fn to_mtl_pixel_format(self) -> u64 {
        match self {
            Self::Rgba8Unorm => 70,
            Self::Rgba8UnormSrgb => 71,
            Self::Bgra8Unorm => 80,
            Self::Bgra8UnormSrgb => 81,
            Self::Bgr10a2Unorm => 94,
            Self::Rgba16Float => 115,
        }
    }

    fn to_objc_pixel_format(self) -> MTLPixelFormat {
        match self {
            Self::Rgba8Unorm => MTLPixelFormat::RGBA8Unorm,
            Self::Rgba8UnormSrgb => MTLPixelFormat::RGBA8Unorm_sRGB,
            Self::Bgra8Unorm => MTLPixelFormat::BGRA8Unorm,
            Self::Bgra8UnormSrgb => MTLPixelFormat::BGRA8Unorm_sRGB,
            Self::Bgr10a2Unorm => MTLPixelFormat::BGR10A2Unorm,
            Self::Rgba16Float => MTLPixelFormat::RGBA16Float,
        }
    }
}

pub(crate) fn create_system_device() -> Result<Retained<ProtocolObject<dyn MTLDevice>>> {
    MTLCreateSystemDefaultDevice()
        .ok_or_else(|| InteropError::Initialization("no Metal device available".into()))
}

pub(crate) fn load_default_library(
    device: &ProtocolObject<dyn MTLDevice>,
) -> Result<Retained<ProtocolObject<dyn MTLLibrary>>> {
    device.newDefaultLibrary().ok_or_else(|| {
        InteropError::Initialization("default shader library not found in application bundle".into())
    })
}

pub(crate) fn create_command_queue(
    device: &ProtocolObject<dyn MTLDevice>,
) -> Result<Retained<ProtocolObject<dyn MTLCommandQueue>>> {
    device
        .newCommandQueue()
        .ok_or_else(|| InteropError::Initialization("failed to create Metal command queue".into()))
}

/// Compile the render pipeline from the configured vertex/fragment pair,
/// targeting the configured color attachment format.
pub(crate) fn create_pipeline_state(
    device: &ProtocolObject<dyn MTLDevice>,
    library: &ProtocolObject<dyn MTLLibrary>,
    config: &InteropConfig,
) -> Result<Retained<ProtocolObject<dyn MTLRenderPipelineState>>> {
    let name = NSString::from_str(&config.vertex_function);
    let vertex_fn = library.newFunctionWithName(&name).ok_or_else(|| {
        InteropError::Initialization(format!(
            "vertex function '{}' not found in shader library",
            config.vertex_function
        ))
    })?;

    let name = NSString::from_str(&config.fragment_function);
    let fragment_fn = library.newFunctionWithName(&name).ok_or_else(|| {
        InteropError::Initialization(format!(
            "fragment function '{}' not found in shader library",
            config.fragment_function
        ))
    })?;

    let descriptor = MTLRenderPipelineDescriptor::new();
    unsafe {
        descriptor.setVertexFunction(Some(&vertex_fn));
        descriptor.setFragmentFunction(Some(&fragment_fn));
        let attachment = descriptor.colorAttachments().objectAtIndexedSubscript(0);
        attachment.setPixelFormat(config.texture_format.to_objc_pixel_format());
    }

    let mut error: *mut AnyObject = std::ptr::null_mut();
    let state: Option<Retained<ProtocolObject<dyn MTLRenderPipelineState>>> = unsafe {
        msg_send![
            device,
            newRenderPipelineStateWithDescriptor: &*descriptor,
            error: &mut error
        ]
    };
    state.ok_or_else(|| {
        let message = if error.is_null() {
            "failed to create render pipeline state".to_string()
        } else {
            let description: Retained<NSString> = unsafe { msg_send![error, localizedDescription] };
            format!("failed to create render pipeline state: {description}")
        };
        InteropError::Initialization(message)
    })
}

/// Build the reusable clear-and-store render pass. The color attachment's
/// texture is rebound per render.
pub(crate) fn create_render_pass(
    clear_color: ClearColor,
) -> Result<Retained<MTLRenderPassDescriptor>> {
    let descriptor = MTLRenderPassDescriptor::new();
    unsafe {
        let attachment = descriptor.colorAttachments().objectAtIndexedSubscript(0);
        attachment.setClearColor(MTLClearColor {
            red: clear_color.red,
            green: clear_color.green,
            blue: clear_color.blue,
            alpha: clear_color.alpha,
        });
        attachment.setLoadAction(MTLLoadAction::Clear);
        attachment.setStoreAction(MTLStoreAction::Store);
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mtl_pixel_format_values() {
        assert_eq!(TextureFormat::Bgra8Unorm.to_mtl_pixel_format(), 80);
        assert_eq!(TextureFormat::Bgra8UnormSrgb.to_mtl_pixel_format(), 81);
        assert_eq!(TextureFormat::Bgr10a2Unorm.to_mtl_pixel_format(), 94);
        assert_eq!(TextureFormat::Rgba16Float.to_mtl_pixel_format(), 115);
    }

    #[test]
    fn test_metal_device_available() {
        let device = create_system_device();
        assert!(device.is_ok(), "Metal should be available on macOS");
    }

    #[test]
    fn test_command_queue_creation() {
        let device = create_system_device().expect("Metal device");
        assert!(create_command_queue(&device).is_ok());
    }

    #[test]
    fn test_render_pass_carries_clear_color() {
        let pass = create_render_pass(ClearColor::new(0.0, 1.0, 0.0, 1.0)).expect("render pass");
        unsafe {
            let attachment = pass.colorAttachments().objectAtIndexedSubscript(0);
            let color = attachment.clearColor();
            assert_eq!(color.green, 1.0);
            assert_eq!(color.red, 0.0);
        }
    }
}
