// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Interop service configuration.

use serde::{Deserialize, Serialize};

use super::format::TextureFormat;

/// RGBA clear color applied by the render pass, components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl ClearColor {
    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl Default for ClearColor {
    /// Opaque green, chosen so an interop texture that was cleared but never
    /// drawn into is unmistakable on screen.
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }
}

/// Configuration for [`InteropService`](crate::core::service::InteropService).
///
/// The defaults reproduce the host display pipeline's expectations: BGRA8
/// output and the `vertexShader` / `fragmentShader` entry points from the
/// application-bundled shader library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropConfig {
    /// Native texture format of the shared texture and the pipeline's color
    /// attachment. Must have a translation table entry.
    pub texture_format: TextureFormat,
    /// Clear color of the reusable render pass.
    pub clear_color: ClearColor,
    /// Vertex entry point in the bundled shader library.
    pub vertex_function: String,
    /// Fragment entry point in the bundled shader library.
    pub fragment_function: String,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            texture_format: TextureFormat::Bgra8Unorm,
            clear_color: ClearColor::default(),
            vertex_function: "vertexShader".to_string(),
            fragment_function: "fragmentShader".to_string(),
        }
    }
}
