// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end interop service scenarios over the headless mock driver.

use texlink::mock::{FailPoint, MockDriver, MockGlContext};
use texlink::{
    BufferCompat, InteropConfig, InteropError, InteropService, SharedInteropService,
    TextureFormat,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn render_reuses_and_replaces_the_single_cache_slot() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let mut service = InteropService::new(driver.clone());

    let first = service
        .render_to_texture(&context, 512, 512)
        .expect("512x512 render");
    assert_ne!(first.get(), 0);

    let second = service
        .render_to_texture(&context, 512, 512)
        .expect("cached 512x512 render");
    assert_eq!(second, first, "same size must reuse the cached texture");

    let third = service
        .render_to_texture(&context, 256, 256)
        .expect("256x256 render");
    assert_ne!(third.get(), 0);
    assert_ne!(third, first, "resize must rebuild the texture");

    let stats = driver.stats();
    assert_eq!(stats.buffers_created, 2, "one buffer per distinct size");
    assert_eq!(stats.live_buffers, 1, "superseded texture released");
    assert_eq!(stats.commits, 3, "one submission per render call");
    assert_eq!(stats.devices_created, 1, "device initialized exactly once");
}

#[test]
fn rendered_content_is_visible_through_the_shared_buffer() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let mut service = InteropService::new(driver);

    service
        .render_to_texture(&context, 32, 32)
        .expect("render");
    service.wait_for_gpu();

    let texture = service
        .interop_texture(&context, 32, 32)
        .expect("cached texture");
    // Default clear color is opaque green; the GL side reads the same
    // memory the native clear pass wrote.
    let contents = texture.pixel_buffer().contents();
    assert!(contents.chunks_exact(4).all(|px| px == [0, 255, 0, 255]));

    // And a write through the native view is just as visible.
    texture.native_texture().fill([9, 8, 7, 6]);
    assert_eq!(&texture.pixel_buffer().contents()[..4], &[9, 8, 7, 6]);
}

#[test]
fn buffers_are_allocated_with_both_compatibility_flags() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let mut service = InteropService::new(driver.clone());

    service.render_to_texture(&context, 64, 64).expect("render");

    let compat = driver.stats().last_buffer_compat.expect("allocation seen");
    assert!(compat.contains(BufferCompat::GL));
    assert!(compat.contains(BufferCompat::NATIVE));
}

#[test]
fn format_without_table_entry_fails_and_leaves_no_cache() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let config = InteropConfig {
        texture_format: TextureFormat::Rgba8Unorm,
        ..InteropConfig::default()
    };
    let mut service = InteropService::with_config(driver.clone(), config);

    let err = service
        .render_to_texture(&context, 64, 64)
        .expect_err("format without translation entry");
    assert!(matches!(
        err,
        InteropError::UnsupportedFormat(TextureFormat::Rgba8Unorm)
    ));
    assert!(!service.has_cached_texture());
    assert_eq!(driver.stats().buffers_created, 0);
}

#[test]
fn every_init_step_failure_is_sticky_and_attributable() {
    init_tracing();
    let steps = [
        FailPoint::Device,
        FailPoint::ShaderLibrary,
        FailPoint::CommandQueue,
        FailPoint::PipelineState,
        FailPoint::RenderPass,
    ];

    for step in steps {
        let driver = MockDriver::new();
        driver.fail_next(step);
        let context = MockGlContext::new();
        let mut service = InteropService::new(driver);

        let err = service
            .render_to_texture(&context, 64, 64)
            .expect_err("armed init failure");
        assert!(
            matches!(err, InteropError::Initialization(_)),
            "{step:?} must surface as an initialization failure"
        );

        // The failure is sticky even though the fail point was consumed.
        let err = service
            .render_to_texture(&context, 64, 64)
            .expect_err("sticky init failure");
        assert!(matches!(err, InteropError::Initialization(_)));
    }
}

#[test]
fn render_failure_means_no_texture_this_frame_but_host_continues() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let mut service = InteropService::new(driver.clone());

    driver.fail_next(FailPoint::BufferAllocation);
    service
        .render_to_texture(&context, 64, 64)
        .expect_err("armed allocation failure");

    // Next frame succeeds with no residue from the failed attempt.
    let id = service
        .render_to_texture(&context, 64, 64)
        .expect("recovered render");
    assert_ne!(id.get(), 0);
    assert_eq!(driver.stats().live_buffers, 1);
}

#[test]
fn shared_service_serializes_renders_across_threads() {
    init_tracing();
    let driver = MockDriver::new();
    let shared = SharedInteropService::new(InteropService::new(driver.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = shared.clone();
            std::thread::spawn(move || {
                let context = MockGlContext::new();
                for _ in 0..8 {
                    service
                        .render_to_texture(&context, 512, 512)
                        .expect("render");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("render thread");
    }

    let stats = driver.stats();
    assert_eq!(stats.commits, 32);
    assert_eq!(stats.devices_created, 1);
    assert_eq!(stats.buffers_created, 1, "all threads share one cached texture");
    assert_eq!(stats.live_buffers, 1);
}

#[test]
fn shutdown_then_reuse_reinitializes_cleanly() {
    init_tracing();
    let driver = MockDriver::new();
    let context = MockGlContext::new();
    let mut service = InteropService::new(driver.clone());

    service.render_to_texture(&context, 128, 128).expect("render");
    service.shutdown();
    assert_eq!(driver.stats().live_buffers, 0);

    // A fresh frame after shutdown brings the stack back up.
    let id = service
        .render_to_texture(&context, 128, 128)
        .expect("render after shutdown");
    assert_ne!(id.get(), 0);
    assert_eq!(driver.stats().devices_created, 2);
}
