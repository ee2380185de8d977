mod common;

use std::sync::Arc;
use std::thread;

use steadycam_core::adaptive::AdaptiveStabilizer;
use steadycam_core::error::{Result, StabilizerError};
use steadycam_core::frame::ImageBuffer;
use steadycam_core::metrics::PerformanceMetrics;
use steadycam_core::params::StabilizationParameters;
use steadycam_core::stabilize::{PassThrough, Stabilize};
use steadycam_core::transform::Transform;
use steadycam_core::wrapper::StabilizerWrapper;

#[test]
fn test_wrapper_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StabilizerWrapper>();
    assert_send_sync::<StabilizerWrapper<AdaptiveStabilizer>>();
    assert_send_sync::<StabilizerWrapper<PassThrough>>();
}

#[test]
fn test_uninitialized_wrapper_passes_through() {
    let wrapper = StabilizerWrapper::new();
    assert!(wrapper.is_initialized());
    assert!(!wrapper.is_ready());

    let frame = common::gray_frame(0.0, 0.0);
    assert!(wrapper.process_frame(&frame).shares_storage(&frame));
    assert_eq!(wrapper.last_error().as_deref(), Some("Not initialized"));
}

#[test]
fn test_cleared_wrapper_reports_not_initialized() {
    let wrapper = StabilizerWrapper::new();
    wrapper
        .initialize(common::WIDTH, common::HEIGHT, common::test_params())
        .unwrap();
    wrapper.clear_state();

    assert!(!wrapper.is_initialized());
    assert!(!wrapper.is_ready());
    let frame = common::gray_frame(0.0, 0.0);
    assert!(wrapper.process_frame(&frame).shares_storage(&frame));
    assert_eq!(wrapper.last_error().as_deref(), Some("Not initialized"));
    assert_eq!(
        wrapper.initialize(common::WIDTH, common::HEIGHT, common::test_params()),
        Err(StabilizerError::NotInitialized)
    );
    assert!(wrapper.transform_history().is_empty());
    assert_eq!(wrapper.performance_metrics(), PerformanceMetrics::default());
    assert_eq!(wrapper.current_parameters(), StabilizationParameters::default());
}

#[test]
fn test_wrapper_delegates_to_engine() {
    let wrapper = StabilizerWrapper::new();
    wrapper
        .initialize(common::WIDTH, common::HEIGHT, common::test_params())
        .unwrap();
    assert!(wrapper.is_ready());
    for k in 0..4 {
        wrapper.process_frame(&common::gray_frame(4.0 * k as f64, 0.0));
    }
    assert_eq!(wrapper.transform_history().len(), 3);
    assert_eq!(wrapper.performance_metrics().frame_count, 4);
    assert_eq!(wrapper.current_parameters(), common::test_params());

    wrapper.reset();
    assert!(wrapper.transform_history().is_empty());
    assert_eq!(wrapper.last_error(), None);
}

#[test]
fn test_pass_through_stabilizer() {
    let wrapper = StabilizerWrapper::with_stabilizer(PassThrough::default());
    wrapper
        .initialize(common::WIDTH, common::HEIGHT, StabilizationParameters::gaming())
        .unwrap();
    let frame = common::gray_frame(0.0, 0.0);
    for _ in 0..3 {
        assert!(wrapper.process_frame(&frame).shares_storage(&frame));
    }
    assert_eq!(wrapper.performance_metrics().frame_count, 3);
    assert_eq!(wrapper.current_parameters(), StabilizationParameters::gaming());
    assert_eq!(wrapper.last_error(), None);
}

/// Panics on every frame after the first.
#[derive(Default)]
struct Faulty {
    calls: usize,
}

impl Stabilize for Faulty {
    fn initialize(&mut self, _: usize, _: usize, _: StabilizationParameters) -> Result<()> {
        panic!("initialize exploded");
    }

    fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        self.calls += 1;
        if self.calls > 1 {
            panic!("frame {} exploded", self.calls);
        }
        frame.clone()
    }

    fn update_parameters(&mut self, _: StabilizationParameters) -> Result<()> {
        panic!("update exploded");
    }

    fn reset(&mut self) {
        panic!("reset exploded");
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn parameters(&self) -> StabilizationParameters {
        StabilizationParameters::default()
    }

    fn transform_history(&self) -> Vec<Transform> {
        Vec::new()
    }

    fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            frame_count: self.calls as u64,
            ..PerformanceMetrics::default()
        }
    }

    fn last_error(&self) -> Option<String> {
        None
    }
}

#[test]
fn test_panics_are_contained() {
    let wrapper = StabilizerWrapper::with_stabilizer(Faulty::default());
    let frame = common::gray_frame(0.0, 0.0);

    assert!(matches!(
        wrapper.initialize(64, 64, StabilizationParameters::default()),
        Err(StabilizerError::Internal(msg)) if msg.contains("initialize exploded")
    ));
    assert!(wrapper.last_error().unwrap().contains("initialize exploded"));

    // A call that completes clears the recorded panic
    assert!(wrapper.process_frame(&frame).shares_storage(&frame));
    assert_eq!(wrapper.last_error(), None);

    let out = wrapper.process_frame(&frame);
    assert_eq!(out, frame);
    assert!(!out.shares_storage(&frame));
    let err = wrapper.last_error().unwrap();
    assert!(err.contains("frame 2 exploded"), "{err}");
    assert!(err.starts_with("Internal error"));

    assert!(matches!(
        wrapper.update_parameters(StabilizationParameters::default()),
        Err(StabilizerError::Internal(_))
    ));
    assert!(wrapper.last_error().unwrap().contains("update exploded"));

    wrapper.reset();
    assert!(wrapper.last_error().unwrap().contains("reset exploded"));

    // Still usable, state kept
    assert!(wrapper.is_ready());
    assert_eq!(wrapper.performance_metrics().frame_count, 2);

    wrapper.clear_state();
    assert_eq!(wrapper.last_error().as_deref(), Some("Not initialized"));
}

#[test]
fn test_install_replaces_stabilizer() {
    let wrapper = StabilizerWrapper::<PassThrough>::empty();
    assert!(!wrapper.is_initialized());
    assert!(wrapper.install(PassThrough::default()).is_none());
    assert!(wrapper.is_initialized());
    assert!(wrapper.install(PassThrough::default()).is_some());
}

#[test]
fn test_concurrent_frames_and_updates() {
    const THREADS: usize = 4;
    const FRAMES_PER_THREAD: usize = 6;

    let wrapper = Arc::new(StabilizerWrapper::new());
    wrapper
        .initialize(common::WIDTH, common::HEIGHT, common::test_params())
        .unwrap();

    let mut handles = Vec::new();
    for t in 0..THREADS {
        let wrapper = Arc::clone(&wrapper);
        handles.push(thread::spawn(move || {
            for k in 0..FRAMES_PER_THREAD {
                let frame = common::gray_frame((t + k) as f64 * 2.0, 0.0);
                let out = wrapper.process_frame(&frame);
                assert_eq!((out.width(), out.height()), (frame.width(), frame.height()));
            }
        }));
    }

    let updater = {
        let wrapper = Arc::clone(&wrapper);
        thread::spawn(move || {
            for radius in [8, 4, 6, 3, 5] {
                let params = StabilizationParameters {
                    smoothing_radius: radius,
                    ..common::test_params()
                };
                wrapper.update_parameters(params).unwrap();
                let history = wrapper.transform_history();
                assert!(history.len() <= radius);
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    updater.join().unwrap();

    let params = wrapper.current_parameters();
    assert_eq!(params.smoothing_radius, 5);
    assert!(wrapper.transform_history().len() <= params.smoothing_radius);
    assert_eq!(
        wrapper.performance_metrics().frame_count,
        (THREADS * FRAMES_PER_THREAD) as u64
    );
}
