mod common;

use ndarray::Array2;

use steadycam_core::consts::{MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH, MIN_IMAGE_SIZE};
use steadycam_core::engine::StabilizerEngine;
use steadycam_core::error::StabilizerError;
use steadycam_core::frame::{to_gray, validate_dimensions, validate_frame, ImageBuffer};

#[test]
fn test_new_checks_buffer_size() {
    assert!(ImageBuffer::new(64, 48, 3, vec![0; 64 * 48 * 3]).is_ok());
    assert!(matches!(
        ImageBuffer::new(64, 48, 3, vec![0; 100]),
        Err(StabilizerError::InvalidFrame(_))
    ));
}

#[test]
fn test_rejects_small_and_empty_frames() {
    let tiny = ImageBuffer::zeros(MIN_IMAGE_SIZE - 1, 64, 1);
    assert!(matches!(
        validate_frame(&tiny),
        Err(StabilizerError::InvalidFrame(_))
    ));
    let empty = ImageBuffer::from_raw_parts(0, 0, 1, 0, Vec::new());
    assert!(validate_frame(&empty).is_err());

    assert!(validate_frame(&ImageBuffer::zeros(MIN_IMAGE_SIZE, MIN_IMAGE_SIZE, 1)).is_ok());
}

#[test]
fn test_rejects_bad_layout() {
    let two_channel = ImageBuffer::zeros(64, 64, 2);
    assert!(validate_frame(&two_channel).is_err());

    let short_stride = ImageBuffer::from_raw_parts(64, 64, 3, 100, vec![0; 100 * 64]);
    assert!(validate_frame(&short_stride).is_err());

    let padded = ImageBuffer::from_raw_parts(64, 64, 3, 200, vec![0; 200 * 63 + 192]);
    assert!(validate_frame(&padded).is_ok());
}

#[test]
fn test_overflowing_layout_is_rejected() {
    let huge_stride = ImageBuffer::from_raw_parts(160, 120, 1, usize::MAX / 2, vec![0; 16]);
    assert!(matches!(
        validate_frame(&huge_stride),
        Err(StabilizerError::InvalidFrame(msg)) if msg.contains("overflows")
    ));
    assert!(matches!(
        ImageBuffer::new(usize::MAX, 2, 4, Vec::new()),
        Err(StabilizerError::InvalidFrame(_))
    ));

    let mut engine = StabilizerEngine::new();
    engine
        .initialize(common::WIDTH, common::HEIGHT, common::test_params())
        .unwrap();
    let out = engine.process_frame(&huge_stride);
    assert!(out.shares_storage(&huge_stride));
    assert!(engine.last_error().unwrap().contains("layout overflows"));
}

#[test]
fn test_max_resolution_passes_validation() {
    let frame = ImageBuffer::zeros(MAX_FRAME_WIDTH, MAX_FRAME_HEIGHT, 1);
    assert!(validate_frame(&frame).is_ok());
    assert!(validate_dimensions(MAX_FRAME_WIDTH + 1, MAX_FRAME_HEIGHT).is_err());
    assert!(matches!(
        validate_dimensions(0, 480),
        Err(StabilizerError::InvalidDimensions { width: 0, height: 480 })
    ));
}

#[test]
fn test_clone_shares_storage_and_deep_copy_does_not() {
    let frame = common::gray_frame(0.0, 0.0);
    let shallow = frame.clone();
    assert!(shallow.shares_storage(&frame));

    let deep = frame.deep_copy();
    assert!(!deep.shares_storage(&frame));
    assert_eq!(deep, frame);
}

#[test]
fn test_equality_ignores_row_padding() {
    let packed = ImageBuffer::new(40, 40, 1, (0..1600).map(|v| (v % 251) as u8).collect()).unwrap();

    let mut padded_data = Vec::new();
    for r in 0..40 {
        padded_data.extend_from_slice(packed.row(r));
        padded_data.extend_from_slice(&[9; 8]);
    }
    let padded = ImageBuffer::from_raw_parts(40, 40, 1, 48, padded_data);
    assert_eq!(padded, packed);
    assert_eq!(padded.deep_copy().stride(), 40);
}

#[test]
fn test_gray_conversion_weights() {
    // One BGR pixel row: pure blue, green, red
    let mut data = vec![0u8; 32 * 32 * 3];
    data[0] = 255;
    data[4] = 255;
    data[8] = 255;
    let frame = ImageBuffer::new(32, 32, 3, data).unwrap();
    let gray = to_gray(&frame);
    assert_eq!(gray.dim(), (32, 32));
    assert!((gray[[0, 0]] - 0.114).abs() < 1e-4);
    assert!((gray[[0, 1]] - 0.587).abs() < 1e-4);
    assert!((gray[[0, 2]] - 0.299).abs() < 1e-4);
    assert_eq!(gray[[1, 0]], 0.0);
}

#[test]
fn test_gray_ignores_alpha() {
    let bgra = common::bgra_frame(0.0, 0.0);
    let gray = common::gray_frame(0.0, 0.0);
    let a = to_gray(&bgra);
    let b = to_gray(&gray);
    let max_diff = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max);
    assert!(max_diff < 2.0 / 255.0, "max_diff={max_diff}");
}

#[test]
fn test_from_gray_layout() {
    let arr = Array2::from_shape_fn((33, 35), |(r, c)| (r * 2 + c) as u8);
    let frame = ImageBuffer::from_gray(&arr);
    assert_eq!((frame.width(), frame.height(), frame.channels()), (35, 33, 1));
    assert_eq!(frame.pixel(3, 4, 0), 10);
}
