mod common;

use steadycam_core::edge::{apply_edge_mode, border_free_rect, scale_to_fill};
use steadycam_core::error::StabilizerError;
use steadycam_core::frame::ImageBuffer;
use steadycam_core::params::EdgeMode;
use steadycam_core::transform::Transform;
use steadycam_core::warp::warp_affine;

fn min_value(frame: &ImageBuffer) -> u8 {
    (0..frame.height())
        .flat_map(|r| frame.row(r).iter().copied())
        .min()
        .unwrap()
}

#[test]
fn test_identity_warp_preserves_frame() {
    let frame = common::gray_frame(0.0, 0.0);
    let out = warp_affine(&frame, &Transform::identity()).unwrap();
    assert_eq!(out, frame);
}

#[test]
fn test_translation_warp_moves_content() {
    let frame = common::bgra_frame(0.0, 0.0);
    let out = warp_affine(&frame, &Transform::from_translation(5.0, 0.0)).unwrap();
    assert_eq!(out.channels(), 4);
    for r in [0, 50, 119] {
        for ch in 0..4 {
            assert_eq!(out.pixel(r, 20, ch), frame.pixel(r, 15, ch));
            assert_eq!(out.pixel(r, 2, ch), 0, "exposed border must be black");
        }
    }
}

#[test]
fn test_singular_warp_fails() {
    let frame = common::gray_frame(0.0, 0.0);
    let singular = Transform::new(0.0, 0.0, 0.0, 0.0, 1.0, 1.0);
    assert!(matches!(
        warp_affine(&frame, &singular),
        Err(StabilizerError::TransformApplication(_))
    ));
}

#[test]
fn test_border_free_rect_for_translation() {
    let rect = border_free_rect(&Transform::from_translation(5.0, -3.0), 100, 80);
    assert_eq!(rect.left, 5.0);
    assert_eq!(rect.top, 0.0);
    assert_eq!(rect.right, 99.0);
    assert_eq!(rect.bottom, 76.0);
    assert_eq!(rect.width(), 95.0);

    let scale = scale_to_fill(&rect, 100, 80).unwrap();
    assert!((scale - 49.5 / 44.5).abs() < 1e-9, "scale={scale}");
}

#[test]
fn test_scale_to_fill_is_capped() {
    let rect = border_free_rect(&Transform::from_translation(45.0, 0.0), 100, 80);
    assert_eq!(scale_to_fill(&rect, 100, 80), Some(2.0));

    let off_centre = border_free_rect(&Transform::from_translation(60.0, 0.0), 100, 80);
    assert_eq!(scale_to_fill(&off_centre, 100, 80), None);
}

#[test]
fn test_padding_keeps_warped_frame() {
    let frame = common::gray_frame(0.0, 0.0);
    let correction = Transform::from_translation(6.0, 4.0);
    let warped = warp_affine(&frame, &correction).unwrap();
    let out = apply_edge_mode(warped.clone(), &correction, EdgeMode::Padding);
    assert!(out.shares_storage(&warped));
    assert_eq!(min_value(&out), 0);
}

#[test]
fn test_crop_and_scale_remove_border() {
    let frame = common::gray_frame(0.0, 0.0);
    assert!(min_value(&frame) >= 20);
    let correction = Transform::from_translation(6.0, 4.0);
    let warped = warp_affine(&frame, &correction).unwrap();

    for mode in [EdgeMode::Crop, EdgeMode::Scale] {
        let out = apply_edge_mode(warped.clone(), &correction, mode);
        assert_eq!((out.width(), out.height()), (frame.width(), frame.height()));
        assert!(min_value(&out) > 0, "{mode} left a black border");
    }
}

#[test]
fn test_no_border_means_no_change() {
    let frame = common::gray_frame(0.0, 0.0);
    let warped = warp_affine(&frame, &Transform::identity()).unwrap();
    let out = apply_edge_mode(warped.clone(), &Transform::identity(), EdgeMode::Crop);
    assert!(out.shares_storage(&warped));
}

#[test]
fn test_degenerate_rect_falls_back_to_padding() {
    let frame = common::gray_frame(0.0, 0.0);
    let correction = Transform::from_translation(140.0, 0.0);
    let warped = warp_affine(&frame, &correction).unwrap();
    for mode in [EdgeMode::Crop, EdgeMode::Scale] {
        let out = apply_edge_mode(warped.clone(), &correction, mode);
        assert!(out.shares_storage(&warped));
    }
}
