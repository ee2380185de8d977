mod common;

use ndarray::Array2;

use steadycam_core::error::StabilizerError;
use steadycam_core::features::detector::{corner_response, detect, DetectorConfig};
use steadycam_core::features::pyramid::{gaussian_blur, Pyramid};

fn config(max_corners: usize, min_distance: f64) -> DetectorConfig {
    DetectorConfig {
        max_corners,
        min_distance,
        ..DetectorConfig::default()
    }
}

#[test]
fn test_detects_spaced_corners_on_texture() {
    let gray = common::scene_gray(common::WIDTH, common::HEIGHT, 0.0, 0.0);
    let points = detect(&gray, &config(100, 8.0)).unwrap();

    assert!(points.len() >= 20, "only {} corners", points.len());
    assert!(points.len() <= 100);
    for p in &points {
        assert!(p.in_bounds(common::WIDTH, common::HEIGHT));
    }
    // Sub-pixel refinement moves each corner by at most half a pixel per axis
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            assert!(a.distance(b) >= 8.0 - 1.5, "{a:?} too close to {b:?}");
        }
    }
}

#[test]
fn test_max_corners_is_respected() {
    let gray = common::scene_gray(common::WIDTH, common::HEIGHT, 0.0, 0.0);
    let points = detect(&gray, &config(10, 4.0)).unwrap();
    assert_eq!(points.len(), 10);
}

#[test]
fn test_detection_is_deterministic() {
    let gray = common::scene_gray(common::WIDTH, common::HEIGHT, 5.0, 3.0);
    let a = detect(&gray, &config(50, 6.0)).unwrap();
    let b = detect(&gray, &config(50, 6.0)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_harris_mode_detects() {
    let gray = common::scene_gray(common::WIDTH, common::HEIGHT, 0.0, 0.0);
    let cfg = DetectorConfig {
        use_harris: true,
        ..config(60, 8.0)
    };
    let points = detect(&gray, &cfg).unwrap();
    assert!(points.len() >= 10, "only {} corners", points.len());
}

#[test]
fn test_flat_image_fails() {
    let flat = Array2::<f32>::from_elem((64, 64), 0.5);
    assert!(matches!(
        detect(&flat, &config(100, 5.0)),
        Err(StabilizerError::FeatureDetection { found: 0, .. })
    ));
}

#[test]
fn test_small_image_fails() {
    let small = Array2::<f32>::zeros((20, 20));
    assert!(matches!(
        detect(&small, &config(100, 5.0)),
        Err(StabilizerError::InvalidDimensions { .. })
    ));
}

#[test]
fn test_response_peaks_at_square_corners() {
    let mut img = Array2::<f32>::zeros((64, 64));
    for r in 20..44 {
        for c in 20..44 {
            img[[r, c]] = 1.0;
        }
    }
    let response = corner_response(&img, 3, false, 0.04);
    let corner = response[[20, 20]].max(response[[19, 19]]);
    let edge = response[[32, 20]];
    let inside = response[[32, 32]];
    assert!(corner > 0.0);
    assert!(corner > edge * 10.0, "corner={corner} edge={edge}");
    assert_eq!(inside, 0.0);
}

#[test]
fn test_pyramid_levels_halve() {
    let gray = common::scene_gray(common::WIDTH, common::HEIGHT, 0.0, 0.0);
    let pyramid = Pyramid::build(&gray, 3, 15);
    assert_eq!(pyramid.max_level(), 3);
    assert_eq!(pyramid.dim(), (120, 160));
    assert_eq!(pyramid.level(1).dim(), (60, 80));
    assert_eq!(pyramid.level(3).dim(), (15, 20));

    // Reduction stops before a level drops under the minimum size
    let shallow = Pyramid::build(&gray, 5, 31);
    assert_eq!(shallow.max_level(), 1);
}

#[test]
fn test_blur_keeps_constant_image() {
    let img = Array2::<f32>::from_elem((32, 40), 0.25);
    let blurred = gaussian_blur(&img, 1.0);
    for v in blurred.iter() {
        assert!((v - 0.25).abs() < 1e-5);
    }
}
