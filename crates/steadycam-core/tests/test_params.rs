use proptest::prelude::*;

use steadycam_core::error::StabilizerError;
use steadycam_core::params::*;

#[test]
fn test_defaults_are_already_valid() {
    let p = StabilizationParameters::default();
    assert_eq!(validate_parameters(&p).unwrap(), p);
    assert_eq!(p.edge_mode, EdgeMode::Padding);
    assert!(p.enabled);
}

#[test]
fn test_presets_are_valid() {
    for preset in [Preset::Gaming, Preset::Streaming, Preset::Recording] {
        let p = preset.parameters();
        assert_eq!(validate_parameters(&p).unwrap(), p, "{preset}");
    }
    assert_eq!(StabilizationParameters::gaming().smoothing_radius, 25);
    assert_eq!(StabilizationParameters::streaming().feature_count, 200);
    assert_eq!(StabilizationParameters::recording().optical_flow_window_size, 31);
}

#[test]
fn test_preset_names_parse() {
    assert_eq!("Gaming".parse::<Preset>().unwrap(), Preset::Gaming);
    assert_eq!("recording".parse::<Preset>().unwrap(), Preset::Recording);
    assert!("cinema".parse::<Preset>().is_err());
    assert_eq!(Preset::default(), Preset::Streaming);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let p = StabilizationParameters {
        smoothing_radius: 0,
        max_correction: 250.0,
        feature_count: 10,
        quality_level: 0.5,
        optical_flow_pyramid_levels: 9,
        feature_refresh_threshold: -1.0,
        ..Default::default()
    };
    let v = validate_parameters(&p).unwrap();
    assert_eq!(v.smoothing_radius, 1);
    assert_eq!(v.max_correction, 100.0);
    assert_eq!(v.feature_count, 50);
    assert_eq!(v.quality_level, 0.1);
    assert_eq!(v.optical_flow_pyramid_levels, 5);
    assert_eq!(v.feature_refresh_threshold, 0.0);
}

#[test]
fn test_odd_fields_forced_odd() {
    let p = StabilizationParameters {
        block_size: 4,
        optical_flow_window_size: 40,
        ..Default::default()
    };
    let v = validate_parameters(&p).unwrap();
    assert_eq!(v.block_size, 5);
    assert_eq!(v.optical_flow_window_size, 31);
}

#[test]
fn test_inverted_pairs_are_swapped() {
    let p = StabilizationParameters {
        adaptive_feature_min: 400,
        adaptive_feature_max: 200,
        ransac_threshold_min: 8.0,
        ransac_threshold_max: 2.0,
        ..Default::default()
    };
    let v = validate_parameters(&p).unwrap();
    assert_eq!((v.adaptive_feature_min, v.adaptive_feature_max), (200, 400));
    assert_eq!((v.ransac_threshold_min, v.ransac_threshold_max), (2.0, 8.0));
}

#[test]
fn test_non_finite_rejected() {
    let p = StabilizationParameters {
        max_correction: f64::NAN,
        ..Default::default()
    };
    assert!(matches!(
        validate_parameters(&p),
        Err(StabilizerError::InvalidParameters(_))
    ));

    let p = StabilizationParameters {
        min_distance: f64::INFINITY,
        ..Default::default()
    };
    assert!(validate_parameters(&p).is_err());
}

#[test]
fn test_edge_mode_text() {
    assert_eq!("crop".parse::<EdgeMode>().unwrap(), EdgeMode::Crop);
    assert_eq!("SCALE".parse::<EdgeMode>().unwrap(), EdgeMode::Scale);
    assert!("stretch".parse::<EdgeMode>().is_err());
    assert_eq!(EdgeMode::Padding.to_string(), "padding");
}

#[test]
fn test_serde_defaults_fill_missing_fields() {
    let p: StabilizationParameters =
        serde_json::from_str(r#"{"smoothing_radius": 12, "edge_mode": "crop"}"#).unwrap();
    assert_eq!(p.smoothing_radius, 12);
    assert_eq!(p.edge_mode, EdgeMode::Crop);
    assert_eq!(p.feature_count, StabilizationParameters::default().feature_count);

    let json = serde_json::to_string(&StabilizationParameters::gaming()).unwrap();
    let back: StabilizationParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back, StabilizationParameters::gaming());
}

fn arb_params() -> impl Strategy<Value = StabilizationParameters> {
    (
        (0usize..400, -50.0f64..300.0, 0usize..4000, -1.0f64..1.0),
        (-10.0f64..500.0, 0usize..64, 0.0f64..0.5, 0usize..10),
        (0usize..64, -2.0f64..3.0, 0usize..1000, 0usize..1000),
        (-2.0f64..3.0, -10.0f64..2000.0, -10.0f64..200.0, -10.0f64..200.0),
    )
        .prop_map(|(a, b, c, d)| StabilizationParameters {
            smoothing_radius: a.0,
            max_correction: a.1,
            feature_count: a.2,
            quality_level: a.3,
            min_distance: b.0,
            block_size: b.1,
            harris_k: b.2,
            optical_flow_pyramid_levels: b.3,
            optical_flow_window_size: c.0,
            feature_refresh_threshold: c.1,
            adaptive_feature_min: c.2,
            adaptive_feature_max: c.3,
            high_pass_attenuation: d.0,
            tracking_error_threshold: d.1,
            ransac_threshold_min: d.2,
            ransac_threshold_max: d.3,
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn prop_validated_fields_in_bounds(p in arb_params()) {
        let v = validate_parameters(&p).unwrap();
        prop_assert!(SMOOTHING_RADIUS_RANGE.contains(&v.smoothing_radius));
        prop_assert!(MAX_CORRECTION_RANGE.contains(&v.max_correction));
        prop_assert!(FEATURE_COUNT_RANGE.contains(&v.feature_count));
        prop_assert!(QUALITY_LEVEL_RANGE.contains(&v.quality_level));
        prop_assert!(MIN_DISTANCE_RANGE.contains(&v.min_distance));
        prop_assert!(BLOCK_SIZE_RANGE.contains(&v.block_size));
        prop_assert!(HARRIS_K_RANGE.contains(&v.harris_k));
        prop_assert!(PYRAMID_LEVELS_RANGE.contains(&v.optical_flow_pyramid_levels));
        prop_assert!(FLOW_WINDOW_RANGE.contains(&v.optical_flow_window_size));
        prop_assert!(REFRESH_THRESHOLD_RANGE.contains(&v.feature_refresh_threshold));
        prop_assert!(ADAPTIVE_FEATURE_RANGE.contains(&v.adaptive_feature_min));
        prop_assert!(ADAPTIVE_FEATURE_RANGE.contains(&v.adaptive_feature_max));
        prop_assert!(HIGH_PASS_ATTENUATION_RANGE.contains(&v.high_pass_attenuation));
        prop_assert!(TRACKING_ERROR_RANGE.contains(&v.tracking_error_threshold));
        prop_assert!(RANSAC_THRESHOLD_RANGE.contains(&v.ransac_threshold_min));
        prop_assert!(RANSAC_THRESHOLD_RANGE.contains(&v.ransac_threshold_max));
        prop_assert!(v.block_size % 2 == 1);
        prop_assert!(v.optical_flow_window_size % 2 == 1);
        prop_assert!(v.adaptive_feature_min <= v.adaptive_feature_max);
        prop_assert!(v.ransac_threshold_min <= v.ransac_threshold_max);
    }

    #[test]
    fn prop_validation_is_idempotent(p in arb_params()) {
        let once = validate_parameters(&p).unwrap();
        let twice = validate_parameters(&once).unwrap();
        prop_assert_eq!(once, twice);
    }
}
