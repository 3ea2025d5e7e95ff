use std::path::PathBuf;

use photonic_core::align::AlignmentType;
use photonic_core::config::PhotonicConfig;
use photonic_core::error::PhotonicError;
use photonic_core::pipeline::job::StackOptions;
use photonic_core::pipeline::{Job, JobId, JobKind, JobType, OptionMap, OptionValue};

fn options(pairs: &[(&str, OptionValue)]) -> OptionMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn text(s: &str) -> OptionValue {
    OptionValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Job types
// ---------------------------------------------------------------------------

#[test]
fn test_job_type_round_trip_names() {
    for name in ["scan", "timelapse", "panoramic", "stack", "align", "raw-convert"] {
        let parsed: JobType = name.parse().unwrap();
        assert_eq!(parsed.as_str(), name);
    }
    assert_eq!("raw".parse::<JobType>().unwrap(), JobType::RawConvert);
    assert!(matches!(
        "video".parse::<JobType>(),
        Err(PhotonicError::InvalidOption { .. })
    ));
}

#[test]
fn test_generated_ids_are_unique() {
    assert_ne!(JobId::generate(), JobId::generate());
}

// ---------------------------------------------------------------------------
// Option translation
// ---------------------------------------------------------------------------

#[test]
fn test_missing_options_take_defaults() {
    let kind = JobKind::from_options(JobType::Timelapse, &OptionMap::new()).unwrap();
    match kind {
        JobKind::Timelapse(o) => {
            assert_eq!(o.fps, 10);
            assert_eq!(o.formats, vec!["mp4"]);
            assert!(!o.stabilize);
            assert!(o.preserve_cache);
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn test_stack_options_are_typed() {
    let map = options(&[
        ("method", text("sigma-clip")),
        ("sigmaLow", OptionValue::Number(1.5)),
        ("iterations", OptionValue::Number(4.0)),
        ("alignment", text("astro")),
        ("astroMode", OptionValue::Bool(true)),
        ("unrelated", text("ignored")),
    ]);
    let JobKind::Stack(o) = JobKind::from_options(JobType::Stack, &map).unwrap() else {
        panic!("expected stack options");
    };
    assert_eq!(o.method, "sigma-clip");
    assert_eq!(o.sigma_low, Some(1.5));
    assert_eq!(o.sigma_high, None);
    assert_eq!(o.iterations, Some(4));
    assert_eq!(o.alignment, Some(AlignmentType::Astro));
    assert!(o.astro_mode);
}

#[test]
fn test_auto_alignment_means_unset() {
    let map = options(&[("type", text("auto"))]);
    let JobKind::Align(o) = JobKind::from_options(JobType::Align, &map).unwrap() else {
        panic!("expected align options");
    };
    assert_eq!(o.alignment_type, None);
    assert_eq!(o.quality, "normal");
}

fn align_options(pairs: &[(&str, OptionValue)]) -> photonic_core::pipeline::job::AlignOptions {
    let JobKind::Align(o) = JobKind::from_options(JobType::Align, &options(pairs)).unwrap() else {
        panic!("expected align options");
    };
    o
}

#[test]
fn test_align_accepts_type_and_threshold_aliases() {
    let o = align_options(&[("atype", text("astro")), ("starThreshold", OptionValue::Number(0.75))]);
    assert_eq!(o.alignment_type, Some(AlignmentType::Astro));
    assert_eq!(o.star_sensitivity, Some(0.75));

    let o = align_options(&[
        ("type", text("panoramic")),
        ("atype", text("astro")),
        ("starSensitivity", OptionValue::Number(2.0)),
        ("starThreshold", OptionValue::Number(0.75)),
    ]);
    assert_eq!(o.alignment_type, Some(AlignmentType::Panoramic));
    assert_eq!(o.star_sensitivity, Some(2.0));

    let o = align_options(&[("starThreshold", OptionValue::Number(0.0))]);
    assert_eq!(o.star_sensitivity, None);
}

#[test]
fn test_mistyped_option_is_rejected() {
    let map = options(&[("fps", text("fast"))]);
    let err = JobKind::from_options(JobType::Timelapse, &map).unwrap_err();
    assert!(matches!(err, PhotonicError::InvalidOption { ref key, .. } if key == "fps"));

    let map = options(&[("iterations", OptionValue::Number(2.5))]);
    assert!(JobKind::from_options(JobType::Stack, &map).is_err());

    let map = options(&[("alignment", text("sideways"))]);
    assert!(JobKind::from_options(JobType::Stack, &map).is_err());
}

#[test]
fn test_list_options_accept_comma_text() {
    let map = options(&[
        ("formats", text("mp4, gif")),
        ("noPreserve", OptionValue::Bool(true)),
    ]);
    let JobKind::Timelapse(o) = JobKind::from_options(JobType::Timelapse, &map).unwrap() else {
        panic!("expected timelapse options");
    };
    assert_eq!(o.formats, vec!["mp4", "gif"]);
    assert!(!o.preserve_cache);

    let map = options(&[("images", OptionValue::List(vec!["a.jpg".into(), "b.jpg".into()]))]);
    let JobKind::Align(o) = JobKind::from_options(JobType::Align, &map).unwrap() else {
        panic!("expected align options");
    };
    assert_eq!(o.images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
}

#[test]
fn test_options_json_uses_typed_fields() {
    let kind = JobKind::from_options(JobType::RawConvert, &options(&[("rawTool", text("dcraw"))])).unwrap();
    let job = Job::new(JobId::from("j"), kind, "/in", "/out");
    let json = job.options_json();
    assert_eq!(json["tool"], "dcraw");
    assert_eq!(json["ignore_cache"], false);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_partial_config_fills_defaults() {
    let config: PhotonicConfig = toml::from_str(
        r#"
        [processing]
        parallel_jobs = 4

        [stacking]
        kappa = 2.5

        [raw.dcraw]
        enabled = false
        "#,
    )
    .unwrap();

    assert_eq!(config.processing.parallel_jobs, 4);
    assert_eq!(config.processing.subscriber_buffer, 8);
    assert!(!config.raw.dcraw.enabled);
    assert!(config.raw.darktable.enabled);
    assert_eq!(config.raw.output_format, "tiff");
    assert!(config.alignment.astro_enabled);
    assert_eq!(config.stacking.kappa, 2.5);
}

#[test]
fn test_default_config_serializes_and_reloads() {
    let text = toml::to_string_pretty(&PhotonicConfig::default()).unwrap();
    let back: PhotonicConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, PhotonicConfig::default());
}

#[test]
fn test_stacking_defaults_fill_only_unset_values() {
    let config = PhotonicConfig::default();
    let mut options = StackOptions {
        sigma_low: Some(1.0),
        ..Default::default()
    };
    config.stacking.fill(&mut options);
    assert_eq!(options.sigma_low, Some(1.0));
    assert_eq!(options.sigma_high, Some(2.0));
    assert_eq!(options.iterations, Some(3));
    assert_eq!(options.kappa, Some(1.5));
    assert_eq!(options.winsor_percent, Some(5.0));
}
