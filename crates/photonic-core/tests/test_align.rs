mod common;

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use ndarray::Array3;

use common::{gradient_frame, make_frame, star_field, write_frames, FIELD_STARS};
use photonic_core::align::phase_correlation::compute_offset_array;
use photonic_core::align::{
    aligned_output_path, detect_alignment_type, estimate_translation, match_stars, roll, Aligner,
    AlignmentRequest, AlignmentType, PhaseCorrelationAligner, StarAligner,
};
use photonic_core::cancel::{CancelSource, CancelToken};
use photonic_core::detect::StarDetectionConfig;
use photonic_core::error::PhotonicError;
use photonic_core::frame::{Frame, StarPoint};
use photonic_core::io::load_image;

fn request(images: Vec<PathBuf>, output_dir: PathBuf, alignment_type: AlignmentType) -> AlignmentRequest {
    AlignmentRequest {
        images,
        alignment_type,
        output_dir,
        quality: "normal".to_string(),
        star: StarDetectionConfig::default(),
    }
}

/// Black frame with bright 3x3 squares, for correlation tests.
fn dark_field(h: usize, w: usize, stars: &[(usize, usize)]) -> Frame {
    let mut data = Array3::<f32>::zeros((h, w, 3));
    for &(x, y) in stars {
        for r in y - 1..=y + 1 {
            for c in x - 1..=x + 1 {
                for ch in 0..3 {
                    data[[r, c, ch]] = 0.9;
                }
            }
        }
    }
    Frame::new(data, 16)
}

const DARK_STARS: [(usize, usize); 4] = [(24, 20), (36, 30), (28, 40), (40, 22)];

// ---------------------------------------------------------------------------
// Star matching
// ---------------------------------------------------------------------------

#[test]
fn test_match_recovers_translation_with_spurious_point() {
    let reference = [StarPoint::new(0.0, 0.0, 10.0), StarPoint::new(50.0, 50.0, 8.0)];
    let target = [
        StarPoint::new(3.0, 2.0, 10.0),
        StarPoint::new(53.0, 52.0, 8.0),
        StarPoint::new(500.0, 500.0, 9.0),
    ];

    let matches = match_stars(&reference, &target, 50.0);
    assert_eq!(matches.len(), 2);
    let offset = estimate_translation(&matches).unwrap();
    assert_abs_diff_eq!(offset.dx, 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(offset.dy, 2.0, epsilon = 1e-9);
}

#[test]
fn test_match_distance_ceiling_is_strict() {
    let reference = [StarPoint::new(0.0, 0.0, 1.0)];
    let target = [StarPoint::new(3.0, 4.0, 1.0)];
    assert!(match_stars(&reference, &target, 5.0).is_empty());
    assert_eq!(match_stars(&reference, &target, 5.01).len(), 1);
}

#[test]
fn test_median_resists_outlier_match() {
    let reference = [
        StarPoint::new(0.0, 0.0, 1.0),
        StarPoint::new(100.0, 0.0, 1.0),
        StarPoint::new(0.0, 100.0, 1.0),
    ];
    let target = [
        StarPoint::new(2.0, 1.0, 1.0),
        StarPoint::new(102.0, 1.0, 1.0),
        StarPoint::new(30.0, 120.0, 1.0),
    ];
    let offset = estimate_translation(&match_stars(&reference, &target, 50.0)).unwrap();
    assert_abs_diff_eq!(offset.dx, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(offset.dy, 1.0, epsilon = 1e-9);
}

#[test]
fn test_empty_matches_is_insufficient_stars() {
    assert!(matches!(
        estimate_translation(&[]),
        Err(PhotonicError::InsufficientStars { found: 0 })
    ));
}

// ---------------------------------------------------------------------------
// roll
// ---------------------------------------------------------------------------

#[test]
fn test_roll_moves_pixels_cyclically() {
    let frame = gradient_frame(6, 8);
    let rolled = roll(&frame, 2.0, 1.0);
    assert_eq!(rolled.data[[1, 2, 0]], frame.data[[0, 0, 0]]);
    // Wraps around the right and bottom edges
    assert_eq!(rolled.data[[0, 1, 2]], frame.data[[5, 7, 2]]);
}

#[test]
fn test_roll_inverse_restores_frame() {
    let frame = gradient_frame(9, 7);
    let back = roll(&roll(&frame, 3.4, -2.6), -3.4, 2.6);
    assert_eq!(back, frame);
}

// ---------------------------------------------------------------------------
// Alignment type
// ---------------------------------------------------------------------------

#[test]
fn test_detect_alignment_type() {
    let few: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
    let many: Vec<PathBuf> = (0..21).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
    assert_eq!(detect_alignment_type(&[]), AlignmentType::General);
    assert_eq!(detect_alignment_type(&few), AlignmentType::Panoramic);
    assert_eq!(detect_alignment_type(&many), AlignmentType::Timelapse);
}

#[test]
fn test_alignment_type_parse() {
    assert_eq!("star".parse::<AlignmentType>().unwrap(), AlignmentType::Astro);
    assert_eq!("timelapse".parse::<AlignmentType>().unwrap(), AlignmentType::Timelapse);
    assert!("feature".parse::<AlignmentType>().is_err());
}

#[test]
fn test_aligned_output_name() {
    let path = aligned_output_path(std::path::Path::new("/out"), 7, std::path::Path::new("/in/IMG_01.jpg"));
    assert_eq!(path, PathBuf::from("/out/aligned_007_IMG_01.tif"));
}

// ---------------------------------------------------------------------------
// StarAligner
// ---------------------------------------------------------------------------

#[test]
fn test_star_aligner_undoes_shift_and_skips_starless_target() {
    let dir = tempfile::tempdir().unwrap();
    let reference = star_field(64, 64, &FIELD_STARS);
    let shifted = roll(&reference, 4.0, 3.0);
    let blank = make_frame(64, 64, 0.05);
    let images = write_frames(dir.path(), "sky", &[reference, shifted, blank]);
    let out = dir.path().join("aligned");

    let result = StarAligner::new(true)
        .align(&CancelToken::never(), &request(images.clone(), out.clone(), AlignmentType::Astro))
        .unwrap();

    assert!(result.success);
    assert_eq!(result.tool, "star-alignment");
    assert_eq!(result.star_count, FIELD_STARS.len());
    assert_eq!(result.aligned_images.len(), 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("insufficient star matches"));
    assert_eq!(result.match_count, FIELD_STARS.len());

    let transform = &result.transforms[1];
    assert_abs_diff_eq!(transform.dx, 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(transform.dy, 3.0, epsilon = 1e-6);

    let original = load_image(&images[0]).unwrap();
    let aligned = load_image(&result.aligned_images[1]).unwrap();
    for (a, b) in original.data.iter().zip(aligned.data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
    assert_eq!(result.aligned_images[0], out.join("aligned_000_sky00.tif"));
}

#[test]
fn test_star_aligner_starless_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_frames(
        dir.path(),
        "sky",
        &[make_frame(32, 32, 0.05), star_field(32, 32, &[(10, 10, 0.9)])],
    );
    let err = StarAligner::new(true)
        .align(&CancelToken::never(), &request(images, dir.path().join("out"), AlignmentType::Astro))
        .unwrap_err();
    assert!(matches!(err, PhotonicError::InsufficientStars { found: 0 }));
}

#[test]
fn test_star_aligner_fails_when_only_reference_survives() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_frames(
        dir.path(),
        "sky",
        &[star_field(64, 64, &FIELD_STARS), make_frame(64, 64, 0.05)],
    );
    let err = StarAligner::new(true)
        .align(&CancelToken::never(), &request(images, dir.path().join("out"), AlignmentType::Astro))
        .unwrap_err();
    assert!(matches!(err, PhotonicError::InsufficientImages { needed: 2, got: 1 }));
}

#[test]
fn test_star_aligner_skips_target_it_cannot_write() {
    let dir = tempfile::tempdir().unwrap();
    let reference = star_field(64, 64, &FIELD_STARS);
    let images = write_frames(
        dir.path(),
        "sky",
        &[reference.clone(), roll(&reference, 4.0, 3.0), roll(&reference, -2.0, 5.0)],
    );
    let out = dir.path().join("aligned");
    std::fs::create_dir_all(aligned_output_path(&out, 1, &images[1])).unwrap();

    let result = StarAligner::new(true)
        .align(&CancelToken::never(), &request(images.clone(), out.clone(), AlignmentType::Astro))
        .unwrap();

    assert_eq!(result.aligned_images.len(), 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("sky01"));
    assert_eq!(result.aligned_images[1], aligned_output_path(&out, 2, &images[2]));
    assert_abs_diff_eq!(result.transforms[1].dx, -2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.transforms[1].dy, 5.0, epsilon = 1e-6);
}

#[test]
fn test_star_aligner_respects_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let field = star_field(64, 64, &FIELD_STARS);
    let images = write_frames(dir.path(), "sky", &[field.clone(), roll(&field, 1.0, 1.0)]);
    let source = CancelSource::new();
    source.cancel();

    let err = StarAligner::new(true)
        .align(&source.token(), &request(images, dir.path().join("out"), AlignmentType::Astro))
        .unwrap_err();
    assert!(matches!(err, PhotonicError::Cancelled));
}

// ---------------------------------------------------------------------------
// Phase correlation
// ---------------------------------------------------------------------------

#[test]
fn test_phase_correlation_offset_sign() {
    let reference = dark_field(64, 64, &DARK_STARS);
    let target = roll(&reference, 5.0, -3.0);
    let offset = compute_offset_array(&reference.luminance(), &target.luminance()).unwrap();
    assert_abs_diff_eq!(offset.dx, 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(offset.dy, -3.0, epsilon = 1e-9);
}

#[test]
fn test_phase_correlation_aligner_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dark_field(64, 64, &DARK_STARS);
    let images = write_frames(dir.path(), "f", &[reference.clone(), roll(&reference, 2.0, 2.0)]);

    let aligner = PhaseCorrelationAligner::new(true);
    assert!(aligner.supports(AlignmentType::Timelapse));
    assert!(!aligner.supports(AlignmentType::Panoramic));

    let result = aligner
        .align(
            &CancelToken::never(),
            &request(images, dir.path().join("out"), AlignmentType::Timelapse),
        )
        .unwrap();
    assert_eq!(result.aligned_images.len(), 2);
    assert!(result.aligned_images.iter().all(|p| p.exists()));
    assert_abs_diff_eq!(result.transforms[1].dx, 2.0, epsilon = 1e-9);
}

#[test]
fn test_phase_correlation_aligner_skips_target_it_cannot_write() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dark_field(64, 64, &DARK_STARS);
    let images = write_frames(
        dir.path(),
        "f",
        &[reference.clone(), roll(&reference, 2.0, 2.0), roll(&reference, -3.0, 1.0)],
    );
    let out = dir.path().join("out");
    std::fs::create_dir_all(aligned_output_path(&out, 2, &images[2])).unwrap();

    let result = PhaseCorrelationAligner::new(true)
        .align(&CancelToken::never(), &request(images, out, AlignmentType::Timelapse))
        .unwrap();
    assert_eq!(result.aligned_images.len(), 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("f02"));
}
