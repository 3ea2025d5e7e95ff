mod common;

use std::fs::File;

use approx::assert_abs_diff_eq;

use common::gradient_frame;
use ndarray::Array3;
use photonic_core::error::PhotonicError;
use photonic_core::frame::Frame;
use photonic_core::io::{is_image_file, is_raw_file, list_images, load_image, save_image};

#[test]
fn test_extension_classification_is_case_insensitive() {
    assert!(is_image_file("a/IMG.JPG".as_ref()));
    assert!(is_image_file("a/b.tiff".as_ref()));
    assert!(is_raw_file("a/b.Nef".as_ref()));
    assert!(!is_raw_file("a/b.png".as_ref()));
    assert!(!is_image_file("a/notes.txt".as_ref()));
    assert!(!is_image_file("a/noext".as_ref()));
}

#[test]
fn test_list_images_recurses_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("night/b")).unwrap();
    for name in ["z.jpg", "night/b/a.tif", "night/x.cr2", "readme.md"] {
        File::create(dir.path().join(name)).unwrap();
    }

    let listed = list_images(dir.path()).unwrap();
    let names: Vec<String> = listed
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["night/b/a.tif", "night/x.cr2", "z.jpg"]);
}

#[test]
fn test_list_images_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("one.png");
    let text = dir.path().join("one.txt");
    File::create(&image).unwrap();
    File::create(&text).unwrap();

    assert_eq!(list_images(&image).unwrap(), vec![image]);
    assert!(list_images(&text).unwrap().is_empty());
}

#[test]
fn test_tiff_round_trip_keeps_16_bit_precision() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out.tif");
    let frame = gradient_frame(5, 7);

    save_image(&frame, &path).unwrap();
    let back = load_image(&path).unwrap();

    assert_eq!(back.dim(), (5, 7, 3));
    for (a, b) in frame.data.iter().zip(back.data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 65535.0);
    }
}

#[test]
fn test_png_and_jpeg_are_written_in_their_own_format() {
    let dir = tempfile::tempdir().unwrap();
    let frame = gradient_frame(8, 8);

    let png = dir.path().join("out.png");
    save_image(&frame, &png).unwrap();
    assert_eq!(
        image::guess_format(&std::fs::read(&png).unwrap()).unwrap(),
        image::ImageFormat::Png
    );
    let back = load_image(&png).unwrap();
    for (a, b) in frame.data.iter().zip(back.data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 255.0);
    }

    let jpg = dir.path().join("out.jpg");
    save_image(&frame, &jpg).unwrap();
    assert_eq!(
        image::guess_format(&std::fs::read(&jpg).unwrap()).unwrap(),
        image::ImageFormat::Jpeg
    );
    assert_eq!(load_image(&jpg).unwrap().dim(), (8, 8, 3));
}

#[test]
fn test_load_missing_file_is_an_error() {
    assert!(load_image("/definitely/not/here.tif".as_ref()).is_err());
}

#[test]
fn test_saving_empty_frame_reports_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let empty = Frame::new(Array3::zeros((0, 4, 3)), 16);
    for name in ["empty.tif", "empty.png"] {
        let err = save_image(&empty, &dir.path().join(name)).unwrap_err();
        assert!(matches!(
            err,
            PhotonicError::InvalidDimensions { width: 4, height: 0 }
        ));
    }
    assert!(!dir.path().join("empty.tif").exists());
}
