mod common;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use common::{Behaviour, FakeConverter};
use photonic_core::cancel::{CancelSource, CancelToken};
use photonic_core::config::RawConfig;
use photonic_core::error::PhotonicError;
use photonic_core::io::list_images;
use photonic_core::raw::{cache_is_valid, RawConversionService, RawConverter};
use photonic_core::selection::Registry;

fn touch(path: &Path, modified: SystemTime) {
    let file = File::create(path).unwrap();
    file.set_modified(modified).unwrap();
}

fn service(converters: Vec<Arc<FakeConverter>>) -> RawConversionService {
    let mut registry: Registry<dyn RawConverter> = Registry::new();
    for c in converters {
        registry.register(c).unwrap();
    }
    RawConversionService::with_registry(registry, RawConfig::default())
}

/// `<dir>/IMG_000N.nef` stamped an hour in the past.
fn raw_files(dir: &Path, count: usize) {
    let past = SystemTime::now() - Duration::from_secs(3600);
    for i in 0..count {
        touch(&dir.join(format!("IMG_{i:04}.nef")), past);
    }
}

// ---------------------------------------------------------------------------
// Cache validity
// ---------------------------------------------------------------------------

#[test]
fn test_cache_valid_when_not_older_than_raw() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("a.nef");
    let cached = dir.path().join("a.tiff");
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    touch(&raw, t0);
    assert!(!cache_is_valid(&raw, &cached));

    touch(&cached, t0 - Duration::from_secs(1));
    assert!(!cache_is_valid(&raw, &cached));

    touch(&cached, t0 + Duration::from_secs(5));
    assert!(cache_is_valid(&raw, &cached));

    touch(&raw, t0 + Duration::from_secs(10));
    assert!(!cache_is_valid(&raw, &cached));
}

#[test]
fn test_cache_with_equal_mtime_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("a.nef");
    let cached = dir.path().join("a.tiff");
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    touch(&raw, t0);
    touch(&cached, t0);
    assert!(cache_is_valid(&raw, &cached));

    let converter = Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed));
    let svc = service(vec![converter.clone()]);
    let processed = dir.path().join("processed");
    std::fs::create_dir_all(&processed).unwrap();
    touch(&processed.join("a.tiff"), t0);

    let report = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap()
        .unwrap();
    assert_eq!(report.cached, 1);
    assert_eq!(report.converted, 0);
    assert_eq!(converter.calls(), 0);
}

// ---------------------------------------------------------------------------
// Directory preprocessing
// ---------------------------------------------------------------------------

#[test]
fn test_preprocess_without_raw_files_is_none() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("photo.jpg")).unwrap();
    let svc = service(vec![Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed))]);

    let report = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap();
    assert!(report.is_none());
    assert!(!dir.path().join("processed").exists());
}

#[test]
fn test_preprocess_converts_then_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 3);
    let converter = Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed));
    let svc = service(vec![converter.clone()]);

    let first = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap()
        .unwrap();
    assert_eq!(first.dir, dir.path().join("processed"));
    assert_eq!(first.converted, 3);
    assert_eq!(first.cached, 0);
    assert!(first.dir.join("IMG_0001.tiff").exists());

    let second = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap()
        .unwrap();
    assert_eq!(second.converted, 0);
    assert_eq!(second.cached, 3);
    assert_eq!(converter.calls(), 3);

    let forced = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, true)
        .unwrap()
        .unwrap();
    assert_eq!(forced.converted, 3);
    assert_eq!(converter.calls(), 6);
}

#[test]
fn test_preprocess_prefers_requested_tool() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 1);
    let darktable = Arc::new(FakeConverter::new("darktable", true, Behaviour::Succeed));
    let dcraw = Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed));
    let svc = service(vec![darktable.clone(), dcraw.clone()]);

    svc.preprocess_directory(&CancelToken::never(), dir.path(), Some("dcraw"), false)
        .unwrap();
    assert_eq!(dcraw.calls(), 1);
    assert_eq!(darktable.calls(), 0);
}

#[test]
fn test_fallback_starts_with_imagemagick() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 1);
    let fakes: Vec<Arc<FakeConverter>> = ["darktable", "rawtherapee", "imagemagick", "dcraw"]
        .into_iter()
        .map(|name| Arc::new(FakeConverter::new(name, true, Behaviour::Succeed)))
        .collect();
    let svc = service(fakes.clone());

    svc.preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap();
    let calls: Vec<usize> = fakes.iter().map(|f| f.calls()).collect();
    assert_eq!(calls, vec![0, 0, 1, 0]);
}

#[test]
fn test_preprocess_all_failures_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 2);
    let svc = service(vec![Arc::new(FakeConverter::new("dcraw", true, Behaviour::Fail))]);

    let err = svc
        .preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap_err();
    match err {
        PhotonicError::AllProcessorsFailed { task, attempts } => {
            assert_eq!(task, "raw");
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_preprocess_honours_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 2);
    let svc = service(vec![Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed))]);
    let source = CancelSource::new();
    source.cancel();

    let err = svc
        .preprocess_directory(&source.token(), dir.path(), None, false)
        .unwrap_err();
    assert!(matches!(err, PhotonicError::Cancelled));
}

#[test]
fn test_listing_skips_conversion_cache() {
    let dir = tempfile::tempdir().unwrap();
    raw_files(dir.path(), 2);
    let svc = service(vec![Arc::new(FakeConverter::new("dcraw", true, Behaviour::Succeed))]);
    svc.preprocess_directory(&CancelToken::never(), dir.path(), None, false)
        .unwrap();

    let listed = list_images(dir.path()).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|p| p.extension().unwrap() == "nef"));
}

#[test]
fn test_output_path_uses_configured_format() {
    let svc = RawConversionService::with_registry(
        Registry::new(),
        RawConfig {
            output_format: "png".to_string(),
            ..Default::default()
        },
    );
    assert_eq!(
        svc.output_path(Path::new("/in/IMG_1.CR2"), Path::new("/cache")),
        Path::new("/cache/IMG_1.png")
    );
}

#[test]
fn test_default_service_registers_command_tools() {
    let svc = RawConversionService::new(RawConfig::default()).unwrap();
    assert_eq!(
        svc.registry().names(),
        vec!["darktable", "rawtherapee", "imagemagick", "dcraw"]
    );
}
