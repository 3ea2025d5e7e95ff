use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use photonic_core::cancel::{CancelSource, CancelToken};
use photonic_core::error::PhotonicError;
use photonic_core::pipeline::job::PanoramicOptions;
use photonic_core::pipeline::panoramic::{
    count_control_points, cpclean_distance, projection_code, set_projection, stitch_panorama,
};
use photonic_core::pipeline::timelapse::{concat_list, encode_timelapse, ffmpeg_args, scale_filter};
use photonic_core::tools::{check_tool, run_tool, tool_available};

// ---------------------------------------------------------------------------
// run_tool
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn test_run_tool_captures_stdout_and_stdin() {
    let out = run_tool(&CancelToken::never(), "cat", &[] as &[&str], Some(b"hello".to_vec())).unwrap();
    assert_eq!(out.stdout_lossy(), "hello");
}

#[cfg(unix)]
#[test]
fn test_run_tool_nonzero_exit_carries_stderr() {
    let err = run_tool(&CancelToken::never(), "sh", &["-c", "echo broken >&2; exit 3"], None).unwrap_err();
    match err {
        PhotonicError::ToolFailed { tool, message } => {
            assert_eq!(tool, "sh");
            assert!(message.contains("exit code 3"));
            assert!(message.contains("broken"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
#[test]
fn test_run_tool_killed_on_cancel() {
    let source = CancelSource::new();
    let token = source.token();
    let handle = thread::spawn(move || run_tool(&token, "sleep", &["5"], None));

    thread::sleep(Duration::from_millis(100));
    let start = Instant::now();
    source.cancel();
    let result = handle.join().unwrap();

    assert!(matches!(result, Err(PhotonicError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_missing_tool() {
    assert!(!tool_available("photonic-no-such-binary"));
    let err = run_tool(&CancelToken::never(), "photonic-no-such-binary", &["x"], None).unwrap_err();
    assert!(matches!(err, PhotonicError::ToolFailed { .. }));
}

/// Executable shell script at `<dir>/<name>`.
#[cfg(unix)]
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn test_availability_check_gives_up_on_hung_tool() {
    let dir = tempfile::tempdir().unwrap();
    let hung = script(dir.path(), "hung-tool", "sleep 30");

    let start = Instant::now();
    assert!(!check_tool(hung.to_str().unwrap(), Duration::from_millis(300)));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[cfg(unix)]
#[test]
fn test_availability_check_accepts_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let grumpy = script(dir.path(), "grumpy-tool", "exit 2");
    assert!(check_tool(grumpy.to_str().unwrap(), Duration::from_secs(5)));
}

#[cfg(unix)]
#[test]
fn test_availability_is_checked_once() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let counted = script(dir.path(), "counted-tool", &format!("echo called >> '{}'", log.display()));
    let program = counted.to_str().unwrap();

    assert!(tool_available(program));
    assert!(tool_available(program));
    let calls = std::fs::read_to_string(&log).unwrap();
    assert_eq!(calls.lines().count(), 1);
}

// ---------------------------------------------------------------------------
// Timelapse
// ---------------------------------------------------------------------------

#[test]
fn test_ffmpeg_args_per_format() {
    let list = Path::new("/tmp/t.frames.txt");
    let mp4 = ffmpeg_args(list, Path::new("/tmp/t.mp4"), "mp4", 24, Some("720p")).unwrap();
    assert_eq!(&mp4[..3], &["-y", "-r", "24"]);
    assert!(mp4.windows(2).any(|w| w == ["-c:v", "libx264"]));
    assert!(mp4.windows(2).any(|w| w == ["-vf", "scale=1280:720"]));
    assert_eq!(mp4.last().unwrap(), "/tmp/t.mp4");

    let h265 = ffmpeg_args(list, Path::new("/tmp/t-h265.mp4"), "mp4-h265", 24, None).unwrap();
    assert!(h265.windows(2).any(|w| w == ["-c:v", "libx265"]));
    assert!(!h265.contains(&"-vf".to_string()));

    let gif = ffmpeg_args(list, Path::new("/tmp/t.gif"), "gif", 12, Some("1080p")).unwrap();
    let filter = &gif[gif.iter().position(|a| a == "-vf").unwrap() + 1];
    assert!(filter.starts_with("fps=12,scale=480:480"));

    assert!(ffmpeg_args(list, Path::new("/tmp/t.avi"), "avi", 24, None).is_none());
}

#[test]
fn test_scale_filters() {
    assert_eq!(scale_filter("1080p"), Some("scale=1920:1080"));
    assert_eq!(scale_filter("240p"), Some("scale=426:240"));
    assert_eq!(scale_filter("4k"), None);
}

#[test]
fn test_concat_list_escapes_quotes() {
    let listing = concat_list(&[PathBuf::from("/nowhere/a.tif"), PathBuf::from("/nowhere/it's.tif")]);
    assert_eq!(listing, "file '/nowhere/a.tif'\nfile '/nowhere/it'\\''s.tif'\n");
}

#[test]
fn test_encode_without_frames() {
    let dir = tempfile::tempdir().unwrap();
    let err = encode_timelapse(
        &CancelToken::never(),
        &[],
        &dir.path().join("t"),
        &["mp4".to_string()],
        10,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, PhotonicError::EmptySequence));
}

#[test]
fn test_encode_unsupported_formats_only() {
    let dir = tempfile::tempdir().unwrap();
    let frame = dir.path().join("f.tif");
    std::fs::write(&frame, b"").unwrap();

    let err = encode_timelapse(
        &CancelToken::never(),
        &[frame],
        &dir.path().join("t"),
        &["avi".to_string()],
        10,
        None,
    )
    .unwrap_err();
    match err {
        PhotonicError::AllProcessorsFailed { task, attempts } => {
            assert_eq!(task, "timelapse");
            assert_eq!(attempts, vec!["unsupported format: avi"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("t.frames.txt").exists());
}

// ---------------------------------------------------------------------------
// Panorama
// ---------------------------------------------------------------------------

const PROJECT: &str = "# hugin project\np f1 w3000 h1500 v360 n\"TIFF_m\"\ni w100 h100 f0 v50 n\"a.jpg\"\nc n0 N1 x1 y2 X3 Y4 t0\nc n0 N1 x5 y6 X7 Y8 t0\n";

#[test]
fn test_projection_rewrite_only_touches_panorama_line() {
    let rewritten = set_projection(PROJECT, projection_code("spherical"));
    let lines: Vec<&str> = rewritten.lines().collect();
    assert_eq!(lines[1], "p f2 w3000 h1500 v360 n\"TIFF_m\"");
    assert_eq!(lines[2], "i w100 h100 f0 v50 n\"a.jpg\"");
    assert_eq!(count_control_points(&rewritten), 2);
}

#[test]
fn test_projection_and_aggression_tables() {
    assert_eq!(projection_code("planar"), 0);
    assert_eq!(projection_code("mercator"), 6);
    assert_eq!(projection_code("unknown"), 1);
    assert_eq!(cpclean_distance("low"), "4");
    assert_eq!(cpclean_distance("moderate"), "3");
    assert_eq!(cpclean_distance("high"), "2");
}

#[test]
fn test_stitch_needs_two_images() {
    let dir = tempfile::tempdir().unwrap();
    let err = stitch_panorama(
        &CancelToken::never(),
        &[dir.path().join("only.jpg")],
        &dir.path().join("pano.tif"),
        &PanoramicOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PhotonicError::InsufficientImages { needed: 2, got: 1 }));
}
