//! Timelapse encoding through `ffmpeg`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{PhotonicError, Result};
use crate::tools::run_tool;

pub const FFMPEG: &str = "ffmpeg";

/// One encoded video or animation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedOutput {
    pub path: PathBuf,
    pub format: String,
    pub codec: String,
    pub size: u64,
}

#[derive(Clone, Debug, Default)]
pub struct TimelapseOutcome {
    pub outputs: Vec<EncodedOutput>,
    pub frame_count: usize,
    pub warnings: Vec<String>,
}

/// Scale filter for a named output resolution.
pub fn scale_filter(resolution: &str) -> Option<&'static str> {
    match resolution {
        "1080p" => Some("scale=1920:1080"),
        "720p" => Some("scale=1280:720"),
        "480p" => Some("scale=854:480"),
        "240p" => Some("scale=426:240"),
        _ => None,
    }
}

/// `(file suffix, codec label)` for a supported format.
fn format_target(format: &str) -> Option<(&'static str, &'static str)> {
    match format {
        "mp4" => Some((".mp4", "libx264")),
        "mp4-h265" => Some(("-h265.mp4", "libx265")),
        "gif" => Some((".gif", "gif")),
        _ => None,
    }
}

/// ffmpeg arguments for one format. `list` is a concat demuxer file.
pub fn ffmpeg_args(list: &Path, output: &Path, format: &str, fps: u32, resolution: Option<&str>) -> Option<Vec<String>> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-r".into(),
        fps.to_string(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.display().to_string(),
    ];
    let scale = resolution.and_then(scale_filter);

    match format {
        "mp4" => {
            args.extend(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", "18"].map(String::from));
            if let Some(filter) = scale {
                args.extend(["-vf".to_string(), filter.to_string()]);
            }
        }
        "mp4-h265" => {
            args.extend(
                ["-c:v", "libx265", "-preset", "medium", "-crf", "28", "-pix_fmt", "yuv420p"].map(String::from),
            );
            if let Some(filter) = scale {
                args.extend(["-vf".to_string(), filter.to_string()]);
            }
        }
        "gif" => {
            args.push("-vf".into());
            args.push(format!(
                "fps={fps},scale=480:480:force_original_aspect_ratio=decrease:flags=lanczos,pad=480:480:(ow-iw)/2:(oh-ih)/2"
            ));
        }
        _ => return None,
    }

    args.extend(["-r".to_string(), fps.to_string()]);
    args.push(output.display().to_string());
    Some(args)
}

/// Concat demuxer listing, one `file` line per frame.
pub fn concat_list(frames: &[PathBuf]) -> String {
    frames
        .iter()
        .map(|f| {
            let path = fs::canonicalize(f).unwrap_or_else(|_| f.clone());
            format!("file '{}'\n", path.display().to_string().replace('\'', "'\\''"))
        })
        .collect()
}

/// Move an existing file aside as `<name>.backup.<unix seconds>`.
fn backup_existing(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".backup.{stamp}"));
    fs::rename(path, &backup)?;
    Ok(())
}

/// Encode `frames` once per requested format next to `base_output`
/// (`<base>.mp4`, `<base>-h265.mp4`, `<base>.gif`).
///
/// A format that fails becomes a warning; the call fails only when no format
/// was produced.
pub fn encode_timelapse(
    cancel: &CancelToken,
    frames: &[PathBuf],
    base_output: &Path,
    formats: &[String],
    fps: u32,
    resolution: Option<&str>,
) -> Result<TimelapseOutcome> {
    if frames.is_empty() {
        return Err(PhotonicError::EmptySequence);
    }
    if let Some(parent) = base_output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut list_path = base_output.as_os_str().to_owned();
    list_path.push(".frames.txt");
    let list_path = PathBuf::from(list_path);
    fs::write(&list_path, concat_list(frames))?;

    info!(frames = frames.len(), fps, formats = ?formats, "encoding timelapse");

    let mut outcome = TimelapseOutcome {
        frame_count: frames.len(),
        ..Default::default()
    };
    for format in formats {
        let Some((suffix, codec)) = format_target(format) else {
            outcome.warnings.push(format!("unsupported format: {format}"));
            continue;
        };
        let mut output = base_output.as_os_str().to_owned();
        output.push(suffix);
        let output = PathBuf::from(output);

        let Some(args) = ffmpeg_args(&list_path, &output, format, fps, resolution) else {
            continue;
        };
        if let Err(e) = backup_existing(&output) {
            warn!(file = %output.display(), error = %e, "could not back up existing output");
        }

        match run_tool(cancel, FFMPEG, &args, None) {
            Ok(_) => {
                let size = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
                info!(format = %format, output = %output.display(), "timelapse format written");
                outcome.outputs.push(EncodedOutput {
                    path: output,
                    format: format.clone(),
                    codec: codec.to_string(),
                    size,
                });
            }
            Err(PhotonicError::Cancelled) => {
                let _ = fs::remove_file(&list_path);
                return Err(PhotonicError::Cancelled);
            }
            Err(e) => {
                warn!(format = %format, error = %e, "timelapse format failed");
                outcome.warnings.push(format!("{format}: {e}"));
            }
        }
    }

    let _ = fs::remove_file(&list_path);

    if outcome.outputs.is_empty() {
        return Err(PhotonicError::AllProcessorsFailed {
            task: "timelapse".to_string(),
            attempts: outcome.warnings,
        });
    }
    Ok(outcome)
}
