//! Panorama stitching through the Hugin command-line toolchain.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{PhotonicError, Result};
use crate::io::{load_image, save_image};
use crate::tools::run_tool;

use super::job::PanoramicOptions;

#[derive(Clone, Debug, Default)]
pub struct PanoramaOutcome {
    pub output: PathBuf,
    pub image_count: usize,
    pub control_points: usize,
    /// `hugin_executor` or `nona+enblend`.
    pub tool_used: String,
    pub warnings: Vec<String>,
}

/// Hugin's numeric projection code. Unknown names map to cylindrical.
pub fn projection_code(projection: &str) -> u8 {
    match projection {
        "planar" | "rectilinear" => 0,
        "cylindrical" => 1,
        "spherical" | "equirectangular" => 2,
        "fisheye" => 3,
        "stereographic" => 5,
        "mercator" => 6,
        _ => 1,
    }
}

/// `cpclean --max-distance` for an aggression level.
pub fn cpclean_distance(aggression: &str) -> &'static str {
    match aggression {
        "low" => "4",
        "high" => "2",
        _ => "3",
    }
}

fn nona_interpolation(quality: &str) -> &'static [&'static str] {
    match quality {
        "fast" => &["-i", "0"],
        "high" => &["-i", "2"],
        "ultra" => &["-i", "3", "-a"],
        _ => &["-i", "1"],
    }
}

fn enblend_mode(blending: &str) -> &'static str {
    match blending {
        "feather" => "--no-optimize",
        "none" => "--no-blend",
        _ => "--levels=29",
    }
}

/// Rewrite the `f` field of the `p` line in a project file.
pub fn set_projection(project: &str, code: u8) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut done = false;
    for line in project.lines() {
        if !done && line.starts_with("p ") {
            let fields: Vec<String> = line
                .split_whitespace()
                .map(|f| {
                    if f.starts_with('f') {
                        format!("f{code}")
                    } else {
                        f.to_string()
                    }
                })
                .collect();
            out.push(fields.join(" "));
            done = true;
        } else {
            out.push(line.to_string());
        }
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

/// Number of `c` (control point) lines in a project file.
pub fn count_control_points(project: &str) -> usize {
    project.lines().filter(|l| l.starts_with("c ")).count()
}

fn path_arg(p: &Path) -> String {
    p.display().to_string()
}

/// Stitch `images` into `output`.
///
/// Runs pto_gen, cpfind, cpclean, autooptimiser and pano_modify, then renders
/// with hugin_executor, falling back to nona plus enblend. Intermediate files
/// live in `<output>.hugin/`.
pub fn stitch_panorama(
    cancel: &CancelToken,
    images: &[PathBuf],
    output: &Path,
    options: &PanoramicOptions,
) -> Result<PanoramaOutcome> {
    if images.len() < 2 {
        return Err(PhotonicError::InsufficientImages {
            needed: 2,
            got: images.len(),
        });
    }

    let mut work = output.as_os_str().to_owned();
    work.push(".hugin");
    let work = PathBuf::from(work);
    fs::create_dir_all(&work)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut outcome = PanoramaOutcome {
        output: output.to_path_buf(),
        image_count: images.len(),
        ..Default::default()
    };

    info!(images = images.len(), projection = %options.projection, "stitching panorama");

    let project = work.join("project.pto");
    let mut args = vec!["-o".to_string(), path_arg(&project)];
    args.extend(images.iter().map(|p| path_arg(p)));
    run_tool(cancel, "pto_gen", &args, None)?;

    let with_points = work.join("project_cp.pto");
    run_tool(
        cancel,
        "cpfind",
        &["--multirow", "-o", path_arg(&with_points).as_str(), path_arg(&project).as_str()],
        None,
    )?;
    outcome.control_points = count_control_points(&fs::read_to_string(&with_points)?);
    if outcome.control_points == 0 {
        warn!("no control points found; images may not overlap");
        outcome.warnings.push("no control points found".to_string());
    }

    let cleaned = work.join("project_clean.pto");
    let distance = cpclean_distance(&options.aggression);
    let points = match run_tool(
        cancel,
        "cpclean",
        &["--max-distance", distance, "-o", path_arg(&cleaned).as_str(), path_arg(&with_points).as_str()],
        None,
    ) {
        Ok(_) => cleaned,
        Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
        Err(e) => {
            outcome.warnings.push(format!("cpclean: {e}"));
            with_points
        }
    };

    let optimised = work.join("project_opt.pto");
    run_tool(
        cancel,
        "autooptimiser",
        &["-a", "-m", "-l", "-s", "-o", path_arg(&optimised).as_str(), path_arg(&points).as_str()],
        None,
    )?;
    let projected = set_projection(&fs::read_to_string(&optimised)?, projection_code(&options.projection));
    fs::write(&optimised, projected)?;

    let final_project = work.join("project_final.pto");
    run_tool(
        cancel,
        "pano_modify",
        &["--canvas=AUTO", "--crop=AUTO", "-o", path_arg(&final_project).as_str(), path_arg(&optimised).as_str()],
        None,
    )?;

    let prefix = work.join("pano");
    let executor = run_tool(
        cancel,
        "hugin_executor",
        &[
            "--stitching".to_string(),
            format!("--prefix={}", path_arg(&prefix)),
            path_arg(&final_project),
        ],
        None,
    );
    let rendered = match executor {
        Ok(_) => {
            outcome.tool_used = "hugin_executor".to_string();
            prefix.with_extension("tif")
        }
        Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
        Err(e) => {
            warn!(error = %e, "hugin_executor failed, rendering with nona and enblend");
            outcome.warnings.push(format!("hugin_executor: {e}"));
            outcome.tool_used = "nona+enblend".to_string();
            render_with_nona(cancel, &work, &final_project, options)?
        }
    };

    deliver(&rendered, output)?;
    info!(output = %output.display(), tool = %outcome.tool_used, "panorama written");
    Ok(outcome)
}

fn render_with_nona(
    cancel: &CancelToken,
    work: &Path,
    project: &Path,
    options: &PanoramicOptions,
) -> Result<PathBuf> {
    let prefix = work.join("remap");
    let mut args = vec!["-o".to_string(), path_arg(&prefix), "-m".into(), "TIFF_m".into()];
    args.extend(nona_interpolation(&options.quality).iter().map(|s| s.to_string()));
    args.push(path_arg(project));
    run_tool(cancel, "nona", &args, None)?;

    let mut remapped: Vec<PathBuf> = fs::read_dir(work)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("remap"))
                .unwrap_or(false)
                && p.extension().map(|e| e == "tif").unwrap_or(false)
        })
        .collect();
    remapped.sort();
    if remapped.is_empty() {
        return Err(PhotonicError::ToolFailed {
            tool: "nona".to_string(),
            message: "no remapped images produced".to_string(),
        });
    }

    let blended = work.join("blended.tif");
    let mut args = vec!["-o".to_string(), path_arg(&blended), enblend_mode(&options.blending).to_string()];
    args.extend(remapped.iter().map(|p| path_arg(p)));
    run_tool(cancel, "enblend", &args, None)?;
    Ok(blended)
}

/// Copy a TIFF render to `output`, re-encoding when `output` is not a TIFF.
fn deliver(rendered: &Path, output: &Path) -> Result<()> {
    let is_tiff = output
        .extension()
        .map(|e| {
            let e = e.to_string_lossy().to_ascii_lowercase();
            e == "tif" || e == "tiff"
        })
        .unwrap_or(false);
    if is_tiff {
        fs::copy(rendered, output)?;
    } else {
        save_image(&load_image(rendered)?, output)?;
    }
    Ok(())
}
