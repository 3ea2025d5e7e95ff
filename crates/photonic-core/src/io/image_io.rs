use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageFormat, Rgb};
use ndarray::Array3;
use walkdir::WalkDir;

use crate::consts::{COLOR_CHANNEL_COUNT, RAW_CACHE_DIR};
use crate::error::{PhotonicError, Result};
use crate::frame::Frame;

/// Extensions treated as images by directory listings.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "dng", "nef", "cr2", "cr3", "arw", "rw2", "orf", "pef",
    "raf", "srw", "x3f",
];

/// Camera RAW extensions that need pre-conversion before pixel access.
const RAW_EXTENSIONS: &[&str] = &[
    "dng", "nef", "cr2", "cr3", "arw", "rw2", "orf", "pef", "raf", "srw", "x3f",
];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_image_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_raw_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|e| RAW_EXTENSIONS.contains(&e.as_str()))
}

/// Recursively list image files under `root`, sorted by path.
///
/// A plain file is returned as a one-element list when it is an image. RAW
/// conversion caches below `root` are not descended into.
pub fn list_images(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_image_file(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && e.file_name() == RAW_CACHE_DIR));
    for entry in walker {
        let entry = entry.map_err(|e| {
            PhotonicError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if entry.file_type().is_file() && is_image_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load an image file into a 3-channel frame.
pub fn load_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let rgb = img.to_rgb16();
    let (w, h) = rgb.dimensions();
    let mut data = Array3::<f32>::zeros((h as usize, w as usize, COLOR_CHANNEL_COUNT));

    for (col, row, pixel) in rgb.enumerate_pixels() {
        for ch in 0..COLOR_CHANNEL_COUNT {
            data[[row as usize, col as usize, ch]] = pixel.0[ch] as f32 / 65535.0;
        }
    }

    Ok(Frame::new(data, 16))
}

/// Expand a frame of any channel count to RGB samples.
fn rgb_samples(frame: &Frame, row: usize, col: usize) -> [f32; 3] {
    let c = frame.channels();
    let pick = |ch: usize| frame.data[[row, col, ch.min(c - 1)]].clamp(0.0, 1.0);
    [pick(0), pick(1), pick(2)]
}

/// Save a frame as 16-bit RGB TIFF.
fn save_tiff(frame: &Frame, path: &Path) -> Result<()> {
    let (h, w, _) = frame.dim();

    let mut pixels: Vec<u16> = Vec::with_capacity(h * w * COLOR_CHANNEL_COUNT);
    for row in 0..h {
        for col in 0..w {
            for v in rgb_samples(frame, row, col) {
                pixels.push((v * 65535.0).round() as u16);
            }
        }
    }

    let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels).ok_or(
        PhotonicError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        },
    )?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit RGB in `format`.
fn save_8bit(frame: &Frame, path: &Path, format: ImageFormat) -> Result<()> {
    let (h, w, _) = frame.dim();

    let mut img = image::RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let [r, g, b] = rgb_samples(frame, row, col);
            img.put_pixel(
                col as u32,
                row as u32,
                Rgb([
                    (r * 255.0).round() as u8,
                    (g * 255.0).round() as u8,
                    (b * 255.0).round() as u8,
                ]),
            );
        }
    }

    img.save_with_format(path, format)?;
    Ok(())
}

/// Save frame, choosing format from file extension: PNG and JPEG are 8-bit,
/// anything else is a 16-bit TIFF. Parent directories are created.
pub fn save_image(frame: &Frame, path: &Path) -> Result<()> {
    let (h, w, c) = frame.dim();
    if h == 0 || w == 0 || c == 0 {
        return Err(PhotonicError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match lowercase_extension(path).as_deref() {
        Some("png") => save_8bit(frame, path, ImageFormat::Png),
        Some("jpg") | Some("jpeg") => save_8bit(frame, path, ImageFormat::Jpeg),
        _ => save_tiff(frame, path),
    }
}
