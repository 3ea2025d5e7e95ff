//! Input discovery and grouping for scan jobs.
//!
//! Images are grouped per directory three ways: the directory as a whole,
//! runs of numbered filenames sharing a prefix, and clusters of files whose
//! modification times lie close together. Each group is classified by size.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::error::Result;
use crate::io::list_images;

/// Files whose mtimes are further apart than this start a new cluster.
pub const TIMESTAMP_CLUSTER_GAP: Duration = Duration::from_secs(60);

/// Smallest filename sequence or timestamp cluster reported as a group.
pub const MIN_GROUP_SIZE: usize = 3;

const TIMELAPSE_MIN_COUNT: usize = 50;
const PANORAMIC_MIN_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Timelapse,
    Panoramic,
    Stack,
}

impl GroupType {
    /// 50+ images look like a timelapse, 5+ like a panorama, fewer like a stack.
    pub fn classify(count: usize) -> Self {
        if count >= TIMELAPSE_MIN_COUNT {
            Self::Timelapse
        } else if count >= PANORAMIC_MIN_COUNT {
            Self::Panoramic
        } else {
            Self::Stack
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    DirectorySize,
    FilenameSequence,
    TimestampCluster,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGroup {
    pub group_type: GroupType,
    pub base_path: PathBuf,
    pub count: usize,
    pub detection: Detection,
}

#[derive(Clone, Debug, Default)]
pub struct ScanSummary {
    pub images: Vec<PathBuf>,
    pub groups: Vec<ImageGroup>,
}

/// List every image under `input` and group them.
pub fn scan(input: &Path) -> Result<ScanSummary> {
    let images = list_images(input)?;
    let groups = group_files(&images);
    Ok(ScanSummary { images, groups })
}

/// Groups sorted by directory then detection kind, with duplicates removed.
pub fn group_files(files: &[PathBuf]) -> Vec<ImageGroup> {
    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for f in files {
        let dir = f.parent().map(Path::to_path_buf).unwrap_or_default();
        by_dir.entry(dir).or_default().push(f.clone());
    }

    let mut groups = Vec::new();
    for (dir, mut members) in by_dir {
        members.sort();
        groups.push(ImageGroup {
            group_type: GroupType::classify(members.len()),
            base_path: dir.clone(),
            count: members.len(),
            detection: Detection::DirectorySize,
        });
        groups.extend(sequence_groups(&dir, &members));
        groups.extend(timestamp_groups(&dir, &members));
    }

    let mut seen = BTreeSet::new();
    groups.retain(|g| seen.insert((g.base_path.clone(), g.detection, g.group_type)));
    groups.sort_by(|a, b| {
        a.base_path
            .cmp(&b.base_path)
            .then(a.detection.cmp(&b.detection))
    });
    groups
}

/// The part of `name` before its last run of digits, or `None` without digits.
fn sequence_prefix(name: &str) -> Option<&str> {
    let end = name.rfind(|c: char| c.is_ascii_digit())?;
    Some(name[..end].trim_end_matches(|c: char| c.is_ascii_digit()))
}

fn sequence_groups(dir: &Path, files: &[PathBuf]) -> Vec<ImageGroup> {
    let mut by_prefix: BTreeMap<String, usize> = BTreeMap::new();
    for f in files {
        let Some(name) = f.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        if let Some(prefix) = sequence_prefix(&name) {
            *by_prefix.entry(prefix.to_string()).or_default() += 1;
        }
    }

    by_prefix
        .into_values()
        .filter(|&count| count >= MIN_GROUP_SIZE)
        .map(|count| ImageGroup {
            group_type: GroupType::classify(count),
            base_path: dir.to_path_buf(),
            count,
            detection: Detection::FilenameSequence,
        })
        .collect()
}

fn timestamp_groups(dir: &Path, files: &[PathBuf]) -> Vec<ImageGroup> {
    let mut times: Vec<SystemTime> = files
        .iter()
        .filter_map(|f| fs::metadata(f).and_then(|m| m.modified()).ok())
        .collect();
    times.sort();

    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=times.len() {
        let split = i == times.len()
            || times[i]
                .duration_since(times[i - 1])
                .map_or(false, |gap| gap > TIMESTAMP_CLUSTER_GAP);
        if split {
            let count = i - start;
            if count >= MIN_GROUP_SIZE {
                groups.push(ImageGroup {
                    group_type: GroupType::classify(count),
                    base_path: dir.to_path_buf(),
                    count,
                    detection: Detection::TimestampCluster,
                });
            }
            start = i;
        }
    }
    groups
}
