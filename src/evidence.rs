//! Evidence persistence.
//!
//! Saves sampled frames as JPEG stills under a two-way directory split
//! (`compliant/`, `non_compliant/`) and throttles how often each side is
//! written. Saved pixels are the overlaid copy, so the stills carry the
//! detection boxes but never the banner text.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;

use crate::evaluate::ComplianceVerdict;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Filesystem store for evidence stills.
pub struct EvidenceStore {
    compliant_dir: PathBuf,
    non_compliant_dir: PathBuf,
}

impl EvidenceStore {
    /// Open the store rooted at `root`, creating both class directories.
    /// An unwritable root is fatal here rather than on the first save.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let compliant_dir = root.join("compliant");
        let non_compliant_dir = root.join("non_compliant");
        for dir in [&compliant_dir, &non_compliant_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating evidence directory {}", dir.display()))?;
        }
        Ok(Self {
            compliant_dir,
            non_compliant_dir,
        })
    }

    pub fn compliant_dir(&self) -> &Path {
        &self.compliant_dir
    }

    pub fn non_compliant_dir(&self) -> &Path {
        &self.non_compliant_dir
    }

    /// Write one overlaid RGB24 buffer as a JPEG still.
    ///
    /// The verdict picks the directory and shapes the filename:
    /// `{class}_frame_{index}_{YYYYmmdd_HHMMSS}[_missing_{items}].jpg`,
    /// with the missing-item suffix sanitized down to `[A-Za-z0-9_-]` so an
    /// item name can never smuggle a path separator into the filename.
    pub fn save(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        verdict: &ComplianceVerdict,
    ) -> Result<PathBuf> {
        let dir = if verdict.is_compliant() {
            &self.compliant_dir
        } else {
            &self.non_compliant_dir
        };
        let path = dir.join(file_name(verdict));
        image::save_buffer(
            &path,
            pixels,
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("writing evidence still {}", path.display()))?;
        Ok(path)
    }
}

fn file_name(verdict: &ComplianceVerdict) -> String {
    let class = if verdict.is_compliant() {
        "compliant"
    } else {
        "non_compliant"
    };
    let mut name = format!(
        "{}_frame_{}_{}",
        class,
        verdict.frame_index,
        Local::now().format("%Y%m%d_%H%M%S")
    );
    if !verdict.missing_items.is_empty() {
        let items: Vec<&str> = verdict.missing_items.iter().map(|i| i.as_str()).collect();
        name.push_str("_missing_");
        name.push_str(&sanitize_component(&items.join("_")));
    }
    name.push_str(".jpg");
    name
}

static FILENAME_SAFE: OnceLock<Regex> = OnceLock::new();

/// Replace every byte outside `[A-Za-z0-9_-]` with `-`.
fn sanitize_component(raw: &str) -> String {
    let re = FILENAME_SAFE.get_or_init(|| Regex::new("[^A-Za-z0-9_-]").expect("static pattern"));
    re.replace_all(raw, "-").into_owned()
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Modulo save throttle with independent compliant / non-compliant counters.
///
/// Counters increment before the check, so with interval 10 the 10th, 20th,
/// 30th... evaluated frame of each class is admitted. The two counters never
/// interact: a burst of one class does not starve the other.
#[derive(Debug)]
pub struct SaveThrottle {
    interval: u64,
    compliant_seen: u64,
    non_compliant_seen: u64,
}

impl SaveThrottle {
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            compliant_seen: 0,
            non_compliant_seen: 0,
        }
    }

    /// Count one evaluated frame of the given class; true means save it.
    pub fn observe(&mut self, compliant: bool) -> bool {
        let counter = if compliant {
            &mut self.compliant_seen
        } else {
            &mut self.non_compliant_seen
        };
        *counter += 1;
        self.interval != 0 && *counter % self.interval == 0
    }
}
