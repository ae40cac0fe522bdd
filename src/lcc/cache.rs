//! On-disk cache layout for per-tile analysis rasters and its validity policy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::lcc_type::WATER_INDEX;
use crate::core::{Result, TileId};

/// File names of every cached raster for one tile.
#[derive(Clone, Debug)]
pub struct CacheLayout {
    dir: PathBuf,
    cell: String,
    ext: String,
}

impl CacheLayout {
    /// `ext` includes the leading dot, e.g. `.jpg`.
    pub fn new(dir: impl Into<PathBuf>, tile: TileId, ext: impl Into<String>) -> Self {
        Self { dir: dir.into(), cell: tile.cell_name(), ext: ext.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.cell, suffix))
    }

    pub fn base_color(&self) -> PathBuf {
        self.file(&format!(".baselcc.color{}", self.ext))
    }

    pub fn lcc_image(&self, index: u32) -> PathBuf {
        self.file(&format!(".lcc.image.{}{}", index, self.ext))
    }

    pub fn filter(&self, index: u32) -> PathBuf {
        self.file(&format!(".lcc.filter.{}{}", index, self.ext))
    }

    /// The water mask shares the water class's filter file.
    pub fn water_mask(&self) -> PathBuf {
        self.filter(WATER_INDEX)
    }

    pub fn combined(&self, index: u32) -> PathBuf {
        self.file(&format!(".c.image.{}{}", index, self.ext))
    }

    /// Reserved; normalized heights are kept in memory.
    pub fn height_map(&self) -> PathBuf {
        self.file(".hf.image.dds")
    }

    pub fn slope(&self) -> PathBuf {
        self.file(&format!(".sl.image{}", self.ext))
    }

    pub fn relative_elevation(&self) -> PathBuf {
        self.file(&format!(".re.image{}", self.ext))
    }

    pub fn stamp(&self, index: u32) -> PathBuf {
        self.file(&format!(".c.image.{}.stamp.json", index))
    }
}

/// When a cached combined image may be reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Any existing file is valid.
    #[default]
    NeverInvalidate,
    /// Valid while the stamp next to it records the current inputs hash.
    InputsHash,
    /// Valid until the file is older than `seconds`.
    FixedTtl { seconds: u64 },
}

/// Inputs hash recorded next to a combined image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStamp {
    pub inputs_hash: String,
    pub written_at: u64,
}

impl CacheStamp {
    pub fn new(inputs_hash: u64) -> Self {
        let written_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        Self { inputs_hash: format!("{:016x}", inputs_hash), written_at }
    }

    pub fn save_sync(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_sync(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

impl CachePolicy {
    /// Whether the file at `path` can be reused.
    pub fn is_valid(&self, path: &Path, stamp_path: &Path, inputs_hash: u64) -> bool {
        if !path.exists() {
            return false;
        }
        match *self {
            CachePolicy::NeverInvalidate => true,
            CachePolicy::InputsHash => match CacheStamp::load_sync(stamp_path) {
                Ok(stamp) => stamp.inputs_hash == format!("{:016x}", inputs_hash),
                Err(e) => {
                    log::debug!("No usable stamp at {}: {}", stamp_path.display(), e);
                    false
                }
            },
            CachePolicy::FixedTtl { seconds } => fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.elapsed().ok())
                .is_some_and(|age| age <= Duration::from_secs(seconds)),
        }
    }
}

/// 64-bit FNV-1a.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Fnv1a {
    pub fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 ^= *b as u64;
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        for v in values {
            self.write(&v.to_le_bytes());
        }
    }

    pub fn finish(&self) -> u64 {
        self.0
    }
}
