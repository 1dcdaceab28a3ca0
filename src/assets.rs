use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const INFOGRAPHIC_DIR: &str = "assets/blog/infographics";
const AUDIO_DIR: &str = "assets/blog/audio";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infographic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub infographic: PathBuf,
    pub audio: PathBuf,
}

/// Post id to asset lookup. Paths in the manifest and the conventional
/// fallbacks are both relative to `root`.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    root: PathBuf,
    entries: HashMap<String, AssetEntry>,
}

impl Manifest {
    pub fn new(root: impl Into<PathBuf>, entries: HashMap<String, AssetEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    /// Reads a manifest if one exists; a missing file yields an empty
    /// manifest so every post falls back to conventional paths.
    pub fn load(root: impl Into<PathBuf>, path: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let Some(path) = path else {
            return Ok(Self::new(root, HashMap::new()));
        };
        if !path.exists() {
            log::debug!("assets: no manifest at {}", path.display());
            return Ok(Self::new(root, HashMap::new()));
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("assets: read manifest {}", path.display()))?;
        let entries: HashMap<String, AssetEntry> = serde_json::from_str(&data)
            .with_context(|| format!("assets: parse manifest {}", path.display()))?;
        log::info!("assets: {} manifest entries", entries.len());
        Ok(Self::new(root, entries))
    }

    pub fn entry(&self, post_id: &str) -> Option<&AssetEntry> {
        self.entries.get(post_id)
    }

    pub fn paths_for(&self, post_id: &str) -> AssetPaths {
        let entry = self.entries.get(post_id);
        let infographic = entry
            .and_then(|entry| entry.infographic.as_deref())
            .map(|rel| self.root.join(rel))
            .unwrap_or_else(|| {
                self.root
                    .join(INFOGRAPHIC_DIR)
                    .join(format!("{post_id}.png"))
            });
        let audio = entry
            .and_then(|entry| entry.audio.as_deref())
            .map(|rel| self.root.join(rel))
            .unwrap_or_else(|| self.root.join(AUDIO_DIR).join(format!("{post_id}.mp3")));
        AssetPaths { infographic, audio }
    }
}
