//! DMX patch overlay
//!
//! A patch copies the value of a source channel onto a target channel in every
//! outgoing packet, without touching the entity mapping. Patches are applied
//! in ascending source-channel order, so when two sources feed the same target
//! the higher source channel wins.

mod store;

pub use store::{load, save};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{GatewayError, Result};
use crate::types::DmxPacket;

#[derive(Debug, Default)]
pub struct PatchOverlay {
    patches: BTreeMap<u16, u16>, // source -> target
    enabled: bool,
    last_recorded: Option<PathBuf>,
}

impl PatchOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(patches: BTreeMap<u16, u16>) -> Self {
        Self { patches, ..Self::default() }
    }

    /// Returns `packets` untouched when disabled or empty, otherwise the
    /// patched copies.
    pub fn apply(&self, packets: Vec<DmxPacket>) -> Vec<DmxPacket> {
        if !self.enabled || self.patches.is_empty() {
            return packets;
        }
        packets
            .into_iter()
            .map(|packet| {
                let mut channels = packet.channels.clone();
                for (source, target) in &self.patches {
                    // read from the unpatched map so chained patches do not cascade
                    if let Some(&value) = packet.channels.get(source) {
                        channels.insert(*target, value);
                    }
                }
                DmxPacket { channels, ..packet }
            })
            .collect()
    }

    pub fn add(&mut self, source: u16, target: u16) {
        self.patches.insert(source, target);
    }

    pub fn remove(&mut self, source: u16) -> Option<u16> {
        self.patches.remove(&source)
    }

    pub fn clear(&mut self) {
        self.patches.clear();
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &BTreeMap<u16, u16> {
        &self.patches
    }

    pub fn last_recorded(&self) -> Option<&Path> {
        self.last_recorded.as_deref()
    }

    /// Replaces the table with the file contents; the file becomes the replay
    /// default.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        self.patches = load(path)?;
        self.last_recorded = Some(path.to_path_buf());
        info!(path = %path.display(), count = self.patches.len(), "patch table loaded");
        Ok(self.patches.len())
    }

    pub fn save_file(&self, path: &Path) -> Result<()> {
        save(&self.patches, path)
    }

    /// Writes the current table under a fresh timestamped name in `dir`.
    pub fn record(&mut self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S_%3f");
        let mut path = dir.join(format!("patch_{stamp}.csv"));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("patch_{stamp}_{n}.csv"));
            n += 1;
        }
        save(&self.patches, &path)?;
        debug!(path = %path.display(), "patch table recorded");
        self.last_recorded = Some(path.clone());
        Ok(path)
    }

    /// Reloads `path`, or the last recorded table, and enables patching.
    pub fn replay(&mut self, path: Option<&Path>) -> Result<usize> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .last_recorded
                .clone()
                .ok_or_else(|| GatewayError::NotFound("no patch table recorded yet".into()))?,
        };
        if !path.exists() {
            return Err(GatewayError::NotFound(format!("patch file {}", path.display())));
        }
        let count = self.load_file(&path)?;
        self.enabled = true;
        Ok(count)
    }
}
