//! The artwork rotation the slideshow walks through.

use std::path::PathBuf;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::Error;
use crate::scan::{ScanOptions, scan_library};

/// Endless cycle over artwork paths. With shuffling on, every pass is a new
/// random order.
#[derive(Debug, Clone)]
pub struct ArtworkRotation {
    items: Vec<PathBuf>,
    idx: usize,
    shuffle: bool,
}

impl ArtworkRotation {
    /// # Errors
    /// Returns [`Error::EmptyScan`] if `items` is empty.
    pub fn from_vec(mut items: Vec<PathBuf>, shuffle: bool) -> Result<Self, Error> {
        if items.is_empty() {
            return Err(Error::EmptyScan);
        }
        if shuffle {
            items.shuffle(&mut rand::rng());
        }
        Ok(Self {
            items,
            idx: 0,
            shuffle,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.items
    }

    /// Return the next artwork, reshuffling after each full pass.
    pub fn advance(&mut self) -> PathBuf {
        if self.idx == self.items.len() {
            self.idx = 0;
            if self.shuffle && self.items.len() > 1 {
                let last = self.items[self.items.len() - 1].clone();
                self.items.shuffle(&mut rand::rng());
                // Avoid showing the same artwork twice in a row across passes.
                if self.items[0] == last {
                    let end = self.items.len() - 1;
                    self.items.swap(0, end);
                }
                debug!("rotation reshuffled");
            }
        }
        let out = self.items[self.idx].clone();
        self.idx += 1;
        out
    }
}

/// Scan the configured library and build the rotation.
///
/// # Errors
/// Propagates scan failures.
pub fn load_rotation(cfg: &Configuration) -> Result<ArtworkRotation, Error> {
    let found = scan_library(&cfg.photo_library_path, &ScanOptions::default())?;
    info!(
        root = %cfg.photo_library_path.display(),
        discovered = found.len(),
        shuffle = cfg.shuffle,
        "artwork library scanned"
    );
    ArtworkRotation::from_vec(found, cfg.shuffle)
}
