use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::render::prepare::{MAX_BLUR_AMOUNT, MAX_GREY_AMOUNT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlurBackend {
    #[default]
    Cpu,
    Neon,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for artwork.
    pub photo_library_path: PathBuf,
    /// Blur strength preference, `0..=500`.
    pub blur_amount: u32,
    /// Maximum overlay dim, `0..=255`.
    pub dim_amount: u32,
    /// Desaturation of fully blurred keyframes, `0..=500`.
    pub grey_amount: u32,
    /// Build a single blurred keyframe instead of two.
    pub low_ram: bool,
    /// Fixed blur/dim/grey and a slower blur animation, for showcasing.
    pub demo_mode: bool,
    /// Time each artwork stays on screen.
    #[serde(with = "humantime_serde")]
    pub dwell: Duration,
    /// Randomize rotation order.
    pub shuffle: bool,
    /// Allocation budget for a single decode.
    pub max_decode_bytes: u64,
    /// Gaussian blur implementation.
    pub blur_backend: BlurBackend,
    /// Whether the first artwork appears blurred.
    pub start_blurred: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate ranges that serde defaults cannot express.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path is required"
        );
        ensure!(
            self.blur_amount <= MAX_BLUR_AMOUNT,
            "blur-amount must be at most {MAX_BLUR_AMOUNT}"
        );
        ensure!(self.dim_amount <= 255, "dim-amount must be at most 255");
        ensure!(
            self.grey_amount <= MAX_GREY_AMOUNT,
            "grey-amount must be at most {MAX_GREY_AMOUNT}"
        );
        ensure!(!self.dwell.is_zero(), "dwell must be greater than zero");
        ensure!(
            self.max_decode_bytes > 0,
            "max-decode-bytes must be greater than zero"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            blur_amount: 250,
            dim_amount: 128,
            grey_amount: 0,
            low_ram: false,
            demo_mode: false,
            dwell: Duration::from_secs(30),
            shuffle: true,
            max_decode_bytes: 256 * 1024 * 1024,
            blur_backend: BlurBackend::Cpu,
            start_blurred: true,
        }
    }
}
