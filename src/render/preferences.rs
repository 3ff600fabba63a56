use std::sync::{Arc, PoisonError, RwLock};

use crate::config::Configuration;
use crate::render::prepare::{DEFAULT_BLUR_AMOUNT, DEFAULT_GREY_AMOUNT, DEFAULT_MAX_DIM};

/// User-adjustable look of the wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserParameters {
    pub blur_amount: u32,
    pub dim_amount: u32,
    pub grey_amount: u32,
}

impl Default for UserParameters {
    fn default() -> Self {
        Self {
            blur_amount: DEFAULT_BLUR_AMOUNT,
            dim_amount: DEFAULT_MAX_DIM,
            grey_amount: DEFAULT_GREY_AMOUNT,
        }
    }
}

impl From<&Configuration> for UserParameters {
    fn from(cfg: &Configuration) -> Self {
        Self {
            blur_amount: cfg.blur_amount,
            dim_amount: cfg.dim_amount,
            grey_amount: cfg.grey_amount,
        }
    }
}

/// Read synchronously whenever the renderer recomputes derived values.
pub trait PreferenceSource: Send + Sync {
    fn parameters(&self) -> UserParameters;
}

/// Preferences shared between the viewer's input handling and the renderer.
#[derive(Debug, Clone, Default)]
pub struct SharedPreferences {
    inner: Arc<RwLock<UserParameters>>,
}

impl SharedPreferences {
    #[must_use]
    pub fn new(params: UserParameters) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Apply `change` and return the new values.
    pub fn update(&self, change: impl FnOnce(&mut UserParameters)) -> UserParameters {
        let mut params = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut params);
        *params
    }
}

impl PreferenceSource for SharedPreferences {
    fn parameters(&self) -> UserParameters {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
