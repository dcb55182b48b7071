//! Game settings
//!
//! Tuned constants kept configurable: search depths in particular depend on
//! how large the arena ends up on the target display. Loaded from a JSON file
//! on native builds and from LocalStorage in the browser.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{GameError, Result};
use crate::sim::SearchConfig;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Arena ===
    /// Pixel size of one cell on the render surface
    pub cell_size: u32,

    // === Pacing ===
    /// Ticks per second at level 1
    pub base_speed: u32,
    /// Ticks per second added per level
    pub speed_increment: u32,
    /// Cap on elapsed time credited per frame (ms)
    pub max_frame_ms: f64,

    // === CPU ===
    /// Minimax plies per decision
    pub search_depth: u32,
    /// Flood-fill budget at search leaves
    pub heuristic_depth: usize,
    /// Bonus for the CPU keeping its heading
    pub continuity_bonus: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,

            base_speed: BASE_SPEED,
            speed_increment: SPEED_INCREMENT,
            max_frame_ms: MAX_FRAME_MS,

            search_depth: SEARCH_DEPTH,
            heuristic_depth: HEURISTIC_DEPTH,
            continuity_bonus: CONTINUITY_BONUS,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would stall or divide by zero
    pub fn validate(&self) -> Result<()> {
        if self.cell_size == 0 {
            return Err(GameError::InvalidSettings("cell_size must be positive".into()));
        }
        if self.base_speed == 0 {
            return Err(GameError::InvalidSettings("base_speed must be positive".into()));
        }
        if self.max_frame_ms.is_nan() || self.max_frame_ms <= 0.0 {
            return Err(GameError::InvalidSettings("max_frame_ms must be positive".into()));
        }
        if !self.continuity_bonus.is_finite() {
            return Err(GameError::InvalidSettings("continuity_bonus must be finite".into()));
        }
        Ok(())
    }

    /// Search configuration derived from these settings
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            depth: self.search_depth,
            heuristic_depth: self.heuristic_depth,
            continuity_bonus: self.continuity_bonus,
            ..SearchConfig::default()
        }
    }

    /// Speed for a level under these settings
    pub fn speed_for_level(&self, level: u32) -> u32 {
        crate::speed_for_level(level, self.base_speed, self.speed_increment)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "light_cycles_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Load settings from a JSON file (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
