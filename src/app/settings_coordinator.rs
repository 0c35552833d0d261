//! Window preference persistence.
//!
//! Everything the viewer remembers between runs except column layouts lives
//! in eframe's storage as JSON strings. Column layouts go through the
//! library's column store so they survive outside the GUI as well.

use serde::{Deserialize, Serialize};

use crate::state::LayoutState;

const PREFERENCES_KEY: &str = "panel_preferences";
const LAYOUT_KEY: &str = "panel_layout";

/// Small preferences that are not tied to a page's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowPreferences {
    /// Page shown when the viewer starts
    pub active_page: Option<String>,
    pub dark_mode: bool,
}

impl Default for WindowPreferences {
    fn default() -> Self {
        Self {
            active_page: None,
            dark_mode: true,
        }
    }
}

/// Typed access to eframe's string storage.
pub struct SettingsCoordinator;

impl SettingsCoordinator {
    /// Loads `key`, falling back to `T::default()` when it is missing or
    /// no longer parses.
    pub fn load_setting<T>(storage: Option<&dyn eframe::Storage>, key: &str) -> T
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        Self::try_load_setting(storage, key).unwrap_or_default()
    }

    pub fn load_setting_or<T>(storage: Option<&dyn eframe::Storage>, key: &str, default: T) -> T
    where
        T: for<'de> Deserialize<'de>,
    {
        Self::try_load_setting(storage, key).unwrap_or(default)
    }

    pub fn try_load_setting<T>(storage: Option<&dyn eframe::Storage>, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let json_str = storage?.get_string(key)?;
        match serde_json::from_str(&json_str) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, %error, "ignoring unreadable setting");
                None
            }
        }
    }

    /// Serializes `value` under `key` and flushes the storage.
    pub fn save_setting<T>(storage: &mut dyn eframe::Storage, key: &str, value: &T)
    where
        T: Serialize,
    {
        match serde_json::to_string(value) {
            Ok(json_str) => {
                storage.set_string(key, json_str);
                storage.flush();
            }
            Err(error) => tracing::warn!(key, %error, "failed to serialize setting"),
        }
    }

    // ===== Viewer Settings =====

    pub fn load_preferences(storage: Option<&dyn eframe::Storage>) -> WindowPreferences {
        Self::load_setting(storage, PREFERENCES_KEY)
    }

    pub fn load_layout(storage: Option<&dyn eframe::Storage>) -> LayoutState {
        Self::load_setting(storage, LAYOUT_KEY)
    }

    pub fn save_all(storage: &mut dyn eframe::Storage, preferences: &WindowPreferences, layout: &LayoutState) {
        Self::save_setting(storage, PREFERENCES_KEY, preferences);
        Self::save_setting(storage, LAYOUT_KEY, layout);
    }
}
