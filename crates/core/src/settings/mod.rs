//! Persisted view preferences.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::cache::KeyValueStore;
use crate::constants::VIEW_PREFERENCES_STORE_KEY;
use crate::errors::{Error, Result};
use crate::holdings::{SortDirection, SortField};

/// How the holdings view is sorted and which uploaded portfolio is
/// selected, persisted across sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPreferences {
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub selected_portfolio: Option<String>,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            sort_field: SortField::Symbol,
            sort_direction: SortDirection::Ascending,
            selected_portfolio: None,
        }
    }
}

/// Loads and saves [`ViewPreferences`].
///
/// Loading never fails: a missing, unreadable or malformed stored value
/// degrades to the defaults.
pub trait PreferencesServiceTrait: Send + Sync {
    fn load(&self) -> ViewPreferences;
    fn save(&self, preferences: &ViewPreferences) -> Result<()>;
}

/// Preference persistence over the injected store.
pub struct PreferencesService {
    store: Arc<dyn KeyValueStore>,
}

impl PreferencesService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl PreferencesServiceTrait for PreferencesService {
    fn load(&self) -> ViewPreferences {
        let raw = match self.store.get(VIEW_PREFERENCES_STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ViewPreferences::default(),
            Err(e) => {
                warn!("preference read failed, using defaults: {}", e);
                return ViewPreferences::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!("stored preferences are malformed, using defaults: {}", e);
                ViewPreferences::default()
            }
        }
    }

    fn save(&self, preferences: &ViewPreferences) -> Result<()> {
        let raw = serde_json::to_string(preferences)
            .map_err(|e| Error::Unexpected(format!("preference serialization: {}", e)))?;
        self.store
            .set(VIEW_PREFERENCES_STORE_KEY, &raw)
            .map_err(|e| Error::Store(e.to_string()))
    }
}
