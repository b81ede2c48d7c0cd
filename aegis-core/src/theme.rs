use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub const THEME_KEY: &str = "themeMode";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    /// light -> dark -> system -> light
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::System,
            ThemeMode::System => ThemeMode::Light,
        }
    }

    /// Resolve `System` against the host's color-scheme preference.
    pub fn effective(self, system_prefers_dark: bool) -> ThemeMode {
        match self {
            ThemeMode::System if system_prefers_dark => ThemeMode::Dark,
            ThemeMode::System => ThemeMode::Light,
            other => other,
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(format!("unknown theme mode '{other}'")),
        }
    }
}

/// Key/value storage for local preferences (browser local storage in the UI).
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

pub fn load_theme(store: &impl PreferenceStore) -> ThemeMode {
    store
        .get(THEME_KEY)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

pub fn save_theme(store: &mut impl PreferenceStore, mode: ThemeMode) {
    store.set(THEME_KEY, mode.as_str());
}
