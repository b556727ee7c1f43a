//! Nutrition table and display-name translations

use crate::error::VisionError;
use nutrilens_core::Per100g;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const EMBEDDED_NUTRITION: &str = include_str!("../data/food_kbzu_embedded.json");
const EMBEDDED_TRANSLATIONS: &str = include_str!("../data/ru_names.json");

/// Reserved key every table carries.
pub const UNKNOWN_KEY: &str = "unknown";

/// Used when a source table has no `unknown` entry.
pub const UNKNOWN_PER_100G: Per100g = Per100g::new(150.0, 10.0, 7.0, 15.0);

/// Lowercase, with every whitespace run collapsed to `_`.
///
/// Applied to table keys at load and to class names at lookup, so
/// `"Bell pepper"` and `"bell pepper"` meet at `bell_pepper`.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// `normalized name -> per-100 g values`
#[derive(Debug, Clone)]
pub struct NutritionTable {
    entries: HashMap<String, Per100g>,
}

impl NutritionTable {
    /// Parse a JSON object of `name -> {calories, protein, fat, carbs}`.
    pub fn from_json(source: &str) -> Result<Self, VisionError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(source)
            .map_err(|e| VisionError::Table(format!("Invalid nutrition table: {}", e)))?;

        let mut entries = HashMap::with_capacity(raw.len() + 1);
        for (name, value) in raw {
            let per100g: Per100g = serde_json::from_value(value).map_err(|e| {
                VisionError::Table(format!("Invalid nutrition entry '{}': {}", name, e))
            })?;
            if !per100g.is_valid() {
                return Err(VisionError::Table(format!(
                    "Nutrition entry '{}' has negative or non-finite values",
                    name
                )));
            }
            let key = normalize_key(&name);
            if entries.insert(key.clone(), per100g).is_some() {
                return Err(VisionError::Table(format!("Duplicate nutrition key: {}", key)));
            }
        }

        entries
            .entry(UNKNOWN_KEY.to_string())
            .or_insert(UNKNOWN_PER_100G);

        Ok(Self { entries })
    }

    /// The compiled-in fallback table.
    pub fn embedded() -> Result<Self, VisionError> {
        Self::from_json(EMBEDDED_NUTRITION)
    }

    /// Read the full table from `path`; any failure degrades to the
    /// embedded table.
    pub fn load(path: Option<&Path>) -> Result<Self, VisionError> {
        if let Some(path) = path {
            match std::fs::read_to_string(path)
                .map_err(VisionError::from)
                .and_then(|s| Self::from_json(&s))
            {
                Ok(table) => {
                    info!("Loaded {} nutrition entries from {:?}", table.len(), path);
                    return Ok(table);
                }
                Err(e) => warn!("Nutrition table {:?} unusable ({}), using embedded table", path, e),
            }
        }

        let table = Self::embedded()?;
        debug!("Using embedded nutrition table ({} entries)", table.len());
        Ok(table)
    }

    /// Exact lookup by already-normalized key.
    pub fn get(&self, key: &str) -> Option<&Per100g> {
        self.entries.get(key)
    }

    /// Lookup by display name, falling back to the `unknown` entry.
    pub fn lookup(&self, name: &str) -> (String, Per100g) {
        let key = normalize_key(name);
        match self.entries.get(&key) {
            Some(per100g) => (key, *per100g),
            None => (key, self.unknown()),
        }
    }

    pub fn unknown(&self) -> Per100g {
        self.entries
            .get(UNKNOWN_KEY)
            .copied()
            .unwrap_or(UNKNOWN_PER_100G)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `normalized name -> Russian display name`
#[derive(Debug, Clone)]
pub struct NameTranslations {
    names: HashMap<String, String>,
}

impl NameTranslations {
    pub fn from_json(source: &str) -> Result<Self, VisionError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(source)
            .map_err(|e| VisionError::Table(format!("Invalid translation table: {}", e)))?;

        let mut names = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let localized = value.as_str().ok_or_else(|| {
                VisionError::Table(format!("Translation for '{}' is not a string", name))
            })?;
            let key = normalize_key(&name);
            if names.insert(key.clone(), localized.to_string()).is_some() {
                return Err(VisionError::Table(format!("Duplicate translation key: {}", key)));
            }
        }

        Ok(Self { names })
    }

    pub fn builtin() -> Result<Self, VisionError> {
        Self::from_json(EMBEDDED_TRANSLATIONS)
    }

    /// Localized name, or `fallback` when the key is unmapped.
    pub fn localize(&self, key: &str, fallback: &str) -> String {
        self.names
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
