//! Detector label set and the food allow-list

use crate::error::VisionError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Open Images V7 class names, one per line, in class-id order.
const EMBEDDED_CLASS_NAMES: &str = include_str!("../data/oiv7_classes.txt");

/// Class ids treated as food or drink.
pub const FOOD_CLASS_IDS: &[usize] = &[
    10, 16, 17, 21, 37, 39, 60, 65, 67, 72, 76, 78, 86, 89, 92, 105, 108, 117, 119, 120, 132,
    140, 143, 146, 151, 154, 166, 171, 178, 186, 192, 199, 204, 207, 210, 213, 226, 227, 229,
    233, 256, 273, 287, 306, 323, 333, 344, 347, 356, 365, 372, 373, 374, 375, 389, 391, 400,
    404, 407, 409, 414, 430, 433, 445, 459, 468, 496, 501, 507, 518, 521, 523, 540, 566, 571,
    579, 589, 600,
];

/// Immutable `class id -> canonical English name` table.
#[derive(Debug, Clone)]
pub struct ClassTable {
    names: Vec<String>,
}

impl ClassTable {
    /// Build from newline-separated names and check it has exactly
    /// `expected` unique, non-empty entries.
    pub fn parse(source: &str, expected: usize) -> Result<Self, VisionError> {
        let names: Vec<String> = source
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if names.len() != expected {
            return Err(VisionError::Table(format!(
                "Class table has {} entries, expected {}",
                names.len(),
                expected
            )));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.to_lowercase()) {
                return Err(VisionError::Table(format!("Duplicate class name: {}", name)));
            }
        }

        Ok(Self { names })
    }

    /// The compiled-in label set.
    pub fn embedded(expected: usize) -> Result<Self, VisionError> {
        Self::parse(EMBEDDED_CLASS_NAMES, expected)
    }

    /// Read from `override_path` when given, else use the embedded list.
    pub fn load(override_path: Option<&Path>, expected: usize) -> Result<Self, VisionError> {
        match override_path {
            Some(path) => {
                let source = std::fs::read_to_string(path)?;
                let table = Self::parse(&source, expected)?;
                info!("Loaded {} class names from {:?}", table.len(), path);
                Ok(table)
            }
            None => {
                let table = Self::embedded(expected)?;
                debug!("Using embedded class table ({} names)", table.len());
                Ok(table)
            }
        }
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(id, n)| (id, n.as_str()))
    }
}

/// Set of class ids that survive post-processing.
#[derive(Debug, Clone)]
pub struct FoodAllowList {
    ids: HashSet<usize>,
}

impl FoodAllowList {
    /// The built-in list, checked against the class table size.
    pub fn builtin(class_count: usize) -> Result<Self, VisionError> {
        Self::from_ids(FOOD_CLASS_IDS.iter().copied(), class_count)
    }

    pub fn from_ids(
        ids: impl IntoIterator<Item = usize>,
        class_count: usize,
    ) -> Result<Self, VisionError> {
        let ids: HashSet<usize> = ids.into_iter().collect();
        if let Some(bad) = ids.iter().find(|id| **id >= class_count) {
            return Err(VisionError::Table(format!(
                "Allow-list id {} outside class table of {}",
                bad, class_count
            )));
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, class_id: usize) -> bool {
        self.ids.contains(&class_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
