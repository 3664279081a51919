use crate::game::{Level, LevelDefinition, LevelError};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

/// Levels shipped with the server, used when no levels file is available
pub static BUILTIN_LEVELS: Lazy<Vec<LevelDefinition>> = Lazy::new(|| {
    vec![LevelDefinition {
        name: "Make It So".to_string(),
        letters: "TEACHER".to_string(),
        words: [
            "TEA", "EAT", "ARE", "RAT", "RATE", "REACT", "TEAR", "HEART", "CHEAT", "REACH",
            "HER", "HAT", "CAT", "CAR", "ART", "ERA", "EACH", "HATE", "HEAT", "CARE", "CREATE",
            "TEACHER",
        ]
        .iter()
        .map(|w| w.to_string())
        .collect(),
    }]
});

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read levels file: {0}")]
    Io(#[from] std::io::Error),

    #[error("levels file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error("no levels defined")]
    Empty,
}

/// Public view of a level; never includes the answers
#[derive(Debug, Clone, Serialize)]
pub struct LevelSummary {
    pub index: usize,
    pub name: String,
    pub letter_count: usize,
    pub word_count: usize,
}

/// Ordered, non-empty list of playable levels
#[derive(Debug)]
pub struct LevelCatalog {
    levels: Vec<Arc<Level>>,
}

impl LevelCatalog {
    /// Load levels from a JSON file holding an array of level definitions
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).await?;
        let catalog = Self::from_json(&content)?;

        tracing::info!("Loaded {} levels into catalog", catalog.len());

        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<LevelDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    pub fn from_definitions(definitions: Vec<LevelDefinition>) -> Result<Self, CatalogError> {
        let levels = definitions
            .into_iter()
            .map(|def| Level::try_from(def).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { levels })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_definitions(BUILTIN_LEVELS.clone())
    }

    pub fn get(&self, index: usize) -> Option<Arc<Level>> {
        self.levels.get(index).cloned()
    }

    /// First level; a catalog is never empty
    pub fn first(&self) -> Arc<Level> {
        self.levels[0].clone()
    }

    /// Get the number of levels in the catalog
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn summaries(&self) -> Vec<LevelSummary> {
        self.levels
            .iter()
            .enumerate()
            .map(|(index, level)| LevelSummary {
                index,
                name: level.name().to_string(),
                letter_count: level.tile_count(),
                word_count: level.word_count(),
            })
            .collect()
    }
}
