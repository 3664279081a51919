use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("level `{0}` has no letters")]
    NoLetters(String),

    #[error("level `{level}` has a non-letter tile `{letter}`")]
    InvalidLetter { level: String, letter: char },

    #[error("level `{0}` has no words")]
    NoWords(String),

    #[error("level `{0}` contains an empty word")]
    EmptyWord(String),

    #[error("word `{word}` cannot be spelled from the letters of level `{level}`")]
    Unspellable { level: String, word: String },
}

/// Level as written in a levels file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    /// Ring letters in ring order, e.g. "TEACHER"
    pub letters: String,
    pub words: Vec<String>,
}

/// A fixed ring of letters and the words that can be found on it.
///
/// Letters and words are stored uppercase. A level never changes once built.
#[derive(Debug, Clone)]
pub struct Level {
    name: String,
    letters: Vec<char>,
    valid_words: HashSet<String>,
}

impl Level {
    pub fn new<I, S>(name: impl Into<String>, letters: &str, words: I) -> Result<Self, LevelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();

        let mut tiles = Vec::new();
        for letter in letters.chars().filter(|c| !c.is_whitespace()) {
            if !letter.is_ascii_alphabetic() {
                return Err(LevelError::InvalidLetter {
                    level: name,
                    letter,
                });
            }
            tiles.push(letter.to_ascii_uppercase());
        }
        if tiles.is_empty() {
            return Err(LevelError::NoLetters(name));
        }

        let available = letter_counts(tiles.iter().copied());
        let mut valid_words = HashSet::new();
        for word in words {
            let word = word.as_ref().trim().to_uppercase();
            if word.is_empty() {
                return Err(LevelError::EmptyWord(name));
            }
            // Every tile may be used once per gesture
            let needed = letter_counts(word.chars());
            let spellable = needed
                .iter()
                .all(|(c, n)| available.get(c).is_some_and(|have| have >= n));
            if !spellable {
                return Err(LevelError::Unspellable { level: name, word });
            }
            valid_words.insert(word);
        }
        if valid_words.is_empty() {
            return Err(LevelError::NoWords(name));
        }

        Ok(Self {
            name,
            letters: tiles,
            valid_words,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    pub fn letter(&self, tile: usize) -> Option<char> {
        self.letters.get(tile).copied()
    }

    /// Number of tiles on the ring
    pub fn tile_count(&self) -> usize {
        self.letters.len()
    }

    pub fn word_count(&self) -> usize {
        self.valid_words.len()
    }

    /// Case-insensitive dictionary lookup
    pub fn contains_word(&self, word: &str) -> bool {
        self.valid_words.contains(&word.to_uppercase())
    }

    /// Spell out the word traced by `path`. Unknown tiles are skipped.
    pub fn spell(&self, path: &[usize]) -> String {
        path.iter().filter_map(|&tile| self.letter(tile)).collect()
    }
}

impl TryFrom<LevelDefinition> for Level {
    type Error = LevelError;

    fn try_from(def: LevelDefinition) -> Result<Self, Self::Error> {
        Level::new(def.name, &def.letters, &def.words)
    }
}

fn letter_counts(letters: impl Iterator<Item = char>) -> HashMap<char, usize> {
    let mut counts = HashMap::new();
    for c in letters {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
}
