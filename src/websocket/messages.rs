use crate::game::{EngineSnapshot, Point};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    PointerDown {
        x: f32,
        y: f32,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp,
    PointerLeave,
    /// For surfaces that do their own hit testing
    PressTile {
        tile: usize,
    },
    EnterTile {
        tile: usize,
    },
    Release,
    Reset,
    /// Ask for the full puzzle state, e.g. after reconnecting
    Sync,
    SelectLevel {
        index: usize,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    LevelLoaded {
        index: usize,
        name: String,
        letters: Vec<char>,
        total_words: usize,
        tiles: Vec<Point>,
    },
    PathUpdate {
        path: Vec<usize>,
        word: String,
        pointer: Option<Point>,
    },
    WordAccepted {
        word: String,
        found: usize,
        total: usize,
    },
    WordRejected {
        word: String,
    },
    AttemptCleared,
    State {
        level_index: usize,
        snapshot: EngineSnapshot,
    },
    Progress {
        found_words: Vec<String>,
        found: usize,
        total: usize,
    },
    LevelSolved {
        name: String,
    },
    Error {
        message: String,
    },
}
