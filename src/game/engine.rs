use crate::game::{layout::Point, level::Level};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

/// Where the engine is in a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    /// No gesture, empty path
    Idle,
    /// Pointer is down, tiles are being collected
    Dragging,
    /// Released and classified; the path is kept on screen until settled
    Settling,
}

/// Classification of a released gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "word", rename_all = "snake_case")]
pub enum Verdict {
    Accepted(String),
    Rejected(String),
}

impl Verdict {
    pub fn word(&self) -> &str {
        match self {
            Verdict::Accepted(word) | Verdict::Rejected(word) => word,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

/// Identifies the deferred clear of one released gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettleTicket(u64);

/// What `end_gesture` hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub verdict: Verdict,
    /// Pass to [`PathSelectionEngine::settle`] once feedback has been shown
    pub ticket: SettleTicket,
}

/// Everything a render surface needs to draw the puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: InteractionState,
    pub path: Vec<usize>,
    pub word: String,
    pub pointer: Option<Point>,
    pub found_words: Vec<String>,
    pub found: usize,
    pub total: usize,
    pub verdict: Option<Verdict>,
    pub solved: bool,
}

/// Turns tile-level gesture events into word discoveries for one level.
///
/// Gestures go Idle -> Dragging -> Settling -> Idle. Classification happens
/// on release; the path stays visible while Settling so the caller can show
/// accept/reject feedback, and is cleared by [`settle`](Self::settle).
#[derive(Debug, Clone)]
pub struct PathSelectionEngine {
    level: Arc<Level>,
    path: Vec<usize>,
    found: HashSet<String>,
    state: InteractionState,
    pointer: Option<Point>,
    last_verdict: Option<Verdict>,
    pending: Option<SettleTicket>,
    next_ticket: u64,
}

impl PathSelectionEngine {
    pub fn new(level: Arc<Level>) -> Self {
        Self::with_ticket_base(level, 0)
    }

    /// Engine whose settle tickets start at `next_ticket`, so tickets handed
    /// out by an engine it replaces can never match one of its own
    pub fn with_ticket_base(level: Arc<Level>, next_ticket: u64) -> Self {
        Self {
            level,
            path: Vec::new(),
            found: HashSet::new(),
            state: InteractionState::Idle,
            pointer: None,
            last_verdict: None,
            pending: None,
            next_ticket,
        }
    }

    /// First ticket a replacement engine should hand out
    pub fn next_ticket_base(&self) -> u64 {
        self.next_ticket
    }

    pub fn level(&self) -> &Arc<Level> {
        &self.level
    }

    /// Start a gesture on `tile`. Returns false when ignored.
    pub fn begin_gesture(&mut self, tile: usize) -> bool {
        if self.state != InteractionState::Idle {
            tracing::debug!(
                "Ignoring gesture start on tile {} while {:?}",
                tile,
                self.state
            );
            return false;
        }
        if !self.in_range(tile) {
            return false;
        }

        self.state = InteractionState::Dragging;
        self.path.clear();
        self.path.push(tile);
        true
    }

    /// Add `tile` to the active gesture. Returns true if the path grew.
    pub fn extend_gesture(&mut self, tile: usize) -> bool {
        if self.state != InteractionState::Dragging || !self.in_range(tile) {
            return false;
        }
        // Retracing over a selected tile leaves the path alone
        if self.path.contains(&tile) {
            return false;
        }

        self.path.push(tile);
        true
    }

    /// Record the free pointer position for the live connecting line
    pub fn update_pointer_position(&mut self, point: Point) {
        self.pointer = Some(point);
    }

    /// Release the gesture and classify the traced word.
    ///
    /// Returns `None` when no gesture is active. An already found word is
    /// rejected since it makes no new progress.
    pub fn end_gesture(&mut self) -> Option<Release> {
        if self.state != InteractionState::Dragging {
            return None;
        }

        let word = self.candidate_word();
        let verdict = if self.level.contains_word(&word) && !self.found.contains(&word) {
            self.found.insert(word.clone());
            tracing::debug!(
                "Accepted `{}` ({}/{})",
                word,
                self.found.len(),
                self.level.word_count()
            );
            Verdict::Accepted(word)
        } else {
            tracing::debug!("Rejected `{}`", word);
            Verdict::Rejected(word)
        };

        let ticket = SettleTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(ticket);
        self.state = InteractionState::Settling;
        self.last_verdict = Some(verdict.clone());

        Some(Release { verdict, ticket })
    }

    /// Clear the released attempt. Returns true if `ticket` was the pending
    /// one; stale or repeated tickets do nothing.
    pub fn settle(&mut self, ticket: SettleTicket) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.clear_attempt();
        true
    }

    /// Forget all progress on this level
    pub fn reset_level(&mut self) {
        self.found.clear();
        self.clear_attempt();
    }

    pub fn is_solved(&self) -> bool {
        self.found.len() == self.level.word_count()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn candidate_word(&self) -> String {
        self.level.spell(&self.path)
    }

    pub fn found_words(&self) -> &HashSet<String> {
        &self.found
    }

    /// Found words ordered for display: shortest first, then alphabetical
    pub fn found_words_sorted(&self) -> Vec<String> {
        let mut words: Vec<String> = self.found_words().iter().cloned().collect();
        words.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        words
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    /// Pointer position to draw the trailing line to, only while dragging
    pub fn live_pointer(&self) -> Option<Point> {
        match self.state {
            InteractionState::Dragging => self.pointer,
            _ => None,
        }
    }

    /// (found, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.found.len(), self.level.word_count())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let (found, total) = self.progress();
        EngineSnapshot {
            state: self.state,
            path: self.path.clone(),
            word: self.candidate_word(),
            pointer: self.live_pointer(),
            found_words: self.found_words_sorted(),
            found,
            total,
            verdict: self.last_verdict().cloned(),
            solved: self.is_solved(),
        }
    }

    fn clear_attempt(&mut self) {
        self.path.clear();
        self.pointer = None;
        self.last_verdict = None;
        self.pending = None;
        self.state = InteractionState::Idle;
    }

    fn in_range(&self, tile: usize) -> bool {
        if tile < self.level.tile_count() {
            return true;
        }
        tracing::debug!(
            "Ignoring tile {} outside ring of {}",
            tile,
            self.level.tile_count()
        );
        false
    }
}
