use crate::{
    game::{
        engine::{PathSelectionEngine, Release, SettleTicket},
        layout::{Point, RingLayout, TileLocator},
        level::Level,
    },
    levels::LevelCatalog,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("level {index} does not exist ({available} available)")]
    UnknownLevel { index: usize, available: usize },
}

/// Raw pointer input from the render surface, in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    /// Pointer left the surface; ends the gesture like a release
    Leave,
}

/// What a pointer event did to the puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    Ignored,
    PathChanged,
    PointerMoved,
    Released(Release),
}

/// Builds the tile locator for a level's ring
pub type LocatorFactory = Box<dyn Fn(&Level) -> Box<dyn TileLocator> + Send + Sync>;

/// One player's word circle: the current level, its selection engine and
/// the geometry used to hit-test pointer input.
pub struct PuzzleSession {
    catalog: Arc<LevelCatalog>,
    level_index: usize,
    engine: PathSelectionEngine,
    locator: Box<dyn TileLocator>,
    locator_factory: LocatorFactory,
}

impl PuzzleSession {
    /// Start on the first level with the default ring geometry
    pub fn new(catalog: Arc<LevelCatalog>) -> Self {
        Self::with_locator(
            catalog,
            Box::new(|level: &Level| {
                Box::new(RingLayout::with_defaults(level.tile_count())) as Box<dyn TileLocator>
            }),
        )
    }

    pub fn with_locator(catalog: Arc<LevelCatalog>, locator_factory: LocatorFactory) -> Self {
        let level = catalog.first();
        let locator = locator_factory(&*level);
        Self {
            catalog,
            level_index: 0,
            engine: PathSelectionEngine::new(level),
            locator,
            locator_factory,
        }
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level(&self) -> &Level {
        self.engine.level()
    }

    pub fn engine(&self) -> &PathSelectionEngine {
        &self.engine
    }

    /// Tile centres in ring order
    pub fn tile_centers(&self) -> Vec<Point> {
        (0..self.level().tile_count())
            .filter_map(|tile| self.locator.tile_center(tile))
            .collect()
    }

    /// Polyline for the connecting line as it should be drawn now
    pub fn connector_points(&self) -> Vec<Point> {
        self.locator
            .connector_points(self.engine.path(), self.engine.live_pointer())
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        match event {
            PointerEvent::Down(point) => {
                self.engine.update_pointer_position(point);
                match self.locator.tile_at(point) {
                    Some(tile) => self.press_tile(tile),
                    None => PointerOutcome::Ignored,
                }
            }
            PointerEvent::Move(point) => {
                self.engine.update_pointer_position(point);
                match self.locator.tile_at(point) {
                    Some(tile) if self.engine.extend_gesture(tile) => PointerOutcome::PathChanged,
                    _ => PointerOutcome::PointerMoved,
                }
            }
            PointerEvent::Up | PointerEvent::Leave => self.release(),
        }
    }

    /// Press on a tile the render surface already resolved
    pub fn press_tile(&mut self, tile: usize) -> PointerOutcome {
        if self.engine.begin_gesture(tile) {
            PointerOutcome::PathChanged
        } else {
            PointerOutcome::Ignored
        }
    }

    /// Pointer entered a tile the render surface already resolved
    pub fn enter_tile(&mut self, tile: usize) -> PointerOutcome {
        if self.engine.extend_gesture(tile) {
            PointerOutcome::PathChanged
        } else {
            PointerOutcome::Ignored
        }
    }

    pub fn release(&mut self) -> PointerOutcome {
        match self.engine.end_gesture() {
            Some(release) => PointerOutcome::Released(release),
            None => PointerOutcome::Ignored,
        }
    }

    pub fn settle(&mut self, ticket: SettleTicket) -> bool {
        self.engine.settle(ticket)
    }

    pub fn reset(&mut self) {
        self.engine.reset_level();
    }

    /// Switch to another level, starting it from scratch
    pub fn select_level(&mut self, index: usize) -> Result<(), SessionError> {
        let level = self
            .catalog
            .get(index)
            .ok_or(SessionError::UnknownLevel {
                index,
                available: self.catalog.len(),
            })?;

        tracing::debug!("Switching to level {} ({})", index, level.name());
        self.locator = (self.locator_factory)(&*level);
        // Clears still pending from the old level must not match new tickets
        self.engine = PathSelectionEngine::with_ticket_base(level, self.engine.next_ticket_base());
        self.level_index = index;
        Ok(())
    }
}
