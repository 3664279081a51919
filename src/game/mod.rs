// Word circle puzzle: levels, ring geometry, the gesture engine and the
// per-player session that ties them together.

pub mod engine;
pub mod layout;
pub mod level;
pub mod session;

pub use engine::{EngineSnapshot, SettleTicket, Verdict};
pub use layout::Point;
pub use level::{Level, LevelDefinition, LevelError};
pub use session::{PointerEvent, PointerOutcome, PuzzleSession};
