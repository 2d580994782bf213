#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Haunt engine.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the pure generation and behavior systems, and the excluded UI layer:
//! grid coordinates, tile kinds, agent identities and states, difficulty
//! presets, and the two error kinds the engine distinguishes. Everything
//! here is a plain value; mutable state lives in the world crate and the
//! systems consume these types through explicit parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed: chase targets may lie outside the grid (offset
/// and mirrored targets are legal aiming points) and basement floors use
/// negative indices, so the whole engine shares one sign convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Returns the neighboring cell one step in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        self.step_by(direction, 1)
    }

    /// Returns the cell `count` steps away in the provided direction.
    #[must_use]
    pub const fn step_by(self, direction: Direction, count: i32) -> Self {
        match direction {
            Direction::North => Self::new(self.column, self.row - count),
            Direction::East => Self::new(self.column + count, self.row),
            Direction::South => Self::new(self.column, self.row + count),
            Direction::West => Self::new(self.column - count, self.row),
        }
    }

    /// Extends the vector from `self` to `pivot` by the same length again.
    ///
    /// Used by flanking targeting: the result is `self + 2 * (pivot - self)`.
    #[must_use]
    pub const fn doubled_through(self, pivot: CellCoord) -> Self {
        Self::new(
            self.column + 2 * (pivot.column - self.column),
            self.row + 2 * (pivot.row - self.row),
        )
    }
}

/// Cardinal movement directions available to the player and agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All cardinal directions in a fixed evaluation order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Returns the direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

/// Kind of tile occupying a single floor grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Impassable wall.
    Blocked,
    /// Wall that can be permanently broken into open passage.
    BreakableBlocked,
    /// Open corridor with nothing on it.
    Open,
    /// The floor's single entry connection point.
    Entry,
    /// The floor's single exit connection point.
    Exit,
    /// Collectible marker placed along the solution path.
    Pickup,
    /// Rare collectible granting the flee window when consumed.
    BonusPickup,
    /// Rare item toggling full visibility for the floor.
    ToggleItem,
}

impl TileKind {
    /// Reports whether a dweller may occupy a cell of this kind.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, TileKind::Blocked | TileKind::BreakableBlocked)
    }
}

/// Width and height of a rectangular cell region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: i32,
    height: i32,
}

impl GridSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Width of the region in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height of the region in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Total number of cells covered by the region.
    #[must_use]
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Reports whether the provided cell lies within the region anchored
    /// at the origin.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() >= 0
            && cell.column() < self.width
            && cell.row() >= 0
            && cell.row() < self.height
    }

    /// Center cell of the region (rounded down on even dimensions).
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        CellCoord::new(self.width / 2, self.height / 2)
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: GridSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: GridSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Reports whether the rectangle contains the provided cell.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() >= self.origin.column()
            && cell.column() < self.origin.column() + self.size.width()
            && cell.row() >= self.origin.row()
            && cell.row() < self.origin.row() + self.size.height()
    }

    /// Returns the rectangle shrunk by one cell on every side.
    #[must_use]
    pub const fn inset(&self) -> Self {
        Self {
            origin: CellCoord::new(self.origin.column() + 1, self.origin.row() + 1),
            size: GridSize::new(self.size.width() - 2, self.size.height() - 2),
        }
    }
}

/// Depth index of a floor; zero is ground level, negative is basement.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct FloorIndex(i32);

impl FloorIndex {
    /// Creates a new floor index.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric depth value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Index of the floor directly above this one.
    #[must_use]
    pub const fn above(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Index of the floor directly below this one.
    #[must_use]
    pub const fn below(&self) -> Self {
        Self(self.0 - 1)
    }

    /// Reports whether the floor lies below ground level.
    #[must_use]
    pub const fn is_basement(&self) -> bool {
        self.0 < 0
    }
}

/// Seed pinned to a floor index so regeneration reproduces the same maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloorSeed(u64);

impl FloorSeed {
    /// Creates a new floor seed with the provided value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric seed value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identity of one of the four fixed pursuit agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentArchetype {
    /// Chases the player's current cell directly; the pack leader.
    Stalker,
    /// Aims four cells ahead of the player's facing.
    Ambusher,
    /// Mirrors the leader's position through a point ahead of the player.
    Flanker,
    /// Chases from afar but retreats to its anchor when close.
    Skulker,
}

impl AgentArchetype {
    /// All archetypes in release order.
    pub const ALL: [AgentArchetype; 4] = [
        AgentArchetype::Stalker,
        AgentArchetype::Ambusher,
        AgentArchetype::Flanker,
        AgentArchetype::Skulker,
    ];

    /// Position of the archetype within the release order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            AgentArchetype::Stalker => 0,
            AgentArchetype::Ambusher => 1,
            AgentArchetype::Flanker => 2,
            AgentArchetype::Skulker => 3,
        }
    }
}

/// Behavioral state of a pursuit agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting in the den for the release delay, then heading to the door.
    Releasing,
    /// Non-aggressive phase; the agent drifts toward its scatter anchor.
    Patrol,
    /// Aggressive phase; the agent hunts per its archetype heuristic.
    Pursuit,
    /// Vulnerable random-walk state during an active flee window.
    Flee,
    /// Captured while fleeing; returning to its home cell.
    Captured,
}

/// Difficulty preset fixing maze dimensions, lives, and corridor texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Small maze, generous lives, straight corridors, full lighting.
    Easy,
    /// Medium maze with curlier corridors and doubled pickup value.
    Tricky,
    /// Large maze, few lives, winding corridors, dynamic lighting.
    Haunted,
}

impl Difficulty {
    /// Maze dimensions used by this preset.
    #[must_use]
    pub const fn maze_size(self) -> GridSize {
        match self {
            Difficulty::Easy => GridSize::new(21, 15),
            Difficulty::Tricky => GridSize::new(31, 21),
            Difficulty::Haunted => GridSize::new(41, 25),
        }
    }

    /// Den footprint (including its wall ring) shared by every preset.
    #[must_use]
    pub const fn den_size(self) -> GridSize {
        GridSize::new(5, 3)
    }

    /// Lives granted to the player at the start of a session.
    #[must_use]
    pub const fn starting_lives(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Tricky => 4,
            Difficulty::Haunted => 3,
        }
    }

    /// Points awarded for consuming a path pickup.
    #[must_use]
    pub const fn pickup_value(self) -> u32 {
        match self {
            Difficulty::Tricky => 20,
            _ => 10,
        }
    }

    /// Reports whether floors of this preset place a visibility toggle item.
    #[must_use]
    pub const fn uses_dynamic_lighting(self) -> bool {
        matches!(self, Difficulty::Haunted)
    }

    /// Corridor straightness bias for the given floor depth.
    ///
    /// The bias is the probability that the carver keeps its direction;
    /// deeper floors ramp toward the next preset's baseline so corridors
    /// grow curlier with depth.
    #[must_use]
    pub fn straightness_bias(self, floor: FloorIndex) -> f64 {
        let depth = f64::from(floor.get().abs());
        let (base, step, min) = match self {
            Difficulty::Easy => (0.6, 0.02, 0.5),
            Difficulty::Tricky => (0.5, 0.05, 0.2),
            Difficulty::Haunted => (0.2, 0.02, 0.1),
        };
        (base - depth * step).max(min)
    }
}

/// Lighting policy for presets with dynamic visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NightMode {
    /// Above-ground floors are always fully lit.
    Never,
    /// Every floor is pinned to the minimum visibility radius.
    Always,
    /// Visibility scales with the real ambient light intensity.
    Solar,
}

/// Points awarded for consuming a bonus pickup.
pub const BONUS_PICKUP_VALUE: u32 = 50;

/// Duration of the flee window armed by a bonus pickup.
pub const FLEE_WINDOW: Duration = Duration::from_secs(10);

/// Fatal configuration error raised when maze generation cannot succeed.
///
/// Generation is deterministic for a given seed, so these failures recur
/// identically on retry; the parameters must change instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The requested dimensions cannot host a carved maze around the den.
    #[error("maze dimensions {width}x{height} cannot host a {den_width}x{den_height} den")]
    InvalidDimensions {
        /// Requested maze width.
        width: i32,
        /// Requested maze height.
        height: i32,
        /// Requested den width.
        den_width: i32,
        /// Requested den height.
        den_height: i32,
    },
    /// No path connects the entry to the exit in the carved topology.
    #[error("no path from entry {entry:?} to exit {exit:?}")]
    Unsolvable {
        /// Entry connection point of the failed topology.
        entry: CellCoord,
        /// Exit connection point of the failed topology.
        exit: CellCoord,
    },
}

/// Recoverable error raised by coordinate queries outside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("cell {cell:?} lies outside the {width}x{height} grid")]
pub struct BoundsError {
    /// Cell that was queried.
    pub cell: CellCoord,
    /// Width of the queried grid.
    pub width: i32,
    /// Height of the queried grid.
    pub height: i32,
}
