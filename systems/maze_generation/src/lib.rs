#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic maze topology generation with a solvability guarantee.
//!
//! The generator carves a perfect maze over the odd lattice of the grid
//! using a growing-tree walk, keeps a centered den room intact, opens a
//! single door in the den's top wall, and designates one entry and one
//! exit connection point. Everything is a pure function of the injected
//! random source, so the same seed reproduces the same topology cell for
//! cell.

use std::collections::VecDeque;

use maze_haunt_core::{
    BoundsError, CellCoord, CellRect, Direction, GenerationError, GridSize, TileKind,
};
use rand::Rng;

/// Parameters accepted by [`MazeTopology::generate`].
#[derive(Clone, Copy, Debug)]
pub struct GeneratorConfig {
    size: GridSize,
    den: GridSize,
    entry: Option<CellCoord>,
    exit: Option<CellCoord>,
    straightness_bias: f64,
}

impl GeneratorConfig {
    /// Creates a configuration for the provided maze and den dimensions.
    ///
    /// The straightness bias is the probability that the carver keeps its
    /// previous direction when it can; values are clamped to [0, 1].
    #[must_use]
    pub fn new(size: GridSize, den: GridSize, straightness_bias: f64) -> Self {
        Self {
            size,
            den,
            entry: None,
            exit: None,
            straightness_bias: straightness_bias.clamp(0.0, 1.0),
        }
    }

    /// Pins the entry connection point so the floor below reconnects.
    #[must_use]
    pub fn with_entry(mut self, entry: CellCoord) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Pins the exit connection point so the floor above reconnects.
    #[must_use]
    pub fn with_exit(mut self, exit: CellCoord) -> Self {
        self.exit = Some(exit);
        self
    }
}

/// Connected grid of passable and blocked cells with one entry and one exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeTopology {
    size: GridSize,
    den: CellRect,
    entry: CellCoord,
    exit: CellCoord,
    cells: Vec<TileKind>,
}

impl MazeTopology {
    /// Generates a solvable topology, or fails with a configuration error.
    ///
    /// Generation is deterministic for a given random stream, so a retry
    /// with the same parameters fails identically; callers must change
    /// the dimensions or den size instead.
    pub fn generate<R: Rng>(
        config: GeneratorConfig,
        rng: &mut R,
    ) -> Result<Self, GenerationError> {
        let size = config.size;
        let den = config.den;
        validate_dimensions(size, den)?;

        let den_rect = centered_rect(size, den);
        let mut cells = vec![TileKind::Blocked; cell_count(size)];

        carve_lattice(&mut cells, size, den_rect, config.straightness_bias, rng);
        carve_den(&mut cells, size, den_rect);

        let entry = match config.entry {
            Some(pinned) => pinned,
            None => pick_boundary_cell(&cells, size, size.height() - 2, rng),
        };
        let exit = match config.exit {
            Some(pinned) => pinned,
            None => pick_boundary_cell(&cells, size, 1, rng),
        };
        open_connection_point(&mut cells, size, entry);
        open_connection_point(&mut cells, size, exit);
        set_tile(&mut cells, size, entry, TileKind::Entry);
        set_tile(&mut cells, size, exit, TileKind::Exit);

        let topology = Self {
            size,
            den: den_rect,
            entry,
            exit,
            cells,
        };

        if topology.solve().is_none() {
            return Err(GenerationError::Unsolvable { entry, exit });
        }

        Ok(topology)
    }

    /// Dimensions of the cell grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Den rectangle, including its wall ring.
    #[must_use]
    pub const fn den_rect(&self) -> CellRect {
        self.den
    }

    /// Entry connection point of the floor.
    #[must_use]
    pub const fn entry(&self) -> CellCoord {
        self.entry
    }

    /// Exit connection point of the floor.
    #[must_use]
    pub const fn exit(&self) -> CellCoord {
        self.exit
    }

    /// Door cell opened in the middle of the den's top wall.
    #[must_use]
    pub const fn den_door(&self) -> CellCoord {
        CellCoord::new(self.size.width() / 2, self.den.origin().row())
    }

    /// Corridor cell directly above the den door.
    ///
    /// Agents leaving the den head here before joining the chase.
    #[must_use]
    pub const fn den_exit_approach(&self) -> CellCoord {
        CellCoord::new(self.size.width() / 2, self.den.origin().row() - 1)
    }

    /// Reports whether the cell lies inside the den rectangle.
    #[must_use]
    pub fn is_inside_den(&self, cell: CellCoord) -> bool {
        self.den.contains(cell)
    }

    /// Tile stored at the provided cell.
    pub fn tile_at(&self, cell: CellCoord) -> Result<TileKind, BoundsError> {
        grid_index(self.size, cell)
            .map(|index| self.cells[index])
            .ok_or(BoundsError {
                cell,
                width: self.size.width(),
                height: self.size.height(),
            })
    }

    /// Dense row-major tile grid.
    #[must_use]
    pub fn cells(&self) -> &[TileKind] {
        &self.cells
    }

    /// Shortest path from entry to exit, endpoints included.
    ///
    /// Breadth-first search over passable cells; `None` means the carved
    /// topology is broken, which [`MazeTopology::generate`] treats as a
    /// fatal configuration error.
    #[must_use]
    pub fn solve(&self) -> Option<Vec<CellCoord>> {
        let start = grid_index(self.size, self.entry)?;
        let goal = grid_index(self.size, self.exit)?;

        let mut parents: Vec<Option<usize>> = vec![None; self.cells.len()];
        let mut visited = vec![false; self.cells.len()];
        let mut queue = VecDeque::new();

        visited[start] = true;
        queue.push_back(self.entry);

        while let Some(cell) = queue.pop_front() {
            let cell_index = grid_index(self.size, cell)?;
            if cell_index == goal {
                return Some(self.backtrace(&parents, goal));
            }

            for direction in Direction::ALL {
                let neighbor = cell.step(direction);
                let Some(neighbor_index) = grid_index(self.size, neighbor) else {
                    continue;
                };
                if visited[neighbor_index] || !self.cells[neighbor_index].is_passable() {
                    continue;
                }
                visited[neighbor_index] = true;
                parents[neighbor_index] = Some(cell_index);
                queue.push_back(neighbor);
            }
        }

        None
    }

    fn backtrace(&self, parents: &[Option<usize>], goal: usize) -> Vec<CellCoord> {
        let width = self.size.width();
        let mut path = Vec::new();
        let mut cursor = Some(goal);
        while let Some(index) = cursor {
            let column = (index as i32) % width;
            let row = (index as i32) / width;
            path.push(CellCoord::new(column, row));
            cursor = parents[index];
        }
        path.reverse();
        path
    }
}

fn validate_dimensions(size: GridSize, den: GridSize) -> Result<(), GenerationError> {
    let invalid = size.width() % 2 == 0
        || size.height() % 2 == 0
        || den.width() < 3
        || den.height() < 3
        || size.width() < den.width() + 6
        || size.height() < den.height() + 6;
    if invalid {
        return Err(GenerationError::InvalidDimensions {
            width: size.width(),
            height: size.height(),
            den_width: den.width(),
            den_height: den.height(),
        });
    }
    Ok(())
}

fn centered_rect(size: GridSize, den: GridSize) -> CellRect {
    let origin = CellCoord::new(
        (size.width() - den.width()) / 2,
        (size.height() - den.height()) / 2,
    );
    CellRect::from_origin_and_size(origin, den)
}

fn cell_count(size: GridSize) -> usize {
    size.area().unsigned_abs() as usize
}

fn grid_index(size: GridSize, cell: CellCoord) -> Option<usize> {
    if !size.contains(cell) {
        return None;
    }
    Some((cell.row() * size.width() + cell.column()) as usize)
}

fn set_tile(cells: &mut [TileKind], size: GridSize, cell: CellCoord, tile: TileKind) {
    if let Some(index) = grid_index(size, cell) {
        cells[index] = tile;
    }
}

fn tile_of(cells: &[TileKind], size: GridSize, cell: CellCoord) -> Option<TileKind> {
    grid_index(size, cell).map(|index| cells[index])
}

/// Carves corridors over the odd lattice with a growing-tree walk.
///
/// Lattice nodes sit at odd coordinates; carving removes the wall cell
/// between two nodes. Nodes and walls inside the den rectangle are left
/// untouched so the room stays sealed until [`carve_den`] opens its door.
fn carve_lattice<R: Rng>(
    cells: &mut [TileKind],
    size: GridSize,
    den: CellRect,
    bias: f64,
    rng: &mut R,
) {
    let start = first_lattice_node(size, den);
    let Some(start) = start else {
        return;
    };

    let mut visited = vec![false; cells.len()];
    let mut stack: Vec<(CellCoord, Option<Direction>)> = Vec::new();

    if let Some(index) = grid_index(size, start) {
        visited[index] = true;
        cells[index] = TileKind::Open;
    }
    stack.push((start, None));

    while let Some(&(node, came_from)) = stack.last() {
        let mut candidates: Vec<Direction> = Vec::with_capacity(4);
        for direction in Direction::ALL {
            let wall = node.step(direction);
            let next = node.step_by(direction, 2);
            let Some(next_index) = grid_index(size, next) else {
                continue;
            };
            if visited[next_index] || den.contains(next) || den.contains(wall) {
                continue;
            }
            candidates.push(direction);
        }

        if candidates.is_empty() {
            let _ = stack.pop();
            continue;
        }

        let direction = choose_direction(&candidates, came_from, bias, rng);
        let wall = node.step(direction);
        let next = node.step_by(direction, 2);
        set_tile(cells, size, wall, TileKind::Open);
        if let Some(next_index) = grid_index(size, next) {
            visited[next_index] = true;
            cells[next_index] = TileKind::Open;
        }
        stack.push((next, Some(direction)));
    }
}

fn choose_direction<R: Rng>(
    candidates: &[Direction],
    came_from: Option<Direction>,
    bias: f64,
    rng: &mut R,
) -> Direction {
    if let Some(previous) = came_from {
        if candidates.contains(&previous) && rng.gen_bool(bias) {
            return previous;
        }
    }
    candidates[rng.gen_range(0..candidates.len())]
}

fn first_lattice_node(size: GridSize, den: CellRect) -> Option<CellCoord> {
    let mut row = 1;
    while row < size.height() {
        let mut column = 1;
        while column < size.width() {
            let node = CellCoord::new(column, row);
            if !den.contains(node) {
                return Some(node);
            }
            column += 2;
        }
        row += 2;
    }
    None
}

/// Opens the den interior, its door, and the approach corridor above it.
fn carve_den(cells: &mut [TileKind], size: GridSize, den: CellRect) {
    let interior = den.inset();
    for row in interior.origin().row()..interior.origin().row() + interior.size().height() {
        for column in
            interior.origin().column()..interior.origin().column() + interior.size().width()
        {
            set_tile(cells, size, CellCoord::new(column, row), TileKind::Open);
        }
    }

    let door = CellCoord::new(size.width() / 2, den.origin().row());
    let approach = CellCoord::new(size.width() / 2, den.origin().row() - 1);
    set_tile(cells, size, door, TileKind::Open);
    set_tile(cells, size, approach, TileKind::Open);
}

/// Picks a random open cell in the given corridor row.
///
/// Falls back to the row's center cell (carving it open) when the carver
/// left no opening there, which only happens for degenerate dimensions.
fn pick_boundary_cell<R: Rng>(
    cells: &[TileKind],
    size: GridSize,
    row: i32,
    rng: &mut R,
) -> CellCoord {
    let mut open: Vec<CellCoord> = Vec::new();
    for column in 1..size.width() - 1 {
        let cell = CellCoord::new(column, row);
        if tile_of(cells, size, cell) == Some(TileKind::Open) {
            open.push(cell);
        }
    }
    if open.is_empty() {
        return CellCoord::new(size.width() / 2, row);
    }
    open[rng.gen_range(0..open.len())]
}

/// Forces a connection point open and hooks it into the corridor network.
///
/// A pinned point inherited from a neighboring floor may land on a wall
/// cell of this floor's carving; in that case the cell toward the grid
/// center is opened as well so the solver can reach it.
fn open_connection_point(cells: &mut [TileKind], size: GridSize, cell: CellCoord) {
    set_tile(cells, size, cell, TileKind::Open);

    let has_open_neighbor = Direction::ALL.into_iter().any(|direction| {
        matches!(
            tile_of(cells, size, cell.step(direction)),
            Some(kind) if kind.is_passable()
        )
    });
    if has_open_neighbor {
        return;
    }

    let toward_center = if cell.row() < size.height() / 2 {
        Direction::South
    } else {
        Direction::North
    };
    set_tile(cells, size, cell.step(toward_center), TileKind::Open);
}
