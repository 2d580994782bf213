#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic item placement over a generated maze topology.
//!
//! The assembler overlays a topology with the floor's collectibles:
//! pickups along the solution path, bonus pickups pushed as far apart as
//! the grid allows, an optional visibility toggle item, and breakable
//! shortcut walls. All counts scale with the maze area relative to the
//! smallest preset, and every random choice flows through the injected
//! random source.

use maze_haunt_core::{BoundsError, CellCoord, Direction, GridSize, TileKind};
use maze_haunt_system_maze_generation::MazeTopology;
use rand::seq::SliceRandom;
use rand::Rng;

/// Area of the smallest difficulty preset; density baselines refer to it.
const BASELINE_AREA: f64 = 21.0 * 15.0;

/// Minimum number of bonus pickups per floor.
const MIN_BONUS_PICKUPS: u32 = 4;

/// Minimum number of breakable walls per floor.
const MIN_BREAKABLE_WALLS: u32 = 5;

/// Mutable item overlay derived from an immutable topology.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemGrid {
    size: GridSize,
    cells: Vec<TileKind>,
}

impl ItemGrid {
    /// Copies the topology's tiles into a fresh mutable overlay.
    #[must_use]
    pub fn from_topology(topology: &MazeTopology) -> Self {
        Self {
            size: topology.size(),
            cells: topology.cells().to_vec(),
        }
    }

    /// Dimensions of the overlay grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Tile stored at the provided cell.
    pub fn tile_at(&self, cell: CellCoord) -> Result<TileKind, BoundsError> {
        self.index(cell)
            .map(|index| self.cells[index])
            .ok_or(BoundsError {
                cell,
                width: self.size.width(),
                height: self.size.height(),
            })
    }

    /// Consumes a pickup at the cell, returning the pre-mutation tile.
    ///
    /// Only `Pickup` and `BonusPickup` are cleared to `Open`; every other
    /// kind (including out-of-bounds queries, reported as `Open`) is left
    /// untouched, so a second call on the same cell is a no-op.
    pub fn consume(&mut self, cell: CellCoord) -> TileKind {
        let Some(index) = self.index(cell) else {
            return TileKind::Open;
        };
        let original = self.cells[index];
        if matches!(original, TileKind::Pickup | TileKind::BonusPickup) {
            self.cells[index] = TileKind::Open;
        }
        original
    }

    /// Permanently converts a breakable wall into open passage.
    pub fn break_wall(&mut self, cell: CellCoord) {
        let Some(index) = self.index(cell) else {
            return;
        };
        if self.cells[index] == TileKind::BreakableBlocked {
            self.cells[index] = TileKind::Open;
        }
    }

    /// Dense row-major tiles of the overlay.
    #[must_use]
    pub fn cells(&self) -> &[TileKind] {
        &self.cells
    }

    /// Number of cells currently holding the provided tile kind.
    #[must_use]
    pub fn count_of(&self, kind: TileKind) -> usize {
        self.cells.iter().filter(|&&tile| tile == kind).count()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.size.contains(cell) {
            return None;
        }
        Some((cell.row() * self.size.width() + cell.column()) as usize)
    }

    fn set(&mut self, cell: CellCoord, tile: TileKind) {
        if let Some(index) = self.index(cell) {
            self.cells[index] = tile;
        }
    }
}

/// Builds the complete item overlay for a floor.
///
/// The solution path must be the solver's untrimmed entry-to-exit path;
/// the endpoints are dropped here because they already carry their own
/// tile kinds.
pub fn assemble<R: Rng>(
    topology: &MazeTopology,
    solution: &[CellCoord],
    place_toggle: bool,
    rng: &mut R,
) -> ItemGrid {
    let mut items = ItemGrid::from_topology(topology);
    let trimmed = trim_endpoints(solution);
    place_pickups(&mut items, trimmed);

    let scale = area_scale(topology.size());
    let bonus_count = scaled_count(rng.gen_range(4..6), scale, MIN_BONUS_PICKUPS);
    place_bonus_pickups(&mut items, topology, bonus_count);

    if place_toggle {
        place_toggle_item(&mut items, topology, rng);
    }

    let breakable_count = scaled_count(5, scale, MIN_BREAKABLE_WALLS);
    place_breakable_walls(&mut items, topology, rng, breakable_count);

    items
}

/// Ratio of the maze area to the baseline preset area.
#[must_use]
pub fn area_scale(size: GridSize) -> f64 {
    size.area() as f64 / BASELINE_AREA
}

fn scaled_count(base: u32, scale: f64, minimum: u32) -> u32 {
    ((f64::from(base) * scale) as u32).max(minimum)
}

fn trim_endpoints(solution: &[CellCoord]) -> &[CellCoord] {
    if solution.len() <= 2 {
        return &[];
    }
    &solution[1..solution.len() - 1]
}

/// Marks every open cell along the trimmed solution path as a pickup.
pub fn place_pickups(items: &mut ItemGrid, trimmed_solution: &[CellCoord]) {
    for &cell in trimmed_solution {
        if items.tile_at(cell) == Ok(TileKind::Open) {
            items.set(cell, TileKind::Pickup);
        }
    }
}

/// Places up to `requested` bonus pickups by farthest-point greedy choice.
///
/// The first pickup maximizes Manhattan distance to the maze center; each
/// subsequent pickup maximizes its minimum distance to the ones already
/// chosen. The count clamps to the candidate count when the floor is too
/// dense to host the request.
pub fn place_bonus_pickups(items: &mut ItemGrid, topology: &MazeTopology, requested: u32) {
    let mut candidates = open_cells_outside_den(items, topology);
    if requested == 0 || candidates.is_empty() {
        return;
    }
    let requested = (requested as usize).min(candidates.len());

    let center = topology.size().center();
    let mut chosen: Vec<CellCoord> = Vec::with_capacity(requested);

    let first = candidates
        .iter()
        .enumerate()
        .max_by_key(|(_, cell)| cell.manhattan_distance(center))
        .map(|(index, _)| index);
    if let Some(index) = first {
        chosen.push(candidates.swap_remove(index));
    }

    while chosen.len() < requested && !candidates.is_empty() {
        let best = candidates
            .iter()
            .enumerate()
            .max_by_key(|(_, cell)| {
                chosen
                    .iter()
                    .map(|pickup| cell.manhattan_distance(*pickup))
                    .min()
                    .unwrap_or(u32::MAX)
            })
            .map(|(index, _)| index);
        match best {
            Some(index) => chosen.push(candidates.swap_remove(index)),
            None => break,
        }
    }

    for cell in chosen {
        items.set(cell, TileKind::BonusPickup);
    }
}

/// Places the single visibility toggle item at a uniform random open cell.
pub fn place_toggle_item<R: Rng>(items: &mut ItemGrid, topology: &MazeTopology, rng: &mut R) {
    let candidates = open_cells_outside_den(items, topology);
    if let Some(&cell) = candidates.as_slice().choose(rng) {
        items.set(cell, TileKind::ToggleItem);
    }
}

/// Converts up to `requested` interior walls into breakable shortcuts.
///
/// A wall qualifies only when it has open corridor on both sides along one
/// axis, so breaking it always yields a straight-through passage.
pub fn place_breakable_walls<R: Rng>(
    items: &mut ItemGrid,
    topology: &MazeTopology,
    rng: &mut R,
    requested: u32,
) {
    let mut candidates: Vec<CellCoord> = Vec::new();
    let size = items.size();
    for row in 1..size.height() - 1 {
        for column in 1..size.width() - 1 {
            let cell = CellCoord::new(column, row);
            if items.tile_at(cell) != Ok(TileKind::Blocked) || topology.is_inside_den(cell) {
                continue;
            }
            if is_straight_through(items, cell) {
                candidates.push(cell);
            }
        }
    }

    candidates.shuffle(rng);
    for cell in candidates.into_iter().take(requested as usize) {
        items.set(cell, TileKind::BreakableBlocked);
    }
}

fn is_straight_through(items: &ItemGrid, cell: CellCoord) -> bool {
    let open = |direction: Direction| {
        matches!(
            items.tile_at(cell.step(direction)),
            Ok(kind) if kind.is_passable()
        )
    };
    (open(Direction::East) && open(Direction::West))
        || (open(Direction::North) && open(Direction::South))
}

fn open_cells_outside_den(items: &ItemGrid, topology: &MazeTopology) -> Vec<CellCoord> {
    let size = items.size();
    let mut cells = Vec::new();
    for row in 0..size.height() {
        for column in 0..size.width() {
            let cell = CellCoord::new(column, row);
            if items.tile_at(cell) == Ok(TileKind::Open) && !topology.is_inside_den(cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_haunt_system_maze_generation::GeneratorConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn topology(seed: u64) -> MazeTopology {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        MazeTopology::generate(
            GeneratorConfig::new(GridSize::new(21, 15), GridSize::new(5, 3), 0.5),
            &mut rng,
        )
        .expect("generation succeeds")
    }

    #[test]
    fn pickups_cover_the_trimmed_solution_path() {
        let topology = topology(42);
        let solution = topology.solve().expect("path exists");
        let mut items = ItemGrid::from_topology(&topology);
        place_pickups(&mut items, &solution[1..solution.len() - 1]);

        for &cell in &solution[1..solution.len() - 1] {
            let tile = items.tile_at(cell).expect("in bounds");
            assert!(
                matches!(tile, TileKind::Pickup | TileKind::Entry | TileKind::Exit),
                "expected pickup at {cell:?}, found {tile:?}"
            );
        }
        assert_eq!(items.tile_at(topology.entry()), Ok(TileKind::Entry));
        assert_eq!(items.tile_at(topology.exit()), Ok(TileKind::Exit));
    }

    #[test]
    fn bonus_pickups_stay_outside_the_den_and_respect_the_request() {
        let topology = topology(42);
        let mut items = ItemGrid::from_topology(&topology);
        place_bonus_pickups(&mut items, &topology, 4);

        let mut placed = Vec::new();
        for row in 0..items.size().height() {
            for column in 0..items.size().width() {
                let cell = CellCoord::new(column, row);
                if items.tile_at(cell) == Ok(TileKind::BonusPickup) {
                    placed.push(cell);
                }
            }
        }
        assert_eq!(placed.len(), 4);
        for cell in &placed {
            assert!(!topology.is_inside_den(*cell));
        }
    }

    #[test]
    fn first_bonus_pickup_is_farthest_from_the_center() {
        let topology = topology(9);
        let mut items = ItemGrid::from_topology(&topology);
        let candidates = open_cells_outside_den(&items, &topology);
        let center = topology.size().center();
        let best = candidates
            .iter()
            .map(|cell| cell.manhattan_distance(center))
            .max()
            .expect("candidates exist");

        place_bonus_pickups(&mut items, &topology, 1);
        let placed: Vec<CellCoord> = candidates
            .into_iter()
            .filter(|&cell| items.tile_at(cell) == Ok(TileKind::BonusPickup))
            .collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].manhattan_distance(center), best);
    }

    fn min_pairwise_distance(cells: &[CellCoord]) -> u32 {
        let mut shortest = u32::MAX;
        for (index, &cell) in cells.iter().enumerate() {
            for &other in &cells[index + 1..] {
                shortest = shortest.min(cell.manhattan_distance(other));
            }
        }
        shortest
    }

    #[test]
    fn bonus_separation_on_a_small_maze_is_near_the_best_achievable() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let topology = MazeTopology::generate(
            GeneratorConfig::new(GridSize::new(9, 9), GridSize::new(3, 3), 0.5),
            &mut rng,
        )
        .expect("generation succeeds");
        let mut items = ItemGrid::from_topology(&topology);
        let candidates = open_cells_outside_den(&items, &topology);
        assert!(candidates.len() >= 4);

        place_bonus_pickups(&mut items, &topology, 4);
        let placed: Vec<CellCoord> = candidates
            .iter()
            .copied()
            .filter(|&cell| items.tile_at(cell) == Ok(TileKind::BonusPickup))
            .collect();
        assert_eq!(placed.len(), 4);
        for cell in &placed {
            assert!(!topology.is_inside_den(*cell));
        }

        let placed_min = min_pairwise_distance(&placed);
        assert!(placed_min > 0);

        // Exhaustive dispersion optimum over every 4-subset of candidates.
        let mut best = 0;
        for i in 0..candidates.len() {
            for j in i + 1..candidates.len() {
                for k in j + 1..candidates.len() {
                    for l in k + 1..candidates.len() {
                        let subset =
                            [candidates[i], candidates[j], candidates[k], candidates[l]];
                        best = best.max(min_pairwise_distance(&subset));
                    }
                }
            }
        }

        // Farthest-point picking guarantees a minimum separation within a
        // factor of two of the optimum: with three cells already chosen,
        // any 4-subset with pairwise separation above twice the next
        // pick's score would pigeonhole two of its cells onto one chosen
        // cell and contradict its own separation.
        assert!(
            placed_min * 2 >= best,
            "separation {placed_min} vs optimum {best}"
        );
    }

    #[test]
    fn bonus_request_clamps_to_the_candidate_count() {
        let topology = topology(4);
        let mut items = ItemGrid::from_topology(&topology);
        let available = open_cells_outside_den(&items, &topology).len();
        place_bonus_pickups(&mut items, &topology, u32::MAX);
        assert_eq!(items.count_of(TileKind::BonusPickup), available);
    }

    #[test]
    fn breakable_walls_always_open_a_straight_passage() {
        let topology = topology(42);
        let mut items = ItemGrid::from_topology(&topology);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        place_breakable_walls(&mut items, &topology, &mut rng, 5);

        let mut found = 0;
        for row in 0..items.size().height() {
            for column in 0..items.size().width() {
                let cell = CellCoord::new(column, row);
                if items.tile_at(cell) == Ok(TileKind::BreakableBlocked) {
                    found += 1;
                    assert!(is_straight_through(&items, cell), "wall at {cell:?}");
                    assert!(!topology.is_inside_den(cell));
                }
            }
        }
        assert!(found > 0 && found <= 5);
    }

    #[test]
    fn consume_clears_pickups_exactly_once() {
        let topology = topology(42);
        let solution = topology.solve().expect("path exists");
        let mut items = ItemGrid::from_topology(&topology);
        place_pickups(&mut items, &solution[1..solution.len() - 1]);

        let cell = solution[1];
        assert_eq!(items.consume(cell), TileKind::Pickup);
        assert_eq!(items.consume(cell), TileKind::Open);
        assert_eq!(items.tile_at(cell), Ok(TileKind::Open));
    }

    #[test]
    fn consume_ignores_walls_and_connection_points() {
        let topology = topology(42);
        let mut items = ItemGrid::from_topology(&topology);
        assert_eq!(items.consume(CellCoord::new(0, 0)), TileKind::Blocked);
        assert_eq!(items.tile_at(CellCoord::new(0, 0)), Ok(TileKind::Blocked));
        assert_eq!(items.consume(topology.entry()), TileKind::Entry);
        assert_eq!(items.tile_at(topology.entry()), Ok(TileKind::Entry));
    }

    #[test]
    fn break_wall_only_affects_breakable_tiles() {
        let topology = topology(42);
        let mut items = ItemGrid::from_topology(&topology);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        place_breakable_walls(&mut items, &topology, &mut rng, 5);

        items.break_wall(CellCoord::new(0, 0));
        assert_eq!(items.tile_at(CellCoord::new(0, 0)), Ok(TileKind::Blocked));

        let breakable = (0..items.size().height())
            .flat_map(|row| (0..items.size().width()).map(move |column| CellCoord::new(column, row)))
            .find(|&cell| items.tile_at(cell) == Ok(TileKind::BreakableBlocked))
            .expect("a breakable wall exists");
        items.break_wall(breakable);
        assert_eq!(items.tile_at(breakable), Ok(TileKind::Open));
        items.break_wall(breakable);
        assert_eq!(items.tile_at(breakable), Ok(TileKind::Open));
    }

    #[test]
    fn assemble_scales_counts_with_area() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let large = MazeTopology::generate(
            GeneratorConfig::new(GridSize::new(41, 25), GridSize::new(5, 3), 0.2),
            &mut rng,
        )
        .expect("generation succeeds");
        let solution = large.solve().expect("path exists");
        let items = assemble(&large, &solution, true, &mut rng);

        // 41*25 is more than triple the baseline area.
        assert!(items.count_of(TileKind::BonusPickup) >= 12);
        assert!(items.count_of(TileKind::BreakableBlocked) >= 15);
        assert_eq!(items.count_of(TileKind::ToggleItem), 1);
    }
}
