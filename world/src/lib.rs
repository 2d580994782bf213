#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mutable state of a haunt session.
//!
//! The world owns what changes while playing: the floors and their item
//! overlays, the cache that keeps visited floors alive across stair
//! traversals, the player, and the score. The generation and behavior
//! systems stay pure; the world feeds them views and applies their
//! results.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use maze_haunt_core::{
    BoundsError, CellCoord, Difficulty, Direction, FloorIndex, FloorSeed, GenerationError,
    NightMode, TileKind,
};
use maze_haunt_system_ambient_light::scaled_radius;
use maze_haunt_system_floor_assembly::{assemble, ItemGrid};
use maze_haunt_system_maze_generation::{GeneratorConfig, MazeTopology};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Smallest visibility radius a floor ever shows.
pub const MIN_VISIBILITY_RADIUS: i32 = 4;

/// Agent step interval on the ground floor, in milliseconds.
const BASE_STEP_INTERVAL_MILLIS: u64 = 500;

/// Step interval reduction per floor of depth, in milliseconds.
const STEP_INTERVAL_DEPTH_MILLIS: u64 = 10;

/// Fastest agent step interval any floor reaches, in milliseconds.
const MIN_STEP_INTERVAL_MILLIS: u64 = 400;

/// Capture bonus for the first capture of a flee window.
const CAPTURE_BASE_BONUS: u32 = 200;

/// Number of doublings after which the capture bonus stops growing.
const CAPTURE_STREAK_CAP: u32 = 3;

/// Derives an independent sub-seed from a floor seed and a stream label.
fn derive_stream_seed(seed: FloorSeed, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.get().to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// One fully assembled floor: immutable topology plus mutable item overlay.
#[derive(Clone, Debug)]
pub struct Floor {
    index: FloorIndex,
    seed: FloorSeed,
    topology: MazeTopology,
    items: ItemGrid,
    step_interval: Duration,
}

impl Floor {
    /// Depth index of the floor.
    #[must_use]
    pub const fn index(&self) -> FloorIndex {
        self.index
    }

    /// Seed the floor was generated from.
    #[must_use]
    pub const fn seed(&self) -> FloorSeed {
        self.seed
    }

    /// Immutable carved topology of the floor.
    #[must_use]
    pub const fn topology(&self) -> &MazeTopology {
        &self.topology
    }

    /// Entry connection point of the floor.
    #[must_use]
    pub const fn entry(&self) -> CellCoord {
        self.topology.entry()
    }

    /// Exit connection point of the floor.
    #[must_use]
    pub const fn exit(&self) -> CellCoord {
        self.topology.exit()
    }

    /// Tile currently stored at the cell, items included.
    pub fn item_at(&self, cell: CellCoord) -> Result<TileKind, BoundsError> {
        self.items.tile_at(cell)
    }

    /// Consumes a pickup at the cell, returning the pre-mutation tile.
    pub fn consume_item(&mut self, cell: CellCoord) -> TileKind {
        self.items.consume(cell)
    }

    /// Permanently breaks a breakable wall at the cell.
    pub fn break_wall(&mut self, cell: CellCoord) {
        self.items.break_wall(cell);
    }

    /// Reports whether a dweller may occupy the cell.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.items.tile_at(cell).is_ok_and(|tile| tile.is_passable())
    }

    /// Time between agent steps on this floor.
    ///
    /// Deeper floors tick faster, clamped at the minimum interval.
    #[must_use]
    pub const fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Visibility radius covering the whole floor, the grid diagonal.
    #[must_use]
    pub fn max_visibility_radius(&self) -> i32 {
        let size = self.topology.size();
        let squared = size.width() * size.width() + size.height() * size.height();
        f64::from(squared).sqrt() as i32
    }

    /// Random stream reserved for placing this floor's agents.
    ///
    /// Derived from the floor seed so a regenerated floor respawns its
    /// pack identically.
    #[must_use]
    pub fn agent_stream(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(derive_stream_seed(self.seed, "agents"))
    }
}

fn step_interval_for(index: FloorIndex) -> Duration {
    let depth = u64::from(index.get().unsigned_abs());
    let millis = BASE_STEP_INTERVAL_MILLIS
        .saturating_sub(STEP_INTERVAL_DEPTH_MILLIS * depth)
        .max(MIN_STEP_INTERVAL_MILLIS);
    Duration::from_millis(millis)
}

/// Generates a complete floor from its pinned seed.
///
/// The maze and item placements draw from independent sub-streams of the
/// floor seed, so the same seed reproduces the same floor cell for cell
/// regardless of how much randomness either stage consumes.
pub fn generate_floor(
    index: FloorIndex,
    seed: FloorSeed,
    entry: Option<CellCoord>,
    exit: Option<CellCoord>,
    difficulty: Difficulty,
) -> Result<Floor, GenerationError> {
    let mut config = GeneratorConfig::new(
        difficulty.maze_size(),
        difficulty.den_size(),
        difficulty.straightness_bias(index),
    );
    if let Some(entry) = entry {
        config = config.with_entry(entry);
    }
    if let Some(exit) = exit {
        config = config.with_exit(exit);
    }

    let mut maze_rng = ChaCha8Rng::seed_from_u64(derive_stream_seed(seed, "maze"));
    let topology = MazeTopology::generate(config, &mut maze_rng)?;
    let solution = topology.solve().ok_or(GenerationError::Unsolvable {
        entry: topology.entry(),
        exit: topology.exit(),
    })?;

    let mut item_rng = ChaCha8Rng::seed_from_u64(derive_stream_seed(seed, "items"));
    let items = assemble(
        &topology,
        &solution,
        difficulty.uses_dynamic_lighting(),
        &mut item_rng,
    );
    debug!(
        "floor {}: {} pickups, {} bonus, {} breakable",
        index.get(),
        items.count_of(TileKind::Pickup),
        items.count_of(TileKind::BonusPickup),
        items.count_of(TileKind::BreakableBlocked),
    );

    Ok(Floor {
        index,
        seed,
        topology,
        items,
        step_interval: step_interval_for(index),
    })
}

/// Reports whether a cached floor still fits the requested connections.
///
/// A pinned connection point must match the cached floor exactly; an
/// unpinned one accepts whatever the floor has.
#[must_use]
pub fn is_compatible(floor: &Floor, entry: Option<CellCoord>, exit: Option<CellCoord>) -> bool {
    entry.map_or(true, |cell| floor.entry() == cell)
        && exit.map_or(true, |cell| floor.exit() == cell)
}

/// Keeps visited floors alive across stair traversals.
///
/// Seeds are pinned per index on first use: a floor evicted for an
/// incompatible connection point regenerates from the same seed, so its
/// maze layout survives even though the connections moved.
#[derive(Debug, Default)]
pub struct FloorCache {
    floors: HashMap<FloorIndex, Floor>,
    seeds: HashMap<FloorIndex, FloorSeed>,
}

impl FloorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the floor at `index`, generating or regenerating on demand.
    ///
    /// A cached floor is reused when its connection points satisfy the
    /// request; otherwise the floor is rebuilt from its pinned seed with
    /// the requested points and replaces the cached entry.
    pub fn fetch<R: Rng>(
        &mut self,
        index: FloorIndex,
        entry: Option<CellCoord>,
        exit: Option<CellCoord>,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<&Floor, GenerationError> {
        let reusable = self
            .floors
            .get(&index)
            .is_some_and(|floor| is_compatible(floor, entry, exit));

        if reusable {
            debug!("reusing cached floor {}", index.get());
        } else {
            let seed = *self
                .seeds
                .entry(index)
                .or_insert_with(|| FloorSeed::new(rng.gen()));
            info!("generating floor {} from seed {:#x}", index.get(), seed.get());
            let floor = generate_floor(index, seed, entry, exit, difficulty)?;
            let _ = self.floors.insert(index, floor);
        }

        Ok(&self.floors[&index])
    }

    /// Floor at `index`, if one has been generated.
    #[must_use]
    pub fn get(&self, index: FloorIndex) -> Option<&Floor> {
        self.floors.get(&index)
    }

    /// Mutable floor at `index`, for consuming items and breaking walls.
    pub fn get_mut(&mut self, index: FloorIndex) -> Option<&mut Floor> {
        self.floors.get_mut(&index)
    }

    /// Number of floors currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    /// Reports whether no floor has been generated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}

/// Visibility radius for a floor under the session's lighting policy.
///
/// Presets without dynamic lighting always see the whole floor. Basements
/// never receive daylight, so every dynamic mode pins them to the
/// minimum radius.
#[must_use]
pub fn visibility_radius(
    difficulty: Difficulty,
    night_mode: NightMode,
    floor: &Floor,
    intensity: f64,
) -> i32 {
    if !difficulty.uses_dynamic_lighting() {
        return floor.max_visibility_radius();
    }
    let max = floor.max_visibility_radius();
    if floor.index().is_basement() {
        return MIN_VISIBILITY_RADIUS;
    }
    match night_mode {
        NightMode::Never => max,
        NightMode::Always => MIN_VISIBILITY_RADIUS,
        NightMode::Solar => {
            scaled_radius(intensity, f64::from(MIN_VISIBILITY_RADIUS), f64::from(max)).round()
                as i32
        }
    }
}

/// The player dweller.
#[derive(Clone, Copy, Debug)]
pub struct Player {
    position: CellCoord,
    facing: Direction,
    lives: u32,
    home: CellCoord,
}

impl Player {
    /// Spawns the player at its home cell with the preset's lives.
    #[must_use]
    pub const fn new(home: CellCoord, facing: Direction, lives: u32) -> Self {
        Self {
            position: home,
            facing,
            lives,
            home,
        }
    }

    /// Cell the player occupies.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Direction the player faces.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Remaining lives.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Cell the player respawns to after losing a life.
    #[must_use]
    pub const fn home(&self) -> CellCoord {
        self.home
    }

    /// Attempts one step; the player turns even when the way is blocked.
    ///
    /// Returns whether the player actually moved.
    pub fn step(&mut self, direction: Direction, floor: &Floor) -> bool {
        self.facing = direction;
        let destination = self.position.step(direction);
        if floor.is_passable(destination) {
            self.position = destination;
            return true;
        }
        false
    }

    /// Removes one life, saturating at zero.
    pub fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    /// Returns the player to its home cell without touching lives or score.
    pub fn respawn(&mut self) {
        self.position = self.home;
    }

    /// Moves the player's home, used when changing floors.
    pub fn rehome(&mut self, home: CellCoord) {
        self.home = home;
        self.position = home;
    }

    /// Reports whether no lives remain.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.lives == 0
    }
}

/// Running score with the flee-window capture streak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Score {
    total: u32,
    capture_streak: u32,
}

impl Score {
    /// Adds flat points, for pickups and bonus pickups.
    pub fn add(&mut self, points: u32) {
        self.total += points;
    }

    /// Awards the next capture bonus and advances the streak.
    ///
    /// The bonus doubles per consecutive capture within one flee window
    /// and stops growing after the streak cap.
    pub fn capture_bonus(&mut self) -> u32 {
        let bonus = CAPTURE_BASE_BONUS << self.capture_streak;
        if self.capture_streak < CAPTURE_STREAK_CAP {
            self.capture_streak += 1;
        }
        self.total += bonus;
        bonus
    }

    /// Resets the capture streak when a flee window ends.
    pub fn end_flee_window(&mut self) {
        self.capture_streak = 0;
    }

    /// Accumulated points.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Captures scored in the current flee window, capped.
    #[must_use]
    pub const fn capture_streak(&self) -> u32 {
        self.capture_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_haunt_core::GridSize;

    fn floor(index: i32, seed: u64) -> Floor {
        generate_floor(
            FloorIndex::new(index),
            FloorSeed::new(seed),
            None,
            None,
            Difficulty::Easy,
        )
        .expect("generation succeeds")
    }

    #[test]
    fn step_interval_shortens_with_depth_and_clamps() {
        assert_eq!(floor(0, 1).step_interval(), Duration::from_millis(500));
        assert_eq!(floor(5, 1).step_interval(), Duration::from_millis(450));
        assert_eq!(floor(-5, 1).step_interval(), Duration::from_millis(450));
        assert_eq!(floor(-50, 1).step_interval(), Duration::from_millis(400));
    }

    #[test]
    fn same_seed_reproduces_the_same_floor() {
        let first = floor(0, 42);
        let second = floor(0, 42);
        assert_eq!(first.topology().cells(), second.topology().cells());
        assert_eq!(first.entry(), second.entry());
        assert_eq!(first.exit(), second.exit());
    }

    #[test]
    fn max_visibility_radius_is_the_grid_diagonal() {
        let floor = floor(0, 3);
        assert_eq!(floor.topology().size(), GridSize::new(21, 15));
        // sqrt(21^2 + 15^2) = sqrt(666), truncated.
        assert_eq!(floor.max_visibility_radius(), 25);
    }

    #[test]
    fn consume_item_clears_pickups_exactly_once() {
        let mut floor = floor(0, 42);
        let solution = floor.topology().solve().expect("path exists");
        let cell = solution[1];
        assert_eq!(floor.item_at(cell), Ok(TileKind::Pickup));
        assert_eq!(floor.consume_item(cell), TileKind::Pickup);
        assert_eq!(floor.consume_item(cell), TileKind::Open);
    }

    #[test]
    fn visibility_pins_and_scales_per_mode() {
        let surface = floor(0, 9);
        let max = surface.max_visibility_radius();

        // Presets without dynamic lighting ignore the night mode entirely.
        assert_eq!(
            visibility_radius(Difficulty::Easy, NightMode::Always, &surface, 0.0),
            max
        );

        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Never, &surface, 0.0),
            max
        );
        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Always, &surface, 1.0),
            MIN_VISIBILITY_RADIUS
        );
        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Solar, &surface, 0.0),
            MIN_VISIBILITY_RADIUS
        );
        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Solar, &surface, 1.0),
            max
        );
        let half = visibility_radius(Difficulty::Haunted, NightMode::Solar, &surface, 0.5);
        assert!(half > MIN_VISIBILITY_RADIUS && half < max);

        let basement = floor(-1, 9);
        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Never, &basement, 1.0),
            MIN_VISIBILITY_RADIUS
        );
        assert_eq!(
            visibility_radius(Difficulty::Haunted, NightMode::Solar, &basement, 1.0),
            MIN_VISIBILITY_RADIUS
        );
    }

    #[test]
    fn player_turns_even_when_blocked_and_respawns_home() {
        let floor = floor(0, 42);
        let mut player = Player::new(floor.entry(), Direction::North, 5);

        let mut moved_any = false;
        for direction in Direction::ALL {
            let before = player.position();
            if player.step(direction, &floor) {
                moved_any = true;
                assert_eq!(player.position(), before.step(direction));
                assert!(floor.is_passable(player.position()));
            } else {
                assert_eq!(player.position(), before);
            }
            assert_eq!(player.facing(), direction);
        }
        // The entry always has at least one open neighbor.
        assert!(moved_any);

        player.lose_life();
        player.respawn();
        assert_eq!(player.position(), floor.entry());
        assert_eq!(player.lives(), 4);
        assert!(!player.is_dead());
    }

    #[test]
    fn capture_bonus_doubles_then_caps_and_resets() {
        let mut score = Score::default();
        assert_eq!(score.capture_bonus(), 200);
        assert_eq!(score.capture_bonus(), 400);
        assert_eq!(score.capture_bonus(), 800);
        assert_eq!(score.capture_bonus(), 1600);
        assert_eq!(score.capture_bonus(), 1600);
        assert_eq!(score.total(), 200 + 400 + 800 + 1600 + 1600);

        score.end_flee_window();
        assert_eq!(score.capture_streak(), 0);
        assert_eq!(score.capture_bonus(), 200);
    }

    #[test]
    fn cache_reuses_compatible_floors_and_repins_seeds() {
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let mut cache = FloorCache::new();
        let index = FloorIndex::new(0);

        let first_cells = cache
            .fetch(index, None, None, Difficulty::Easy, &mut rng)
            .expect("generation succeeds")
            .topology()
            .cells()
            .to_vec();
        assert_eq!(cache.len(), 1);

        // Unpinned request: the cached floor satisfies it unchanged.
        let second_cells = cache
            .fetch(index, None, None, Difficulty::Easy, &mut rng)
            .expect("generation succeeds")
            .topology()
            .cells()
            .to_vec();
        assert_eq!(first_cells, second_cells);

        // Pinning a different entry forces regeneration from the same seed.
        let pinned = CellCoord::new(3, 13);
        let rebuilt = cache
            .fetch(index, Some(pinned), None, Difficulty::Easy, &mut rng)
            .expect("generation succeeds");
        assert_eq!(rebuilt.entry(), pinned);
        let rebuilt_seed = rebuilt.seed();

        // The rebuilt floor is now the cached one and keeps its seed.
        let again = cache
            .fetch(index, Some(pinned), None, Difficulty::Easy, &mut rng)
            .expect("generation succeeds");
        assert_eq!(again.seed(), rebuilt_seed);
        assert_eq!(again.entry(), pinned);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn compatibility_only_checks_pinned_points() {
        let floor = floor(0, 5);
        assert!(is_compatible(&floor, None, None));
        assert!(is_compatible(&floor, Some(floor.entry()), None));
        assert!(is_compatible(&floor, Some(floor.entry()), Some(floor.exit())));
        assert!(!is_compatible(&floor, Some(CellCoord::new(-1, -1)), None));
        assert!(!is_compatible(&floor, None, Some(CellCoord::new(-1, -1))));
    }
}
