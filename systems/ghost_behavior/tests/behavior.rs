//! Full-floor simulation of the agent pack on a generated maze.

use std::time::Duration;

use maze_haunt_core::{AgentState, CellCoord, Direction, GridSize};
use maze_haunt_system_floor_assembly::{assemble, ItemGrid};
use maze_haunt_system_ghost_behavior::{
    advance_agents, place_agents, Agent, BehaviorSchedule, FleeWindow, PhaseController,
    PlayerView,
};
use maze_haunt_system_maze_generation::{GeneratorConfig, MazeTopology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const TICK: Duration = Duration::from_millis(500);

fn floor(seed: u64) -> (MazeTopology, ItemGrid) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let topology = MazeTopology::generate(
        GeneratorConfig::new(GridSize::new(21, 15), GridSize::new(5, 3), 0.5),
        &mut rng,
    )
    .expect("generation succeeds");
    let solution = topology.solve().expect("path exists");
    let items = assemble(&topology, &solution, false, &mut rng);
    (topology, items)
}

fn spawn_pack(
    topology: &MazeTopology,
    rng: &mut ChaCha8Rng,
) -> ([Agent; 4], PhaseController, FleeWindow, PlayerView) {
    let agents = place_agents(
        topology.size(),
        topology.den_rect(),
        topology.den_exit_approach(),
        Duration::ZERO,
        rng,
    );
    let controller = PhaseController::new(BehaviorSchedule::default(), Duration::ZERO);
    let flee = FleeWindow::default();
    let player = PlayerView {
        position: topology.entry(),
        facing: Direction::North,
    };
    (agents, controller, flee, player)
}

fn is_passable(items: &ItemGrid, cell: CellCoord) -> bool {
    items.tile_at(cell).is_ok_and(|tile| tile.is_passable())
}

#[test]
fn pack_releases_and_stays_on_passable_cells() {
    let (topology, items) = floor(42);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let (mut agents, mut controller, flee, player) = spawn_pack(&topology, &mut rng);
    let blocked = |cell: CellCoord| !is_passable(&items, cell);

    for step in 0..120_u32 {
        advance_agents(
            &mut agents,
            &blocked,
            &mut controller,
            &flee,
            player,
            TICK * step,
            &mut rng,
        );
        for agent in &agents {
            assert!(
                is_passable(&items, agent.position()),
                "{:?} stands on a wall at {:?}",
                agent.archetype(),
                agent.position()
            );
        }
    }

    for agent in &agents {
        assert!(
            matches!(agent.state(), AgentState::Patrol | AgentState::Pursuit),
            "{:?} never left the den: {:?}",
            agent.archetype(),
            agent.state()
        );
    }
}

#[test]
fn waiting_agents_hold_their_spawn_cells() {
    let (topology, items) = floor(9);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let (mut agents, mut controller, flee, player) = spawn_pack(&topology, &mut rng);
    let blocked = |cell: CellCoord| !is_passable(&items, cell);

    let spawns: Vec<CellCoord> = agents.iter().map(Agent::position).collect();
    advance_agents(
        &mut agents,
        &blocked,
        &mut controller,
        &flee,
        player,
        Duration::ZERO,
        &mut rng,
    );

    // Only the first release deadline has passed; the rest must wait.
    for (agent, spawn) in agents.iter().zip(&spawns).skip(1) {
        assert_eq!(agent.position(), *spawn);
        assert_eq!(agent.state(), AgentState::Releasing);
    }
}

#[test]
fn flee_window_flips_the_released_pack_and_expires() {
    let (topology, items) = floor(42);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let (mut agents, mut controller, mut flee, player) = spawn_pack(&topology, &mut rng);
    let blocked = |cell: CellCoord| !is_passable(&items, cell);

    let mut now = Duration::ZERO;
    for step in 0..120_u32 {
        now = TICK * step;
        advance_agents(
            &mut agents, &blocked, &mut controller, &flee, player, now, &mut rng,
        );
    }

    flee.arm(now, &mut agents);
    for agent in &agents {
        assert_eq!(agent.state(), AgentState::Flee);
    }

    for step in 1..=5_u32 {
        let during = now + TICK * step;
        assert!(flee.is_active(during));
        advance_agents(
            &mut agents, &blocked, &mut controller, &flee, player, during, &mut rng,
        );
        for agent in &agents {
            assert_eq!(agent.state(), AgentState::Flee);
            assert!(is_passable(&items, agent.position()));
        }
    }

    let after = now + Duration::from_secs(11);
    assert!(!flee.is_active(after));
    assert!(flee.expire_if_due(after, &mut agents));
    for agent in &agents {
        assert_eq!(agent.state(), AgentState::Pursuit);
    }
}
