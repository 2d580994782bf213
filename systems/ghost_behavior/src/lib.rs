#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pursuit agent behavior: state machine, targeting, and step resolution.
//!
//! Four agents share the floor grid with the player. A phase controller
//! flips the pack between patrol and pursuit on a wall-clock schedule, a
//! flee window turns the pack vulnerable when the player consumes a bonus
//! pickup, and each tick every agent takes at most one deadlock-avoiding
//! step toward an archetype-specific target. The system never touches
//! world state directly: passability arrives as a closure, time as an
//! explicit `now`, randomness as an injected source.

use std::time::Duration;

use maze_haunt_core::{
    AgentArchetype, AgentState, CellCoord, CellRect, Direction, GridSize, FLEE_WINDOW,
};
use rand::Rng;

/// Delay between consecutive agent releases from the den.
pub const RELEASE_STAGGER: Duration = Duration::from_secs(3);

/// Vertical arrival tolerance for the den-exit approach cell.
///
/// The door sits on the maze's center column, which is even, so the
/// carved corridor junction nearest the approach cell can lie one row
/// off the target. An agent on the door column within this many rows of
/// the approach has left the den.
pub const DEN_EXIT_ARRIVAL_TOLERANCE: u32 = 1;

/// Duration of the initial patrol phase in the default schedule.
const DEFAULT_PATROL_PHASE: Duration = Duration::from_secs(5);

/// Distance threshold at which the shy archetype breaks off its chase.
const SKULKER_RETREAT_DISTANCE: u32 = 8;

/// One of the four pursuit agents haunting a floor.
#[derive(Clone, Debug)]
pub struct Agent {
    archetype: AgentArchetype,
    position: CellCoord,
    facing: Direction,
    state: AgentState,
    home: CellCoord,
    scatter_anchor: CellCoord,
    exit_target: CellCoord,
    release_at: Duration,
}

impl Agent {
    /// Identity of the agent.
    #[must_use]
    pub const fn archetype(&self) -> AgentArchetype {
        self.archetype
    }

    /// Cell the agent currently occupies.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Direction of the agent's last step.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Current behavioral state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Spawn cell inside the den the agent returns to when captured.
    #[must_use]
    pub const fn home(&self) -> CellCoord {
        self.home
    }

    /// Corner cell the agent drifts toward during patrol phases.
    #[must_use]
    pub const fn scatter_anchor(&self) -> CellCoord {
        self.scatter_anchor
    }

    /// Overrides the agent's behavioral state.
    pub fn set_state(&mut self, state: AgentState) {
        self.state = state;
    }

    /// Repositions the agent without recreating it.
    pub fn set_position(&mut self, position: CellCoord) {
        self.position = position;
    }
}

/// Ordered list of patrol/pursuit phases consumed by the controller.
#[derive(Clone, Debug)]
pub struct BehaviorSchedule {
    phases: Vec<(AgentState, Duration)>,
}

impl BehaviorSchedule {
    /// Creates a schedule from explicit phases.
    ///
    /// The last phase's duration is ignored once reached; the controller
    /// stays in it forever.
    #[must_use]
    pub fn new(phases: Vec<(AgentState, Duration)>) -> Self {
        debug_assert!(!phases.is_empty(), "schedule requires at least one phase");
        Self { phases }
    }
}

impl Default for BehaviorSchedule {
    /// A short patrol opening settling into permanent pursuit.
    fn default() -> Self {
        Self::new(vec![
            (AgentState::Patrol, DEFAULT_PATROL_PHASE),
            (AgentState::Pursuit, Duration::MAX),
        ])
    }
}

/// Explicit phase-tracking value advancing the shared schedule.
///
/// Kept as a value threaded into [`advance_agents`] rather than global
/// state so concurrent sessions (and tests) cannot interfere.
#[derive(Clone, Debug)]
pub struct PhaseController {
    schedule: BehaviorSchedule,
    index: usize,
    phase_started: Duration,
}

impl PhaseController {
    /// Creates a controller starting its schedule at `now`.
    #[must_use]
    pub fn new(schedule: BehaviorSchedule, now: Duration) -> Self {
        Self {
            schedule,
            index: 0,
            phase_started: now,
        }
    }

    /// State designated by the current phase.
    #[must_use]
    pub fn current_state(&self) -> AgentState {
        self.schedule.phases[self.index].0
    }

    /// Advances the phase clock and flips agents in patrol/pursuit.
    ///
    /// Agents releasing, fleeing, or returning home keep their state; they
    /// pick up the shared phase when they re-enter the chase.
    pub fn update(&mut self, now: Duration, agents: &mut [Agent]) {
        let (_, duration) = self.schedule.phases[self.index];
        if now.saturating_sub(self.phase_started) >= duration
            && self.index + 1 < self.schedule.phases.len()
        {
            self.index += 1;
            self.phase_started = now;
        }

        let current = self.current_state();
        for agent in agents.iter_mut() {
            if matches!(agent.state, AgentState::Patrol | AgentState::Pursuit) {
                agent.state = current;
            }
        }
    }
}

/// Shared vulnerability window armed by a bonus pickup.
#[derive(Clone, Copy, Debug, Default)]
pub struct FleeWindow {
    until: Option<Duration>,
}

impl FleeWindow {
    /// Arms the window for the fixed flee duration and flips every agent
    /// outside the den into the flee state.
    pub fn arm(&mut self, now: Duration, agents: &mut [Agent]) {
        self.until = Some(now + FLEE_WINDOW);
        for agent in agents.iter_mut() {
            if matches!(agent.state, AgentState::Patrol | AgentState::Pursuit) {
                agent.state = AgentState::Flee;
            }
        }
    }

    /// Reports whether the window covers the provided instant.
    #[must_use]
    pub fn is_active(&self, now: Duration) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Ends an expired window, reverting fleeing agents to pursuit.
    ///
    /// Returns true when the window ended on this call so the caller can
    /// reset its capture streak.
    pub fn expire_if_due(&mut self, now: Duration, agents: &mut [Agent]) -> bool {
        let Some(until) = self.until else {
            return false;
        };
        if now < until {
            return false;
        }
        self.until = None;
        for agent in agents.iter_mut() {
            if agent.state == AgentState::Flee {
                agent.state = AgentState::Pursuit;
            }
        }
        true
    }
}

/// Player facts an agent tick needs.
#[derive(Clone, Copy, Debug)]
pub struct PlayerView {
    /// Cell the player occupies.
    pub position: CellCoord,
    /// Direction the player faces.
    pub facing: Direction,
}

/// Outcome of the player and an agent sharing a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Nothing happened; no agent shares the player's cell in a
    /// consequential state.
    None,
    /// A fleeing agent was captured; its index identifies it.
    AgentCaptured(usize),
    /// A pursuing agent caught the player.
    PlayerCaught,
}

/// Places the four agents in the den, staggered for release.
///
/// Spawn cells are uniform random den-interior cells; agents may share a
/// spawn cell, collision rules only apply once they start moving.
pub fn place_agents<R: Rng>(
    maze: GridSize,
    den: CellRect,
    den_exit_approach: CellCoord,
    now: Duration,
    rng: &mut R,
) -> [Agent; 4] {
    let interior = den.inset();
    AgentArchetype::ALL.map(|archetype| {
        let column = interior.origin().column() + rng.gen_range(0..interior.size().width());
        let row = interior.origin().row() + rng.gen_range(0..interior.size().height());
        let home = CellCoord::new(column, row);
        Agent {
            archetype,
            position: home,
            facing: Direction::West,
            state: AgentState::Releasing,
            home,
            scatter_anchor: scatter_anchor(archetype, maze),
            exit_target: den_exit_approach,
            release_at: now + RELEASE_STAGGER * archetype.index() as u32,
        }
    })
}

fn scatter_anchor(archetype: AgentArchetype, maze: GridSize) -> CellCoord {
    let east = maze.width() - 1;
    let south = maze.height() - 1;
    match archetype {
        AgentArchetype::Stalker => CellCoord::new(east, 0),
        AgentArchetype::Ambusher => CellCoord::new(0, 0),
        AgentArchetype::Flanker => CellCoord::new(east, south),
        AgentArchetype::Skulker => CellCoord::new(0, south),
    }
}

/// Chase target for an archetype, pure in its inputs.
#[must_use]
pub fn target_for(
    archetype: AgentArchetype,
    own_position: CellCoord,
    scatter_anchor: CellCoord,
    leader_position: CellCoord,
    player: PlayerView,
) -> CellCoord {
    match archetype {
        AgentArchetype::Stalker => player.position,
        AgentArchetype::Ambusher => player.position.step_by(player.facing, 4),
        AgentArchetype::Flanker => {
            let pivot = player.position.step_by(player.facing, 2);
            leader_position.doubled_through(pivot)
        }
        AgentArchetype::Skulker => {
            if own_position.manhattan_distance(player.position) > SKULKER_RETREAT_DISTANCE {
                player.position
            } else {
                scatter_anchor
            }
        }
    }
}

/// Advances every agent one tick.
///
/// `is_blocked` must report walls, unbroken breakable walls, and
/// out-of-bounds cells as blocked; occupancy by other agents is handled
/// here. Agents move in archetype order against the live positions of the
/// rest of the pack, so no step ever lands on an occupied cell.
pub fn advance_agents<F, R>(
    agents: &mut [Agent],
    is_blocked: F,
    controller: &mut PhaseController,
    flee: &FleeWindow,
    player: PlayerView,
    now: Duration,
    rng: &mut R,
) where
    F: Fn(CellCoord) -> bool,
    R: Rng,
{
    controller.update(now, agents);

    let leader_position = agents
        .iter()
        .find(|agent| agent.archetype == AgentArchetype::Stalker)
        .map_or(player.position, Agent::position);

    for index in 0..agents.len() {
        let occupied: Vec<CellCoord> = agents
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != index)
            .map(|(_, agent)| agent.position)
            .collect();
        let agent = &mut agents[index];

        match agent.state {
            AgentState::Flee => step_random(agent, &is_blocked, &occupied, rng),
            AgentState::Captured => {
                if agent.position == agent.home {
                    if !flee.is_active(now) {
                        agent.state = AgentState::Pursuit;
                    }
                } else {
                    let home = agent.home;
                    step_toward(agent, home, &is_blocked, &occupied, rng);
                }
            }
            AgentState::Patrol => {
                let anchor = agent.scatter_anchor;
                step_toward(agent, anchor, &is_blocked, &occupied, rng);
            }
            AgentState::Pursuit => {
                let target = target_for(
                    agent.archetype,
                    agent.position,
                    agent.scatter_anchor,
                    leader_position,
                    player,
                );
                step_toward(agent, target, &is_blocked, &occupied, rng);
            }
            AgentState::Releasing => {
                if flee.is_active(now) || now < agent.release_at {
                    continue;
                }
                let exit = agent.exit_target;
                let arrived = agent.position.column() == exit.column()
                    && agent.position.row().abs_diff(exit.row()) <= DEN_EXIT_ARRIVAL_TOLERANCE;
                if arrived {
                    agent.state = AgentState::Pursuit;
                } else {
                    step_toward(agent, exit, &is_blocked, &occupied, rng);
                }
            }
        }
    }
}

/// Resolves the player sharing a cell with an agent.
///
/// A fleeing agent is flipped to captured and reported by index; only a
/// pursuit-state agent catches the player. Patrolling, releasing, and
/// already-captured agents are harmless.
pub fn resolve_player_touch(agents: &mut [Agent], player_position: CellCoord) -> TouchOutcome {
    for (index, agent) in agents.iter_mut().enumerate() {
        if agent.position != player_position {
            continue;
        }
        match agent.state {
            AgentState::Flee => {
                agent.state = AgentState::Captured;
                return TouchOutcome::AgentCaptured(index);
            }
            AgentState::Pursuit => return TouchOutcome::PlayerCaught,
            AgentState::Patrol | AgentState::Releasing | AgentState::Captured => {}
        }
    }
    TouchOutcome::None
}

fn legal_directions<F>(
    agent: &Agent,
    is_blocked: &F,
    occupied: &[CellCoord],
    allow_reverse: bool,
) -> Vec<Direction>
where
    F: Fn(CellCoord) -> bool,
{
    let reverse = agent.facing.opposite();
    Direction::ALL
        .into_iter()
        .filter(|&direction| allow_reverse || direction != reverse)
        .filter(|&direction| {
            let destination = agent.position.step(direction);
            !is_blocked(destination) && !occupied.contains(&destination)
        })
        .collect()
}

/// Moves one step toward the target, preferring not to reverse.
///
/// Among legal moves the destination with minimal Manhattan distance to
/// the target wins; ties break uniformly at random. With no legal move at
/// all the agent stays put for the tick.
fn step_toward<F, R>(
    agent: &mut Agent,
    target: CellCoord,
    is_blocked: &F,
    occupied: &[CellCoord],
    rng: &mut R,
) where
    F: Fn(CellCoord) -> bool,
    R: Rng,
{
    let mut candidates = best_directions(
        agent,
        target,
        legal_directions(agent, is_blocked, occupied, false),
    );
    if candidates.is_empty() {
        candidates = best_directions(
            agent,
            target,
            legal_directions(agent, is_blocked, occupied, true),
        );
    }
    if candidates.is_empty() {
        return;
    }
    let direction = candidates[rng.gen_range(0..candidates.len())];
    agent.facing = direction;
    agent.position = agent.position.step(direction);
}

fn best_directions(agent: &Agent, target: CellCoord, legal: Vec<Direction>) -> Vec<Direction> {
    let mut shortest = u32::MAX;
    let mut best = Vec::with_capacity(4);
    for direction in legal {
        let distance = agent.position.step(direction).manhattan_distance(target);
        if distance < shortest {
            shortest = distance;
            best.clear();
            best.push(direction);
        } else if distance == shortest {
            best.push(direction);
        }
    }
    best
}

/// Undirected flee movement: random valid direction, avoiding reversal
/// when any other option exists.
fn step_random<F, R>(agent: &mut Agent, is_blocked: &F, occupied: &[CellCoord], rng: &mut R)
where
    F: Fn(CellCoord) -> bool,
    R: Rng,
{
    let mut candidates = legal_directions(agent, is_blocked, occupied, false);
    if candidates.is_empty() {
        candidates = legal_directions(agent, is_blocked, occupied, true);
    }
    if candidates.is_empty() {
        return;
    }
    let direction = candidates[rng.gen_range(0..candidates.len())];
    agent.facing = direction;
    agent.position = agent.position.step(direction);
}
