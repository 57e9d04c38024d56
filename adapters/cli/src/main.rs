#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver binary.
//!
//! Owns the loop the engine itself never runs: player commands go through
//! `apply`, the resulting events feed the pure systems, and the command
//! batches they answer with go back through `apply` until the turn settles.
//! A scripted policy stands in for a human so whole runs play out from a
//! single seed.

mod presenter;

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use glam::Vec2;

use king_defence_core::{
    BoardPoint, BoardPos, Command, Event, PieceView, TurnState, RNG_STREAM_ENEMY_DECISION,
    RNG_STREAM_PERK_DRAFT, RNG_STREAM_WORLD,
};
use king_defence_system_enemy_decision::{Config, EnemyDecision};
use king_defence_system_perks::{ModifierStore, PerkDecks};
use king_defence_system_spawning::{derive_stream_seed, Spawning};
use king_defence_world::{query, World};

/// Simulated frame length while the action phase drains.
const TICK: Duration = Duration::from_millis(16);
/// Dispatch iterations after which the driver declares the simulation wedged.
const SETTLE_LIMIT: u32 = 100_000;
/// Rejected player commands per round after which the policy gives up.
const STALL_LIMIT: u32 = 32;

/// Scripted runs of the king-defence combat engine.
#[derive(Parser, Debug)]
#[command(name = "king-defence", version, about)]
struct Args {
    /// Master seed; every random stream of the run derives from it.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Floors to clear before the run counts as a victory.
    #[arg(long, default_value_t = 3)]
    floors: u32,

    /// Player rounds allowed per floor before the run is cut short.
    #[arg(long, default_value_t = 64)]
    max_rounds: u32,

    /// Suppress narration and board frames; print only the outcome.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let mut driver = Driver::new(&args);
    if !args.quiet {
        println!("{}", query::welcome_banner(&driver.world));
    }
    driver.configure(args.seed)?;

    for floor in 1..=args.floors {
        match driver.play_floor()? {
            FloorOutcome::Captured => {
                println!("defeat: the king fell on floor {floor}");
                return Ok(());
            }
            FloorOutcome::RoundLimit => {
                println!("stalemate: round limit reached on floor {floor}");
                return Ok(());
            }
            FloorOutcome::Cleared => {
                if floor < args.floors {
                    driver.draft();
                }
            }
        }
    }

    println!("victory: {} floors cleared", args.floors);
    Ok(())
}

/// How one floor ended.
enum FloorOutcome {
    /// The wave was defeated.
    Cleared,
    /// An enemy captured the player.
    Captured,
    /// The round cap expired before either side won.
    RoundLimit,
}

struct Driver {
    world: World,
    spawning: Spawning,
    decision: EnemyDecision,
    decks: PerkDecks,
    store: ModifierStore,
    queue: VecDeque<Command>,
    events: Vec<Event>,
    routed: Vec<Command>,
    quiet: bool,
    max_rounds: u32,
    captured: bool,
}

impl Driver {
    fn new(args: &Args) -> Self {
        Self {
            world: World::new(),
            spawning: Spawning::new(),
            decision: EnemyDecision::new(Config::new(derive_stream_seed(
                args.seed,
                RNG_STREAM_ENEMY_DECISION,
            ))),
            decks: PerkDecks::new(derive_stream_seed(args.seed, RNG_STREAM_PERK_DRAFT)),
            store: ModifierStore::new(),
            queue: VecDeque::new(),
            events: Vec::new(),
            routed: Vec::new(),
            quiet: args.quiet,
            max_rounds: args.max_rounds,
            captured: false,
        }
    }

    fn configure(&mut self, master_seed: u64) -> Result<()> {
        self.queue.push_back(Command::ConfigureRun {
            rng_seed: derive_stream_seed(master_seed, RNG_STREAM_WORLD),
        });
        self.settle()
    }

    /// Plays one floor to its terminal state.
    fn play_floor(&mut self) -> Result<FloorOutcome> {
        self.captured = false;
        self.queue.push_back(Command::StartFloor);
        self.settle()?;

        let mut last_round = 0;
        let mut stalls = 0;
        while query::turn_state(&self.world) == TurnState::PlayerTurn {
            let round = query::round(&self.world);
            if round > self.max_rounds {
                return Ok(FloorOutcome::RoundLimit);
            }
            if round == last_round {
                stalls += 1;
                if stalls > STALL_LIMIT {
                    bail!("player policy wedged on round {round}");
                }
            } else {
                last_round = round;
                stalls = 0;
                if !self.quiet {
                    println!("{}", presenter::board(&query::piece_view(&self.world)));
                }
            }

            let Some(command) = self.player_command() else {
                bail!("player turn without a player piece");
            };
            self.queue.push_back(command);
            self.settle()?;
        }

        Ok(if self.captured {
            FloorOutcome::Captured
        } else {
            FloorOutcome::Cleared
        })
    }

    /// Applies queued commands until the world rests in a player turn or a
    /// terminal state, feeding the action phase with ticks.
    fn settle(&mut self) -> Result<()> {
        for _ in 0..SETTLE_LIMIT {
            match self.queue.pop_front() {
                Some(command) => self.dispatch(command),
                None => match query::turn_state(&self.world) {
                    TurnState::ActionPhase => self.queue.push_back(Command::Tick { dt: TICK }),
                    TurnState::EnemyTurn => bail!("enemy turn produced no commands"),
                    TurnState::PlayerTurn | TurnState::None => return Ok(()),
                },
            }
        }
        bail!("simulation failed to settle")
    }

    fn dispatch(&mut self, command: Command) {
        self.events.clear();
        king_defence_world::apply(&mut self.world, command, &mut self.events);

        if !self.quiet {
            for event in &self.events {
                if let Some(line) = presenter::describe(event) {
                    println!("{line}");
                }
            }
        }
        if self
            .events
            .iter()
            .any(|event| matches!(event, Event::PlayerCaptured { .. }))
        {
            self.captured = true;
        }

        self.route();
    }

    /// Offers the latest event batch to every system and queues whatever
    /// commands they answer with.
    fn route(&mut self) {
        self.routed.clear();
        let loadouts = self.store.floor_loadouts();
        let wave = self.store.wave_roster();
        self.spawning
            .handle(&self.events, &loadouts, &wave, &mut self.routed);
        let pieces = query::piece_view(&self.world);
        self.decision.handle(
            &self.events,
            &pieces,
            query::occupancy_view(&self.world),
            &mut self.routed,
        );
        self.queue.extend(self.routed.drain(..));
    }

    /// Scripted player policy: step off threatened ground when possible,
    /// reach for a stored soul when cornered, keep the magazine fed, and
    /// otherwise shoot at the closest enemy.
    ///
    /// Every fallback makes progress: shield rejections burn charges until
    /// the action goes through, and an empty magazine turns into a move,
    /// which reloads.
    fn player_command(&self) -> Option<Command> {
        let view = query::piece_view(&self.world);
        let player_tile = view.player()?.position;
        let threatened = query::threatened_tiles(&self.world);
        let moves = query::player_moves(&self.world);

        if threatened.contains(&player_tile) {
            if let Some(&safe) = moves.iter().find(|to| !threatened.contains(to)) {
                return Some(Command::MovePlayer { to: safe });
            }
            if query::selected_soul(&self.world).is_none() {
                if let Some(slot) = self.stored_soul() {
                    return Some(Command::SelectSoul { slot });
                }
            }
        }

        let weapon = query::weapon_status(&self.world);
        if weapon.magazine == 0 {
            let step = moves
                .iter()
                .find(|to| !threatened.contains(to))
                .or_else(|| moves.first());
            if let Some(&to) = step {
                return Some(Command::MovePlayer { to });
            }
        }

        let aim = nearest_enemy_center(&view, player_tile)?;
        Some(Command::FireWeapon { aim })
    }

    fn stored_soul(&self) -> Option<u32> {
        query::soul_slots(&self.world)
            .iter()
            .position(Option::is_some)
            .map(|slot| slot as u32)
    }

    /// Runs the between-floor draft, taking the first card of each pair.
    fn draft(&mut self) {
        let draft = self.decks.deal();
        if let Some(chosen) = draft.player.first() {
            if !self.quiet {
                println!("perk drafted: {}", chosen.name);
            }
            self.decks.choose(chosen, &mut self.store);
        }
        if let Some(chosen) = draft.enemy.first() {
            if !self.quiet {
                println!("the wave drafts: {}", chosen.name);
            }
            self.decks.choose(chosen, &mut self.store);
        }
    }
}

fn nearest_enemy_center(view: &PieceView, from: BoardPos) -> Option<BoardPoint> {
    let origin = board_vec(from.center());
    view.enemies()
        .min_by(|left, right| {
            let l = board_vec(left.position.center()).distance_squared(origin);
            let r = board_vec(right.position.center()).distance_squared(origin);
            l.total_cmp(&r)
        })
        .map(|enemy| enemy.position.center())
}

fn board_vec(point: BoardPoint) -> Vec2 {
    Vec2::new(point.x(), point.y())
}
