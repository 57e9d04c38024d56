use std::collections::VecDeque;
use std::time::Duration;

use king_defence_core::{
    Command, Event, TurnState, RNG_STREAM_ENEMY_DECISION, RNG_STREAM_PERK_DRAFT, RNG_STREAM_WORLD,
};
use king_defence_system_enemy_decision::{Config, EnemyDecision};
use king_defence_system_perks::{ModifierStore, PerkDecks};
use king_defence_system_spawning::{derive_stream_seed, Spawning};
use king_defence_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(16);
const MASTER_SEED: u64 = 41;
/// Player commands after which a run is cut; both replays share the cap.
const COMMAND_BUDGET: u32 = 200;
const FLOOR_BUDGET: u32 = 2;

#[test]
fn identically_seeded_runs_produce_identical_event_logs() {
    let first = replay(MASTER_SEED);
    let second = replay(MASTER_SEED);

    assert!(!first.is_empty(), "replay produced no events");
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn a_replay_reaches_battle_and_resolves_shots() {
    let log = replay(MASTER_SEED);

    assert!(log
        .iter()
        .any(|event| matches!(event, Event::FloorStarted { floor: 1 })));
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::RoundStarted { .. })));
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::WeaponFired { .. })));
}

/// Plays a scripted run: the same policy the headless driver uses, reduced
/// to its deterministic core. Returns every event the run produced.
fn replay(master_seed: u64) -> Vec<Event> {
    let mut driver = Driver::new(master_seed);
    driver.push(Command::ConfigureRun {
        rng_seed: derive_stream_seed(master_seed, RNG_STREAM_WORLD),
    });
    driver.settle();

    let mut floors_started = 0;
    let mut commands_spent = 0;
    while floors_started < FLOOR_BUDGET && commands_spent < COMMAND_BUDGET {
        match query::turn_state(&driver.world) {
            TurnState::None => {
                if floors_started > 0 && !driver.player_survived() {
                    break;
                }
                if floors_started > 0 {
                    driver.draft();
                }
                floors_started += 1;
                driver.push(Command::StartFloor);
            }
            TurnState::PlayerTurn => {
                let Some(command) = driver.player_command() else {
                    break;
                };
                commands_spent += 1;
                driver.push(command);
            }
            TurnState::EnemyTurn | TurnState::ActionPhase => {}
        }
        driver.settle();
    }

    driver.log
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
    log: Vec<Event>,
    captured: bool,
}

impl Driver {
    fn new(master_seed: u64) -> Self {
        Self {
            world: World::new(),
            spawning: Spawning::new(),
            decision: EnemyDecision::new(Config::new(derive_stream_seed(
                master_seed,
                RNG_STREAM_ENEMY_DECISION,
            ))),
            decks: PerkDecks::new(derive_stream_seed(master_seed, RNG_STREAM_PERK_DRAFT)),
            store: ModifierStore::new(),
            queue: VecDeque::new(),
            events: Vec::new(),
            routed: Vec::new(),
            log: Vec::new(),
            captured: false,
        }
    }

    fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    fn settle(&mut self) {
        for _ in 0..100_000 {
            match self.queue.pop_front() {
                Some(command) => self.dispatch(command),
                None => match query::turn_state(&self.world) {
                    TurnState::ActionPhase => self.push(Command::Tick { dt: TICK }),
                    TurnState::EnemyTurn => panic!("enemy turn produced no commands"),
                    TurnState::PlayerTurn | TurnState::None => return,
                },
            }
        }
        panic!("simulation failed to settle");
    }

    fn dispatch(&mut self, command: Command) {
        self.events.clear();
        world::apply(&mut self.world, command, &mut self.events);
        self.log.extend(self.events.iter().cloned());
        if self
            .events
            .iter()
            .any(|event| matches!(event, Event::PlayerCaptured { .. }))
        {
            self.captured = true;
        }

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

    fn player_survived(&self) -> bool {
        !self.captured
    }

    fn player_command(&self) -> Option<Command> {
        let view = query::piece_view(&self.world);
        let player_tile = view.player()?.position;
        let threatened = query::threatened_tiles(&self.world);
        let moves = query::player_moves(&self.world);

        if threatened.contains(&player_tile) {
            if let Some(&safe) = moves.iter().find(|to| !threatened.contains(to)) {
                return Some(Command::MovePlayer { to: safe });
            }
        }
        if query::weapon_status(&self.world).magazine == 0 {
            if let Some(&to) = moves.first() {
                return Some(Command::MovePlayer { to });
            }
        }

        let aim = view
            .enemies()
            .min_by_key(|enemy| enemy.position.manhattan_distance(player_tile))
            .map(|enemy| enemy.position.center())?;
        Some(Command::FireWeapon { aim })
    }

    fn draft(&mut self) {
        let draft = self.decks.deal();
        if let Some(chosen) = draft.player.first() {
            self.decks.choose(chosen, &mut self.store);
        }
        if let Some(chosen) = draft.enemy.first() {
            self.decks.choose(chosen, &mut self.store);
        }
    }
}
