#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the King Defence engine.
//!
//! All mutation funnels through [`apply`], which executes one [`Command`],
//! updates the board, the piece registry, the turn flow, and the player's
//! gear, and broadcasts [`Event`] values describing what changed. Systems and
//! adapters never touch the state directly; they read it through the
//! [`query`] module's immutable snapshots and views.

mod board;
mod pieces;
mod turn;
mod weapon;

use king_defence_core::{
    player_movement, BoardPoint, BoardPos, Command, EnemyKind, EnemyLoadout, Event, Faction,
    FireError, FloorLoadouts, Health, MoveError, PieceId, SoulError, TurnState, WELCOME_BANNER,
};
use king_defence_patterns::{resolve_targets, threatens};

use crate::board::Board;
use crate::pieces::PieceRegistry;
use crate::turn::{
    ActionEffect, ActionScheduler, AdvanceMode, Resolution, TurnFlow, CAPTURE_FADE, DEATH_FADE,
    MOVE_TWEEN, PROMOTION_FADE,
};
use crate::weapon::{resolve_pellet, ReloadOutcome, WeaponState};

/// Seed used until an adapter configures the run.
const DEFAULT_RUN_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Enemy kind a pawn is replaced with on the player's back rank.
const PROMOTION_KIND: EnemyKind = EnemyKind::Queen;

/// Authoritative state owned by the engine.
#[derive(Clone, Debug)]
pub struct World {
    banner: &'static str,
    board: Board,
    pieces: PieceRegistry,
    turn: TurnFlow,
    scheduler: ActionScheduler,
    rng: WorldRng,
    floor: u32,
    loadouts: FloorLoadouts,
    weapon: WeaponState,
    shield_charges: u32,
    soul_slots: Vec<Option<EnemyKind>>,
    selected_soul: Option<u32>,
}

impl World {
    /// Creates a world with an empty board awaiting its first floor.
    #[must_use]
    pub fn new() -> Self {
        let loadouts = FloorLoadouts::baseline();
        Self {
            banner: WELCOME_BANNER,
            board: Board::new(),
            pieces: PieceRegistry::new(),
            turn: TurnFlow::new(),
            scheduler: ActionScheduler::new(),
            rng: WorldRng::seeded(DEFAULT_RUN_SEED),
            floor: 0,
            weapon: WeaponState::full(&loadouts.weapon),
            shield_charges: loadouts.shield_charges,
            soul_slots: vec![None; loadouts.souls.slots as usize],
            selected_soul: None,
            loadouts,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes one command against the world and appends the resulting events.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureRun { rng_seed } => {
            world.rng = WorldRng::seeded(rng_seed);
        }
        Command::StartFloor => {
            world.board.clear();
            world.pieces.clear();
            world.scheduler.clear();
            world.turn.reset();
            world.selected_soul = None;
            world.floor += 1;
            out_events.push(Event::FloorStarted { floor: world.floor });
        }
        Command::SetFloorLoadouts { loadouts } => {
            world.weapon = WeaponState::full(&loadouts.weapon);
            world.shield_charges = loadouts.shield_charges;
            world
                .soul_slots
                .resize(loadouts.souls.slots as usize, None);
            world.loadouts = loadouts;
        }
        Command::SpawnPlayer { at } => {
            if world.pieces.player_id().is_some() {
                debug_assert!(false, "player is already on the board");
                return;
            }
            if !world.board.is_free(at) {
                debug_assert!(false, "player spawn tile is occupied");
                return;
            }
            let id = world.pieces.allocate(
                Faction::Player,
                at,
                Health::new(1),
                0,
                player_movement().to_vec(),
                Vec::new(),
            );
            if world.board.place(id, at).is_err() {
                let _ = world.pieces.remove(id);
                return;
            }
            out_events.push(Event::PieceSpawned {
                piece: id,
                faction: Faction::Player,
                at,
            });
        }
        Command::SpawnEnemy { kind, at } => {
            let Some(loadout) = world.loadouts.enemy(kind).cloned() else {
                debug_assert!(false, "floor loadouts are missing a spawned kind");
                return;
            };
            let _ = spawn_enemy_piece(world, kind, at, &loadout, out_events);
        }
        Command::BeginBattle => {
            if world.turn.state() != TurnState::None {
                debug_assert!(false, "battle is already running");
                return;
            }
            if world.pieces.player_id().is_none() {
                debug_assert!(false, "battle requires a spawned player");
                return;
            }
            world.turn.begin_battle();
            out_events.push(Event::TurnChanged {
                state: TurnState::EnemyTurn,
            });
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            if world.turn.state() != TurnState::ActionPhase {
                return;
            }
            let effects = world.scheduler.advance(dt);
            for effect in effects {
                apply_action_effect(world, effect, out_events);
            }
            if world.scheduler.is_empty() {
                resolve_action_barrier(world, out_events);
            }
        }
        Command::MovePlayer { to } => move_player(world, to, out_events),
        Command::FireWeapon { aim } => fire_weapon(world, aim, out_events),
        Command::SelectSoul { slot } => {
            if world.turn.state() != TurnState::PlayerTurn {
                out_events.push(Event::SoulRejected {
                    reason: SoulError::OutOfTurn,
                });
                return;
            }
            match world.soul_slots.get(slot as usize).copied() {
                None => out_events.push(Event::SoulRejected {
                    reason: SoulError::NoSuchSlot,
                }),
                Some(None) => out_events.push(Event::SoulRejected {
                    reason: SoulError::EmptySlot,
                }),
                Some(Some(kind)) => {
                    if world.selected_soul == Some(slot) {
                        out_events.push(Event::SoulRejected {
                            reason: SoulError::AlreadySelected,
                        });
                        return;
                    }
                    if world.selected_soul.take().is_some() {
                        out_events.push(Event::SoulModeExited);
                    }
                    world.selected_soul = Some(slot);
                    out_events.push(Event::SoulModeEntered { slot, kind });
                }
            }
        }
        Command::DeselectSoul => {
            if world.selected_soul.take().is_some() {
                out_events.push(Event::SoulModeExited);
            }
        }
        Command::StepEnemyCooldown { piece } => {
            if world.turn.state() != TurnState::EnemyTurn {
                debug_assert!(false, "cooldown steps happen during the enemy turn");
                return;
            }
            let Some(state) = world.pieces.get_mut(piece) else {
                return;
            };
            debug_assert!(state.cooldown > 1, "cooldown step requires cooldown above one");
            if state.cooldown > 1 {
                state.cooldown -= 1;
                let remaining = state.cooldown;
                out_events.push(Event::EnemyCooldownStepped { piece, remaining });
            }
        }
        Command::SetEnemyReadiness { piece, ready } => {
            if world.turn.state() != TurnState::EnemyTurn {
                debug_assert!(false, "readiness changes happen during the enemy turn");
                return;
            }
            let Some(state) = world.pieces.get_mut(piece) else {
                return;
            };
            if state.ready != ready {
                state.ready = ready;
                out_events.push(Event::EnemyReadinessChanged { piece, ready });
            }
        }
        Command::MoveEnemy { piece, to } => move_enemy(world, piece, to, out_events),
        Command::CapturePlayer { piece } => capture_player(world, piece, out_events),
        Command::EndEnemyTurn => {
            if world.turn.state() != TurnState::EnemyTurn {
                debug_assert!(false, "only the enemy turn can be ended");
                return;
            }
            enter_action_phase(world, AdvanceMode::Advance, out_events);
        }
        Command::ClearRemainingEnemies => {
            if world.turn.state() != TurnState::EnemyTurn {
                debug_assert!(false, "wave sweeps happen during the enemy turn");
                return;
            }
            debug_assert!(
                !world.pieces.enemy_king_alive(),
                "wave sweep requires every enemy king dead"
            );
            let victims: Vec<PieceId> = world
                .pieces
                .iter()
                .filter(|piece| piece.faction.is_enemy())
                .map(|piece| piece.id)
                .collect();
            for piece in victims {
                kill_piece(world, piece, false, out_events);
            }
            out_events.push(Event::FloorCleared { floor: world.floor });
            enter_action_phase(world, AdvanceMode::Conclude, out_events);
        }
    }
}

fn move_player(world: &mut World, to: BoardPos, out_events: &mut Vec<Event>) {
    if world.turn.state() != TurnState::PlayerTurn {
        out_events.push(Event::PlayerMoveRejected {
            to,
            reason: MoveError::OutOfTurn,
        });
        return;
    }
    let Some(player) = world.pieces.player_id() else {
        out_events.push(Event::PlayerMoveRejected {
            to,
            reason: MoveError::OutOfTurn,
        });
        return;
    };
    if !player_available_moves(world).contains(&to) {
        out_events.push(Event::PlayerMoveRejected {
            to,
            reason: MoveError::UnreachableTile,
        });
        return;
    }
    if shield_gate(world, to, out_events) {
        out_events.push(Event::PlayerMoveRejected {
            to,
            reason: MoveError::ShieldBlocked,
        });
        return;
    }
    let Some(from) = world.pieces.get(player).map(|piece| piece.position) else {
        return;
    };
    let _ = world.board.vacate(from);
    if world.board.place(player, to).is_err() {
        // The resolver only offers empty tiles.
        let _ = world.board.place(player, from);
        out_events.push(Event::PlayerMoveRejected {
            to,
            reason: MoveError::DestinationOccupied,
        });
        return;
    }
    if let Some(piece) = world.pieces.get_mut(player) {
        piece.position = to;
    }
    out_events.push(Event::PieceMoved {
        piece: player,
        from,
        to,
        duration_hint: MOVE_TWEEN,
    });
    world.scheduler.register(MOVE_TWEEN, ActionEffect::Hold);

    let mut advance = AdvanceMode::Advance;
    if let Some(slot) = world.selected_soul.take() {
        let index = slot as usize;
        if index < world.soul_slots.len() {
            let spent = world.soul_slots.remove(index);
            world.soul_slots.push(None);
            if let Some(kind) = spent {
                out_events.push(Event::SoulSpent { slot, kind });
                if world.loadouts.souls.move_keeps_turn {
                    advance = AdvanceMode::Hold;
                }
            }
        }
    }
    reload_weapon(world, out_events);
    enter_action_phase(world, advance, out_events);
}

fn fire_weapon(world: &mut World, aim: BoardPoint, out_events: &mut Vec<Event>) {
    if world.turn.state() != TurnState::PlayerTurn {
        out_events.push(Event::FireRejected {
            reason: FireError::OutOfTurn,
        });
        return;
    }
    let Some(player) = world.pieces.player_id() else {
        out_events.push(Event::FireRejected {
            reason: FireError::OutOfTurn,
        });
        return;
    };
    let Some(origin_tile) = world.pieces.get(player).map(|piece| piece.position) else {
        return;
    };
    if world.selected_soul.take().is_some() {
        out_events.push(Event::SoulModeExited);
    }
    if shield_gate(world, origin_tile, out_events) {
        out_events.push(Event::FireRejected {
            reason: FireError::ShieldBlocked,
        });
        return;
    }
    if world.weapon.magazine == 0 {
        out_events.push(Event::FireRejected {
            reason: FireError::EmptyMagazine,
        });
        return;
    }
    world.weapon.magazine -= 1;

    let spec = world.loadouts.weapon;
    let origin = origin_tile.center();
    let base_angle = (aim.y() - origin.y()).atan2(aim.x() - origin.x());
    let half_arc = spec.arc_degrees.to_radians() / 2.0;

    let mut impacts = Vec::with_capacity(spec.pellets as usize);
    for pellet in 0..spec.pellets {
        let angle = base_angle + (world.rng.unit_f32() * 2.0 - 1.0) * half_arc;
        // The first third of the spread flies at full range.
        let range = if pellet < spec.pellets / 3 {
            spec.max_range
        } else {
            spec.min_range + world.rng.unit_f32() * (spec.max_range - spec.min_range)
        };
        impacts.push(resolve_pellet(
            world.board.view(),
            player,
            origin,
            angle,
            range,
            spec.pellet_speed,
        ));
    }
    for impact in impacts {
        match impact.target {
            Some(piece) => world.scheduler.register(
                impact.flight,
                ActionEffect::Damage {
                    piece,
                    amount: spec.pellet_damage,
                },
            ),
            None => world.scheduler.register(impact.flight, ActionEffect::Hold),
        }
    }
    out_events.push(Event::WeaponFired {
        pellets: spec.pellets,
        magazine_remaining: world.weapon.magazine,
    });
    enter_action_phase(world, AdvanceMode::Advance, out_events);
}

fn move_enemy(world: &mut World, piece: PieceId, to: BoardPos, out_events: &mut Vec<Event>) {
    if world.turn.state() != TurnState::EnemyTurn {
        out_events.push(Event::EnemyMoveRejected {
            piece,
            to,
            reason: MoveError::OutOfTurn,
        });
        return;
    }
    let Some(state) = world.pieces.get(piece) else {
        return;
    };
    if !state.faction.is_enemy() {
        debug_assert!(false, "player piece routed through the enemy move path");
        return;
    }
    let from = state.position;
    let kind = state.faction.enemy_kind();
    let speed = state.speed;
    let was_ready = state.ready;
    if !world.board.is_free(to) {
        debug_assert!(false, "enemy move targeted an occupied tile");
        out_events.push(Event::EnemyMoveRejected {
            piece,
            to,
            reason: MoveError::DestinationOccupied,
        });
        return;
    }
    let _ = world.board.vacate(from);
    if world.board.place(piece, to).is_err() {
        let _ = world.board.place(piece, from);
        return;
    }
    if let Some(state) = world.pieces.get_mut(piece) {
        state.position = to;
        state.ready = false;
        state.cooldown = speed;
    }
    if was_ready {
        out_events.push(Event::EnemyReadinessChanged {
            piece,
            ready: false,
        });
    }
    out_events.push(Event::PieceMoved {
        piece,
        from,
        to,
        duration_hint: MOVE_TWEEN,
    });
    world.scheduler.register(MOVE_TWEEN, ActionEffect::Hold);

    if kind == Some(EnemyKind::Pawn) && to.row() == 0 {
        promote_pawn(world, piece, to, out_events);
    }
}

fn capture_player(world: &mut World, piece: PieceId, out_events: &mut Vec<Event>) {
    if world.turn.state() != TurnState::EnemyTurn {
        debug_assert!(false, "captures happen during the enemy turn");
        return;
    }
    let Some(player) = world.pieces.player_id() else {
        debug_assert!(false, "capture requires a live player");
        return;
    };
    let Some(state) = world.pieces.get(piece) else {
        return;
    };
    if !state.faction.is_enemy() {
        debug_assert!(false, "capture requires an enemy piece");
        return;
    }
    let enemy_from = state.position;
    let Some(player_pos) = world.pieces.get(player).map(|p| p.position) else {
        return;
    };
    // Clear the king's tile first, then march the captor in.
    let _ = world.board.vacate(player_pos);
    let _ = world.board.vacate(enemy_from);
    if world.board.place(piece, player_pos).is_err() {
        return;
    }
    if let Some(state) = world.pieces.get_mut(piece) {
        state.position = player_pos;
        state.ready = false;
    }
    let _ = world.pieces.remove(player);
    out_events.push(Event::PieceMoved {
        piece,
        from: enemy_from,
        to: player_pos,
        duration_hint: MOVE_TWEEN,
    });
    out_events.push(Event::PlayerCaptured { by: piece });
    world.scheduler.register(MOVE_TWEEN, ActionEffect::Hold);
    world.scheduler.register(CAPTURE_FADE, ActionEffect::Hold);
    enter_action_phase(world, AdvanceMode::Conclude, out_events);
}

fn promote_pawn(world: &mut World, pawn: PieceId, at: BoardPos, out_events: &mut Vec<Event>) {
    // Replacement, not death: the pawn leaves without a death event and the
    // queen inherits its tile.
    let vacated = world.board.vacate(at);
    debug_assert_eq!(vacated, Some(pawn));
    let _ = world.pieces.remove(pawn);
    let Some(loadout) = world.loadouts.enemy(PROMOTION_KIND).cloned() else {
        debug_assert!(false, "floor loadouts are missing the promotion kind");
        return;
    };
    if let Some(replacement) = spawn_enemy_piece(world, PROMOTION_KIND, at, &loadout, out_events) {
        out_events.push(Event::PawnPromoted {
            pawn,
            replacement,
            at,
        });
        world.scheduler.register(PROMOTION_FADE, ActionEffect::Hold);
    }
}

fn spawn_enemy_piece(
    world: &mut World,
    kind: EnemyKind,
    at: BoardPos,
    loadout: &EnemyLoadout,
    out_events: &mut Vec<Event>,
) -> Option<PieceId> {
    if !world.board.is_free(at) {
        debug_assert!(false, "enemy spawn tile is occupied");
        return None;
    }
    let speed = loadout.speed.max(1);
    let cooldown = world.rng.range_inclusive(2, speed.max(2));
    let id = world.pieces.allocate(
        Faction::Enemy(kind),
        at,
        loadout.max_health,
        speed,
        loadout.movement.clone(),
        loadout.threat.clone(),
    );
    if world.board.place(id, at).is_err() {
        let _ = world.pieces.remove(id);
        return None;
    }
    if let Some(state) = world.pieces.get_mut(id) {
        state.cooldown = cooldown;
    }
    out_events.push(Event::PieceSpawned {
        piece: id,
        faction: Faction::Enemy(kind),
        at,
    });
    Some(id)
}

fn apply_action_effect(world: &mut World, effect: ActionEffect, out_events: &mut Vec<Event>) {
    match effect {
        ActionEffect::Hold => {}
        ActionEffect::Damage { piece, amount } => {
            // The target may already have died to an earlier pellet.
            let Some(state) = world.pieces.get_mut(piece) else {
                return;
            };
            state.health = state.health.saturating_sub(amount);
            let remaining = state.health;
            out_events.push(Event::PieceDamaged {
                piece,
                damage: amount,
                remaining,
            });
            if remaining.is_zero() {
                kill_piece(world, piece, true, out_events);
            }
        }
    }
}

/// Removes a piece: clear its tile, notify collaborators, then drop the entry.
fn kill_piece(world: &mut World, piece: PieceId, harvest: bool, out_events: &mut Vec<Event>) {
    let Some((position, faction)) = world
        .pieces
        .get(piece)
        .map(|state| (state.position, state.faction))
    else {
        return;
    };
    let vacated = world.board.vacate(position);
    debug_assert_eq!(vacated, Some(piece));
    out_events.push(Event::PieceDied {
        piece,
        at: position,
    });
    if harvest {
        if let Some(kind) = faction.enemy_kind() {
            harvest_soul(world, kind, out_events);
        }
    }
    let _ = world.pieces.remove(piece);
    world.scheduler.register(DEATH_FADE, ActionEffect::Hold);
}

fn harvest_soul(world: &mut World, kind: EnemyKind, out_events: &mut Vec<Event>) {
    if let Some(slot) = world.soul_slots.iter().position(Option::is_none) {
        world.soul_slots[slot] = Some(kind);
        out_events.push(Event::SoulHarvested {
            slot: slot as u32,
            kind,
        });
    }
}

/// Spends a shield charge when the tile is threatened, surfacing the
/// threateners. Returns `true` when the charge absorbed the action.
fn shield_gate(world: &mut World, tile: BoardPos, out_events: &mut Vec<Event>) -> bool {
    if world.shield_charges == 0 {
        return false;
    }
    let threateners = threatening_enemies_at(world, tile);
    if threateners.is_empty() {
        return false;
    }
    world.shield_charges -= 1;
    for piece in threateners {
        out_events.push(Event::ThreatShown { piece, tile });
    }
    out_events.push(Event::ShieldSpent {
        remaining: world.shield_charges,
    });
    true
}

fn reload_weapon(world: &mut World, out_events: &mut Vec<Event>) {
    match world.weapon.reload(&world.loadouts.weapon) {
        Some(ReloadOutcome::Reloaded { magazine, reserve }) => {
            out_events.push(Event::WeaponReloaded { magazine, reserve });
        }
        Some(ReloadOutcome::Regenerated { reserve }) => {
            out_events.push(Event::ReserveRegenerated { reserve });
        }
        None => {}
    }
}

fn enter_action_phase(world: &mut World, mode: AdvanceMode, out_events: &mut Vec<Event>) {
    world.turn.suspend(mode);
    out_events.push(Event::TurnChanged {
        state: TurnState::ActionPhase,
    });
}

fn resolve_action_barrier(world: &mut World, out_events: &mut Vec<Event>) {
    match world.turn.resolve() {
        Resolution::Advanced(TurnState::PlayerTurn) => {
            world.shield_charges = world.loadouts.shield_charges;
            out_events.push(Event::TurnChanged {
                state: TurnState::PlayerTurn,
            });
            out_events.push(Event::RoundStarted {
                round: world.turn.round(),
            });
            out_events.push(Event::ShieldRestored {
                charges: world.shield_charges,
            });
        }
        Resolution::Advanced(state) | Resolution::Resumed(state) => {
            out_events.push(Event::TurnChanged { state });
        }
        Resolution::Concluded => {
            out_events.push(Event::TurnChanged {
                state: TurnState::None,
            });
        }
    }
}

/// Tiles the player may move to, honoring a selected soul's pattern table.
fn player_available_moves(world: &World) -> Vec<BoardPos> {
    let Some(player) = world.pieces.player_id() else {
        return Vec::new();
    };
    let Some(position) = world.pieces.get(player).map(|piece| piece.position) else {
        return Vec::new();
    };
    let soul_kind = world
        .selected_soul
        .and_then(|slot| world.soul_slots.get(slot as usize).copied().flatten());
    let table = match soul_kind {
        Some(kind) => world
            .loadouts
            .enemy(kind)
            .map(|loadout| loadout.movement.as_slice())
            .unwrap_or_else(|| kind.base_movement()),
        None => player_movement(),
    };
    let mut out = Vec::new();
    resolve_targets(world.board.view(), position, table, false, |_| false, &mut out);
    out
}

/// Enemies whose threat resolution covers `tile`, in ascending id order.
fn threatening_enemies_at(world: &World, tile: BoardPos) -> Vec<PieceId> {
    let Some(player) = world.pieces.player_id() else {
        return Vec::new();
    };
    let view = world.board.view();
    world
        .pieces
        .iter()
        .filter(|piece| piece.faction.is_enemy())
        .filter(|piece| {
            threatens(view, piece.position, &piece.threat, tile, |occupant| {
                occupant == player
            })
        })
        .map(|piece| piece.id)
        .collect()
}

#[derive(Clone, Debug)]
struct WorldRng {
    state: u64,
}

impl WorldRng {
    fn seeded(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    /// Uniform draw from `lo..=hi`; modulo bias is irrelevant at these spans.
    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        debug_assert!(lo <= hi);
        let span = u64::from(hi - lo) + 1;
        lo + ((self.next() >> 33) % span) as u32
    }

    /// Uniform draw from `[0, 1)`.
    fn unit_f32(&mut self) -> f32 {
        ((self.next() >> 40) as f32) / ((1u64 << 24) as f32)
    }
}

/// Read-only accessors over the authoritative world state.
pub mod query {
    use super::*;
    use king_defence_core::{OccupancyView, PieceView, WeaponStatus};

    /// Greeting banner adapters print when the experience boots.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &str {
        world.banner
    }

    /// Phase of the battle loop currently in control.
    #[must_use]
    pub fn turn_state(world: &World) -> TurnState {
        world.turn.state()
    }

    /// One-based player round counter for the current floor.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.turn.round()
    }

    /// One-based floor number of the run.
    #[must_use]
    pub fn floor(world: &World) -> u32 {
        world.floor
    }

    /// Snapshot of every live piece, sorted by identifier.
    #[must_use]
    pub fn piece_view(world: &World) -> PieceView {
        PieceView::from_snapshots(world.pieces.snapshots())
    }

    /// Borrowed view over the dense occupancy buffer.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.board.view()
    }

    /// Tiles the player may move to right now.
    #[must_use]
    pub fn player_moves(world: &World) -> Vec<BoardPos> {
        player_available_moves(world)
    }

    /// Union of every enemy's threat resolution, deduplicated and sorted.
    #[must_use]
    pub fn threatened_tiles(world: &World) -> Vec<BoardPos> {
        let player = world.pieces.player_id();
        let view = world.board.view();
        let mut tiles = Vec::new();
        for piece in world.pieces.iter().filter(|piece| piece.faction.is_enemy()) {
            resolve_targets(view, piece.position, &piece.threat, true, |occupant| {
                Some(occupant) == player
            }, &mut tiles);
        }
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }

    /// Enemies whose threat resolution covers `tile`.
    #[must_use]
    pub fn threatening_enemies(world: &World, tile: BoardPos) -> Vec<PieceId> {
        threatening_enemies_at(world, tile)
    }

    /// Ammunition state of the player's weapon.
    #[must_use]
    pub fn weapon_status(world: &World) -> WeaponStatus {
        WeaponStatus {
            spec: world.loadouts.weapon,
            magazine: world.weapon.magazine,
            reserve: world.weapon.reserve,
        }
    }

    /// Shield charges the player has left this turn.
    #[must_use]
    pub fn shield_charges(world: &World) -> u32 {
        world.shield_charges
    }

    /// Souls stored in the player's slots.
    #[must_use]
    pub fn soul_slots(world: &World) -> Vec<Option<EnemyKind>> {
        world.soul_slots.clone()
    }

    /// Slot selected for soul movement, if any.
    #[must_use]
    pub fn selected_soul(world: &World) -> Option<u32> {
        world.selected_soul
    }

    /// Number of scheduled actions still holding the action phase open.
    #[must_use]
    pub fn pending_actions(world: &World) -> usize {
        world.scheduler.len()
    }

    /// Loadouts cached for the current floor.
    #[must_use]
    pub fn floor_loadouts(world: &World) -> &FloorLoadouts {
        &world.loadouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use king_defence_core::{BoardPoint, SoulRules, WeaponSpec, PLAYER_SPAWN};
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(16);

    fn pos(column: u8, row: u8) -> BoardPos {
        BoardPos::new(column, row).expect("coordinates should be on the board")
    }

    fn drive(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events);
        events
    }

    fn pump_until(world: &mut World, expected: TurnState) -> Vec<Event> {
        let mut collected = Vec::new();
        for _ in 0..1024 {
            apply(world, Command::Tick { dt: TICK }, &mut collected);
            if query::turn_state(world) == expected {
                return collected;
            }
        }
        panic!("turn never reached {expected:?}");
    }

    fn battle_world(loadouts: FloorLoadouts, enemies: &[(EnemyKind, BoardPos)]) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::ConfigureRun { rng_seed: 7 }, &mut events);
        apply(&mut world, Command::StartFloor, &mut events);
        apply(&mut world, Command::SetFloorLoadouts { loadouts }, &mut events);
        apply(&mut world, Command::SpawnPlayer { at: PLAYER_SPAWN }, &mut events);
        for (kind, at) in enemies {
            apply(
                &mut world,
                Command::SpawnEnemy {
                    kind: *kind,
                    at: *at,
                },
                &mut events,
            );
        }
        apply(&mut world, Command::BeginBattle, &mut events);
        world
    }

    fn reach_player_turn(world: &mut World) -> Vec<Event> {
        let mut events = drive(world, Command::EndEnemyTurn);
        events.extend(pump_until(world, TurnState::PlayerTurn));
        events
    }

    // Zero arc and a generous minimum range make every pellet fly straight
    // down the aim line; zero shields keep the gate out of the way.
    fn straight_shot_loadouts() -> FloorLoadouts {
        let mut loadouts = FloorLoadouts::baseline();
        loadouts.weapon = WeaponSpec {
            arc_degrees: 0.0,
            min_range: 4.0,
            max_range: 5.0,
            ..loadouts.weapon
        };
        loadouts.shield_charges = 0;
        loadouts
    }

    #[test]
    fn player_move_round_trip_restores_occupancy() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[]);
        let _ = reach_player_turn(&mut world);
        let baseline = world.board.cells().to_vec();

        let _ = drive(&mut world, Command::MovePlayer { to: pos(3, 1) });
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
        assert_ne!(world.board.cells(), baseline.as_slice());

        let _ = reach_player_turn(&mut world);
        let _ = drive(&mut world, Command::MovePlayer { to: PLAYER_SPAWN });
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
        assert_eq!(world.board.cells(), baseline.as_slice());
    }

    #[test]
    fn action_phase_blocks_until_pending_actions_drain() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[]);
        let _ = reach_player_turn(&mut world);

        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 1) });
        assert!(events.contains(&Event::TurnChanged {
            state: TurnState::ActionPhase,
        }));
        assert_eq!(query::turn_state(&world), TurnState::ActionPhase);
        assert_eq!(query::pending_actions(&world), 1);

        let _ = drive(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
        );
        assert_eq!(query::turn_state(&world), TurnState::ActionPhase);

        let _ = drive(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(300),
            },
        );
        assert_eq!(query::turn_state(&world), TurnState::EnemyTurn);
        assert_eq!(query::pending_actions(&world), 0);
    }

    #[test]
    fn player_turn_entry_restores_shields_and_counts_rounds() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Rook, pos(0, 7))]);
        let events = reach_player_turn(&mut world);

        assert!(events.contains(&Event::TurnChanged {
            state: TurnState::PlayerTurn,
        }));
        assert!(events.contains(&Event::RoundStarted { round: 1 }));
        assert!(events.contains(&Event::ShieldRestored { charges: 2 }));
        assert_eq!(query::round(&world), 1);
        assert_eq!(query::shield_charges(&world), 2);
    }

    #[test]
    fn spawn_cooldowns_stay_inside_the_sampling_window() {
        let enemies: Vec<(EnemyKind, BoardPos)> = (0..6)
            .map(|column| (EnemyKind::Rook, pos(column, 7)))
            .chain((0..6).map(|column| (EnemyKind::Pawn, pos(column, 6))))
            .collect();
        let world = battle_world(FloorLoadouts::baseline(), &enemies);

        for piece in query::piece_view(&world).enemies() {
            match piece.faction.enemy_kind() {
                Some(EnemyKind::Rook) => {
                    assert!((2..=4).contains(&piece.cooldown), "rook cooldown {}", piece.cooldown);
                }
                Some(EnemyKind::Pawn) => assert_eq!(piece.cooldown, 2),
                other => panic!("unexpected kind {other:?}"),
            }
        }
    }

    #[test]
    fn shield_absorbs_actions_on_threatened_tiles() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Rook, pos(3, 5))]);
        let rook = query::piece_view(&world)
            .enemies()
            .next()
            .expect("rook should be alive")
            .id;
        let _ = reach_player_turn(&mut world);

        // The rook covers the whole file, player tile included. Firing from a
        // covered tile burns the first charge without spending a shell.
        let events = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 5.0),
            },
        );
        assert!(events.contains(&Event::ThreatShown {
            piece: rook,
            tile: PLAYER_SPAWN,
        }));
        assert!(events.contains(&Event::ShieldSpent { remaining: 1 }));
        assert!(events.contains(&Event::FireRejected {
            reason: FireError::ShieldBlocked,
        }));
        assert_eq!(query::weapon_status(&world).magazine, 2);

        // Moving into the covered file burns the second.
        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 1) });
        assert!(events.contains(&Event::ShieldSpent { remaining: 0 }));
        assert!(events.contains(&Event::PlayerMoveRejected {
            to: pos(3, 1),
            reason: MoveError::ShieldBlocked,
        }));
        assert_eq!(query::turn_state(&world), TurnState::PlayerTurn);

        // Out of charges: the move into danger proceeds.
        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 1) });
        assert!(events.iter().any(|event| matches!(
            event,
            Event::PieceMoved { to, .. } if *to == pos(3, 1)
        )));
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
    }

    #[test]
    fn pellets_damage_kill_and_harvest_a_soul() {
        let mut world = battle_world(straight_shot_loadouts(), &[(EnemyKind::Rook, pos(3, 3))]);
        let rook = query::piece_view(&world)
            .enemies()
            .next()
            .expect("rook should be alive")
            .id;
        let _ = reach_player_turn(&mut world);

        let events = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 3.0),
            },
        );
        assert!(events.contains(&Event::WeaponFired {
            pellets: 6,
            magazine_remaining: 1,
        }));
        assert_eq!(query::turn_state(&world), TurnState::ActionPhase);

        let events = pump_until(&mut world, TurnState::EnemyTurn);
        let damage_count = events
            .iter()
            .filter(|event| matches!(event, Event::PieceDamaged { piece, .. } if *piece == rook))
            .count();
        assert_eq!(damage_count, 3, "rook takes exactly its health in pellets");
        assert!(events.contains(&Event::PieceDied {
            piece: rook,
            at: pos(3, 3),
        }));
        assert!(events.contains(&Event::SoulHarvested {
            slot: 0,
            kind: EnemyKind::Rook,
        }));
        assert!(query::piece_view(&world).enemies().next().is_none());
        assert_eq!(query::soul_slots(&world), vec![Some(EnemyKind::Rook)]);
    }

    #[test]
    fn soul_move_spends_the_soul_and_ends_the_turn() {
        let mut world = battle_world(straight_shot_loadouts(), &[(EnemyKind::Rook, pos(3, 3))]);
        let _ = reach_player_turn(&mut world);
        let _ = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 3.0),
            },
        );
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
        let _ = reach_player_turn(&mut world);

        let events = drive(&mut world, Command::SelectSoul { slot: 0 });
        assert!(events.contains(&Event::SoulModeEntered {
            slot: 0,
            kind: EnemyKind::Rook,
        }));
        assert!(query::player_moves(&world).contains(&pos(3, 4)));

        let events = drive(&mut world, Command::SelectSoul { slot: 0 });
        assert!(events.contains(&Event::SoulRejected {
            reason: SoulError::AlreadySelected,
        }));
        assert_eq!(query::selected_soul(&world), Some(0));

        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 4) });
        assert!(events.contains(&Event::SoulSpent {
            slot: 0,
            kind: EnemyKind::Rook,
        }));
        assert_eq!(query::soul_slots(&world), vec![None]);
        assert_eq!(query::selected_soul(&world), None);

        let _ = pump_until(&mut world, TurnState::EnemyTurn);
    }

    #[test]
    fn soul_move_with_the_perk_resumes_the_player_turn() {
        let mut loadouts = straight_shot_loadouts();
        loadouts.souls = SoulRules {
            slots: 1,
            move_keeps_turn: true,
        };
        let mut world = battle_world(loadouts, &[(EnemyKind::Rook, pos(3, 3))]);
        let _ = reach_player_turn(&mut world);
        let _ = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 3.0),
            },
        );
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
        let _ = reach_player_turn(&mut world);
        let round_before = query::round(&world);

        let _ = drive(&mut world, Command::SelectSoul { slot: 0 });
        let _ = drive(&mut world, Command::MovePlayer { to: pos(3, 4) });
        let events = pump_until(&mut world, TurnState::PlayerTurn);

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::RoundStarted { .. })));
        assert_eq!(query::round(&world), round_before);
        assert_eq!(query::turn_state(&world), TurnState::PlayerTurn);
    }

    #[test]
    fn pawn_reaching_the_back_rank_promotes_to_a_queen() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Pawn, pos(5, 1))]);
        let pawn = query::piece_view(&world)
            .enemies()
            .next()
            .expect("pawn should be alive")
            .id;

        let events = drive(
            &mut world,
            Command::MoveEnemy {
                piece: pawn,
                to: pos(5, 0),
            },
        );
        let replacement = events
            .iter()
            .find_map(|event| match event {
                Event::PawnPromoted { replacement, .. } => Some(*replacement),
                _ => None,
            })
            .expect("promotion should fire");
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PieceDied { .. })));

        let view = query::piece_view(&world);
        let queen = view.get(replacement).expect("queen should be alive");
        assert_eq!(queen.faction, Faction::Enemy(EnemyKind::Queen));
        assert_eq!(queen.position, pos(5, 0));
        assert!(view.get(pawn).is_none());
    }

    #[test]
    fn capture_removes_the_player_and_concludes_the_run() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Knight, pos(4, 2))]);
        let knight = query::piece_view(&world)
            .enemies()
            .next()
            .expect("knight should be alive")
            .id;

        let events = drive(&mut world, Command::CapturePlayer { piece: knight });
        assert!(events.contains(&Event::PlayerCaptured { by: knight }));
        assert!(query::piece_view(&world).player().is_none());

        let _ = pump_until(&mut world, TurnState::None);
        let view = query::piece_view(&world);
        let knight_state = view.get(knight).expect("captor should survive");
        assert_eq!(knight_state.position, PLAYER_SPAWN);
    }

    #[test]
    fn wave_sweep_kills_enemies_without_harvesting() {
        let mut world = battle_world(
            FloorLoadouts::baseline(),
            &[(EnemyKind::Rook, pos(0, 7)), (EnemyKind::Pawn, pos(1, 6))],
        );

        let events = drive(&mut world, Command::ClearRemainingEnemies);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::PieceDied { .. }))
                .count(),
            2
        );
        assert!(events.contains(&Event::FloorCleared { floor: 1 }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::SoulHarvested { .. })));

        let _ = pump_until(&mut world, TurnState::None);
        assert_eq!(query::piece_view(&world).len(), 1);
        assert_eq!(query::soul_slots(&world), vec![None]);
    }

    #[test]
    fn empty_magazine_rejects_the_shot() {
        let mut loadouts = FloorLoadouts::baseline();
        loadouts.weapon.magazine = 0;
        let mut world = battle_world(loadouts, &[]);
        let _ = reach_player_turn(&mut world);

        let events = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 7.0),
            },
        );
        assert!(events.contains(&Event::FireRejected {
            reason: FireError::EmptyMagazine,
        }));
        assert_eq!(query::turn_state(&world), TurnState::PlayerTurn);
    }

    #[test]
    fn moving_reloads_and_then_regenerates_reserve() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[]);
        let _ = reach_player_turn(&mut world);
        let _ = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(3.0, 7.0),
            },
        );
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
        assert_eq!(query::weapon_status(&world).magazine, 1);

        let _ = reach_player_turn(&mut world);
        let events = drive(&mut world, Command::MovePlayer { to: pos(2, 0) });
        assert!(events.contains(&Event::WeaponReloaded {
            magazine: 2,
            reserve: 5,
        }));
        let _ = pump_until(&mut world, TurnState::EnemyTurn);

        let _ = reach_player_turn(&mut world);
        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 0) });
        assert!(events.contains(&Event::ReserveRegenerated { reserve: 6 }));
        let _ = pump_until(&mut world, TurnState::EnemyTurn);
    }

    #[test]
    fn out_of_turn_player_commands_are_rejected() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[]);
        assert_eq!(query::turn_state(&world), TurnState::EnemyTurn);

        let events = drive(&mut world, Command::MovePlayer { to: pos(3, 1) });
        assert!(events.contains(&Event::PlayerMoveRejected {
            to: pos(3, 1),
            reason: MoveError::OutOfTurn,
        }));
        let events = drive(
            &mut world,
            Command::FireWeapon {
                aim: BoardPoint::new(0.0, 0.0),
            },
        );
        assert!(events.contains(&Event::FireRejected {
            reason: FireError::OutOfTurn,
        }));
        let events = drive(&mut world, Command::SelectSoul { slot: 0 });
        assert!(events.contains(&Event::SoulRejected {
            reason: SoulError::OutOfTurn,
        }));

        let _ = reach_player_turn(&mut world);
        let events = drive(&mut world, Command::MovePlayer { to: pos(6, 6) });
        assert!(events.contains(&Event::PlayerMoveRejected {
            to: pos(6, 6),
            reason: MoveError::UnreachableTile,
        }));
    }

    #[test]
    fn starting_a_floor_resets_the_battle_state() {
        let mut world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Rook, pos(0, 7))]);
        let _ = reach_player_turn(&mut world);

        let events = drive(&mut world, Command::StartFloor);
        assert!(events.contains(&Event::FloorStarted { floor: 2 }));
        assert_eq!(query::turn_state(&world), TurnState::None);
        assert_eq!(query::round(&world), 0);
        assert!(query::piece_view(&world).is_empty());
        assert_eq!(query::pending_actions(&world), 0);
    }

    #[test]
    fn threat_queries_track_enemy_positions() {
        let world = battle_world(FloorLoadouts::baseline(), &[(EnemyKind::Rook, pos(5, 3))]);
        let rook = query::piece_view(&world)
            .enemies()
            .next()
            .expect("rook should be alive")
            .id;

        let threatened = query::threatened_tiles(&world);
        assert!(threatened.contains(&pos(5, 0)));
        assert!(threatened.contains(&pos(0, 3)));
        assert!(!threatened.contains(&pos(4, 2)));
        assert_eq!(query::threatening_enemies(&world, pos(5, 1)), vec![rook]);
        assert!(query::threatening_enemies(&world, pos(4, 2)).is_empty());
    }
}
