#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the King Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to King Defence.";

/// Number of tile columns on the battle board.
pub const BOARD_COLUMNS: u8 = 8;

/// Number of tile rows on the battle board.
pub const BOARD_ROWS: u8 = 8;

/// Total tile count of the dense occupancy buffer.
pub const TILE_COUNT: usize = (BOARD_COLUMNS as usize) * (BOARD_ROWS as usize);

/// Tile the player king occupies at the start of every floor.
pub const PLAYER_SPAWN: BoardPos = BoardPos { column: 3, row: 0 };

/// Order in which enemy kinds take their decisions during an enemy turn.
///
/// Doubles as the canonical enumeration of every enemy kind.
pub const ENEMY_EXECUTION_ORDER: [EnemyKind; 6] = [
    EnemyKind::Pawn,
    EnemyKind::King,
    EnemyKind::Queen,
    EnemyKind::Bishop,
    EnemyKind::Rook,
    EnemyKind::Knight,
];

/// Stream label deriving the world's seed from the master run seed.
pub const RNG_STREAM_WORLD: &str = "world";

/// Stream label deriving the enemy decision seed from the master run seed.
pub const RNG_STREAM_ENEMY_DECISION: &str = "enemy-decision";

/// Stream label deriving the perk draft seed from the master run seed.
pub const RNG_STREAM_PERK_DRAFT: &str = "perk-draft";

/// Describes which phase of the battle loop currently holds control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// No battle is running: before the first wave spawns and after the run
    /// concludes.
    None,
    /// The player may move, fire, or spend a soul.
    PlayerTurn,
    /// Enemies process cooldowns, telegraphs, and movement.
    EnemyTurn,
    /// Scheduled actions drain; the turn advances once the queue empties.
    ActionPhase,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Seeds the world's deterministic random stream for the run.
    ConfigureRun {
        /// Seed for cooldown sampling and pellet spread.
        rng_seed: u64,
    },
    /// Clears the board and opens the next floor.
    StartFloor,
    /// Caches the per-floor resolution of the modifier store.
    SetFloorLoadouts {
        /// Resolved enemy templates, weapon spec, shield limit, soul rules.
        loadouts: FloorLoadouts,
    },
    /// Places the player king on the board.
    SpawnPlayer {
        /// Tile the player starts on.
        at: BoardPos,
    },
    /// Places one enemy piece using the cached floor loadout for its kind.
    SpawnEnemy {
        /// Kind of enemy to spawn.
        kind: EnemyKind,
        /// Tile the enemy starts on.
        at: BoardPos,
    },
    /// Hands control to the first enemy turn once the wave is placed.
    BeginBattle,
    /// Advances simulated time, draining due scheduled actions.
    Tick {
        /// Elapsed simulation time for this step.
        dt: Duration,
    },
    /// Moves the player to an adjacent tile, or along a soul pattern while a
    /// soul is selected.
    MovePlayer {
        /// Destination tile.
        to: BoardPos,
    },
    /// Fires the weapon toward a continuous board-space point.
    FireWeapon {
        /// Aim point in board space.
        aim: BoardPoint,
    },
    /// Enters soul movement mode using the stored soul in `slot`.
    SelectSoul {
        /// Index into the player's soul slots.
        slot: u32,
    },
    /// Leaves soul movement mode without spending the soul.
    DeselectSoul,
    /// Decrements an enemy's move cooldown by one turn.
    StepEnemyCooldown {
        /// Enemy whose cooldown steps.
        piece: PieceId,
    },
    /// Raises or lowers an enemy's telegraph.
    SetEnemyReadiness {
        /// Enemy whose readiness changes.
        piece: PieceId,
        /// New readiness value.
        ready: bool,
    },
    /// Executes a decided enemy move.
    MoveEnemy {
        /// Enemy that moves.
        piece: PieceId,
        /// Destination tile.
        to: BoardPos,
    },
    /// Resolves mate: the chosen enemy captures the player immediately.
    CapturePlayer {
        /// Enemy performing the capture.
        piece: PieceId,
    },
    /// Closes the enemy turn and enters the action phase.
    EndEnemyTurn,
    /// Sweeps the rest of a defeated wave once no enemy king remains.
    ClearRemainingEnemies,
}

/// Events broadcast after the world applies commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Simulation time advanced by `dt`.
    TimeAdvanced {
        /// Elapsed simulation time.
        dt: Duration,
    },
    /// A new floor opened.
    FloorStarted {
        /// One-based floor number.
        floor: u32,
    },
    /// A piece entered the board.
    PieceSpawned {
        /// Identifier of the new piece.
        piece: PieceId,
        /// Side and kind of the new piece.
        faction: Faction,
        /// Tile the piece occupies.
        at: BoardPos,
    },
    /// The battle loop moved to a new phase.
    TurnChanged {
        /// Phase now in control.
        state: TurnState,
    },
    /// A new player round began.
    RoundStarted {
        /// One-based round counter for the current floor.
        round: u32,
    },
    /// A piece moved between tiles.
    PieceMoved {
        /// Piece that moved.
        piece: PieceId,
        /// Tile the piece left.
        from: BoardPos,
        /// Tile the piece now occupies.
        to: BoardPos,
        /// Presentation time the move tween should take.
        duration_hint: Duration,
    },
    /// A player move was refused.
    PlayerMoveRejected {
        /// Requested destination.
        to: BoardPos,
        /// Why the move was refused.
        reason: MoveError,
    },
    /// An enemy move command was refused.
    EnemyMoveRejected {
        /// Enemy whose move was refused.
        piece: PieceId,
        /// Requested destination.
        to: BoardPos,
        /// Why the move was refused.
        reason: MoveError,
    },
    /// A shot was refused.
    FireRejected {
        /// Why the shot was refused.
        reason: FireError,
    },
    /// A soul slot interaction was refused.
    SoulRejected {
        /// Why the interaction was refused.
        reason: SoulError,
    },
    /// A shield charge absorbed an action into a threatened tile.
    ShieldSpent {
        /// Charges left after the absorb.
        remaining: u32,
    },
    /// Shield charges refilled at the start of a player turn.
    ShieldRestored {
        /// Charges now available.
        charges: u32,
    },
    /// A threatening enemy was surfaced while a shield intervened.
    ThreatShown {
        /// Enemy threatening the gated tile.
        piece: PieceId,
        /// Tile the enemy threatens.
        tile: BoardPos,
    },
    /// The weapon fired a spread of pellets.
    WeaponFired {
        /// Number of pellets in the spread.
        pellets: u32,
        /// Shells left in the magazine.
        magazine_remaining: u32,
    },
    /// Shells moved from reserve into the magazine.
    WeaponReloaded {
        /// Shells in the magazine after the reload.
        magazine: u32,
        /// Shells left in reserve.
        reserve: u32,
    },
    /// A reserve shell regenerated instead of a reload.
    ReserveRegenerated {
        /// Shells in reserve after regeneration.
        reserve: u32,
    },
    /// A pellet's delayed damage landed on a piece.
    PieceDamaged {
        /// Piece that was hit.
        piece: PieceId,
        /// Damage applied.
        damage: u32,
        /// Health remaining afterwards.
        remaining: Health,
    },
    /// A piece died and left the board.
    PieceDied {
        /// Piece that died.
        piece: PieceId,
        /// Tile it vacated.
        at: BoardPos,
    },
    /// A dead enemy's template was stored in a free soul slot.
    SoulHarvested {
        /// Slot that received the soul.
        slot: u32,
        /// Kind of the harvested enemy.
        kind: EnemyKind,
    },
    /// The player entered soul movement mode.
    SoulModeEntered {
        /// Selected slot.
        slot: u32,
        /// Kind stored in the slot.
        kind: EnemyKind,
    },
    /// The player left soul movement mode without spending the soul.
    SoulModeExited,
    /// A soul move consumed the stored soul.
    SoulSpent {
        /// Slot the soul was taken from.
        slot: u32,
        /// Kind that was spent.
        kind: EnemyKind,
    },
    /// An enemy pawn reached the player's back rank and was replaced.
    PawnPromoted {
        /// Pawn that was removed.
        pawn: PieceId,
        /// Queen that took its place.
        replacement: PieceId,
        /// Tile where the promotion happened.
        at: BoardPos,
    },
    /// An enemy's move cooldown stepped down.
    EnemyCooldownStepped {
        /// Enemy whose cooldown stepped.
        piece: PieceId,
        /// Turns left until the enemy can act.
        remaining: u32,
    },
    /// An enemy raised or lowered its telegraph.
    EnemyReadinessChanged {
        /// Enemy whose readiness changed.
        piece: PieceId,
        /// New readiness value.
        ready: bool,
    },
    /// An enemy captured the player; the run is over.
    PlayerCaptured {
        /// Enemy that performed the capture.
        by: PieceId,
    },
    /// Every enemy king died and the wave was swept.
    FloorCleared {
        /// Floor that was cleared.
        floor: u32,
    },
}

/// Identifier assigned to every piece that enters the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a piece identifier from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw index backing the identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Chess kind of an enemy piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Single forward stepper with diagonal threat; promotes on the back rank.
    Pawn,
    /// Slow omnidirectional stepper; the wave falls when the last one dies.
    King,
    /// Omnidirectional slider.
    Queen,
    /// Diagonal slider.
    Bishop,
    /// Orthogonal slider.
    Rook,
    /// L-shaped jumper.
    Knight,
}

impl EnemyKind {
    /// Baseline health for the kind before modifiers.
    #[must_use]
    pub const fn base_health(self) -> Health {
        match self {
            Self::Pawn => Health::new(1),
            Self::Knight | Self::Bishop => Health::new(2),
            Self::Rook | Self::Queen => Health::new(3),
            Self::King => Health::new(4),
        }
    }

    /// Baseline speed for the kind before modifiers.
    ///
    /// Speed is the cooldown an enemy returns to after moving; larger values
    /// mean slower pieces.
    #[must_use]
    pub const fn base_speed(self) -> u32 {
        match self {
            Self::Pawn => 2,
            Self::Knight | Self::Bishop => 3,
            Self::Rook | Self::Queen => 4,
            Self::King => 5,
        }
    }

    /// Baseline movement pattern table for the kind.
    #[must_use]
    pub fn base_movement(self) -> &'static [MovementPattern] {
        match self {
            Self::Pawn => &PAWN_MOVEMENT,
            Self::King => &KING_MOVEMENT,
            Self::Queen => &QUEEN_MOVEMENT,
            Self::Bishop => &BISHOP_MOVEMENT,
            Self::Rook => &ROOK_MOVEMENT,
            Self::Knight => &KNIGHT_MOVEMENT,
        }
    }

    /// Baseline threat pattern table for the kind.
    ///
    /// Pawns threaten diagonally while moving straight; every other kind
    /// threatens along its movement table.
    #[must_use]
    pub fn base_threat(self) -> &'static [MovementPattern] {
        match self {
            Self::Pawn => &PAWN_THREAT,
            other => other.base_movement(),
        }
    }

    /// Builds the unmodified template snapshot for the kind.
    #[must_use]
    pub fn base_loadout(self) -> EnemyLoadout {
        EnemyLoadout {
            max_health: self.base_health(),
            speed: self.base_speed(),
            movement: self.base_movement().to_vec(),
            threat: self.base_threat().to_vec(),
        }
    }
}

/// Side a piece fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The player-controlled king.
    Player,
    /// An enemy piece of the given kind.
    Enemy(EnemyKind),
}

impl Faction {
    /// Returns `true` for enemy pieces.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::Enemy(_))
    }

    /// Returns the enemy kind when the faction is hostile.
    #[must_use]
    pub const fn enemy_kind(self) -> Option<EnemyKind> {
        match self {
            Self::Player => None,
            Self::Enemy(kind) => Some(kind),
        }
    }
}

/// Hit points carried by a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a health value from raw points.
    #[must_use]
    pub const fn new(points: u32) -> Self {
        Self(points)
    }

    /// Returns the raw points.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Applies damage, saturating at zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: u32) -> Self {
        Self(self.0.saturating_sub(damage))
    }

    /// Returns `true` once all points are gone.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Direction component of a movement pattern, in tiles per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delta {
    dx: i8,
    dy: i8,
}

impl Delta {
    /// Creates a direction from per-axis tile offsets.
    #[must_use]
    pub const fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }

    /// Column offset per step.
    #[must_use]
    pub const fn dx(self) -> i8 {
        self.dx
    }

    /// Row offset per step.
    #[must_use]
    pub const fn dy(self) -> i8 {
        self.dy
    }
}

/// How far a pattern repeats its direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// Exactly one application of the direction, ignoring intervening tiles.
    Jump,
    /// Repeated steps up to a fixed distance, blocked by occupied tiles.
    FiniteStep {
        /// Maximum number of steps along the direction.
        max_distance: u8,
    },
    /// Repeated steps until blocked or off the board.
    InfiniteStep,
}

/// One direction a piece can move or threaten along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementPattern {
    delta: Delta,
    kind: PatternKind,
}

impl MovementPattern {
    /// Creates a pattern from a direction and a repetition rule.
    #[must_use]
    pub const fn new(delta: Delta, kind: PatternKind) -> Self {
        Self { delta, kind }
    }

    /// Direction the pattern extends along.
    #[must_use]
    pub const fn delta(self) -> Delta {
        self.delta
    }

    /// Repetition rule of the pattern.
    #[must_use]
    pub const fn kind(self) -> PatternKind {
        self.kind
    }
}

const fn jump(dx: i8, dy: i8) -> MovementPattern {
    MovementPattern::new(Delta::new(dx, dy), PatternKind::Jump)
}

const fn stride(dx: i8, dy: i8, max_distance: u8) -> MovementPattern {
    MovementPattern::new(Delta::new(dx, dy), PatternKind::FiniteStep { max_distance })
}

const fn slide(dx: i8, dy: i8) -> MovementPattern {
    MovementPattern::new(Delta::new(dx, dy), PatternKind::InfiniteStep)
}

// Enemies advance from the spawn rows toward the player's back rank, so
// "forward" for them is negative y.
const PAWN_MOVEMENT: [MovementPattern; 1] = [stride(0, -1, 1)];
const PAWN_THREAT: [MovementPattern; 2] = [jump(-1, -1), jump(1, -1)];
const KING_MOVEMENT: [MovementPattern; 8] = [
    jump(1, 0),
    jump(1, 1),
    jump(0, 1),
    jump(-1, 1),
    jump(-1, 0),
    jump(-1, -1),
    jump(0, -1),
    jump(1, -1),
];
const QUEEN_MOVEMENT: [MovementPattern; 8] = [
    slide(1, 0),
    slide(1, 1),
    slide(0, 1),
    slide(-1, 1),
    slide(-1, 0),
    slide(-1, -1),
    slide(0, -1),
    slide(1, -1),
];
const BISHOP_MOVEMENT: [MovementPattern; 4] =
    [slide(1, 1), slide(-1, 1), slide(-1, -1), slide(1, -1)];
const ROOK_MOVEMENT: [MovementPattern; 4] =
    [slide(1, 0), slide(0, 1), slide(-1, 0), slide(0, -1)];
const KNIGHT_MOVEMENT: [MovementPattern; 8] = [
    jump(1, 2),
    jump(2, 1),
    jump(2, -1),
    jump(1, -2),
    jump(-1, -2),
    jump(-2, -1),
    jump(-2, 1),
    jump(-1, 2),
];
const PLAYER_MOVEMENT: [MovementPattern; 8] = KING_MOVEMENT;

/// Movement pattern table for the player king's normal moves.
#[must_use]
pub fn player_movement() -> &'static [MovementPattern] {
    &PLAYER_MOVEMENT
}

/// Validated coordinate on the fixed battle board.
///
/// Out-of-bounds positions are unrepresentable: construction and offsetting
/// both return `None` instead of leaking an invalid coordinate, so downstream
/// code never range-checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardPos {
    column: u8,
    row: u8,
}

impl BoardPos {
    /// Creates a board position when both axes are inside the board.
    #[must_use]
    pub const fn new(column: u8, row: u8) -> Option<Self> {
        if column < BOARD_COLUMNS && row < BOARD_ROWS {
            Some(Self { column, row })
        } else {
            None
        }
    }

    /// Column of the position.
    #[must_use]
    pub const fn column(self) -> u8 {
        self.column
    }

    /// Row of the position.
    #[must_use]
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Index of the position inside a dense row-major tile buffer.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.row as usize) * (BOARD_COLUMNS as usize) + (self.column as usize)
    }

    /// Applies a direction `steps` times, returning `None` off the board.
    #[must_use]
    pub fn offset(self, delta: Delta, steps: u8) -> Option<Self> {
        let column = i16::from(self.column) + i16::from(delta.dx()) * i16::from(steps);
        let row = i16::from(self.row) + i16::from(delta.dy()) * i16::from(steps);
        if (0..i16::from(BOARD_COLUMNS)).contains(&column)
            && (0..i16::from(BOARD_ROWS)).contains(&row)
        {
            Self::new(column as u8, row as u8)
        } else {
            None
        }
    }

    /// Manhattan distance to another position.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u8 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Center of the tile in continuous board space.
    #[must_use]
    pub fn center(self) -> BoardPoint {
        BoardPoint::new(f32::from(self.column), f32::from(self.row))
    }
}

/// Continuous point in board space; tile centers sit at integer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardPoint {
    x: f32,
    y: f32,
}

impl BoardPoint {
    /// Creates a board-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate, in tiles.
    #[must_use]
    pub const fn x(self) -> f32 {
        self.x
    }

    /// Vertical coordinate, in tiles.
    #[must_use]
    pub const fn y(self) -> f32 {
        self.y
    }

    /// Tile whose square contains the point, if any.
    #[must_use]
    pub fn containing_tile(self) -> Option<BoardPos> {
        let column = self.x.round();
        let row = self.y.round();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        if column >= f32::from(BOARD_COLUMNS) || row >= f32::from(BOARD_ROWS) {
            return None;
        }
        BoardPos::new(column as u8, row as u8)
    }

    /// Euclidean distance to another point, in tiles.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Fully resolved (post-modifier) template snapshot for one enemy kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyLoadout {
    /// Health an enemy of the kind spawns with.
    pub max_health: Health,
    /// Cooldown the enemy returns to after moving.
    pub speed: u32,
    /// Movement pattern table.
    pub movement: Vec<MovementPattern>,
    /// Threat pattern table.
    pub threat: Vec<MovementPattern>,
}

/// Resolved parameters of the player's pellet-spread weapon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Pellets released per shot.
    pub pellets: u32,
    /// Full width of the spread cone, in degrees.
    pub arc_degrees: f32,
    /// Shortest pellet flight, in tiles.
    pub min_range: f32,
    /// Longest pellet flight, in tiles.
    pub max_range: f32,
    /// Damage each pellet applies on impact.
    pub pellet_damage: u32,
    /// Pellet flight speed, in tiles per second.
    pub pellet_speed: f32,
    /// Shells the magazine holds.
    pub magazine: u32,
    /// Shells the reserve holds.
    pub reserve_limit: u32,
    /// Shells moved per reload.
    pub reload_amount: u32,
}

impl WeaponSpec {
    /// Baseline weapon before modifiers.
    #[must_use]
    pub const fn default_loadout() -> Self {
        Self {
            pellets: 6,
            arc_degrees: 30.0,
            min_range: 2.5,
            max_range: 5.0,
            pellet_damage: 1,
            pellet_speed: 12.0,
            magazine: 2,
            reserve_limit: 6,
            reload_amount: 1,
        }
    }
}

/// Resolved soul-slot rules for a floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoulRules {
    /// Number of soul slots the player carries.
    pub slots: u32,
    /// Whether a soul move suspends the player turn instead of ending it.
    pub move_keeps_turn: bool,
}

impl SoulRules {
    /// Baseline soul rules before modifiers.
    #[must_use]
    pub const fn default_loadout() -> Self {
        Self {
            slots: 1,
            move_keeps_turn: false,
        }
    }
}

/// Baseline shield charges restored at every player-turn start.
pub const DEFAULT_SHIELD_CHARGES: u32 = 2;

/// Per-floor resolution of the modifier store, cached by the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloorLoadouts {
    /// Resolved template per enemy kind.
    pub enemies: Vec<(EnemyKind, EnemyLoadout)>,
    /// Resolved weapon parameters.
    pub weapon: WeaponSpec,
    /// Shield charges restored each player turn.
    pub shield_charges: u32,
    /// Resolved soul rules.
    pub souls: SoulRules,
}

impl FloorLoadouts {
    /// Builds the unmodified loadouts used when no perks were drafted.
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            enemies: ENEMY_EXECUTION_ORDER
                .iter()
                .map(|kind| (*kind, kind.base_loadout()))
                .collect(),
            weapon: WeaponSpec::default_loadout(),
            shield_charges: DEFAULT_SHIELD_CHARGES,
            souls: SoulRules::default_loadout(),
        }
    }

    /// Resolved template for one enemy kind.
    #[must_use]
    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyLoadout> {
        self.enemies
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map(|(_, loadout)| loadout)
    }
}

/// Immutable copy of one live piece.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceSnapshot {
    /// Identifier of the piece.
    pub id: PieceId,
    /// Side and kind of the piece.
    pub faction: Faction,
    /// Tile the piece occupies.
    pub position: BoardPos,
    /// Current health.
    pub health: Health,
    /// Health the piece spawned with.
    pub max_health: Health,
    /// Cooldown the piece returns to after moving; zero for the player.
    pub speed: u32,
    /// Turns left until the piece can act; zero for the player.
    pub cooldown: u32,
    /// Whether the piece is telegraphing a move.
    pub ready: bool,
    /// Movement pattern table in effect for the piece.
    pub movement: Vec<MovementPattern>,
    /// Threat pattern table in effect for the piece.
    pub threat: Vec<MovementPattern>,
}

/// Sorted, immutable view over every live piece.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PieceView {
    pieces: Vec<PieceSnapshot>,
}

impl PieceView {
    /// Builds a view from snapshots, sorting them by identifier.
    #[must_use]
    pub fn from_snapshots(mut pieces: Vec<PieceSnapshot>) -> Self {
        pieces.sort_by_key(|snapshot| snapshot.id);
        Self { pieces }
    }

    /// Iterates the snapshots in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.pieces.iter()
    }

    /// Looks up one piece by identifier.
    #[must_use]
    pub fn get(&self, piece: PieceId) -> Option<&PieceSnapshot> {
        self.pieces
            .binary_search_by_key(&piece, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.pieces[index])
    }

    /// Snapshot of the player king, when alive.
    #[must_use]
    pub fn player(&self) -> Option<&PieceSnapshot> {
        self.pieces
            .iter()
            .find(|snapshot| snapshot.faction == Faction::Player)
    }

    /// Iterates enemy snapshots in ascending identifier order.
    pub fn enemies(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.pieces.iter().filter(|snapshot| snapshot.faction.is_enemy())
    }

    /// Number of live pieces in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Returns `true` when no piece is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Borrowed view over the dense occupancy buffer.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<PieceId>],
}

impl<'a> OccupancyView<'a> {
    /// Wraps a dense row-major tile buffer of [`TILE_COUNT`] cells.
    #[must_use]
    pub fn new(cells: &'a [Option<PieceId>]) -> Self {
        debug_assert_eq!(cells.len(), TILE_COUNT);
        Self { cells }
    }

    /// Piece occupying the tile, if any.
    #[must_use]
    pub fn occupant(&self, pos: BoardPos) -> Option<PieceId> {
        self.cells.get(pos.index()).copied().flatten()
    }

    /// Returns `true` when the tile holds no piece.
    #[must_use]
    pub fn is_free(&self, pos: BoardPos) -> bool {
        self.occupant(pos).is_none()
    }
}

/// Snapshot of the weapon's ammunition state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponStatus {
    /// Parameters in effect for the floor.
    pub spec: WeaponSpec,
    /// Shells in the magazine.
    pub magazine: u32,
    /// Shells in reserve.
    pub reserve: u32,
}

/// Why a move command was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum MoveError {
    /// The move was issued outside the acting piece's turn.
    #[error("move issued outside the acting piece's turn")]
    OutOfTurn,
    /// The destination is not in the piece's available-move set.
    #[error("destination is not in the available-move set")]
    UnreachableTile,
    /// The destination tile already holds a piece.
    #[error("destination tile is already occupied")]
    DestinationOccupied,
    /// The destination is threatened and a shield charge intervened.
    #[error("a shield charge absorbed the move")]
    ShieldBlocked,
}

/// Why a shot was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum FireError {
    /// The shot was issued outside the player's turn.
    #[error("shot issued outside the player's turn")]
    OutOfTurn,
    /// The magazine holds no shells.
    #[error("magazine is empty")]
    EmptyMagazine,
    /// The player's tile is threatened and a shield charge intervened.
    #[error("a shield charge absorbed the shot")]
    ShieldBlocked,
}

/// Why a soul slot interaction was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SoulError {
    /// The interaction was issued outside the player's turn.
    #[error("soul interaction issued outside the player's turn")]
    OutOfTurn,
    /// The slot index is beyond the player's slot count.
    #[error("no such soul slot")]
    NoSuchSlot,
    /// The slot holds no soul.
    #[error("soul slot is empty")]
    EmptySlot,
    /// The slot is already the active soul selection.
    #[error("soul slot is already selected")]
    AlreadySelected,
}

/// A piece was placed onto a tile that already holds one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[error("tile ({}, {}) is already occupied", .tile.column(), .tile.row())]
pub struct OccupiedTileError {
    tile: BoardPos,
}

impl OccupiedTileError {
    /// Creates the error for the contested tile.
    #[must_use]
    pub const fn new(tile: BoardPos) -> Self {
        Self { tile }
    }

    /// Tile that already held a piece.
    #[must_use]
    pub const fn tile(self) -> BoardPos {
        self.tile
    }
}
