#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns a started floor into a complete spawn batch:
//! loadouts, the player king, the enemy wave, and the battle start.
//!
//! Also hosts the labeled seed derivation shared by every seeded system,
//! so one master seed fans out into independent reproducible streams.

use king_defence_core::{
    BoardPos, Command, EnemyKind, Event, FloorLoadouts, BOARD_ROWS, PLAYER_SPAWN, TILE_COUNT,
};
use sha2::{Digest, Sha256};

/// Order in which enemy kinds claim tiles; stronger pieces anchor the
/// back rank before the rank and file fill in.
const PLACEMENT_PRIORITY: [EnemyKind; 6] = [
    EnemyKind::King,
    EnemyKind::Queen,
    EnemyKind::Rook,
    EnemyKind::Bishop,
    EnemyKind::Knight,
    EnemyKind::Pawn,
];

/// Column visit order: fan outward from the board center, right first.
const COLUMN_FAN: [u8; 8] = [4, 3, 5, 2, 6, 1, 7, 0];

/// Pure spawning system.
///
/// Watches the event stream for floor starts and answers each with the
/// full command batch that populates the board. Holds no game state
/// beyond a per-floor placement scratch.
#[derive(Debug, Default)]
pub struct Spawning {
    claimed: Vec<bool>,
}

impl Spawning {
    /// Creates a spawning system with an empty placement scratch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events and emits a spawn batch per started floor.
    pub fn handle(
        &mut self,
        events: &[Event],
        loadouts: &FloorLoadouts,
        wave: &[(EnemyKind, u32)],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if matches!(event, Event::FloorStarted { .. }) {
                self.spawn_floor(loadouts, wave, out);
            }
        }
    }

    fn spawn_floor(
        &mut self,
        loadouts: &FloorLoadouts,
        wave: &[(EnemyKind, u32)],
        out: &mut Vec<Command>,
    ) {
        out.push(Command::SetFloorLoadouts {
            loadouts: loadouts.clone(),
        });
        out.push(Command::SpawnPlayer { at: PLAYER_SPAWN });

        self.claimed.clear();
        self.claimed.resize(TILE_COUNT, false);
        self.claimed[PLAYER_SPAWN.index()] = true;

        for kind in PLACEMENT_PRIORITY {
            let count = wave
                .iter()
                .find(|(entry, _)| *entry == kind)
                .map_or(0, |(_, count)| *count);
            for _ in 0..count {
                // A wave larger than the open board simply truncates.
                if let Some(at) = self.claim_tile(kind) {
                    out.push(Command::SpawnEnemy { kind, at });
                }
            }
        }

        out.push(Command::BeginBattle);
    }

    /// Claims the first unclaimed tile, scanning the back rows first and
    /// fanning columns out from the center. Pawns skip the back rank so
    /// they always have a telegraphed advance ahead of them.
    fn claim_tile(&mut self, kind: EnemyKind) -> Option<BoardPos> {
        let top_row = if kind == EnemyKind::Pawn {
            BOARD_ROWS - 2
        } else {
            BOARD_ROWS - 1
        };
        for row in (0..=top_row).rev() {
            for column in COLUMN_FAN {
                let Some(at) = BoardPos::new(column, row) else {
                    continue;
                };
                if !self.claimed[at.index()] {
                    self.claimed[at.index()] = true;
                    return Some(at);
                }
            }
        }
        None
    }
}

/// Derives the seed for one named random stream from the master run seed.
///
/// Seeded systems each own a label so their draws stay independent while
/// the whole run remains reproducible from a single seed.
#[must_use]
pub fn derive_stream_seed(master_seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8]
        .try_into()
        .expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}
