#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns enemy-turn entry into an ordered command batch:
//! cooldown steps, telegraphs, moves, mate resolution, and wave defeat.

use king_defence_core::{
    BoardPos, Command, EnemyKind, Event, OccupancyView, PieceId, PieceSnapshot, PieceView,
    TurnState, ENEMY_EXECUTION_ORDER, TILE_COUNT,
};
use king_defence_patterns::{resolve_targets, threatens};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the decision system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided mate-selection seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Enemy decision system that reuses scratch buffers across turns.
#[derive(Debug)]
pub struct EnemyDecision {
    rng: ChaCha8Rng,
    scratch_cells: Vec<Option<PieceId>>,
    candidates: Vec<BoardPos>,
    threateners: Vec<PieceId>,
}

impl EnemyDecision {
    /// Creates a new decision system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            scratch_cells: Vec::new(),
            candidates: Vec::new(),
            threateners: Vec::new(),
        }
    }

    /// Consumes events and immutable views to emit one command batch per
    /// enemy turn.
    pub fn handle(
        &mut self,
        events: &[Event],
        pieces: &PieceView,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if matches!(
                event,
                Event::TurnChanged {
                    state: TurnState::EnemyTurn,
                }
            ) {
                self.decide_turn(pieces, occupancy, out);
            }
        }
    }

    fn decide_turn(
        &mut self,
        pieces: &PieceView,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        let Some(player) = pieces.player() else {
            return;
        };
        let player_id = player.id;
        let player_tile = player.position;

        if !enemy_king_alive(pieces) {
            out.push(Command::ClearRemainingEnemies);
            return;
        }

        // Mate pre-empts every individual decision: a threatened player is
        // captured before cooldowns or telegraphs are considered.
        self.collect_threateners(pieces, occupancy, player_id, player_tile);
        if !self.threateners.is_empty() {
            let index = self.rng.gen_range(0..self.threateners.len());
            out.push(Command::CapturePlayer {
                piece: self.threateners[index],
            });
            return;
        }

        self.prepare_scratch(pieces);
        for kind in ENEMY_EXECUTION_ORDER {
            for enemy in pieces
                .enemies()
                .filter(|snapshot| snapshot.faction.enemy_kind() == Some(kind))
            {
                self.decide_enemy(enemy, player_id, player_tile, out);
            }
        }
        out.push(Command::EndEnemyTurn);
    }

    fn decide_enemy(
        &mut self,
        enemy: &PieceSnapshot,
        player_id: PieceId,
        player_tile: BoardPos,
        out: &mut Vec<Command>,
    ) {
        if enemy.cooldown > 1 {
            out.push(Command::StepEnemyCooldown { piece: enemy.id });
            return;
        }

        self.collect_candidates(enemy);
        if self.candidates.is_empty() {
            // A boxed-in enemy stands down; it never telegraphs a move the
            // board cannot honor.
            if enemy.ready {
                out.push(Command::SetEnemyReadiness {
                    piece: enemy.id,
                    ready: false,
                });
            }
            return;
        }
        if !enemy.ready {
            out.push(Command::SetEnemyReadiness {
                piece: enemy.id,
                ready: true,
            });
            return;
        }

        // Vacate the origin before simulating so slide threats pass through
        // the tile the enemy is leaving.
        self.scratch_cells[enemy.position.index()] = None;
        if let Some(destination) = self.select_destination(enemy, player_id, player_tile) {
            self.scratch_cells[destination.index()] = Some(enemy.id);
            out.push(Command::MoveEnemy {
                piece: enemy.id,
                to: destination,
            });
        }
    }

    fn collect_threateners(
        &mut self,
        pieces: &PieceView,
        occupancy: OccupancyView<'_>,
        player_id: PieceId,
        player_tile: BoardPos,
    ) {
        self.threateners.clear();
        for enemy in pieces.enemies() {
            let covers_player = threatens(
                occupancy,
                enemy.position,
                &enemy.threat,
                player_tile,
                |occupant| occupant == player_id,
            );
            if covers_player {
                self.threateners.push(enemy.id);
            }
        }
    }

    fn prepare_scratch(&mut self, pieces: &PieceView) {
        self.scratch_cells.clear();
        self.scratch_cells.resize(TILE_COUNT, None);
        for snapshot in pieces.iter() {
            self.scratch_cells[snapshot.position.index()] = Some(snapshot.id);
        }
    }

    fn collect_candidates(&mut self, enemy: &PieceSnapshot) {
        self.candidates.clear();
        resolve_targets(
            OccupancyView::new(&self.scratch_cells),
            enemy.position,
            &enemy.movement,
            false,
            |_| false,
            &mut self.candidates,
        );
    }

    /// One-ply lookahead over the resolved candidates: prefer tiles whose
    /// threat set would cover the player, then minimum Manhattan distance,
    /// ties broken by resolver output order.
    fn select_destination(
        &self,
        enemy: &PieceSnapshot,
        player_id: PieceId,
        player_tile: BoardPos,
    ) -> Option<BoardPos> {
        let view = OccupancyView::new(&self.scratch_cells);
        let mut best: Option<Candidate> = None;

        for &tile in &self.candidates {
            let threatens_player = threatens(view, tile, &enemy.threat, player_tile, |occupant| {
                occupant == player_id
            });
            let current = Candidate {
                threatens_player,
                distance: tile.manhattan_distance(player_tile),
                tile,
            };

            match &mut best {
                Some(existing) => {
                    if current.precedes(existing) {
                        *existing = current;
                    }
                }
                None => best = Some(current),
            }
        }

        best.map(|candidate| candidate.tile)
    }
}

fn enemy_king_alive(pieces: &PieceView) -> bool {
    pieces
        .enemies()
        .any(|snapshot| snapshot.faction.enemy_kind() == Some(EnemyKind::King))
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    threatens_player: bool,
    distance: u8,
    tile: BoardPos,
}

impl Candidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.threatens_player != other.threatens_player {
            return self.threatens_player;
        }

        self.distance < other.distance
    }
}
