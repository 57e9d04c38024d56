//! Registry owning every live piece.

use std::collections::BTreeMap;

use king_defence_core::{
    BoardPos, Faction, Health, MovementPattern, PieceId, PieceSnapshot,
};

/// Mutable state of one live piece.
///
/// The registry owns these exclusively; the board and all snapshots refer to
/// pieces by identifier only.
#[derive(Clone, Debug)]
pub(crate) struct PieceState {
    pub(crate) id: PieceId,
    pub(crate) faction: Faction,
    pub(crate) position: BoardPos,
    pub(crate) health: Health,
    pub(crate) max_health: Health,
    pub(crate) speed: u32,
    pub(crate) cooldown: u32,
    pub(crate) ready: bool,
    pub(crate) movement: Vec<MovementPattern>,
    pub(crate) threat: Vec<MovementPattern>,
}

#[derive(Clone, Debug)]
pub(crate) struct PieceRegistry {
    entries: BTreeMap<PieceId, PieceState>,
    next_id: u32,
}

impl PieceRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Allocates a fresh identifier and stores the piece.
    ///
    /// Identifiers increase monotonically and are never reused within a run,
    /// so events stay unambiguous even after pieces die.
    pub(crate) fn allocate(
        &mut self,
        faction: Faction,
        position: BoardPos,
        max_health: Health,
        speed: u32,
        movement: Vec<MovementPattern>,
        threat: Vec<MovementPattern>,
    ) -> PieceId {
        let id = PieceId::new(self.next_id);
        self.next_id += 1;
        let previous = self.entries.insert(
            id,
            PieceState {
                id,
                faction,
                position,
                health: max_health,
                max_health,
                speed,
                cooldown: 0,
                ready: false,
                movement,
                threat,
            },
        );
        debug_assert!(previous.is_none());
        id
    }

    pub(crate) fn get(&self, id: PieceId) -> Option<&PieceState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PieceId) -> Option<&mut PieceState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: PieceId) -> Option<PieceState> {
        self.entries.remove(&id)
    }

    /// Iterates pieces in ascending identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &PieceState> {
        self.entries.values()
    }

    pub(crate) fn player_id(&self) -> Option<PieceId> {
        self.entries
            .values()
            .find(|piece| piece.faction == Faction::Player)
            .map(|piece| piece.id)
    }

    pub(crate) fn enemy_king_alive(&self) -> bool {
        self.entries
            .values()
            .any(|piece| piece.faction == Faction::Enemy(king_defence_core::EnemyKind::King))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn snapshots(&self) -> Vec<PieceSnapshot> {
        self.entries
            .values()
            .map(|piece| PieceSnapshot {
                id: piece.id,
                faction: piece.faction,
                position: piece.position,
                health: piece.health,
                max_health: piece.max_health,
                speed: piece.speed,
                cooldown: piece.cooldown,
                ready: piece.ready,
                movement: piece.movement.clone(),
                threat: piece.threat.clone(),
            })
            .collect()
    }
}
