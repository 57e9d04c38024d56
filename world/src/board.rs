//! Dense occupancy map for the fixed battle board.

use king_defence_core::{BoardPos, OccupancyView, OccupiedTileError, PieceId, TILE_COUNT};

/// Single source of truth for which piece stands on which tile.
///
/// The board stores identifiers only; piece state lives in the registry. A
/// move is always a vacate of the origin followed by a place on the
/// destination, so a round trip restores the buffer bit-for-bit.
#[derive(Clone, Debug)]
pub(crate) struct Board {
    cells: Vec<Option<PieceId>>,
}

impl Board {
    pub(crate) fn new() -> Self {
        Self {
            cells: vec![None; TILE_COUNT],
        }
    }

    pub(crate) fn occupant(&self, pos: BoardPos) -> Option<PieceId> {
        self.cells.get(pos.index()).copied().flatten()
    }

    pub(crate) fn is_free(&self, pos: BoardPos) -> bool {
        self.occupant(pos).is_none()
    }

    /// Places a piece, refusing tiles that already hold one.
    ///
    /// An occupied destination indicates broken move sequencing upstream, so
    /// debug builds treat it as fatal while release builds surface the error
    /// to the caller.
    pub(crate) fn place(&mut self, piece: PieceId, pos: BoardPos) -> Result<(), OccupiedTileError> {
        let index = pos.index();
        if self.cells[index].is_some() {
            debug_assert!(false, "tile ({}, {}) already occupied", pos.column(), pos.row());
            return Err(OccupiedTileError::new(pos));
        }
        self.cells[index] = Some(piece);
        Ok(())
    }

    pub(crate) fn vacate(&mut self, pos: BoardPos) -> Option<PieceId> {
        self.cells[pos.index()].take()
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(None);
    }

    // Only exercised by unit tests, which compare raw occupancy buffers.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn cells(&self) -> &[Option<PieceId>] {
        &self.cells
    }

    pub(crate) fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(column: u8, row: u8) -> BoardPos {
        BoardPos::new(column, row).expect("coordinates should be on the board")
    }

    #[test]
    fn place_and_vacate_round_trip() {
        let mut board = Board::new();
        let baseline = board.cells().to_vec();

        board
            .place(PieceId::new(1), pos(4, 2))
            .expect("empty tile should accept a piece");
        assert_eq!(board.occupant(pos(4, 2)), Some(PieceId::new(1)));

        assert_eq!(board.vacate(pos(4, 2)), Some(PieceId::new(1)));
        assert_eq!(board.cells(), baseline.as_slice());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "already occupied"))]
    fn double_placement_is_refused() {
        let mut board = Board::new();
        board
            .place(PieceId::new(1), pos(0, 0))
            .expect("empty tile should accept a piece");

        let result = board.place(PieceId::new(2), pos(0, 0));
        assert_eq!(result, Err(OccupiedTileError::new(pos(0, 0))));
        assert_eq!(board.occupant(pos(0, 0)), Some(PieceId::new(1)));
    }
}
