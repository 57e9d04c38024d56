#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure movement-pattern resolution.
//!
//! The resolver turns a piece's pattern table into the concrete tiles it can
//! reach or threaten on the current board. It reads only a borrowed
//! [`OccupancyView`] and appends into a caller-owned buffer, so the world and
//! the decision system share one implementation without either owning it.
//! Capturability is a caller-supplied predicate: the resolver never learns
//! about factions.

use king_defence_core::{BoardPos, MovementPattern, OccupancyView, PatternKind, PieceId};

/// Appends every tile reachable from `origin` along `patterns`.
///
/// Tiles are appended in pattern-list order and, within a sliding pattern, in
/// increasing step distance. An empty tile is always included. An occupied
/// tile is included only when its occupant satisfies `is_capturable` and
/// `can_capture` is set, and a slide stops at the first occupied tile either
/// way (capture-then-stop). Duplicates across patterns are preserved; callers
/// treat the output as a set via containment. An empty result is a valid
/// outcome, not an error.
pub fn resolve_targets<F>(
    occupancy: OccupancyView<'_>,
    origin: BoardPos,
    patterns: &[MovementPattern],
    can_capture: bool,
    is_capturable: F,
    out: &mut Vec<BoardPos>,
) where
    F: Fn(PieceId) -> bool,
{
    for pattern in patterns {
        let limit = match pattern.kind() {
            PatternKind::Jump => 1,
            PatternKind::FiniteStep { max_distance } => max_distance,
            PatternKind::InfiniteStep => u8::MAX,
        };

        for step in 1..=limit {
            let Some(tile) = origin.offset(pattern.delta(), step) else {
                break;
            };

            match occupancy.occupant(tile) {
                None => out.push(tile),
                Some(occupant) => {
                    if can_capture && is_capturable(occupant) {
                        out.push(tile);
                    }
                    break;
                }
            }
        }
    }
}

/// Returns `true` when `target` is inside the threat resolution of `origin`.
///
/// Equivalent to resolving with `can_capture` set and testing containment,
/// but exits as soon as the target is reached or the walk is blocked short of
/// it.
pub fn threatens<F>(
    occupancy: OccupancyView<'_>,
    origin: BoardPos,
    patterns: &[MovementPattern],
    target: BoardPos,
    is_capturable: F,
) -> bool
where
    F: Fn(PieceId) -> bool,
{
    for pattern in patterns {
        let limit = match pattern.kind() {
            PatternKind::Jump => 1,
            PatternKind::FiniteStep { max_distance } => max_distance,
            PatternKind::InfiniteStep => u8::MAX,
        };

        for step in 1..=limit {
            let Some(tile) = origin.offset(pattern.delta(), step) else {
                break;
            };

            match occupancy.occupant(tile) {
                None => {
                    if tile == target {
                        return true;
                    }
                }
                Some(occupant) => {
                    if tile == target && is_capturable(occupant) {
                        return true;
                    }
                    break;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use king_defence_core::{Delta, PieceId, TILE_COUNT};

    fn pos(column: u8, row: u8) -> BoardPos {
        BoardPos::new(column, row).expect("coordinates should be on the board")
    }

    fn empty_board() -> Vec<Option<PieceId>> {
        vec![None; TILE_COUNT]
    }

    fn resolve(
        cells: &[Option<PieceId>],
        origin: BoardPos,
        patterns: &[MovementPattern],
        can_capture: bool,
    ) -> Vec<BoardPos> {
        let mut out = Vec::new();
        resolve_targets(
            OccupancyView::new(cells),
            origin,
            patterns,
            can_capture,
            |_| true,
            &mut out,
        );
        out
    }

    fn slide_east() -> [MovementPattern; 1] {
        [MovementPattern::new(Delta::new(1, 0), PatternKind::InfiniteStep)]
    }

    #[test]
    fn infinite_step_walks_to_the_board_edge() {
        let cells = empty_board();
        let tiles = resolve(&cells, pos(3, 3), &slide_east(), false);
        assert_eq!(tiles, vec![pos(4, 3), pos(5, 3), pos(6, 3), pos(7, 3)]);
    }

    #[test]
    fn capture_includes_the_blocker_and_stops() {
        let mut cells = empty_board();
        cells[pos(5, 3).index()] = Some(PieceId::new(1));

        let tiles = resolve(&cells, pos(3, 3), &slide_east(), true);
        assert_eq!(tiles, vec![pos(4, 3), pos(5, 3)]);
    }

    #[test]
    fn blocker_is_excluded_without_capture_rights() {
        let mut cells = empty_board();
        cells[pos(5, 3).index()] = Some(PieceId::new(1));

        let tiles = resolve(&cells, pos(3, 3), &slide_east(), false);
        assert_eq!(tiles, vec![pos(4, 3)]);
    }

    #[test]
    fn non_capturable_blocker_still_stops_the_walk() {
        let mut cells = empty_board();
        cells[pos(5, 3).index()] = Some(PieceId::new(1));

        let mut tiles = Vec::new();
        resolve_targets(
            OccupancyView::new(&cells),
            pos(3, 3),
            &slide_east(),
            true,
            |_| false,
            &mut tiles,
        );
        assert_eq!(tiles, vec![pos(4, 3)]);
    }

    #[test]
    fn finite_step_is_a_prefix_of_the_unobstructed_walk() {
        let cells = empty_board();
        let full = resolve(&cells, pos(0, 3), &slide_east(), false);

        for max_distance in 0..=u8::try_from(full.len()).expect("walk fits in u8") {
            let finite = [MovementPattern::new(
                Delta::new(1, 0),
                PatternKind::FiniteStep { max_distance },
            )];
            let tiles = resolve(&cells, pos(0, 3), &finite, false);
            assert_eq!(tiles.len(), usize::from(max_distance));
            assert_eq!(tiles.as_slice(), &full[..tiles.len()]);
        }
    }

    #[test]
    fn infinite_step_matches_finite_step_at_the_obstruction_distance() {
        let mut cells = empty_board();
        cells[pos(6, 3).index()] = Some(PieceId::new(1));

        let infinite = resolve(&cells, pos(2, 3), &slide_east(), true);
        let finite = [MovementPattern::new(
            Delta::new(1, 0),
            PatternKind::FiniteStep { max_distance: 4 },
        )];
        let bounded = resolve(&cells, pos(2, 3), &finite, true);
        assert_eq!(infinite, bounded);
    }

    #[test]
    fn capturable_tile_appears_exactly_once_and_nothing_beyond_it() {
        let mut cells = empty_board();
        cells[pos(4, 3).index()] = Some(PieceId::new(1));

        let tiles = resolve(&cells, pos(1, 3), &slide_east(), true);
        assert_eq!(tiles.iter().filter(|tile| **tile == pos(4, 3)).count(), 1);
        assert!(tiles.iter().all(|tile| tile.column() <= 4));
    }

    #[test]
    fn jump_ignores_intervening_tiles() {
        let mut cells = empty_board();
        for column in 2..=4 {
            for row in 2..=4 {
                if (column, row) != (3, 3) {
                    cells[pos(column, row).index()] = Some(PieceId::new(u32::from(column * 8 + row)));
                }
            }
        }

        let knight_hop = [MovementPattern::new(Delta::new(1, 2), PatternKind::Jump)];
        let tiles = resolve(&cells, pos(3, 3), &knight_hop, false);
        assert_eq!(tiles, vec![pos(4, 5)]);
    }

    #[test]
    fn jump_respects_the_capture_rule() {
        let mut cells = empty_board();
        cells[pos(4, 5).index()] = Some(PieceId::new(1));

        let knight_hop = [MovementPattern::new(Delta::new(1, 2), PatternKind::Jump)];
        assert_eq!(resolve(&cells, pos(3, 3), &knight_hop, false), Vec::new());
        assert_eq!(resolve(&cells, pos(3, 3), &knight_hop, true), vec![pos(4, 5)]);
    }

    #[test]
    fn duplicate_tiles_across_patterns_are_preserved() {
        let cells = empty_board();
        let patterns = [
            MovementPattern::new(Delta::new(1, 0), PatternKind::Jump),
            MovementPattern::new(Delta::new(1, 0), PatternKind::FiniteStep { max_distance: 2 }),
        ];

        let tiles = resolve(&cells, pos(3, 3), &patterns, false);
        assert_eq!(tiles, vec![pos(4, 3), pos(4, 3), pos(5, 3)]);
    }

    #[test]
    fn threatens_agrees_with_resolution_containment() {
        let mut cells = empty_board();
        cells[pos(5, 3).index()] = Some(PieceId::new(1));
        cells[pos(2, 6).index()] = Some(PieceId::new(2));
        let view = OccupancyView::new(&cells);

        let patterns = [
            MovementPattern::new(Delta::new(1, 0), PatternKind::InfiniteStep),
            MovementPattern::new(Delta::new(-1, 1), PatternKind::InfiniteStep),
        ];
        let origin = pos(3, 3);
        let resolved = resolve(&cells, origin, &patterns, true);

        for column in 0..8 {
            for row in 0..8 {
                let target = pos(column, row);
                assert_eq!(
                    threatens(view, origin, &patterns, target, |_| true),
                    resolved.contains(&target),
                    "threat mismatch at ({column}, {row})",
                );
            }
        }
    }

    #[test]
    fn threatens_respects_the_capturable_predicate() {
        let mut cells = empty_board();
        cells[pos(5, 3).index()] = Some(PieceId::new(1));
        let view = OccupancyView::new(&cells);

        assert!(threatens(view, pos(3, 3), &slide_east(), pos(5, 3), |_| true));
        assert!(!threatens(view, pos(3, 3), &slide_east(), pos(5, 3), |_| false));
        assert!(!threatens(view, pos(3, 3), &slide_east(), pos(6, 3), |_| true));
    }
}
