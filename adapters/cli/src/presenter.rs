//! Text presentation of the board and the event stream.

use king_defence_core::{
    BoardPos, EnemyKind, Event, Faction, PieceView, BOARD_COLUMNS, BOARD_ROWS,
};

const fn glyph(faction: Faction) -> char {
    match faction {
        Faction::Player => '@',
        Faction::Enemy(EnemyKind::Pawn) => 'P',
        Faction::Enemy(EnemyKind::King) => 'K',
        Faction::Enemy(EnemyKind::Queen) => 'Q',
        Faction::Enemy(EnemyKind::Bishop) => 'B',
        Faction::Enemy(EnemyKind::Rook) => 'R',
        Faction::Enemy(EnemyKind::Knight) => 'N',
    }
}

/// Renders the board with row 7 on top. Enemies holding a telegraph show
/// uppercase; enemies still on cooldown show lowercase.
pub(crate) fn board(view: &PieceView) -> String {
    let mut cells = [['.'; BOARD_COLUMNS as usize]; BOARD_ROWS as usize];
    for piece in view.iter() {
        let mut mark = glyph(piece.faction);
        if matches!(piece.faction, Faction::Enemy(_)) && !piece.ready {
            mark = mark.to_ascii_lowercase();
        }
        cells[piece.position.row() as usize][piece.position.column() as usize] = mark;
    }

    let mut out = String::new();
    for row in (0..BOARD_ROWS).rev() {
        out.push_str(&format!("{row} |"));
        for column in 0..BOARD_COLUMNS {
            out.push(' ');
            out.push(cells[row as usize][column as usize]);
        }
        out.push('\n');
    }
    out.push_str("   ");
    for column in 0..BOARD_COLUMNS {
        out.push(' ');
        out.push_str(&column.to_string());
    }
    out
}

fn tile(at: BoardPos) -> String {
    format!("({}, {})", at.column(), at.row())
}

/// Human-readable line for one event, or `None` for pure plumbing.
pub(crate) fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::TimeAdvanced { .. }
        | Event::TurnChanged { .. }
        | Event::ShieldRestored { .. }
        | Event::EnemyCooldownStepped { .. } => return None,
        Event::FloorStarted { floor } => format!("=== floor {floor} ==="),
        Event::PieceSpawned { piece, faction, at } => match faction {
            Faction::Player => format!("the king takes the field at {}", tile(*at)),
            Faction::Enemy(kind) => {
                format!("{kind:?} #{} stands at {}", piece.get(), tile(*at))
            }
        },
        Event::RoundStarted { round } => format!("-- round {round} --"),
        Event::PieceMoved { piece, from, to, .. } => {
            format!("piece #{} moves {} -> {}", piece.get(), tile(*from), tile(*to))
        }
        Event::PlayerMoveRejected { to, reason } => {
            format!("move to {} refused: {reason}", tile(*to))
        }
        Event::EnemyMoveRejected { piece, to, reason } => {
            format!("enemy #{} move to {} refused: {reason}", piece.get(), tile(*to))
        }
        Event::FireRejected { reason } => format!("shot refused: {reason}"),
        Event::SoulRejected { reason } => format!("soul selection refused: {reason}"),
        Event::ShieldSpent { remaining } => {
            format!("a shield charge absorbs the action ({remaining} left)")
        }
        Event::ThreatShown { piece, tile: at } => {
            format!("enemy #{} threatens {}", piece.get(), tile(*at))
        }
        Event::WeaponFired {
            pellets,
            magazine_remaining,
        } => format!("fired {pellets} pellets ({magazine_remaining} shells left)"),
        Event::WeaponReloaded { magazine, reserve } => {
            format!("reloaded: {magazine} in the magazine, {reserve} in reserve")
        }
        Event::ReserveRegenerated { reserve } => format!("reserve regenerates to {reserve}"),
        Event::PieceDamaged {
            piece,
            damage,
            remaining,
        } => format!(
            "piece #{} takes {damage} damage ({} hp left)",
            piece.get(),
            remaining.get()
        ),
        Event::PieceDied { piece, at } => {
            format!("piece #{} dies at {}", piece.get(), tile(*at))
        }
        Event::SoulHarvested { slot, kind } => {
            format!("a {kind:?} soul fills slot {slot}")
        }
        Event::SoulModeEntered { kind, .. } => format!("soul mode: moving as a {kind:?}"),
        Event::SoulModeExited => String::from("soul mode ends"),
        Event::SoulSpent { kind, .. } => format!("the {kind:?} soul is spent"),
        Event::PawnPromoted {
            pawn, replacement, ..
        } => format!(
            "pawn #{} is crowned queen #{}",
            pawn.get(),
            replacement.get()
        ),
        Event::EnemyReadinessChanged { piece, ready } => {
            if *ready {
                format!("enemy #{} telegraphs its next move", piece.get())
            } else {
                format!("enemy #{} stands down", piece.get())
            }
        }
        Event::PlayerCaptured { by } => format!("the king falls to enemy #{}", by.get()),
        Event::FloorCleared { floor } => format!("floor {floor} cleared"),
    };
    Some(line)
}
