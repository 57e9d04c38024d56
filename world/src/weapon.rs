//! Ammunition accounting and pellet flight resolution.

use std::time::Duration;

use king_defence_core::{BoardPoint, OccupancyView, PieceId, WeaponSpec};

/// Sampling interval along a pellet ray, in tiles.
const RAY_STEP: f32 = 0.05;

/// Runtime ammunition counters for the player's weapon.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WeaponState {
    pub(crate) magazine: u32,
    pub(crate) reserve: u32,
}

/// What a move-triggered reload did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReloadOutcome {
    /// Shells moved from reserve into the magazine.
    Reloaded { magazine: u32, reserve: u32 },
    /// The magazine was full, so one reserve shell regenerated instead.
    Regenerated { reserve: u32 },
}

impl WeaponState {
    pub(crate) fn full(spec: &WeaponSpec) -> Self {
        Self {
            magazine: spec.magazine,
            reserve: spec.reserve_limit,
        }
    }

    /// Reload step performed whenever the player moves.
    pub(crate) fn reload(&mut self, spec: &WeaponSpec) -> Option<ReloadOutcome> {
        if self.magazine < spec.magazine && self.reserve > 0 {
            let moved = spec
                .reload_amount
                .min(spec.magazine - self.magazine)
                .min(self.reserve);
            self.magazine += moved;
            self.reserve -= moved;
            Some(ReloadOutcome::Reloaded {
                magazine: self.magazine,
                reserve: self.reserve,
            })
        } else if self.reserve < spec.reserve_limit {
            self.reserve += 1;
            Some(ReloadOutcome::Regenerated {
                reserve: self.reserve,
            })
        } else {
            None
        }
    }
}

/// Result of walking one pellet ray across the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PelletImpact {
    /// First enemy the pellet struck, if any.
    pub(crate) target: Option<PieceId>,
    /// Time the pellet spends in flight before impact or fizzle.
    pub(crate) flight: Duration,
}

/// Walks a pellet from `origin` along `angle` until it strikes a piece other
/// than the shooter, leaves the board, or exhausts its range.
pub(crate) fn resolve_pellet(
    occupancy: OccupancyView<'_>,
    shooter: PieceId,
    origin: BoardPoint,
    angle: f32,
    range: f32,
    speed: f32,
) -> PelletImpact {
    let (sin, cos) = angle.sin_cos();
    let mut travelled = RAY_STEP;

    while travelled <= range {
        let point = BoardPoint::new(origin.x() + cos * travelled, origin.y() + sin * travelled);
        match point.containing_tile() {
            None => break,
            Some(tile) => match occupancy.occupant(tile) {
                Some(occupant) if occupant != shooter => {
                    return PelletImpact {
                        target: Some(occupant),
                        flight: flight_time(travelled, speed),
                    };
                }
                _ => {}
            },
        }
        travelled += RAY_STEP;
    }

    PelletImpact {
        target: None,
        flight: flight_time(range, speed),
    }
}

fn flight_time(distance: f32, speed: f32) -> Duration {
    if speed <= f32::EPSILON {
        return Duration::ZERO;
    }
    Duration::from_secs_f32(distance.max(0.0) / speed)
}
