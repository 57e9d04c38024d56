//! Turn state machine and the action scheduler backing its barrier.

use std::time::Duration;

use king_defence_core::{PieceId, TurnState};

/// Presentation time a piece move blocks the action phase for.
pub(crate) const MOVE_TWEEN: Duration = Duration::from_millis(300);

/// Presentation time a dying piece blocks the action phase for.
pub(crate) const DEATH_FADE: Duration = Duration::from_millis(1000);

/// Presentation time a promotion replacement blocks the action phase for.
pub(crate) const PROMOTION_FADE: Duration = Duration::from_millis(1000);

/// Presentation time the capture animation blocks the action phase for.
pub(crate) const CAPTURE_FADE: Duration = Duration::from_millis(1000);

/// What happens when the action phase's pending set drains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AdvanceMode {
    /// Hand control to the other side.
    Advance,
    /// Resume the suspended turn (soul move that keeps the player turn).
    Hold,
    /// End the battle: the run or the floor is over.
    Conclude,
}

/// Outcome of resolving a drained action phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Control advanced to a fresh turn.
    Advanced(TurnState),
    /// The suspended turn resumed mid-flight.
    Resumed(TurnState),
    /// The battle ended.
    Concluded,
}

/// Tracks which phase holds control and how the next barrier resolves.
#[derive(Clone, Debug)]
pub(crate) struct TurnFlow {
    state: TurnState,
    suspended: TurnState,
    advance: AdvanceMode,
    round: u32,
}

impl TurnFlow {
    pub(crate) fn new() -> Self {
        Self {
            state: TurnState::None,
            suspended: TurnState::None,
            advance: AdvanceMode::Advance,
            round: 0,
        }
    }

    pub(crate) fn state(&self) -> TurnState {
        self.state
    }

    pub(crate) fn round(&self) -> u32 {
        self.round
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn begin_battle(&mut self) {
        debug_assert_eq!(self.state, TurnState::None);
        self.state = TurnState::EnemyTurn;
    }

    /// Enters the action phase, recording which turn it interrupts and how
    /// control moves on once the pending set drains.
    pub(crate) fn suspend(&mut self, advance: AdvanceMode) {
        debug_assert_ne!(self.state, TurnState::ActionPhase);
        self.suspended = self.state;
        self.advance = advance;
        self.state = TurnState::ActionPhase;
    }

    /// Resolves a drained action phase into the next turn.
    pub(crate) fn resolve(&mut self) -> Resolution {
        debug_assert_eq!(self.state, TurnState::ActionPhase);
        match self.advance {
            AdvanceMode::Advance => {
                let next = match self.suspended {
                    TurnState::PlayerTurn => TurnState::EnemyTurn,
                    TurnState::EnemyTurn => TurnState::PlayerTurn,
                    TurnState::None | TurnState::ActionPhase => TurnState::None,
                };
                if next == TurnState::PlayerTurn {
                    self.round += 1;
                }
                self.state = next;
                Resolution::Advanced(next)
            }
            AdvanceMode::Hold => {
                self.state = self.suspended;
                Resolution::Resumed(self.state)
            }
            AdvanceMode::Conclude => {
                self.state = TurnState::None;
                Resolution::Concluded
            }
        }
    }
}

/// Effect applied when a scheduled action's delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActionEffect {
    /// Pure time block holding the barrier open.
    Hold,
    /// Delayed damage landing on a piece (which may have died meanwhile).
    Damage {
        piece: PieceId,
        amount: u32,
    },
}

#[derive(Clone, Debug)]
struct PendingAction {
    remaining: Duration,
    effect: ActionEffect,
}

/// Queue of in-flight actions keeping the action phase open.
///
/// Registration happens while a turn's command batch is applied; the queue is
/// polled only by later `Tick` commands, so every action of a batch is in the
/// queue before the barrier is first tested.
#[derive(Clone, Debug)]
pub(crate) struct ActionScheduler {
    pending: Vec<PendingAction>,
}

impl ActionScheduler {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, delay: Duration, effect: ActionEffect) {
        self.pending.push(PendingAction {
            remaining: delay,
            effect,
        });
    }

    /// Advances every pending delay and returns the effects that came due,
    /// in registration order.
    pub(crate) fn advance(&mut self, dt: Duration) -> Vec<ActionEffect> {
        for action in &mut self.pending {
            action.remaining = action.remaining.saturating_sub(dt);
        }
        let (due, keep): (Vec<PendingAction>, Vec<PendingAction>) = self
            .pending
            .drain(..)
            .partition(|action| action.remaining.is_zero());
        self.pending = keep;
        due.into_iter().map(|action| action.effect).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}
