#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Perk accumulation and drafting.
//!
//! The [`ModifierStore`] collects every drafted effect for a run and resolves
//! them into per-floor loadouts and wave rosters once per floor; spawned
//! pieces keep whatever the store said at their floor start. [`PerkDecks`]
//! deals the between-floor draft from a seeded stream so runs replay exactly.

use king_defence_core::{
    Delta, EnemyKind, EnemyLoadout, FloorLoadouts, Health, MovementPattern, PatternKind, SoulRules,
    WeaponSpec, DEFAULT_SHIELD_CHARGES, ENEMY_EXECUTION_ORDER,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Enemy counts fielded before any count perks are drafted.
const BASE_WAVE: [(EnemyKind, u32); 6] = [
    (EnemyKind::King, 1),
    (EnemyKind::Queen, 0),
    (EnemyKind::Rook, 1),
    (EnemyKind::Bishop, 1),
    (EnemyKind::Knight, 1),
    (EnemyKind::Pawn, 4),
];

/// Which pattern table of an enemy kind a perk rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternChannel {
    /// Only the movement table.
    Movement,
    /// Only the threat table.
    Threat,
    /// Movement and threat together.
    Both,
}

/// One effect a drafted perk applies to the modifier store.
#[derive(Clone, Debug, PartialEq)]
pub enum PerkEffect {
    /// Shifts the spawn health of one enemy kind.
    EnemyHealth {
        /// Kind the delta applies to.
        kind: EnemyKind,
        /// Hit points added (or removed when negative).
        delta: i32,
    },
    /// Shifts the post-move cooldown of one enemy kind.
    EnemySpeed {
        /// Kind the delta applies to.
        kind: EnemyKind,
        /// Cooldown turns added; negative deltas make the kind act sooner.
        delta: i32,
    },
    /// Shifts how many pieces of one kind the wave fields.
    EnemyCount {
        /// Kind the delta applies to.
        kind: EnemyKind,
        /// Pieces added to the roster (or removed when negative).
        delta: i32,
    },
    /// Rewrites one enemy kind's pattern tables.
    EnemyPatterns {
        /// Kind the patterns apply to.
        kind: EnemyKind,
        /// Table(s) the patterns land in.
        channel: PatternChannel,
        /// Patterns appended to, or substituted for, the current table.
        patterns: Vec<MovementPattern>,
        /// `true` discards the accumulated table before installing these.
        replace: bool,
    },
    /// Shifts the magazine capacity of the player's weapon.
    MagazineCapacity {
        /// Shells added to the magazine.
        delta: i32,
    },
    /// Shifts the reserve ammunition limit.
    ReserveLimit {
        /// Shells added to the reserve cap.
        delta: i32,
    },
    /// Shifts how many shells each reload moves into the magazine.
    ReloadAmount {
        /// Shells added per reload.
        delta: i32,
    },
    /// Shifts how many pellets each shot releases.
    Pellets {
        /// Pellets added per shot.
        delta: i32,
    },
    /// Shifts the longest pellet flight, in tiles.
    Range {
        /// Tiles added to the maximum range.
        delta: i32,
    },
    /// Shifts the full width of the spread cone, in degrees.
    Arc {
        /// Degrees added to the cone; negative deltas tighten the spread.
        delta: i32,
    },
    /// Shifts how many soul slots the player carries.
    SoulSlots {
        /// Slots added.
        delta: i32,
    },
    /// Makes soul moves suspend the player turn instead of ending it.
    SoulMoveKeepsTurn,
}

/// Accumulated pattern overrides for one table of one kind.
#[derive(Clone, Debug, Default)]
struct PatternState {
    /// Replacement table from the latest `replace` perk, if any.
    replaced: Option<Vec<MovementPattern>>,
    /// Appends collected since the latest replacement.
    appended: Vec<MovementPattern>,
}

impl PatternState {
    fn apply(&mut self, patterns: &[MovementPattern], replace: bool) {
        if replace {
            self.replaced = Some(patterns.to_vec());
            self.appended.clear();
        } else {
            self.appended.extend_from_slice(patterns);
        }
    }

    fn resolve(&self, base: &[MovementPattern]) -> Vec<MovementPattern> {
        let mut table = match &self.replaced {
            Some(replacement) => replacement.clone(),
            None => base.to_vec(),
        };
        table.extend_from_slice(&self.appended);
        table
    }
}

/// Accumulated deltas for one enemy kind.
#[derive(Clone, Debug, Default)]
struct KindState {
    health: i32,
    speed: i32,
    count: i32,
    movement: PatternState,
    threat: PatternState,
}

/// Every drafted effect of the run, resolvable into floor loadouts.
///
/// Deltas accumulate additively; resolution clamps the results so no kind
/// drops below one hit point or a one-turn cooldown.
#[derive(Clone, Debug)]
pub struct ModifierStore {
    kinds: Vec<(EnemyKind, KindState)>,
    magazine: i32,
    reserve_limit: i32,
    reload_amount: i32,
    pellets: i32,
    range: i32,
    arc: i32,
    soul_slots: i32,
    soul_move_keeps_turn: bool,
}

impl Default for ModifierStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifierStore {
    /// Creates an empty store; resolution then reproduces the baselines.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: ENEMY_EXECUTION_ORDER
                .iter()
                .map(|kind| (*kind, KindState::default()))
                .collect(),
            magazine: 0,
            reserve_limit: 0,
            reload_amount: 0,
            pellets: 0,
            range: 0,
            arc: 0,
            soul_slots: 0,
            soul_move_keeps_turn: false,
        }
    }

    /// Folds one effect into the store.
    pub fn apply(&mut self, effect: &PerkEffect) {
        match effect {
            PerkEffect::EnemyHealth { kind, delta } => self.kind_state_mut(*kind).health += delta,
            PerkEffect::EnemySpeed { kind, delta } => self.kind_state_mut(*kind).speed += delta,
            PerkEffect::EnemyCount { kind, delta } => self.kind_state_mut(*kind).count += delta,
            PerkEffect::EnemyPatterns {
                kind,
                channel,
                patterns,
                replace,
            } => {
                let state = self.kind_state_mut(*kind);
                if matches!(channel, PatternChannel::Movement | PatternChannel::Both) {
                    state.movement.apply(patterns, *replace);
                }
                if matches!(channel, PatternChannel::Threat | PatternChannel::Both) {
                    state.threat.apply(patterns, *replace);
                }
            }
            PerkEffect::MagazineCapacity { delta } => self.magazine += delta,
            PerkEffect::ReserveLimit { delta } => self.reserve_limit += delta,
            PerkEffect::ReloadAmount { delta } => self.reload_amount += delta,
            PerkEffect::Pellets { delta } => self.pellets += delta,
            PerkEffect::Range { delta } => self.range += delta,
            PerkEffect::Arc { delta } => self.arc += delta,
            PerkEffect::SoulSlots { delta } => self.soul_slots += delta,
            PerkEffect::SoulMoveKeepsTurn => self.soul_move_keeps_turn = true,
        }
    }

    /// Resolves the effective template for one enemy kind.
    #[must_use]
    pub fn resolve(&self, kind: EnemyKind) -> EnemyLoadout {
        match self.kinds.iter().find(|(entry, _)| *entry == kind) {
            Some((_, state)) => EnemyLoadout {
                max_health: Health::new(add_clamped(kind.base_health().get(), state.health, 1)),
                speed: add_clamped(kind.base_speed(), state.speed, 1),
                movement: state.movement.resolve(kind.base_movement()),
                threat: state.threat.resolve(kind.base_threat()),
            },
            None => kind.base_loadout(),
        }
    }

    /// Resolves everything the world caches at floor start.
    #[must_use]
    pub fn floor_loadouts(&self) -> FloorLoadouts {
        let base_souls = SoulRules::default_loadout();
        FloorLoadouts {
            enemies: ENEMY_EXECUTION_ORDER
                .iter()
                .map(|kind| (*kind, self.resolve(*kind)))
                .collect(),
            weapon: self.weapon_spec(),
            shield_charges: DEFAULT_SHIELD_CHARGES,
            souls: SoulRules {
                slots: add_clamped(base_souls.slots, self.soul_slots, 0),
                move_keeps_turn: base_souls.move_keeps_turn || self.soul_move_keeps_turn,
            },
        }
    }

    /// Wave composition for the next floor: the base roster plus count
    /// deltas, clamped so the wave always fields at least one king.
    #[must_use]
    pub fn wave_roster(&self) -> Vec<(EnemyKind, u32)> {
        BASE_WAVE
            .iter()
            .map(|&(kind, base)| {
                let minimum = u32::from(kind == EnemyKind::King);
                (kind, add_clamped(base, self.count_delta(kind), minimum))
            })
            .collect()
    }

    fn weapon_spec(&self) -> WeaponSpec {
        let base = WeaponSpec::default_loadout();
        WeaponSpec {
            pellets: add_clamped(base.pellets, self.pellets, 1),
            arc_degrees: (base.arc_degrees + self.arc as f32).clamp(0.0, 360.0),
            max_range: (base.max_range + self.range as f32).max(base.min_range),
            magazine: add_clamped(base.magazine, self.magazine, 1),
            reserve_limit: add_clamped(base.reserve_limit, self.reserve_limit, 0),
            reload_amount: add_clamped(base.reload_amount, self.reload_amount, 1),
            ..base
        }
    }

    fn count_delta(&self, kind: EnemyKind) -> i32 {
        self.kinds
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map_or(0, |(_, state)| state.count)
    }

    fn kind_state_mut(&mut self, kind: EnemyKind) -> &mut KindState {
        let index = match self.kinds.iter().position(|(entry, _)| *entry == kind) {
            Some(index) => index,
            None => {
                self.kinds.push((kind, KindState::default()));
                self.kinds.len() - 1
            }
        };
        &mut self.kinds[index].1
    }
}

fn add_clamped(base: u32, delta: i32, minimum: u32) -> u32 {
    let shifted = i64::from(base) + i64::from(delta);
    shifted.clamp(i64::from(minimum), i64::from(u32::MAX)) as u32
}

/// One draftable perk: a label, its effects, and whether it can recur.
#[derive(Clone, Debug, PartialEq)]
pub struct PerkCard {
    /// Short label shown when the draft is presented.
    pub name: &'static str,
    /// Whether the card stays in its deck after being chosen.
    pub repeatable: bool,
    /// Effects applied to the store when the card is chosen.
    pub effects: Vec<PerkEffect>,
}

/// One floor's draft: candidate cards for each side of the bargain.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    /// Cards that strengthen the player; the driver picks one.
    pub player: Vec<PerkCard>,
    /// Cards that strengthen the wave; the driver picks one.
    pub enemy: Vec<PerkCard>,
}

/// Drafting state: a seeded stream dealing from two shrinking decks.
#[derive(Clone, Debug)]
pub struct PerkDecks {
    rng: ChaCha8Rng,
    player: Vec<PerkCard>,
    enemy: Vec<PerkCard>,
}

impl PerkDecks {
    /// Creates the built-in decks with a seeded dealing stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            player: default_player_deck(),
            enemy: default_enemy_deck(),
        }
    }

    /// Deals up to two distinct cards from each deck for one draft.
    pub fn deal(&mut self) -> Draft {
        Draft {
            player: deal_from(&mut self.rng, &self.player),
            enemy: deal_from(&mut self.rng, &self.enemy),
        }
    }

    /// Applies a chosen card to the store and retires it from its deck
    /// unless it is repeatable.
    pub fn choose(&mut self, card: &PerkCard, store: &mut ModifierStore) {
        for effect in &card.effects {
            store.apply(effect);
        }
        if !card.repeatable {
            self.player.retain(|entry| entry != card);
            self.enemy.retain(|entry| entry != card);
        }
    }

    /// Remaining cards in the player deck.
    #[must_use]
    pub fn player_deck(&self) -> &[PerkCard] {
        &self.player
    }

    /// Remaining cards in the enemy deck.
    #[must_use]
    pub fn enemy_deck(&self) -> &[PerkCard] {
        &self.enemy
    }
}

fn deal_from(rng: &mut ChaCha8Rng, deck: &[PerkCard]) -> Vec<PerkCard> {
    match deck.len() {
        0 => Vec::new(),
        1 => vec![deck[0].clone()],
        len => {
            let first = rng.gen_range(0..len);
            let mut second = rng.gen_range(0..len - 1);
            if second >= first {
                second += 1;
            }
            vec![deck[first].clone(), deck[second].clone()]
        }
    }
}

const fn jump(dx: i8, dy: i8) -> MovementPattern {
    MovementPattern::new(Delta::new(dx, dy), PatternKind::Jump)
}

const fn stride(dx: i8, dy: i8, max_distance: u8) -> MovementPattern {
    MovementPattern::new(Delta::new(dx, dy), PatternKind::FiniteStep { max_distance })
}

fn card(name: &'static str, repeatable: bool, effects: Vec<PerkEffect>) -> PerkCard {
    PerkCard {
        name,
        repeatable,
        effects,
    }
}

fn default_player_deck() -> Vec<PerkCard> {
    vec![
        card("Heavy shells", true, vec![PerkEffect::Pellets { delta: 2 }]),
        card("Long barrel", true, vec![PerkEffect::Range { delta: 1 }]),
        card("Choked spread", true, vec![PerkEffect::Arc { delta: -10 }]),
        card(
            "Extended magazine",
            true,
            vec![PerkEffect::MagazineCapacity { delta: 1 }],
        ),
        card(
            "Deep reserves",
            true,
            vec![PerkEffect::ReserveLimit { delta: 2 }],
        ),
        card(
            "Fast loader",
            true,
            vec![PerkEffect::ReloadAmount { delta: 1 }],
        ),
        card("Soul gourd", true, vec![PerkEffect::SoulSlots { delta: 1 }]),
        card("Lingering souls", false, vec![PerkEffect::SoulMoveKeepsTurn]),
        card(
            "Culled ranks",
            true,
            vec![PerkEffect::EnemyCount {
                kind: EnemyKind::Pawn,
                delta: -1,
            }],
        ),
        card(
            "Brittle rooks",
            true,
            vec![PerkEffect::EnemyHealth {
                kind: EnemyKind::Rook,
                delta: -1,
            }],
        ),
        card(
            "Leaden pieces",
            true,
            vec![PerkEffect::EnemySpeed {
                kind: EnemyKind::Knight,
                delta: 1,
            }],
        ),
        card(
            "Hobbled knights",
            false,
            vec![PerkEffect::EnemyPatterns {
                kind: EnemyKind::Knight,
                channel: PatternChannel::Both,
                patterns: vec![jump(1, 1), jump(-1, 1), jump(-1, -1), jump(1, -1)],
                replace: true,
            }],
        ),
    ]
}

fn default_enemy_deck() -> Vec<PerkCard> {
    vec![
        card(
            "Royal guard",
            true,
            vec![PerkEffect::EnemyCount {
                kind: EnemyKind::Queen,
                delta: 1,
            }],
        ),
        card(
            "Pawn storm",
            true,
            vec![PerkEffect::EnemyCount {
                kind: EnemyKind::Pawn,
                delta: 2,
            }],
        ),
        card(
            "Hardened rooks",
            true,
            vec![PerkEffect::EnemyHealth {
                kind: EnemyKind::Rook,
                delta: 1,
            }],
        ),
        card(
            "Eager pawns",
            true,
            vec![PerkEffect::EnemySpeed {
                kind: EnemyKind::Pawn,
                delta: -1,
            }],
        ),
        card(
            "Marching pawns",
            false,
            vec![PerkEffect::EnemyPatterns {
                kind: EnemyKind::Pawn,
                channel: PatternChannel::Movement,
                patterns: vec![stride(0, -1, 2)],
                replace: true,
            }],
        ),
        card(
            "Spearhead pawns",
            false,
            vec![PerkEffect::EnemyPatterns {
                kind: EnemyKind::Pawn,
                channel: PatternChannel::Threat,
                patterns: vec![jump(0, -1)],
                replace: false,
            }],
        ),
        card(
            "Crowned bishops",
            false,
            vec![PerkEffect::EnemyPatterns {
                kind: EnemyKind::Bishop,
                channel: PatternChannel::Both,
                patterns: vec![jump(1, 0), jump(-1, 0), jump(0, 1), jump(0, -1)],
                replace: false,
            }],
        ),
    ]
}
