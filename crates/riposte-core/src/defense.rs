//! Blocking and poise.
//!
//! A [`Guard`] absorbs hits from the front while raised, spending defense.
//! Raising it just before a hit lands is a perfect block, which costs
//! nothing. [`Poise`] soaks unblocked hits until it breaks into a stagger.
//!
//! [`Defender`] ties both to a [`ComboResolver`]: blocks set the resolver's
//! block flags so counter attacks (`AfterBlock`, `AfterPerfectBlock`) become
//! available, and staggers interrupt the current combo.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::condition::planar_angle;
use crate::resolver::ComboResolver;

/// An incoming attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Direction the attack travels, from attacker toward defender.
    pub direction: Vec3,
    /// Poise removed when the hit is not blocked.
    pub poise_damage: f32,
    /// Defense removed when the hit is blocked.
    pub defense_damage: f32,
    /// Whether a guard can stop the hit at all.
    pub blockable: bool,
}

impl Hit {
    /// A blockable hit with no damage.
    #[must_use]
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction,
            poise_damage: 0.0,
            defense_damage: 0.0,
            blockable: true,
        }
    }

    /// Returns a copy with poise damage.
    #[must_use]
    pub fn with_poise_damage(mut self, poise_damage: f32) -> Self {
        self.poise_damage = poise_damage;
        self
    }

    /// Returns a copy with defense damage.
    #[must_use]
    pub fn with_defense_damage(mut self, defense_damage: f32) -> Self {
        self.defense_damage = defense_damage;
        self
    }

    /// Returns an unblockable copy.
    #[must_use]
    pub fn unblockable(mut self) -> Self {
        self.blockable = false;
        self
    }
}

/// How a hit was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitReaction {
    /// Blocked right after raising the guard. No defense spent.
    PerfectBlock,
    /// Blocked, spending defense.
    Blocked,
    /// Blocked, but defense ran out and the guard dropped.
    GuardBroken,
    /// Not blocked.
    Unblocked,
}

impl HitReaction {
    /// Whether the guard stopped the hit.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        !matches!(self, HitReaction::Unblocked)
    }
}

/// Guard tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Defense of a full guard.
    pub max_defense: f32,
    /// Seconds after raising during which blocks are perfect.
    pub perfect_window: f64,
    /// Largest angle in degrees between facing and the attacker that can
    /// be blocked.
    pub block_angle: f32,
    /// Defense regained per second.
    pub regen_rate: f32,
    /// Seconds after a block before defense regenerates.
    pub regen_delay: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_defense: 100.0,
            perfect_window: 0.2,
            block_angle: 90.0,
            regen_rate: 25.0,
            regen_delay: 1.0,
        }
    }
}

/// Poise tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoiseConfig {
    /// Poise when fully recovered.
    pub max_poise: f32,
    /// Poise regained per second.
    pub regen_rate: f32,
    /// Seconds after a hit before poise regenerates.
    pub regen_delay: f64,
}

impl Default for PoiseConfig {
    fn default() -> Self {
        Self {
            max_poise: 50.0,
            regen_rate: 10.0,
            regen_delay: 2.0,
        }
    }
}

/// Delayed linear regeneration driven by timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Regen {
    last_tick: Option<f64>,
    last_hit: Option<f64>,
}

impl Regen {
    fn hit(&mut self, now: f64) {
        self.last_hit = Some(now);
    }

    /// Amount regained between the previous tick and `now`.
    #[allow(clippy::cast_possible_truncation)]
    fn tick(&mut self, now: f64, rate: f32, delay: f64) -> f32 {
        let Some(previous) = self.last_tick.replace(now) else {
            return 0.0;
        };
        let from = self.last_hit.map_or(previous, |hit| previous.max(hit + delay));
        if now > from {
            rate * (now - from) as f32
        } else {
            0.0
        }
    }
}

/// A raisable guard with depletable defense.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    config: GuardConfig,
    defense: f32,
    raised_at: Option<f64>,
    regen: Regen,
}

impl Guard {
    /// A lowered guard at full defense.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self {
            defense: config.max_defense,
            config,
            raised_at: None,
            regen: Regen::default(),
        }
    }

    /// Raises the guard. Raising an already raised guard keeps the original
    /// time, so the perfect window cannot be refreshed by holding block.
    ///
    /// Returns `false` when there is no defense left to raise.
    pub fn raise(&mut self, now: f64) -> bool {
        if self.defense <= 0.0 {
            return false;
        }
        if self.raised_at.is_none() {
            self.raised_at = Some(now);
        }
        true
    }

    /// Lowers the guard.
    pub fn lower(&mut self) {
        self.raised_at = None;
    }

    /// Whether the guard is up.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised_at.is_some()
    }

    /// Remaining defense.
    #[must_use]
    pub fn defense(&self) -> f32 {
        self.defense
    }

    /// The guard's tuning.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Regains defense for the time since the last call.
    pub fn regenerate(&mut self, now: f64) {
        let gained = self
            .regen
            .tick(now, self.config.regen_rate, self.config.regen_delay);
        self.defense = (self.defense + gained).min(self.config.max_defense);
    }

    /// Receives `hit` while facing `facing`.
    pub fn absorb(&mut self, hit: &Hit, facing: Vec3, now: f64) -> HitReaction {
        let Some(raised_at) = self.raised_at else {
            return HitReaction::Unblocked;
        };
        if !hit.blockable {
            return HitReaction::Unblocked;
        }
        // The attacker stands opposite the hit's travel direction
        let in_arc = planar_angle(facing, -hit.direction)
            .is_some_and(|angle| angle.abs() <= self.config.block_angle);
        if !in_arc {
            return HitReaction::Unblocked;
        }

        self.regen.hit(now);
        if now - raised_at <= self.config.perfect_window {
            return HitReaction::PerfectBlock;
        }
        self.defense -= hit.defense_damage;
        if self.defense <= 0.0 {
            self.defense = 0.0;
            self.lower();
            HitReaction::GuardBroken
        } else {
            HitReaction::Blocked
        }
    }
}

/// Resistance to being staggered.
#[derive(Debug, Clone, PartialEq)]
pub struct Poise {
    config: PoiseConfig,
    value: f32,
    regen: Regen,
}

impl Poise {
    /// Full poise.
    #[must_use]
    pub fn new(config: PoiseConfig) -> Self {
        Self {
            value: config.max_poise,
            config,
            regen: Regen::default(),
        }
    }

    /// Current poise.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Removes `amount` poise. Returns `true` when poise breaks, in which
    /// case it resets to full.
    pub fn take(&mut self, amount: f32, now: f64) -> bool {
        if amount <= 0.0 {
            return false;
        }
        self.regen.hit(now);
        self.value -= amount;
        if self.value <= 0.0 {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Restores full poise.
    pub fn reset(&mut self) {
        self.value = self.config.max_poise;
    }

    /// Regains poise for the time since the last call.
    pub fn regenerate(&mut self, now: f64) {
        let gained = self
            .regen
            .tick(now, self.config.regen_rate, self.config.regen_delay);
        self.value = (self.value + gained).min(self.config.max_poise);
    }
}

/// Result of [`Defender::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseOutcome {
    /// How the guard handled the hit.
    pub reaction: HitReaction,
    /// Whether the defender was staggered.
    pub staggered: bool,
}

/// Guard and poise of one combatant.
#[derive(Debug, Clone, PartialEq)]
pub struct Defender {
    /// The guard.
    pub guard: Guard,
    /// The poise.
    pub poise: Poise,
}

impl Default for Defender {
    fn default() -> Self {
        Self::new(GuardConfig::default(), PoiseConfig::default())
    }
}

impl Defender {
    /// Creates a defender at full guard and poise.
    #[must_use]
    pub fn new(guard: GuardConfig, poise: PoiseConfig) -> Self {
        Self {
            guard: Guard::new(guard),
            poise: Poise::new(poise),
        }
    }

    /// Receives `hit` and reports it to `resolver`.
    ///
    /// Blocks flag the resolver for counters. A broken guard or broken poise
    /// staggers the defender and stops its combo.
    pub fn receive<P>(
        &mut self,
        hit: &Hit,
        facing: Vec3,
        resolver: &mut ComboResolver<P>,
    ) -> DefenseOutcome {
        let now = resolver.now();
        let reaction = self.guard.absorb(hit, facing, now);
        let staggered = match reaction {
            HitReaction::PerfectBlock => {
                resolver.on_perfect_block();
                false
            }
            HitReaction::Blocked => {
                resolver.on_block();
                false
            }
            HitReaction::GuardBroken => {
                self.poise.reset();
                true
            }
            HitReaction::Unblocked => self.poise.take(hit.poise_damage, now),
        };
        if staggered {
            tracing::debug!(?reaction, "defender staggered");
            resolver.stop();
        }
        DefenseOutcome {
            reaction,
            staggered,
        }
    }

    /// Regenerates guard and poise.
    pub fn regenerate(&mut self, now: f64) {
        self.guard.regenerate(now);
        self.poise.regenerate(now);
    }
}
