//! Candidate conditions.
//!
//! Several attacks may end on the same combo node, each guarded by a
//! [`Condition`]. The resolver picks the first enabled candidate whose
//! condition holds for the actor at the moment of the input.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::resolver::ResolverConfig;

/// When a candidate attack may be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Always.
    #[default]
    None,
    /// While the actor is airborne.
    OnAir,
    /// Shortly after a regular block.
    AfterBlock,
    /// Shortly after a perfect block.
    AfterPerfectBlock,
    /// While moving in the facing direction.
    RunningForward,
    /// While moving against the facing direction.
    RunningBackwards,
    /// While the stick points in the facing direction.
    InputForward,
    /// While the stick points against the facing direction.
    InputBackwards,
}

/// Everything a condition can look at.
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    /// The actor attempting the attack.
    pub actor: &'a dyn Actor,
    /// Thresholds and windows.
    pub config: &'a ResolverConfig,
    /// Current time in seconds.
    pub now: f64,
    /// When the last regular block happened, if it is still flagged.
    pub block: Option<f64>,
    /// When the last perfect block happened, if it is still flagged.
    pub perfect_block: Option<f64>,
}

impl ConditionContext<'_> {
    fn within_window(&self, stamp: Option<f64>) -> bool {
        stamp.is_some_and(|at| self.now - at <= self.config.block_window)
    }
}

impl Condition {
    /// Whether the condition holds.
    #[must_use]
    pub fn matches(self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Condition::None => true,
            Condition::OnAir => !ctx.actor.is_grounded(),
            Condition::AfterBlock => ctx.within_window(ctx.block),
            Condition::AfterPerfectBlock => ctx.within_window(ctx.perfect_block),
            Condition::RunningForward => movement_angle(ctx.actor, ctx.config)
                .is_some_and(|angle| angle.abs() <= ctx.config.forward_angle),
            Condition::RunningBackwards => movement_angle(ctx.actor, ctx.config)
                .is_some_and(|angle| angle.abs() >= ctx.config.backward_angle),
            Condition::InputForward => input_angle(ctx.actor, ctx.config)
                .is_some_and(|angle| angle.abs() <= ctx.config.forward_angle),
            Condition::InputBackwards => input_angle(ctx.actor, ctx.config)
                .is_some_and(|angle| angle.abs() >= ctx.config.backward_angle),
        }
    }
}

/// Signed angle in degrees from `from` to `to`, measured on the XZ plane.
///
/// Returns `None` when either vector has no planar component.
#[must_use]
pub fn planar_angle(from: Vec3, to: Vec3) -> Option<f32> {
    let a = flatten(from)?;
    let b = flatten(to)?;
    Some(a.perp_dot(b).atan2(a.dot(b)).to_degrees())
}

/// Angle between facing and movement, or `None` below the minimum speed.
#[must_use]
pub fn movement_angle(actor: &dyn Actor, config: &ResolverConfig) -> Option<f32> {
    let velocity = actor.movement_direction()?;
    if planar(velocity).length() < config.min_move_speed {
        return None;
    }
    planar_angle(actor.forward_direction(), velocity)
}

/// Angle between facing and stick input mapped through the camera, or
/// `None` below the minimum input magnitude.
#[must_use]
pub fn input_angle(actor: &dyn Actor, config: &ResolverConfig) -> Option<f32> {
    let input = actor.input_direction()?;
    if input.length() < config.min_input_magnitude {
        return None;
    }
    let world = actor.camera_rotation() * Vec3::new(input.x, 0.0, input.y);
    planar_angle(actor.forward_direction(), world)
}

fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

fn flatten(v: Vec3) -> Option<Vec2> {
    let flat = planar(v);
    (flat.length_squared() > f32::EPSILON).then_some(flat)
}
