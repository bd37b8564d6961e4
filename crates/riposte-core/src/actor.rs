//! Actor state queried during combo selection.
//!
//! The resolver never owns locomotion or physics. It asks the host through
//! [`Actor`] only for the facts a candidate condition needs.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Host-side view of the actor performing combos.
///
/// World up is `+Y`. Directions are compared on the XZ plane.
pub trait Actor {
    /// Whether the actor stands on the ground.
    fn is_grounded(&self) -> bool;

    /// Current planar velocity. Its length is the movement speed.
    fn movement_direction(&self) -> Option<Vec3>;

    /// Direction the actor faces.
    fn forward_direction(&self) -> Vec3;

    /// Raw stick input, `x` right and `y` forward relative to the camera.
    fn input_direction(&self) -> Option<Vec2>;

    /// Camera orientation used to map raw input into the world.
    fn camera_rotation(&self) -> Quat {
        Quat::IDENTITY
    }

    /// Whether locomotion currently locks the actor out of new attacks.
    fn is_busy(&self) -> bool;
}

/// Plain snapshot of actor state, for hosts that gather it once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    /// See [`Actor::is_grounded`].
    pub grounded: bool,
    /// See [`Actor::movement_direction`].
    pub velocity: Option<Vec3>,
    /// See [`Actor::forward_direction`].
    pub forward: Vec3,
    /// See [`Actor::input_direction`].
    pub input: Option<Vec2>,
    /// See [`Actor::camera_rotation`].
    pub camera: Quat,
    /// See [`Actor::is_busy`].
    pub busy: bool,
}

impl Default for ActorState {
    fn default() -> Self {
        Self {
            grounded: true,
            velocity: None,
            forward: Vec3::Z,
            input: None,
            camera: Quat::IDENTITY,
            busy: false,
        }
    }
}

impl ActorState {
    /// A grounded, idle actor facing `+Z`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy that is airborne.
    #[must_use]
    pub fn airborne(mut self) -> Self {
        self.grounded = false;
        self
    }

    /// Returns a copy moving with `velocity`.
    #[must_use]
    pub fn moving(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Returns a copy facing `forward`.
    #[must_use]
    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward;
        self
    }

    /// Returns a copy holding stick input `input` under camera `camera`.
    #[must_use]
    pub fn with_input(mut self, input: Vec2, camera: Quat) -> Self {
        self.input = Some(input);
        self.camera = camera;
        self
    }

    /// Returns a copy with the busy flag set to `busy`.
    #[must_use]
    pub fn busy(mut self, busy: bool) -> Self {
        self.busy = busy;
        self
    }
}

impl Actor for ActorState {
    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn movement_direction(&self) -> Option<Vec3> {
        self.velocity
    }

    fn forward_direction(&self) -> Vec3 {
        self.forward
    }

    fn input_direction(&self) -> Option<Vec2> {
        self.input
    }

    fn camera_rotation(&self) -> Quat {
        self.camera
    }

    fn is_busy(&self) -> bool {
        self.busy
    }
}
