//! Collision event classification
//!
//! Every collider is summarized by a three-bit [`ClientObjectProperties`]
//! value. The pair of values indexes a fixed table deciding whether the pair
//! is ignored, reported as a trigger overlap, or resolved physically (and
//! which side moves).

use crate::ecs::components::{ColliderComponent, RigidBodyComponent};

bitflags::bitflags! {
    /// Per-collider classification bits
    ///
    /// The raw value is an index into the event table; only values `0..=5`
    /// are meaningful.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClientObjectProperties: u8 {
        /// Overlaps are reported but never resolved
        const TRIGGER = 0b001;
        /// The entity has no rigid body and never moves
        const NO_BODY = 0b010;
        /// The body moves only by its own velocity
        const KINEMATIC = 0b100;
    }
}

impl ClientObjectProperties {
    /// Properties of a collider given its (optional) rigid body
    pub fn from_components(collider: &ColliderComponent, body: Option<&RigidBodyComponent>) -> Self {
        let mut properties = Self::empty();
        properties.set(Self::TRIGGER, collider.is_trigger);
        match body {
            None => properties |= Self::NO_BODY,
            Some(body) => properties.set(Self::KINEMATIC, body.is_kinematic()),
        }
        properties
    }

    /// Properties of static concave geometry
    pub fn static_geometry() -> Self {
        Self::NO_BODY
    }

    /// Classify a pair
    pub fn event_type(self, other: Self) -> CollisionEventType {
        classify(self, other)
    }
}

/// What a pair of overlapping colliders produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEventType {
    /// Ignored
    None,
    /// Overlap notifications only
    Trigger,
    /// Contact resolution where only the first entity moves
    FirstBodyPhysics,
    /// Contact resolution where only the second entity moves
    SecondBodyPhysics,
    /// Contact resolution moving both entities
    TwoBodyPhysics,
}

impl CollisionEventType {
    /// Whether the pair gets contacts and a manifold
    pub fn is_physics(self) -> bool {
        matches!(
            self,
            Self::FirstBodyPhysics | Self::SecondBodyPhysics | Self::TwoBodyPhysics
        )
    }

    /// Whether the pair only drives trigger notifications
    pub fn is_trigger(self) -> bool {
        self == Self::Trigger
    }

    /// The same event seen with the entities swapped
    pub fn flipped(self) -> Self {
        match self {
            Self::FirstBodyPhysics => Self::SecondBodyPhysics,
            Self::SecondBodyPhysics => Self::FirstBodyPhysics,
            other => other,
        }
    }
}

use CollisionEventType::{
    FirstBodyPhysics as First, None as Ignore, SecondBodyPhysics as Second, Trigger,
    TwoBodyPhysics as Both,
};

/// Rows/columns: dynamic, dynamic trigger, static, static trigger,
/// kinematic, kinematic trigger
const EVENT_TABLE: [[CollisionEventType; 6]; 6] = [
    [Both, Trigger, First, Trigger, First, Trigger],
    [Trigger, Trigger, Trigger, Trigger, Trigger, Trigger],
    [Second, Trigger, Ignore, Ignore, Ignore, Trigger],
    [Trigger, Trigger, Ignore, Ignore, Trigger, Trigger],
    [Second, Trigger, Ignore, Trigger, Ignore, Trigger],
    [Trigger, Trigger, Trigger, Trigger, Trigger, Trigger],
];

/// Look up the event type of a pair
///
/// Values outside the table (a kinematic flag without a body) are ignored.
pub fn classify(a: ClientObjectProperties, b: ClientObjectProperties) -> CollisionEventType {
    let (row, column) = (a.bits() as usize, b.bits() as usize);
    if row < EVENT_TABLE.len() && column < EVENT_TABLE.len() {
        EVENT_TABLE[row][column]
    } else {
        CollisionEventType::None
    }
}
