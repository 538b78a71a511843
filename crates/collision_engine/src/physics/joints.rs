//! Joint storage
//!
//! Joints are anchor pairs between two entities. The pipeline stores them and
//! forgets the ones whose entities are destroyed; nothing in the contact solver
//! reads them.

use slotmap::{new_key_type, SlotMap};

use crate::ecs::{Entity, World};
use crate::foundation::math::Vec3;

new_key_type! {
    /// Handle to a stored joint
    pub struct JointKey;
}

/// Two entities held together at local anchors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    /// First entity
    pub entity_a: Entity,
    /// Second entity
    pub entity_b: Entity,
    /// Anchor in the first entity's local space
    pub anchor_a: Vec3,
    /// Anchor in the second entity's local space
    pub anchor_b: Vec3,
}

impl Joint {
    /// Whether the joint attaches to `entity`
    pub fn involves(&self, entity: Entity) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }
}

/// All joints in a scene
#[derive(Debug, Clone, Default)]
pub struct JointSet {
    joints: SlotMap<JointKey, Joint>,
}

impl JointSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a joint
    pub fn add_joint(&mut self, joint: Joint) -> JointKey {
        self.joints.insert(joint)
    }

    /// Remove one joint
    pub fn remove_joint(&mut self, key: JointKey) -> Option<Joint> {
        self.joints.remove(key)
    }

    /// Remove every joint attached to `entity`, returning how many went
    pub fn remove_all_joints(&mut self, entity: Entity) -> usize {
        let before = self.joints.len();
        self.joints.retain(|_, joint| !joint.involves(entity));
        before - self.joints.len()
    }

    /// Drop joints whose entities are gone
    pub fn prune(&mut self, world: &World) -> usize {
        let before = self.joints.len();
        self.joints
            .retain(|_, joint| world.is_alive(joint.entity_a) && world.is_alive(joint.entity_b));
        before - self.joints.len()
    }

    /// Joint behind a key
    pub fn get(&self, key: JointKey) -> Option<&Joint> {
        self.joints.get(key)
    }

    /// All joints
    pub fn iter(&self) -> impl Iterator<Item = (JointKey, &Joint)> {
        self.joints.iter()
    }

    /// Number of joints
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether there are no joints
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Remove every joint
    pub fn clear(&mut self) {
        self.joints.clear();
    }
}
