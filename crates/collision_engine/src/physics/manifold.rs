//! Persistent contact manifolds
//!
//! Narrow-phase results are merged into one manifold per entity pair. Each
//! manifold keeps up to four contacts across steps so the solver can warm
//! start, and a small state machine turns the stream of results into exactly
//! one enter and one exit notification per contact episode:
//!
//! - `New` (created this step): enter, then `Stale`
//! - `Persisting` (refreshed this step): stay, then `Stale`
//! - `Stale` (not refreshed this step): exit, then removed
//!
//! Trigger overlaps run the same machine without contacts.

use std::collections::BTreeMap;

use crate::ecs::components::{CollisionLogicComponent, CollisionNotification};
use crate::ecs::{Entity, World};
use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::physics::events::CollisionEventType;
use crate::physics::narrow_phase::{Contact, NarrowPhysicsResult};

/// Most contacts a manifold keeps
pub const MAX_CONTACTS: usize = 4;

/// Unordered entity pair, smaller entity first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityPair {
    /// Smaller entity
    pub first: Entity,
    /// Larger entity
    pub second: Entity,
}

impl EntityPair {
    /// Pair two entities in canonical order
    pub fn new(a: Entity, b: Entity) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Whether `(a, b)` is already in canonical order
    pub fn is_ordered(a: Entity, b: Entity) -> bool {
        a <= b
    }

    /// The entity of the pair that is not `entity`
    pub fn other(&self, entity: Entity) -> Entity {
        if entity == self.first {
            self.second
        } else {
            self.first
        }
    }
}

/// Where a pair is in its contact episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrowEventState {
    /// Detected this step for the first time
    New,
    /// Detected again this step
    Persisting,
    /// Not yet detected this step
    Stale,
}

/// Contact episode between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NarrowEvent {
    /// First entity
    pub first: Entity,
    /// Second entity
    pub second: Entity,
    /// Episode state
    pub state: NarrowEventState,
}

impl NarrowEvent {
    fn new(pair: EntityPair) -> Self {
        Self {
            first: pair.first,
            second: pair.second,
            state: NarrowEventState::New,
        }
    }

    /// Mark as detected this step
    fn refresh(&mut self) {
        if self.state == NarrowEventState::Stale {
            self.state = NarrowEventState::Persisting;
        }
    }
}

/// Persistent contact set of one physics pair
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Entities and episode state
    pub event: NarrowEvent,
    /// Classification for `(event.first, event.second)`
    pub event_type: CollisionEventType,
    contacts: Vec<Contact>,
}

impl Manifold {
    fn new(pair: EntityPair, event_type: CollisionEventType) -> Self {
        Self {
            event: NarrowEvent::new(pair),
            event_type,
            contacts: Vec::with_capacity(MAX_CONTACTS + 1),
        }
    }

    /// Pair key
    pub fn pair(&self) -> EntityPair {
        EntityPair {
            first: self.event.first,
            second: self.event.second,
        }
    }

    /// Current contacts, oriented from `event.first` to `event.second`
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Add a contact
    ///
    /// A contact within `break_distance` of an existing one replaces it and
    /// takes over its accumulated impulses. A fifth contact evicts whichever
    /// point leaves the largest area behind, possibly the new one.
    pub fn add_contact(&mut self, contact: Contact, break_distance: f32) {
        let threshold = break_distance * break_distance;
        let nearest = self
            .contacts
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (c.local_point_a - contact.local_point_a).magnitude_squared()))
            .filter(|(_, distance)| *distance < threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((index, _)) = nearest {
            let previous = self.contacts[index];
            self.contacts[index] = Contact {
                lambda: previous.lambda,
                mu_tangent: previous.mu_tangent,
                mu_bitangent: previous.mu_bitangent,
                ..contact
            };
            return;
        }

        self.contacts.push(contact);
        if self.contacts.len() > MAX_CONTACTS {
            let evict = eviction_index(&self.contacts);
            self.contacts.remove(evict);
        }
    }

    /// Re-place contacts with new matrices and drop the ones that drifted apart
    pub fn refresh_contacts(&mut self, matrix_first: &Mat4, matrix_second: &Mat4, break_distance: f32) {
        let threshold = break_distance * break_distance;
        self.contacts.retain_mut(|contact| {
            contact.world_point_a = transform_point(matrix_first, &contact.local_point_a);
            contact.world_point_b = transform_point(matrix_second, &contact.local_point_b);

            let separation = contact.world_point_a - contact.world_point_b;
            contact.depth = separation.dot(&contact.normal);
            if contact.depth < -break_distance {
                return false;
            }

            let lateral = separation - contact.normal * contact.depth;
            lateral.magnitude_squared() <= threshold
        });
    }
}

/// Area measure of four points (twice the area of the quadrilateral they span)
///
/// Takes the largest cross product over the three ways of pairing the points
/// into two segments, so it does not depend on their order.
pub fn quad_area(points: [Vec3; 4]) -> f32 {
    let [p0, p1, p2, p3] = points;
    let a = (p0 - p1).cross(&(p2 - p3)).magnitude();
    let b = (p0 - p2).cross(&(p1 - p3)).magnitude();
    let c = (p0 - p3).cross(&(p1 - p2)).magnitude();
    a.max(b).max(c)
}

/// Index among five contacts whose removal keeps the largest area
fn eviction_index(contacts: &[Contact]) -> usize {
    debug_assert_eq!(contacts.len(), MAX_CONTACTS + 1);
    (0..contacts.len())
        .map(|skip| {
            let mut kept = [Vec3::zeros(); 4];
            let mut slot = 0;
            for (i, contact) in contacts.iter().enumerate() {
                if i != skip {
                    kept[slot] = contact.local_point_a;
                    slot += 1;
                }
            }
            (skip, quad_area(kept))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(skip, _)| skip)
}

/// Notifications sent during one [`ManifoldCache::notify_events`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationCounts {
    /// Episodes that started
    pub enter: usize,
    /// Episodes that continued
    pub stay: usize,
    /// Episodes that ended
    pub exit: usize,
}

impl std::ops::AddAssign for NotificationCounts {
    fn add_assign(&mut self, other: Self) {
        self.enter += other.enter;
        self.stay += other.stay;
        self.exit += other.exit;
    }
}

/// Solver output for one contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactImpulse {
    /// Manifold the contact belongs to
    pub pair: EntityPair,
    /// Index into the manifold's contacts
    pub contact: usize,
    /// Total normal impulse
    pub lambda: f32,
    /// Total impulse along the first tangent
    pub mu_tangent: f32,
    /// Total impulse along the second tangent
    pub mu_bitangent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpisodeKind {
    Collision,
    Trigger,
}

/// All manifolds and trigger overlaps, keyed by entity pair
#[derive(Debug, Clone, Default)]
pub struct ManifoldCache {
    break_distance: f32,
    manifolds: BTreeMap<EntityPair, Manifold>,
    triggers: BTreeMap<EntityPair, NarrowEvent>,
    removed: Vec<(NarrowEvent, EpisodeKind)>,
}

impl ManifoldCache {
    /// Create an empty cache
    pub fn new(break_distance: f32) -> Self {
        Self {
            break_distance,
            ..Self::default()
        }
    }

    /// Contact break distance
    pub fn break_distance(&self) -> f32 {
        self.break_distance
    }

    /// Apply one step's narrow-phase results
    ///
    /// Physics results without a contact (failed penetration queries) only
    /// keep an existing manifold alive.
    pub fn merge_contacts(&mut self, results: impl IntoIterator<Item = NarrowPhysicsResult>) {
        for result in results {
            let pair = EntityPair::new(result.entity_a, result.entity_b);
            let ordered = EntityPair::is_ordered(result.entity_a, result.entity_b);

            if result.event_type.is_trigger() {
                self.triggers
                    .entry(pair)
                    .and_modify(NarrowEvent::refresh)
                    .or_insert_with(|| NarrowEvent::new(pair));
                continue;
            }
            if !result.event_type.is_physics() {
                continue;
            }

            let Some(contact) = result.contact else {
                if let Some(manifold) = self.manifolds.get_mut(&pair) {
                    manifold.event.refresh();
                }
                continue;
            };

            let (contact, event_type) = if ordered {
                (contact, result.event_type)
            } else {
                (contact.flipped(), result.event_type.flipped())
            };

            let manifold = self
                .manifolds
                .entry(pair)
                .or_insert_with(|| Manifold::new(pair, event_type));
            manifold.event.refresh();
            manifold.add_contact(contact, self.break_distance);
        }
    }

    /// Re-place cached contacts with the latest transforms
    ///
    /// Manifolds whose contacts all broke, or whose entities are gone, move to
    /// the removed set so their exit still fires.
    pub fn update_manifolds(&mut self, world: &World) {
        let break_distance = self.break_distance;
        let mut emptied = Vec::new();

        for (pair, manifold) in &mut self.manifolds {
            let matrices = matrix_of(world, pair.first).zip(matrix_of(world, pair.second));
            match matrices {
                Some((first, second)) => {
                    manifold.refresh_contacts(&first, &second, break_distance);
                }
                None => {
                    log::warn!("Dropping contacts of {pair:?}: entity no longer placed");
                    manifold.contacts.clear();
                }
            }
            if manifold.contacts.is_empty() {
                emptied.push(*pair);
            }
        }

        for pair in emptied {
            if let Some(manifold) = self.manifolds.remove(&pair) {
                self.removed.push((manifold.event, EpisodeKind::Collision));
            }
        }

        let dead: Vec<EntityPair> = self
            .triggers
            .keys()
            .filter(|pair| !world.is_alive(pair.first) || !world.is_alive(pair.second))
            .copied()
            .collect();
        for pair in dead {
            if let Some(event) = self.triggers.remove(&pair) {
                self.removed.push((event, EpisodeKind::Trigger));
            }
        }
    }

    /// Advance every episode and deliver enter/stay/exit notifications
    pub fn notify_events(&mut self, world: &mut World) -> NotificationCounts {
        let mut counts = NotificationCounts::default();

        for (event, kind) in std::mem::take(&mut self.removed) {
            // Never entered, so nothing to exit
            if event.state == NarrowEventState::New {
                continue;
            }
            deliver(world, &event, kind, Phase::Exit);
            counts.exit += 1;
        }

        let mut ended = Vec::new();
        for (pair, manifold) in &mut self.manifolds {
            if let Some(phase) = advance(&mut manifold.event) {
                deliver(world, &manifold.event, EpisodeKind::Collision, phase);
                counts.record(phase);
                if phase == Phase::Exit {
                    ended.push(*pair);
                }
            }
        }
        for pair in ended {
            self.manifolds.remove(&pair);
        }

        let mut ended = Vec::new();
        for (pair, event) in &mut self.triggers {
            if let Some(phase) = advance(event) {
                deliver(world, event, EpisodeKind::Trigger, phase);
                counts.record(phase);
                if phase == Phase::Exit {
                    ended.push(*pair);
                }
            }
        }
        for pair in ended {
            self.triggers.remove(&pair);
        }

        counts
    }

    /// Store the solver's accumulated impulses for warm starting
    pub fn cache_impulses(&mut self, impulses: &[ContactImpulse]) {
        for impulse in impulses {
            let Some(contact) = self
                .manifolds
                .get_mut(&impulse.pair)
                .and_then(|manifold| manifold.contacts.get_mut(impulse.contact))
            else {
                continue;
            };
            contact.lambda = impulse.lambda;
            contact.mu_tangent = impulse.mu_tangent;
            contact.mu_bitangent = impulse.mu_bitangent;
        }
    }

    /// Active manifolds in pair order
    pub fn manifolds(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    /// Manifold between two entities, in either order
    pub fn manifold(&self, a: Entity, b: Entity) -> Option<&Manifold> {
        self.manifolds.get(&EntityPair::new(a, b))
    }

    /// Active trigger overlaps in pair order
    pub fn trigger_events(&self) -> impl Iterator<Item = &NarrowEvent> {
        self.triggers.values()
    }

    /// Trigger overlap between two entities, in either order
    pub fn trigger_event(&self, a: Entity, b: Entity) -> Option<&NarrowEvent> {
        self.triggers.get(&EntityPair::new(a, b))
    }

    /// Number of manifolds
    pub fn manifold_count(&self) -> usize {
        self.manifolds.len()
    }

    /// Number of trigger overlaps
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Forget everything, without notifications
    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.triggers.clear();
        self.removed.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enter,
    Stay,
    Exit,
}

impl NotificationCounts {
    fn record(&mut self, phase: Phase) {
        match phase {
            Phase::Enter => self.enter += 1,
            Phase::Stay => self.stay += 1,
            Phase::Exit => self.exit += 1,
        }
    }
}

/// Step the episode state machine, returning the notification to send
fn advance(event: &mut NarrowEvent) -> Option<Phase> {
    match event.state {
        NarrowEventState::New => {
            event.state = NarrowEventState::Stale;
            Some(Phase::Enter)
        }
        NarrowEventState::Persisting => {
            event.state = NarrowEventState::Stale;
            Some(Phase::Stay)
        }
        NarrowEventState::Stale => Some(Phase::Exit),
    }
}

fn deliver(world: &mut World, event: &NarrowEvent, kind: EpisodeKind, phase: Phase) {
    let notification = |other| match (kind, phase) {
        (EpisodeKind::Collision, Phase::Enter) => CollisionNotification::CollisionEnter(other),
        (EpisodeKind::Collision, Phase::Stay) => CollisionNotification::CollisionStay(other),
        (EpisodeKind::Collision, Phase::Exit) => CollisionNotification::CollisionExit(other),
        (EpisodeKind::Trigger, Phase::Enter) => CollisionNotification::TriggerEnter(other),
        (EpisodeKind::Trigger, Phase::Stay) => CollisionNotification::TriggerStay(other),
        (EpisodeKind::Trigger, Phase::Exit) => CollisionNotification::TriggerExit(other),
    };

    for (receiver, other) in [(event.first, event.second), (event.second, event.first)] {
        if !world.is_alive(receiver) {
            continue;
        }
        if let Some(logic) = world.get_component_mut::<CollisionLogicComponent>(receiver) {
            logic.dispatch(receiver, notification(other));
        }
    }
}

fn matrix_of(world: &World, entity: Entity) -> Option<Mat4> {
    if !world.is_alive(entity) {
        return None;
    }
    world.world_matrix(entity)
}
