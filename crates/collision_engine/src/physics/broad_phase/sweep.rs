//! Single-axis sort and sweep
//!
//! Proxies are ordered by the minimum of their sphere estimate along one axis.
//! Walking that order, each proxy only needs testing against the proxies that
//! start before its own maximum along the axis.

use super::proxy::Proxy;
use super::radix::RadixSorter;
use crate::core::config::SweepAxis;
use crate::ecs::Entity;
use crate::physics::events::CollisionEventType;

/// Two colliders whose sphere estimates overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    /// First entity
    pub first: Entity,
    /// Second entity
    pub second: Entity,
    /// Classification for `(first, second)`
    pub event_type: CollisionEventType,
}

/// Candidate pairs split by how the narrow phase treats them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadPhasePairs {
    /// Pairs that get contacts
    pub physics: Vec<CandidatePair>,
    /// Pairs that only drive trigger notifications
    pub triggers: Vec<CandidatePair>,
}

impl BroadPhasePairs {
    /// Total number of candidate pairs
    pub fn len(&self) -> usize {
        self.physics.len() + self.triggers.len()
    }

    /// Whether no pair was found
    pub fn is_empty(&self) -> bool {
        self.physics.is_empty() && self.triggers.is_empty()
    }

    /// Both buckets in one iterator, physics pairs first
    pub fn iter(&self) -> impl Iterator<Item = &CandidatePair> {
        self.physics.iter().chain(self.triggers.iter())
    }
}

/// Broad-phase strategy used by the pipeline
pub trait BroadPhase: Send {
    /// Replace the proxy set for this step
    fn update(&mut self, proxies: Vec<Proxy>);

    /// Overlapping, non-ignored pairs among the current proxies
    fn find_pairs(&mut self) -> BroadPhasePairs;

    /// Proxies given to the last [`BroadPhase::update`]
    fn proxies(&self) -> &[Proxy];

    /// Drop all proxies and cached ordering
    fn clear(&mut self);
}

/// Sort-and-sweep along one world axis
#[derive(Debug, Clone, Default)]
pub struct SingleAxisPrune {
    axis: SweepAxis,
    proxies: Vec<Proxy>,
    min_extents: Vec<f32>,
    sorter: RadixSorter,
}

impl SingleAxisPrune {
    /// Create a pruner sweeping along `axis`
    pub fn new(axis: SweepAxis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    /// Sweep axis
    pub fn axis(&self) -> SweepAxis {
        self.axis
    }

    /// Fraction of steps where last step's ordering was still valid
    pub fn coherence_ratio(&self) -> f32 {
        self.sorter.coherence_ratio()
    }
}

impl BroadPhase for SingleAxisPrune {
    fn update(&mut self, proxies: Vec<Proxy>) {
        let axis = self.axis.index();
        self.proxies = proxies;
        self.min_extents.clear();
        self.min_extents
            .extend(self.proxies.iter().map(|proxy| proxy.estimate.min_extent(axis)));
        self.min_extents.push(f32::INFINITY);
    }

    fn find_pairs(&mut self) -> BroadPhasePairs {
        let mut pairs = BroadPhasePairs::default();
        let count = self.proxies.len();
        if count < 2 {
            return pairs;
        }

        let axis = self.axis.index();
        let order = self.sorter.sort(&self.min_extents);
        debug_assert_eq!(order.len(), count + 1);
        debug_assert_eq!(order[count] as usize, count, "sentinel must sort last");

        for (position, index) in order[..count].iter().enumerate() {
            let proxy = &self.proxies[*index as usize];
            let max_limit = proxy.estimate.max_extent(axis);
            debug_assert!(max_limit.is_finite(), "non-finite estimate for {:?}", proxy.entity);

            // The sentinel's +inf ends every window
            let mut cursor = position + 1;
            while self.min_extents[order[cursor] as usize] < max_limit {
                let other = &self.proxies[order[cursor] as usize];
                cursor += 1;

                if !proxy.estimate.intersects(&other.estimate) {
                    continue;
                }

                let event_type = proxy.properties.event_type(other.properties);
                let pair = CandidatePair {
                    first: proxy.entity,
                    second: other.entity,
                    event_type,
                };
                match event_type {
                    CollisionEventType::None => {}
                    CollisionEventType::Trigger => pairs.triggers.push(pair),
                    _ => pairs.physics.push(pair),
                }
            }
        }

        log::trace!(
            "Broad phase: {} proxies, {} physics pairs, {} trigger pairs",
            count,
            pairs.physics.len(),
            pairs.triggers.len()
        );
        pairs
    }

    fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    fn clear(&mut self) {
        self.proxies.clear();
        self.min_extents.clear();
        self.sorter.reset();
    }
}
