//! Broad phase
//!
//! Cheap pruning of all collider pairs down to the few whose sphere estimates
//! overlap.

pub mod proxy;
pub mod radix;
pub mod sweep;

pub use proxy::Proxy;
pub use radix::RadixSorter;
pub use sweep::{BroadPhase, BroadPhasePairs, CandidatePair, SingleAxisPrune};
