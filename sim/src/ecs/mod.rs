//! Entity-component infrastructure: partitioned stores, live groups,
//! reactive collectors and phased system composition.

pub mod collector;
pub mod group;
pub mod store;
pub mod system;

pub use collector::{Collector, CollectorTrigger};
pub use group::Group;
pub use store::{IdGenerator, Input, Partition, Progress, Simulation, Store};
pub use system::{Feature, SimContext, System};
