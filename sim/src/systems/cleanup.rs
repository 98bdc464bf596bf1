//! Event cleanup - returns one-frame event entities to the pool.

use tracing::trace;

use crate::ecs::{SimContext, System};

/// Runs in the cleanup phase, after every consumer has seen this frame's
/// hit and violation events.
#[derive(Debug, Default)]
pub struct EventCleanupSystem;

impl System for EventCleanupSystem {
    fn name(&self) -> &'static str {
        "event_cleanup"
    }

    fn cleanup(&mut self, ctx: &mut SimContext<'_>) {
        let recycled = ctx.sim.recycle_events();
        if recycled > 0 {
            trace!(recycled, "events_recycled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::*;
    use crate::systems::test_support::Harness;
    use bevy_ecs::prelude::*;

    #[test]
    fn test_no_events_survive_cleanup() {
        let mut h = Harness::new();
        let hit = h.sim.create_event();
        h.sim
            .add(
                hit,
                HitEvent {
                    kind: PedestrianKind::Walker,
                    pedestrian_id: 1,
                },
            )
            .unwrap();
        let violation = h.sim.create_event();
        h.sim
            .add(
                violation,
                ViolationEvent {
                    kind: PedestrianKind::Child,
                    pedestrian_id: 2,
                    penalty: 100,
                },
            )
            .unwrap();

        let mut system = EventCleanupSystem;
        h.run_cleanup(&mut system);

        assert_eq!(h.count::<With<HitEvent>>(), 0);
        assert_eq!(h.count::<With<ViolationEvent>>(), 0);
        assert_eq!(h.sim.live_event_count(), 0);
    }
}
