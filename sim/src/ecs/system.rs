//! System phases and feature composition.
//!
//! Every system may take part in four phases:
//!
//! - `initialize` - once per day, before the first tick; may fail
//! - `execute` - every variable-rate tick
//! - `fixed_execute` - every fixed (physics-aligned) tick
//! - `cleanup` - every variable-rate tick, after `execute`
//!
//! A [`Feature`] runs a phase on its members in declared order. Features are
//! systems themselves and nest freely.

use rand::rngs::StdRng;

use crate::clock::SimClock;
use crate::ecs::store::{Input, Progress, Simulation, Store};
use crate::error::{SimError, SimResult};
use crate::outbox::Outbox;

/// Mutable context handed to each system for one phase call.
pub struct SimContext<'a> {
    pub sim: &'a mut Store<Simulation>,
    pub progress: &'a mut Store<Progress>,
    pub input: &'a mut Store<Input>,
    pub clock: &'a SimClock,
    pub rng: &'a mut StdRng,
    pub outbox: &'a mut Outbox,
}

impl SimContext<'_> {
    pub fn now(&self) -> f32 {
        self.clock.now()
    }
}

/// A unit of simulation logic. All phases default to no-ops.
pub trait System {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    fn initialize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    fn execute(&mut self, _ctx: &mut SimContext<'_>) {}

    fn fixed_execute(&mut self, _ctx: &mut SimContext<'_>) {}

    fn cleanup(&mut self, _ctx: &mut SimContext<'_>) {}

    /// Append the names of the leaf systems, in execution order.
    fn collect_names(&self, out: &mut Vec<&'static str>) {
        out.push(self.name());
    }
}

/// Ordered composition of systems.
pub struct Feature {
    name: &'static str,
    systems: Vec<Box<dyn System>>,
}

impl Feature {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            systems: Vec::new(),
        }
    }

    /// Append a system; members run in the order they were added.
    pub fn with<S: System + 'static>(mut self, system: S) -> Self {
        self.add(system);
        self
    }

    pub fn add<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Member names in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Leaf system names across nested features, in execution order.
    pub fn leaf_names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }
}

impl System for Feature {
    fn name(&self) -> &'static str {
        self.name
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for system in &mut self.systems {
            tracing::debug!(feature = self.name, system = system.name(), "system_initialize");
            system.initialize(ctx).map_err(|err| match err {
                SimError::Store(store) => SimError::Initialize {
                    system: system.name(),
                    reason: store.to_string(),
                },
                other => other,
            })?;
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        for system in &mut self.systems {
            system.execute(ctx);
        }
    }

    fn fixed_execute(&mut self, ctx: &mut SimContext<'_>) {
        for system in &mut self.systems {
            system.fixed_execute(ctx);
        }
    }

    fn cleanup(&mut self, ctx: &mut SimContext<'_>) {
        for system in &mut self.systems {
            system.cleanup(ctx);
        }
    }

    fn collect_names(&self, out: &mut Vec<&'static str>) {
        for system in &self.systems {
            system.collect_names(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::store::IdGenerator;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl System for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn execute(&mut self, _ctx: &mut SimContext<'_>) {
            self.log.borrow_mut().push(format!("{}:execute", self.name));
        }

        fn cleanup(&mut self, _ctx: &mut SimContext<'_>) {
            self.log.borrow_mut().push(format!("{}:cleanup", self.name));
        }
    }

    #[test]
    fn test_feature_runs_members_in_declared_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner = Feature::new("inner").with(Recorder {
            name: "b",
            log: log.clone(),
        });
        let mut root = Feature::new("root")
            .with(Recorder {
                name: "a",
                log: log.clone(),
            })
            .with(inner)
            .with(Recorder {
                name: "c",
                log: log.clone(),
            });

        let ids = IdGenerator::new();
        let mut sim = Store::new(ids.clone());
        let mut progress = Store::new(ids.clone());
        let mut input = Store::new(ids);
        let clock = SimClock::new(1.0 / 50.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut outbox = Outbox::default();
        let mut ctx = SimContext {
            sim: &mut sim,
            progress: &mut progress,
            input: &mut input,
            clock: &clock,
            rng: &mut rng,
            outbox: &mut outbox,
        };

        root.execute(&mut ctx);
        root.fixed_execute(&mut ctx);
        root.cleanup(&mut ctx);

        assert_eq!(
            *log.borrow(),
            vec![
                "a:execute",
                "b:execute",
                "c:execute",
                "a:cleanup",
                "b:cleanup",
                "c:cleanup"
            ]
        );
        assert_eq!(root.system_names(), vec!["a", "inner", "c"]);
        assert_eq!(root.leaf_names(), vec!["a", "b", "c"]);
    }

    struct Broken;

    impl System for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
            let gone = ctx.sim.create_entity();
            ctx.sim.destroy(gone);
            ctx.sim.add(gone, crate::components::Hit)?;
            Ok(())
        }
    }

    #[test]
    fn test_initialize_failure_names_the_leaf_system() {
        let mut root = Feature::new("root").with(Feature::new("inner").with(Broken));

        let ids = IdGenerator::new();
        let mut sim = Store::new(ids.clone());
        let mut progress = Store::new(ids.clone());
        let mut input = Store::new(ids);
        let clock = SimClock::new(1.0 / 50.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut outbox = Outbox::default();
        let mut ctx = SimContext {
            sim: &mut sim,
            progress: &mut progress,
            input: &mut input,
            clock: &clock,
            rng: &mut rng,
            outbox: &mut outbox,
        };

        let err = root.initialize(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            SimError::Initialize {
                system: "broken",
                ..
            }
        ));
    }
}
