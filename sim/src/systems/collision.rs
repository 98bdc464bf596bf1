//! Collision systems - turn hero/pedestrian impacts into hits.
//!
//! Two strategies share one hit registration path:
//!
//! - [`ContactCollisionSystem`] consumes contact records reported by the
//!   physics provider on the fixed tick and computes knockback.
//! - [`ProximityCollisionSystem`] checks hero/pedestrian distance on the
//!   variable tick, for hosts without contact callbacks.
//!
//! A day installs exactly one of them.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::components::*;
use crate::config::CollisionConfig;
use crate::ecs::{Group, SimContext, Simulation, Store, System};
use crate::outbox::{Outbox, Signal};
use crate::systems::{ActivePedestrians, HeroFilter};

/// Mark `pedestrian` as hit and publish a one-frame hit event.
///
/// Returns the event entity, or `None` when the entity is not a pedestrian or
/// was already hit. A pedestrian is hit at most once.
pub fn register_hit(
    sim: &mut Store<Simulation>,
    outbox: &mut Outbox,
    pedestrian: Entity,
    impact: CollisionImpact,
) -> Option<Entity> {
    if !sim.has::<PedestrianTag>(pedestrian) || sim.has::<Hit>(pedestrian) {
        return None;
    }
    let kind = *sim.get::<PedestrianKind>(pedestrian)?;
    let id = sim.identity(pedestrian)?;
    if let Err(err) = sim.add(pedestrian, Hit) {
        warn!(id, error = %err, "hit_flag_failed");
        return None;
    }

    let event = sim.create_event();
    let attached = sim
        .add(
            event,
            HitEvent {
                kind,
                pedestrian_id: id,
            },
        )
        .and_then(|_| sim.add(event, impact));
    if let Err(err) = attached {
        warn!(id, error = %err, "hit_event_failed");
    }

    info!(id, kind = kind.as_str(), force = impact.force, "pedestrian_hit");
    outbox.signal(Signal::Hit {
        id,
        kind,
        force: impact.force,
        point: impact.point,
    });
    Some(event)
}

/// Horizontal knockback along `direction` plus a lift that ramps in between
/// `min_speed_for_lift` and `max_lift_speed`.
pub fn knockback_impulse(config: &CollisionConfig, speed: f32, mass: f32, direction: Vec3) -> Vec3 {
    let horizontal = speed * mass * config.force_multiplier;
    let span = config.max_lift_speed - config.min_speed_for_lift;
    let ramp = if span > 0.0 {
        ((speed - config.min_speed_for_lift) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let lift = horizontal * config.lift_multiplier * ramp;

    flat_direction(direction) * horizontal + Vec3::Y * lift
}

/// Unit vector of `v` projected onto the road plane, forward when degenerate.
fn flat_direction(v: Vec3) -> Vec3 {
    let flat = Vec3::new(v.x, 0.0, v.z).normalize_or_zero();
    if flat == Vec3::ZERO {
        Vec3::Z
    } else {
        flat
    }
}

/// Random torque with each component in `[-max_torque, max_torque]`.
pub fn random_torque(max_torque: f32, rng: &mut StdRng) -> Vec3 {
    if max_torque <= 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.random_range(-max_torque..=max_torque),
        rng.random_range(-max_torque..=max_torque),
        rng.random_range(-max_torque..=max_torque),
    )
}

fn mass_of(sim: &Store<Simulation>, entity: Entity) -> f32 {
    sim.get::<PedestrianBody>(entity)
        .map(|body| body.mass)
        .unwrap_or_else(|| PedestrianBody::default().mass)
}

// ============================================================================
// CONTACT STRATEGY
// ============================================================================

/// Consumes the input store's contact queue on every fixed tick.
pub struct ContactCollisionSystem {
    config: CollisionConfig,
    hero: Group<Simulation, HeroFilter>,
}

impl ContactCollisionSystem {
    pub fn new(config: CollisionConfig, sim: &mut Store<Simulation>) -> Self {
        Self {
            config,
            hero: sim.group(),
        }
    }
}

impl System for ContactCollisionSystem {
    fn name(&self) -> &'static str {
        "contact_collision"
    }

    fn fixed_execute(&mut self, ctx: &mut SimContext<'_>) {
        let contacts = match ctx.input.unique_mut::<ContactQueue>() {
            Some(mut queue) => std::mem::take(&mut queue.contacts),
            None => return,
        };
        if contacts.is_empty() {
            return;
        }

        let hero_pos = self
            .hero
            .first(ctx.sim)
            .and_then(|hero| ctx.sim.get::<WorldPosition>(hero))
            .map(|pos| pos.0);

        for contact in contacts {
            let Some(entity) = ctx.sim.entity(contact.other_id) else {
                debug!(other = contact.other_id, "contact_with_unknown_body");
                continue;
            };
            if !ctx.sim.has::<PedestrianTag>(entity) || ctx.sim.has::<Hit>(entity) {
                continue;
            }

            let speed = contact.relative_velocity.length();
            let mass = mass_of(ctx.sim, entity);
            let direction = match (hero_pos, ctx.sim.get::<WorldPosition>(entity)) {
                (Some(hero), Some(pos)) => pos.0 - hero,
                _ => contact.relative_velocity,
            };
            let impact = CollisionImpact {
                force: speed * mass * self.config.force_multiplier,
                point: contact.point,
                normal: contact.normal,
            };
            if register_hit(ctx.sim, ctx.outbox, entity, impact).is_none() {
                continue;
            }

            let knockback = PendingKnockback {
                impulse: knockback_impulse(&self.config, speed, mass, direction),
                torque: random_torque(self.config.max_torque, ctx.rng),
            };
            if let Err(err) = ctx.sim.replace(entity, knockback) {
                warn!(error = %err, "knockback_store_failed");
            }
        }
    }
}

// ============================================================================
// PROXIMITY STRATEGY
// ============================================================================

/// Hits every un-hit pedestrian within `hit_radius` of the hero.
pub struct ProximityCollisionSystem {
    config: CollisionConfig,
    hero: Group<Simulation, HeroFilter>,
    active: Group<Simulation, ActivePedestrians>,
    buffer: Vec<Entity>,
}

impl ProximityCollisionSystem {
    pub fn new(config: CollisionConfig, sim: &mut Store<Simulation>) -> Self {
        Self {
            config,
            hero: sim.group(),
            active: sim.group(),
            buffer: Vec::new(),
        }
    }
}

impl System for ProximityCollisionSystem {
    fn name(&self) -> &'static str {
        "proximity_collision"
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        let Some(hero) = self.hero.first(ctx.sim) else {
            return;
        };
        let Some(hero_pos) = ctx.sim.get::<WorldPosition>(hero).copied() else {
            return;
        };
        let hero_speed = ctx
            .sim
            .get::<Velocity>(hero)
            .map(Velocity::speed)
            .unwrap_or(0.0);
        let radius_sq = self.config.hit_radius * self.config.hit_radius;

        self.active.snapshot(ctx.sim, &mut self.buffer);
        for &entity in &self.buffer {
            let Some(pos) = ctx.sim.get::<WorldPosition>(entity).copied() else {
                continue;
            };
            if hero_pos.distance_squared(&pos) >= radius_sq {
                continue;
            }

            let normal = flat_direction(pos.0 - hero_pos.0);
            let impact = CollisionImpact {
                force: hero_speed * mass_of(ctx.sim, entity) * self.config.force_multiplier,
                point: pos.0,
                normal,
            };
            register_hit(ctx.sim, ctx.outbox, entity, impact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::test_support::Harness;
    use rand::SeedableRng;

    fn contact_with(id: u64, velocity: Vec3) -> Contact {
        Contact {
            other_id: id,
            relative_velocity: velocity,
            point: Vec3::ZERO,
            normal: Vec3::NEG_Z,
        }
    }

    fn push_contact(h: &mut Harness, contact: Contact) {
        h.input
            .unique_mut::<ContactQueue>()
            .unwrap()
            .contacts
            .push(contact);
    }

    #[test]
    fn test_register_hit_is_idempotent() {
        let mut h = Harness::new();
        let e = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::ZERO);
        let first = register_hit(&mut h.sim, &mut h.outbox, e, CollisionImpact::default());
        let second = register_hit(&mut h.sim, &mut h.outbox, e, CollisionImpact::default());
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(h.count::<With<HitEvent>>(), 1);
        let hits = h
            .outbox
            .pending_signals()
            .iter()
            .filter(|s| matches!(s, Signal::Hit { .. }))
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_register_hit_ignores_non_pedestrians() {
        let mut h = Harness::new();
        let hero = h.spawn_hero(Vec3::ZERO);
        assert!(register_hit(&mut h.sim, &mut h.outbox, hero, CollisionImpact::default()).is_none());
        assert!(!h.sim.has::<Hit>(hero));
    }

    #[test]
    fn test_knockback_has_no_lift_below_threshold() {
        let config = CollisionConfig::default();
        let impulse = knockback_impulse(&config, 4.0, 70.0, Vec3::Z);
        assert_eq!(impulse.y, 0.0);
        assert!((impulse.z - 4.0 * 70.0 * config.force_multiplier).abs() < 1e-3);
    }

    #[test]
    fn test_knockback_lift_saturates() {
        let config = CollisionConfig::default();
        let fast = knockback_impulse(&config, 40.0, 70.0, Vec3::X);
        let horizontal = 40.0 * 70.0 * config.force_multiplier;
        assert!((fast.y - horizontal * config.lift_multiplier).abs() < 1e-2);
        assert!((fast.x - horizontal).abs() < 1e-2);
    }

    #[test]
    fn test_torque_is_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let torque = random_torque(2.0, &mut rng);
            assert!(torque.abs().max_element() <= 2.0);
        }
        assert_eq!(random_torque(0.0, &mut rng), Vec3::ZERO);
    }

    #[test]
    fn test_contact_hits_pedestrian_and_stores_knockback() {
        let mut h = Harness::new();
        h.spawn_hero(Vec3::ZERO);
        let e = h.spawn_pedestrian(PedestrianKind::Jogger, Vec3::new(0.0, 0.0, 2.0));
        let id = h.sim.identity(e).unwrap();
        push_contact(&mut h, contact_with(id, Vec3::new(0.0, 0.0, 10.0)));
        // Second contact with the same body in the same tick is ignored
        push_contact(&mut h, contact_with(id, Vec3::new(0.0, 0.0, 10.0)));

        let mut system = ContactCollisionSystem::new(CollisionConfig::default(), &mut h.sim);
        h.run_fixed(&mut system);

        assert!(h.sim.has::<Hit>(e));
        assert_eq!(h.count::<With<HitEvent>>(), 1);
        let knockback = h.sim.get::<PendingKnockback>(e).unwrap();
        assert!(knockback.impulse.z > 0.0);
        assert!(h.input.unique::<ContactQueue>().unwrap().contacts.is_empty());
    }

    #[test]
    fn test_contact_with_unknown_body_is_ignored() {
        let mut h = Harness::new();
        h.spawn_hero(Vec3::ZERO);
        push_contact(&mut h, contact_with(9999, Vec3::Z));
        let mut system = ContactCollisionSystem::new(CollisionConfig::default(), &mut h.sim);
        h.run_fixed(&mut system);
        assert_eq!(h.count::<With<HitEvent>>(), 0);
    }

    #[test]
    fn test_proximity_hits_inside_radius_only() {
        let mut h = Harness::new();
        let hero = h.spawn_hero(Vec3::ZERO);
        h.sim.replace(hero, Velocity(Vec3::new(0.0, 0.0, 12.0))).unwrap();
        let close = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(0.5, 0.0, 0.5));
        let far = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(3.0, 0.0, 0.0));

        let mut system = ProximityCollisionSystem::new(CollisionConfig::default(), &mut h.sim);
        h.run_execute(&mut system, 0.1);
        h.run_execute(&mut system, 0.1);

        assert!(h.sim.has::<Hit>(close));
        assert!(!h.sim.has::<Hit>(far));
        assert_eq!(h.count::<With<HitEvent>>(), 1);
        assert!(!h.sim.has::<PendingKnockback>(close));
    }
}
