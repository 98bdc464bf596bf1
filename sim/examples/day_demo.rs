//! Drives one day of the lane runner with a scripted hero.
//!
//! Run with: cargo run --example day_demo
//! Set `RUST_LOG=lane_sim=debug` for more detail.

use glam::Vec3;
use lane_sim::{Contact, DayLoop, GameConfig, MemoryPersistence, PhysicsCommand, Signal};
use tracing_subscriber::EnvFilter;

const HERO_SPEED: f32 = 12.0;
const FRAME: f32 = 1.0 / 30.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = GameConfig::default();
    config.timing.day_duration = 30.0;

    let mut day = DayLoop::new(config, MemoryPersistence::new()).expect("valid config");
    let params = day.start_day().expect("day starts");
    println!("=== Day {} ({:.0}s) ===", params.day, params.day_duration);

    let mut hero_z = 0.0;
    day.spawn_hero(Vec3::ZERO);
    let hero = day.hero_id().expect("hero spawned");

    let mut bodies: Vec<(u64, Vec3)> = Vec::new();
    let mut frame = 0u32;
    while !day.is_finished() {
        hero_z += HERO_SPEED * FRAME;
        let hero_pos = Vec3::new(0.0, 0.0, hero_z);
        day.sync_transform(hero, hero_pos, Some(Vec3::new(0.0, 0.0, HERO_SPEED)));

        // Stand-in for the physics provider: touch anything within a meter
        for &(id, pos) in &bodies {
            if pos.distance(hero_pos) < 1.0 {
                day.push_contact(Contact {
                    other_id: id,
                    relative_velocity: Vec3::new(0.0, 0.0, HERO_SPEED),
                    point: pos,
                    normal: Vec3::NEG_Z,
                });
            }
        }

        day.step(FRAME);

        for command in day.drain_physics_commands() {
            match command {
                PhysicsCommand::SpawnBody { id, position, .. } => bodies.push((id, position)),
                PhysicsCommand::RemoveBody { id } | PhysicsCommand::ReleaseBody { id } => {
                    bodies.retain(|(body, _)| *body != id);
                }
                _ => {}
            }
        }
        for signal in day.drain_signals() {
            match signal {
                Signal::QuestCompleted { kind, reward, .. } => {
                    println!("  quest complete: {} (+{reward})", kind.as_str());
                }
                Signal::DayFinished(summary) => println!("  summary: {summary:?}"),
                _ => {}
            }
        }

        frame += 1;
        if frame % 150 == 0 {
            let snapshot = day.snapshot();
            println!(
                "t={:>5.1}s pedestrians={:>2} money={}",
                snapshot.time,
                snapshot.active_pedestrians(),
                snapshot.money
            );
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!(
        "{}",
        day.snapshot().to_json_pretty().expect("snapshot serializes")
    );
}
