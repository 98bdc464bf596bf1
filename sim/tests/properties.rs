//! Property tests for difficulty scaling, the wallet and day-level caps.

use bevy_ecs::prelude::*;
use glam::Vec3;
use lane_sim::config::{DifficultyConfig, QuestTemplate};
use lane_sim::ecs::{IdGenerator, Progress, Store};
use lane_sim::systems::economy::{apply_penalty, balance, credit, ensure_ledger};
use lane_sim::{
    difficulty_for_day, Contact, DayLoop, GameConfig, MemoryPersistence, Outbox, PedestrianKind,
    Ragdolled,
};
use proptest::prelude::*;

const FIXED: f32 = 0.25;

fn contact(id: u64) -> Contact {
    Contact {
        other_id: id,
        relative_velocity: Vec3::new(0.0, 0.0, 8.0),
        point: Vec3::ZERO,
        normal: Vec3::NEG_Z,
    }
}

fn kind_strategy() -> impl Strategy<Value = PedestrianKind> {
    prop_oneof![
        Just(PedestrianKind::Walker),
        Just(PedestrianKind::Jogger),
        Just(PedestrianKind::Cyclist),
        Just(PedestrianKind::Elder),
    ]
}

#[derive(Debug, Clone)]
enum Ledger {
    Credit(u64),
    Penalty(u64),
}

fn ledger_strategy() -> impl Strategy<Value = Ledger> {
    prop_oneof![
        (0_u64..1_000).prop_map(Ledger::Credit),
        (0_u64..1_000).prop_map(Ledger::Penalty),
    ]
}

proptest! {
    #[test]
    fn difficulty_never_eases_and_respects_caps(day in 1_u32..500) {
        let config = DifficultyConfig::default();
        let today = difficulty_for_day(&config, day);
        let tomorrow = difficulty_for_day(&config, day + 1);

        prop_assert!(tomorrow.quest_count >= today.quest_count);
        prop_assert!(tomorrow.spawn_interval <= today.spawn_interval);
        prop_assert!(tomorrow.speed_multiplier >= today.speed_multiplier);
        prop_assert!(tomorrow.crossing_chance >= today.crossing_chance);
        prop_assert!(tomorrow.max_pedestrians >= today.max_pedestrians);

        prop_assert!(today.quest_count <= config.max_quest_count);
        prop_assert!(today.spawn_interval >= config.min_spawn_interval);
        prop_assert!(today.speed_multiplier <= config.max_speed_multiplier);
        prop_assert!(today.crossing_chance <= config.max_crossing_chance);
        prop_assert!(today.max_pedestrians <= config.pedestrian_cap);
    }

    #[test]
    fn balance_tracks_ledger_and_never_goes_negative(
        start in 0_u64..2_000,
        ops in prop::collection::vec(ledger_strategy(), 0..40),
    ) {
        let mut progress: Store<Progress> = Store::new(IdGenerator::new());
        let mut outbox = Outbox::default();
        ensure_ledger(&mut progress, start);

        let mut expected = start;
        for op in ops {
            match op {
                Ledger::Credit(amount) => {
                    credit(&mut progress, &mut outbox, amount, 1.0);
                    expected += amount;
                }
                Ledger::Penalty(amount) => {
                    apply_penalty(&mut progress, &mut outbox, amount);
                    expected = expected.saturating_sub(amount);
                }
            }
            prop_assert_eq!(balance(&progress), expected);
        }
    }

    #[test]
    fn live_ragdolls_never_exceed_cap(cap in 1_usize..5, hits in 1_usize..12) {
        let mut config = GameConfig::default();
        config.timing.fixed_timestep = FIXED;
        config.ragdoll.max_active_ragdolls = cap;
        let mut day = DayLoop::new(config, MemoryPersistence::new()).unwrap();
        day.start_day().unwrap();

        for i in 0..hits {
            let id = day
                .spawn_pedestrian(PedestrianKind::Walker, Vec3::new(1.0, 0.0, i as f32), None)
                .unwrap();
            day.push_contact(contact(id));
            day.step(FIXED);

            let mut ragdolls = day.sim_mut().group::<With<Ragdolled>>();
            let live = ragdolls.count(day.sim());
            prop_assert!(live <= cap);
            prop_assert_eq!(live, (i + 1).min(cap));
        }
    }

    #[test]
    fn quest_progress_is_monotonic_and_bounded(
        kinds in prop::collection::vec(kind_strategy(), 1..20),
    ) {
        let mut config = GameConfig::default();
        config.timing.fixed_timestep = FIXED;
        config.quests.pool = vec![
            QuestTemplate { target_kind: PedestrianKind::Walker, min_required: 2, max_required: 4, reward: 100 },
            QuestTemplate { target_kind: PedestrianKind::Jogger, min_required: 1, max_required: 3, reward: 100 },
        ];
        config.quests.min_count = 2;
        config.difficulty.base_quest_count = 2;
        config.difficulty.max_quest_count = 2;
        let mut day = DayLoop::new(config, MemoryPersistence::new()).unwrap();
        day.start_day().unwrap();

        let mut previous: Vec<u32> = day.snapshot().quests.iter().map(|q| q.current_count).collect();
        for (i, kind) in kinds.into_iter().enumerate() {
            let id = day
                .spawn_pedestrian(kind, Vec3::new(1.0, 0.0, i as f32), None)
                .unwrap();
            day.push_contact(contact(id));
            day.step(FIXED);

            let quests = day.snapshot().quests;
            for (quest, before) in quests.iter().zip(&previous) {
                prop_assert!(quest.current_count >= *before);
                prop_assert!(quest.current_count <= quest.required_count);
                prop_assert_eq!(quest.completed, quest.current_count == quest.required_count);
            }
            previous = quests.iter().map(|q| q.current_count).collect();
        }
    }
}
