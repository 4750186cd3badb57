//! Integration tests for the progress and motivation engine.

use momentum_core::{
    AiDetails, Config, Engine, HabitCompletion, MemoryPlanStore, Milestone, MilestoneStatus, Mood,
    NewTask, PlanDb, PlanStore, RawCompletion, TaskPatch,
};

fn engine() -> Engine<MemoryPlanStore> {
    Engine::new(MemoryPlanStore::new(), &Config::default()).unwrap()
}

fn habit_done(id: &str) -> RawCompletion {
    RawCompletion::Habit(HabitCompletion {
        habit_id: id.to_string(),
        completed: Some(true),
        notes: None,
    })
}

#[test]
fn test_three_habit_completions_lift_mood_from_idle() {
    let mut engine = engine();
    assert_eq!(engine.mood().mood, Mood::Idle);

    let mut seen = Vec::new();
    for id in ["stretch", "journal", "read"] {
        engine.record_completion(&habit_done(id)).unwrap();
        seen.push(engine.mood().mood);
    }

    assert!(seen.iter().all(|m| *m != Mood::Concerned));
    assert!(matches!(
        engine.mood().mood,
        Mood::Encouraged | Mood::Celebratory
    ));
    assert_eq!(engine.mood().mood, Mood::Celebratory);
}

#[test]
fn test_open_character_twice_matches_once() {
    let mut once = engine();
    once.open_character();

    let mut twice = engine();
    twice.open_character();
    twice.open_character();

    assert_eq!(once.character(), twice.character());
}

#[test]
fn test_unschedule_survives_empty_patch() {
    let mut engine = engine();
    let task = engine
        .create_task(NewTask {
            title: "Book venue".to_string(),
            planned_date: chrono::NaiveDate::from_ymd_opt(2026, 12, 1),
            ..NewTask::default()
        })
        .unwrap();

    let unschedule: TaskPatch = serde_json::from_str(r#"{"plannedDate": null}"#).unwrap();
    engine.update_task(&task.id, unschedule).unwrap();
    let no_fields: TaskPatch = serde_json::from_str("{}").unwrap();
    let task = engine.update_task(&task.id, no_fields).unwrap();

    assert_eq!(task.planned_date, None);
}

#[test]
fn test_complete_then_uncomplete_restores_ratio() {
    let mut engine = engine();
    engine.record_completion(&habit_done("h-1")).unwrap();
    engine
        .record_completion(&RawCompletion::Habit(HabitCompletion {
            habit_id: "h-2".to_string(),
            completed: Some(false),
            notes: None,
        }))
        .unwrap();
    let task = engine.create_task(NewTask::titled("Send invoices")).unwrap();

    let before = engine.weighted_ratio();
    engine.toggle_completion(&task.id).unwrap();
    assert_ne!(engine.weighted_ratio(), before);
    engine.toggle_completion(&task.id).unwrap();

    assert_eq!(engine.weighted_ratio(), before);
    assert_eq!(before, Some(0.5));
}

#[test]
fn test_seed_single_pending_milestone() {
    let mut engine = engine();
    let plan: AiDetails =
        serde_json::from_str(r#"{"Milestones": [{"Name": "Launch MVP", "Status": "pending"}]}"#)
            .unwrap();

    let seeded = engine.seed_from_plan(&plan).unwrap();

    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0].title, "Launch MVP");
    assert!(!seeded[0].completed);
    assert_eq!(seeded[0].planned_date, None);
    assert_eq!(engine.tasks().len(), 1);
    assert_eq!(engine.milestone_status("Launch MVP"), Some(MilestoneStatus::Pending));
}

#[test]
fn test_create_task_defaults() {
    let mut engine = engine();
    let task = engine.create_task(NewTask::titled("Write pitch deck")).unwrap();

    assert!(!task.completed);
    assert_eq!(task.description, "");
    assert_eq!(task.planned_date, None);
    assert!(!task.id.is_empty());
}

#[test]
fn test_done_milestone_seeds_completed_task() {
    let mut engine = engine();
    let plan = AiDetails {
        milestones: vec![Milestone {
            name: "Incorporate".to_string(),
            status: MilestoneStatus::Done,
        }],
        ..AiDetails::default()
    };
    let seeded = engine.seed_from_plan(&plan).unwrap();
    assert!(seeded[0].completed);
    // Seeding is imported state and does not move the mood.
    assert_eq!(engine.mood().mood, Mood::Idle);
}

#[test]
fn test_sqlite_backed_engine_restarts_with_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("momentum.db");

    let task_id = {
        let db = PlanDb::open_at(&path).unwrap();
        let mut engine = Engine::new(db, &Config::default()).unwrap();
        engine.set_user_type(momentum_core::UserType::New);
        let task = engine.create_task(NewTask::titled("Open bank account")).unwrap();
        engine.toggle_completion(&task.id).unwrap();
        engine.record_completion(&habit_done("walk")).unwrap();
        task.id
    };

    let db = PlanDb::open_at(&path).unwrap();
    assert_eq!(db.list_tasks().unwrap().len(), 1);
    let engine = Engine::new(db, &Config::default()).unwrap();

    assert!(engine.task(&task_id).unwrap().completed);
    assert_eq!(engine.mood().mood, Mood::Celebratory);
    assert_eq!(engine.character().user_type, momentum_core::UserType::New);
}

#[test]
fn test_sqlite_restart_does_not_count_imported_milestones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("momentum.db");
    let plan: AiDetails =
        serde_json::from_str(r#"{"Milestones": [{"Name": "Incorporate", "Status": "done"}]}"#)
            .unwrap();

    let live = {
        let mut engine = Engine::new(PlanDb::open_at(&path).unwrap(), &Config::default()).unwrap();
        engine.seed_from_plan(&plan).unwrap();
        engine.mood().mood
    };

    let restarted = Engine::new(PlanDb::open_at(&path).unwrap(), &Config::default()).unwrap();
    assert_eq!(live, Mood::Idle);
    assert_eq!(restarted.mood().mood, live);
    assert_eq!(restarted.tasks().len(), 1);
}

#[test]
fn test_duplicate_milestones_are_rejected() {
    let mut engine = engine();
    let plan: AiDetails = serde_json::from_str(
        r#"{"Milestones": [{"Name": "Launch MVP"}, {"Name": "Launch MVP", "Status": "done"}]}"#,
    )
    .unwrap();

    assert!(matches!(
        engine.seed_from_plan(&plan),
        Err(momentum_core::CoreError::Validation(_))
    ));
    assert!(engine.tasks().is_empty());
}

mod properties {
    use super::*;
    use momentum_core::{CharacterSession, CompletionEvent};
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Open,
        Close,
        StartChatting,
        StopChatting,
        SetUserType(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Open),
            Just(Op::Close),
            Just(Op::StartChatting),
            Just(Op::StopChatting),
            (0u8..5).prop_map(Op::SetUserType),
        ]
    }

    fn user_type(n: u8) -> momentum_core::UserType {
        use momentum_core::UserType::*;
        [New, Experienced, Agency, TeamLead, Unknown][n as usize % 5]
    }

    proptest! {
        #[test]
        fn chatting_implies_open(ops in prop::collection::vec(op(), 0..64)) {
            let mut session = CharacterSession::new();
            let mut ever_opened = false;
            for op in ops {
                match op {
                    Op::Open => { session.open(); }
                    Op::Close => { session.close(); }
                    Op::StartChatting => { session.start_chatting(); }
                    Op::StopChatting => { session.stop_chatting(); }
                    Op::SetUserType(n) => { session.set_user_type(user_type(n)); }
                }
                ever_opened |= session.is_open();
                prop_assert!(!session.is_chatting() || session.is_open());
                prop_assert_eq!(session.has_interacted_before(), ever_opened);
            }
        }

        #[test]
        fn high_habit_ratio_is_celebratory(
            positives in 1usize..40,
            extra_negatives in 0usize..10,
        ) {
            // Keep the ratio at or above 0.8: negatives <= positives / 4.
            let negatives = extra_negatives.min(positives / 4);
            let config = momentum_core::MoodConfig {
                window_size: positives + negatives,
                ..momentum_core::MoodConfig::default()
            };
            let at = chrono::Utc::now();
            let mut window: Vec<CompletionEvent> = (0..negatives)
                .map(|i| CompletionEvent::habit(format!("miss-{i}"), false, at))
                .collect();
            window.extend((0..positives).map(|i| CompletionEvent::habit(format!("hit-{i}"), true, at)));

            let state = momentum_core::mood::resolve(&window, &config, at);
            prop_assert_eq!(state.mood, Mood::Celebratory);
        }
    }
}
