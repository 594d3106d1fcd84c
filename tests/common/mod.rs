// tests/common/mod.rs

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use levelboard::{
    config::Config,
    engine::{EngineSettings, ProgressionEngine},
    models::{
        class_room::ClassRoom,
        item::{GradableItem, ItemKind},
        notification::Notification,
        student::Student,
    },
    routes,
    state::AppState,
    store::{MemoryStore, ProgressionStore, Seed, memory::SeedGrade},
    utils::jwt::sign_jwt,
};

pub const SECRET: &str = "ranking_test_secret";

pub const TEACHER_ONE: i64 = 1;
pub const TEACHER_TWO: i64 = 2;

pub const CLASS_A: i64 = 10;
pub const CLASS_B: i64 = 11;
pub const CLASS_OTHER: i64 = 20;

pub const ALICE: i64 = 1;
pub const BRUNO: i64 = 2;
pub const CARLA: i64 = 3;
pub const DIEGO: i64 = 4;
pub const EVA: i64 = 5;

pub const QUEST_ONE: i64 = 100;
pub const QUEST_TWO: i64 = 101;
pub const GUILD_MISSION: i64 = 102;
pub const QUEST_B: i64 = 110;
pub const QUEST_OTHER: i64 = 200;

fn student(id: i64, name: &str, class_id: i64, teacher_id: i64) -> Student {
    Student {
        id,
        name: name.to_string(),
        avatar_url: None,
        teacher_id,
        class_id,
    }
}

fn item(id: i64, title: &str, class_id: i64, kind: ItemKind) -> GradableItem {
    GradableItem {
        id,
        title: title.to_string(),
        max_score: 10.0,
        class_id,
        kind,
        reward: matches!(kind, ItemKind::Mission).then_some(3),
    }
}

/// Two teachers, three classes.
///
/// Class A holds Alice (100 XP), Bruno (90 XP) and Eva (no grades).
/// Class B holds Carla (300 XP); the other teacher's class holds Diego (200 XP).
pub fn seed() -> Seed {
    Seed {
        classes: vec![
            ClassRoom {
                id: CLASS_A,
                name: "Guild A".to_string(),
                teacher_id: TEACHER_ONE,
            },
            ClassRoom {
                id: CLASS_B,
                name: "Guild B".to_string(),
                teacher_id: TEACHER_ONE,
            },
            ClassRoom {
                id: CLASS_OTHER,
                name: "Guild Z".to_string(),
                teacher_id: TEACHER_TWO,
            },
        ],
        students: vec![
            student(ALICE, "Alice", CLASS_A, TEACHER_ONE),
            student(BRUNO, "Bruno", CLASS_A, TEACHER_ONE),
            student(CARLA, "Carla", CLASS_B, TEACHER_ONE),
            student(DIEGO, "Diego", CLASS_OTHER, TEACHER_TWO),
            student(EVA, "Eva", CLASS_A, TEACHER_ONE),
        ],
        items: vec![
            item(QUEST_ONE, "Quest 1", CLASS_A, ItemKind::Activity),
            item(QUEST_TWO, "Quest 2", CLASS_A, ItemKind::Activity),
            item(GUILD_MISSION, "Guild mission", CLASS_A, ItemKind::Mission),
            item(QUEST_B, "Quest B", CLASS_B, ItemKind::Activity),
            item(QUEST_OTHER, "Quest Z", CLASS_OTHER, ItemKind::Activity),
        ],
        grades: vec![
            SeedGrade {
                student_id: ALICE,
                item_id: QUEST_ONE,
                score: 10.0,
            },
            SeedGrade {
                student_id: BRUNO,
                item_id: QUEST_ONE,
                score: 9.0,
            },
            SeedGrade {
                student_id: CARLA,
                item_id: QUEST_B,
                score: 30.0,
            },
            SeedGrade {
                student_id: DIEGO,
                item_id: QUEST_OTHER,
                score: 20.0,
            },
        ],
    }
}

pub fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_seed(seed()))
}

pub fn engine_over(store: Arc<dyn ProgressionStore>, settings: EngineSettings) -> ProgressionEngine {
    ProgressionEngine::new(store, settings)
}

/// Waits until the notifier has stored at least `count` notifications.
pub async fn wait_for_notifications(store: &MemoryStore, count: usize) -> Vec<Notification> {
    for _ in 0..100 {
        let notifications = store.notifications().await;
        if notifications.len() >= count {
            return notifications;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    store.notifications().await
}

/// Spawns the app on a random port. Returns the base URL.
pub async fn spawn_app(store: Arc<MemoryStore>) -> String {
    let settings = EngineSettings::default();
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        seed_path: None,
        engine: settings,
        warnings: Vec::new(),
    };

    let engine = Arc::new(ProgressionEngine::new(store, settings));
    let state = AppState { engine, config };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

pub fn admin_token() -> String {
    sign_jwt("999", "admin", None, None, SECRET, 600).unwrap()
}

pub fn teacher_token(teacher_id: i64) -> String {
    sign_jwt(&teacher_id.to_string(), "teacher", None, None, SECRET, 600).unwrap()
}

pub fn student_token(student_id: i64) -> String {
    sign_jwt(&student_id.to_string(), "student", None, None, SECRET, 600).unwrap()
}
