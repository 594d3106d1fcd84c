// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::engine::{EngineSettings, snapshot::SnapshotPolicy, xp::XpWeights};

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    /// JSON fixture loaded into the in-memory store at startup.
    pub seed_path: Option<String>,
    pub engine: EngineSettings,
    /// Settings that were set but could not be parsed. Logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let defaults = EngineSettings::default();
        let mut warnings = Vec::new();
        let w = &mut warnings;

        let port = parse_or("PORT", 3000, w);
        let engine = EngineSettings {
            weights: XpWeights {
                activity: parse_or("XP_ACTIVITY_WEIGHT", defaults.weights.activity, w),
                mission: parse_or("XP_MISSION_WEIGHT", defaults.weights.mission, w),
            },
            policy: SnapshotPolicy {
                teacher_scope: parse_or("SNAPSHOT_TEACHER_SCOPE", defaults.policy.teacher_scope, w),
                global_scope: parse_or("SNAPSHOT_GLOBAL_SCOPE", defaults.policy.global_scope, w),
            },
            // Retries after a snapshot version conflict.
            max_conflict_retries: parse_or("MAX_CONFLICT_RETRIES", defaults.max_conflict_retries, w),
            notification_buffer: parse_or("NOTIFICATION_BUFFER", defaults.notification_buffer, w),
        };

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            seed_path: env::var("SEED_PATH").ok(),
            engine,
            warnings,
        }
    }
}

/// Reads `key` from the environment. See `parse_setting`.
fn parse_or<T: FromStr + std::fmt::Debug>(key: &str, default: T, warnings: &mut Vec<String>) -> T {
    parse_setting(key, env::var(key).ok(), default, warnings)
}

/// Parses a raw setting, falling back to `default` when unset or malformed.
fn parse_setting<T: FromStr + std::fmt::Debug>(
    key: &str,
    raw: Option<String>,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warnings.push(format!("Ignoring invalid {}={:?}, using {:?}", key, raw, default));
        default
    })
}
