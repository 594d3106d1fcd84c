// src/models/ranking.rs

use serde::{Deserialize, Serialize};

use crate::{engine::xp::LevelProgress, error::AppError};

/// Direction of a student's rank since the last snapshot of the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Unchanged,
    /// No snapshot exists for this student in this scope yet.
    New,
}

impl Trend {
    pub fn from_delta(delta: Option<i64>) -> Self {
        match delta {
            None => Trend::New,
            Some(d) if d > 0 => Trend::Up,
            Some(d) if d < 0 => Trend::Down,
            Some(_) => Trend::Unchanged,
        }
    }
}

/// One computed leaderboard row. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub student_id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub class_id: i64,
    pub class_name: Option<String>,
    pub scope_name: String,
    pub xp: f64,
    pub level: i64,
    pub progress: LevelProgress,
    /// 1-based position in the current view.
    pub position: i64,
    /// Position captured before the latest grade write in this scope.
    pub previous_position: Option<i64>,
    /// `previous_position - position`; positive means the student moved up.
    pub rank_delta: Option<i64>,
    pub trend: Trend,
}

/// The student dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgress {
    pub student_id: i64,
    pub class_id: i64,
    pub xp: f64,
    pub level: i64,
    pub progress: LevelProgress,
    pub position: i64,
    pub previous_position: Option<i64>,
    pub rank_delta: Option<i64>,
}

/// Query parameters for `GET /api/ranking`.
///
/// Ids stay as strings so clients sending `undefined` get the unfiltered view.
#[derive(Debug, Default, Deserialize)]
pub struct RankingParams {
    #[serde(default, alias = "teacherId")]
    pub teacher_id: Option<String>,
    #[serde(default, alias = "classId")]
    pub class_id: Option<String>,
}

/// Query parameters for class-bound catalog reads.
#[derive(Debug, Default, Deserialize)]
pub struct ClassParams {
    #[serde(default, alias = "classId")]
    pub class_id: Option<String>,
}

/// Parses an optional id query value. Blank, `undefined` and `null` count as absent.
pub fn parse_optional_id(raw: Option<&str>, field: &str) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("undefined") | Some("null") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} is not a valid id", field))),
    }
}
