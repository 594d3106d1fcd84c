// src/models/grade.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::item::ItemKind};

/// Represents the 'grades' table. One row per (student, item) pair.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub item_id: i64,
    pub score: f64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A grade joined with the kind of item it scores. Input of the XP formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredGrade {
    pub student_id: i64,
    pub score: f64,
    pub kind: ItemKind,
}

/// A JSON value that may arrive as a number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    fn as_id(&self) -> Option<i64> {
        match self {
            LooseNumber::Int(v) => Some(*v),
            LooseNumber::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            LooseNumber::Float(_) => None,
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_score(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Int(v) => *v as f64,
            LooseNumber::Float(v) => *v,
            LooseNumber::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// DTO for posting a grade. Fields stay loose so bad input maps to a 400, not a 422.
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    #[serde(default, alias = "studentId")]
    pub student_id: Option<LooseNumber>,
    #[serde(default, alias = "itemId", alias = "activityId")]
    pub item_id: Option<LooseNumber>,
    #[serde(default)]
    pub score: Option<LooseNumber>,
}

/// A parsed grade write.
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
pub struct GradeCommand {
    #[validate(range(min = 1, message = "student_id must be a positive id"))]
    pub student_id: i64,
    #[validate(range(min = 1, message = "item_id must be a positive id"))]
    pub item_id: i64,
    pub score: f64,
}

impl GradeCommand {
    /// Rejects commands that must never reach the store.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|errors| AppError::BadRequest(errors.to_string()))?;
        if !self.score.is_finite() {
            return Err(AppError::BadRequest("score must be a finite number".to_string()));
        }
        Ok(())
    }
}

impl TryFrom<GradeRequest> for GradeCommand {
    type Error = AppError;

    fn try_from(req: GradeRequest) -> Result<Self, Self::Error> {
        let student_id = required(req.student_id, "student_id")?
            .as_id()
            .ok_or_else(|| AppError::BadRequest("student_id is not a valid id".to_string()))?;
        let item_id = required(req.item_id, "item_id")?
            .as_id()
            .ok_or_else(|| AppError::BadRequest("item_id is not a valid id".to_string()))?;
        let score = required(req.score, "score")?
            .as_score()
            .ok_or_else(|| AppError::BadRequest("score is not a number".to_string()))?;

        let command = GradeCommand {
            student_id,
            item_id,
            score,
        };
        command.check()?;
        Ok(command)
    }
}

fn required(value: Option<LooseNumber>, field: &str) -> Result<LooseNumber, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> GradeRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn accepts_numeric_strings_and_camel_case() {
        let command = GradeCommand::try_from(request(serde_json::json!({
            "studentId": "7",
            "activityId": 3,
            "score": "8.5"
        })))
        .unwrap();

        assert_eq!(
            command,
            GradeCommand {
                student_id: 7,
                item_id: 3,
                score: 8.5
            }
        );
    }

    #[test]
    fn rejects_missing_and_unparseable_fields() {
        let missing = GradeCommand::try_from(request(serde_json::json!({ "item_id": 1, "score": 5 })));
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let garbage = GradeCommand::try_from(request(serde_json::json!({
            "student_id": "abc",
            "item_id": 1,
            "score": 5
        })));
        assert!(matches!(garbage, Err(AppError::BadRequest(_))));

        let not_finite = GradeCommand::try_from(request(serde_json::json!({
            "student_id": 1,
            "item_id": 1,
            "score": "NaN"
        })));
        assert!(matches!(not_finite, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_non_positive_ids() {
        let zero = GradeCommand::try_from(request(serde_json::json!({
            "student_id": 0,
            "item_id": 1,
            "score": 5
        })));
        assert!(matches!(zero, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn out_of_range_scores_pass_through() {
        let command = GradeCommand::try_from(request(serde_json::json!({
            "student_id": 1,
            "item_id": 1,
            "score": -4
        })))
        .unwrap();
        assert_eq!(command.score, -4.0);
    }
}
