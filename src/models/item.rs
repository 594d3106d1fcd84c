// src/models/item.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a gradable item rewards. Each kind carries its own XP weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Evaluated per student.
    Activity,
    /// Class-wide mission.
    Mission,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Activity => "activity",
            ItemKind::Mission => "mission",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "activity" => Some(ItemKind::Activity),
            "mission" => Some(ItemKind::Mission),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'gradable_items' table (activities and missions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradableItem {
    pub id: i64,
    pub title: String,
    pub max_score: f64,
    pub class_id: i64,
    pub kind: ItemKind,
    /// Flat reward advertised on missions. Not part of the XP formula.
    #[serde(default)]
    pub reward: Option<i64>,
}
