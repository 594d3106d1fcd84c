// src/engine/xp.rs

//! XP and level math. Everything here is pure.

use serde::{Deserialize, Serialize};

use crate::models::{grade::ScoredGrade, item::ItemKind};

/// XP multiplier per item kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpWeights {
    pub activity: f64,
    pub mission: f64,
}

impl Default for XpWeights {
    fn default() -> Self {
        Self {
            activity: 10.0,
            mission: 3.0,
        }
    }
}

impl XpWeights {
    pub fn weight(&self, kind: ItemKind) -> f64 {
        match kind {
            ItemKind::Activity => self.activity,
            ItemKind::Mission => self.mission,
        }
    }

    pub fn xp_for(&self, score: f64, kind: ItemKind) -> f64 {
        score * self.weight(kind)
    }
}

/// Sum of `score * weight(kind)` over the given grades.
pub fn total_xp<'a, I>(grades: I, weights: &XpWeights) -> f64
where
    I: IntoIterator<Item = &'a ScoredGrade>,
{
    grades
        .into_iter()
        .map(|g| weights.xp_for(g.score, g.kind))
        .sum()
}

/// Highest reachable level. XP beyond `100 * (MAX_LEVEL - 1)^2` stays here.
pub const MAX_LEVEL: i64 = 1 << 31;

/// Negative and NaN XP count as zero; `+inf` is kept.
fn clamp_xp(xp: f64) -> f64 {
    if xp.is_nan() { 0.0 } else { xp.max(0.0) }
}

/// `floor(sqrt(xp / 100)) + 1`, capped at `MAX_LEVEL`.
pub fn level_for(xp: f64) -> i64 {
    let level = (clamp_xp(xp) / 100.0).sqrt().floor() + 1.0;
    level.min(MAX_LEVEL as f64) as i64
}

/// Where a student sits between the current level floor and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: i64,
    pub current_floor: f64,
    pub next_ceiling: f64,
    /// Clamped to `0..=100`.
    pub percent: f64,
    pub xp_to_next: f64,
}

impl LevelProgress {
    pub fn for_xp(xp: f64) -> Self {
        let xp = clamp_xp(xp);
        let level = level_for(xp);
        let below = (level - 1) as f64;
        let current_floor = below * below * 100.0;
        let next_ceiling = (level as f64) * (level as f64) * 100.0;

        // span is at least 100 for every level >= 1
        let span = next_ceiling - current_floor;
        let raw = (xp - current_floor) / span * 100.0;
        let percent = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };
        let xp_to_next = (next_ceiling - xp).max(0.0);

        Self {
            level,
            current_floor,
            next_ceiling,
            percent,
            xp_to_next,
        }
    }
}

/// XP and level of one student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentXp {
    pub xp: f64,
    pub level: i64,
}

impl StudentXp {
    pub fn from_grades<'a, I>(grades: I, weights: &XpWeights) -> Self
    where
        I: IntoIterator<Item = &'a ScoredGrade>,
    {
        let xp = total_xp(grades, weights);
        Self {
            xp,
            level: level_for(xp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(score: f64, kind: ItemKind) -> ScoredGrade {
        ScoredGrade {
            student_id: 1,
            score,
            kind,
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for(0.0), 1);
        assert_eq!(level_for(99.0), 1);
        assert_eq!(level_for(100.0), 2);
        assert_eq!(level_for(399.0), 2);
        assert_eq!(level_for(400.0), 3);
        assert_eq!(level_for(900.0), 4);
    }

    #[test]
    fn level_is_monotonic() {
        let mut last = level_for(0.0);
        for step in 0..5_000 {
            let level = level_for(step as f64 * 3.5);
            assert!(level >= last, "level dropped at xp {}", step as f64 * 3.5);
            last = level;
        }
    }

    #[test]
    fn negative_and_non_finite_xp_do_not_panic() {
        assert_eq!(level_for(-250.0), 1);
        assert_eq!(level_for(f64::NAN), 1);
        assert_eq!(level_for(f64::NEG_INFINITY), 1);

        let progress = LevelProgress::for_xp(-250.0);
        assert_eq!(progress.level, 1);
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.xp_to_next, 100.0);
    }

    #[test]
    fn huge_xp_saturates_at_max_level() {
        assert_eq!(level_for(1e19), 316_227_767);
        assert_eq!(level_for(1e300), MAX_LEVEL);
        assert_eq!(level_for(f64::INFINITY), MAX_LEVEL);

        let mut last = 1;
        for xp in [1e17, 1e18, 9.2e18, 1e19, 1e20, 1e100, f64::MAX, f64::INFINITY] {
            let level = level_for(xp);
            assert!(level >= last, "level dropped at xp {}", xp);
            last = level;
        }

        for xp in [1e19, 1e300, f64::INFINITY] {
            let progress = LevelProgress::for_xp(xp);
            assert!(progress.level >= 1);
            assert!(progress.current_floor >= 0.0);
            assert!(progress.next_ceiling > progress.current_floor);
            assert!((0.0..=100.0).contains(&progress.percent));
            assert!(progress.xp_to_next >= 0.0);
        }

        let capped = LevelProgress::for_xp(f64::INFINITY);
        assert_eq!(capped.level, MAX_LEVEL);
        assert_eq!(capped.percent, 100.0);
        assert_eq!(capped.xp_to_next, 0.0);
    }

    #[test]
    fn mixes_weights_per_kind() {
        let weights = XpWeights::default();
        let grades = [
            grade(10.0, ItemKind::Activity),
            grade(8.0, ItemKind::Mission),
        ];

        assert_eq!(total_xp(&grades, &weights), 100.0 + 24.0);
    }

    #[test]
    fn sum_is_order_independent() {
        let weights = XpWeights {
            activity: 10.0,
            mission: 3.0,
        };
        let mut grades = vec![
            grade(7.0, ItemKind::Activity),
            grade(2.5, ItemKind::Mission),
            grade(9.0, ItemKind::Activity),
            grade(4.0, ItemKind::Mission),
        ];
        let forward = total_xp(&grades, &weights);
        grades.reverse();
        let backward = total_xp(&grades, &weights);

        assert_eq!(forward, backward);
        assert_eq!(forward, 70.0 + 7.5 + 90.0 + 12.0);
    }

    #[test]
    fn progress_bounds() {
        let zero = LevelProgress::for_xp(0.0);
        assert_eq!(zero.current_floor, 0.0);
        assert_eq!(zero.next_ceiling, 100.0);
        assert_eq!(zero.percent, 0.0);
        assert_eq!(zero.xp_to_next, 100.0);

        let mid = LevelProgress::for_xp(250.0);
        assert_eq!(mid.level, 2);
        assert_eq!(mid.current_floor, 100.0);
        assert_eq!(mid.next_ceiling, 400.0);
        assert_eq!(mid.percent, 50.0);
        assert_eq!(mid.xp_to_next, 150.0);
    }

    #[test]
    fn empty_grade_set_is_level_one() {
        let stats = StudentXp::from_grades(&[], &XpWeights::default());
        assert_eq!(stats, StudentXp { xp: 0.0, level: 1 });
    }
}
