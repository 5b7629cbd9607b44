//! Level/progress derivation from lifetime points.
//!
//! Tiers are compared by `min_points`, never by position, so the table may
//! arrive unsorted or with gaps in `level_number`.

use crate::models::levels::LevelTier;

#[derive(Clone, Debug, PartialEq)]
pub enum LevelStatus {
    /// No tier table loaded yet.
    NotReady,
    InProgress { next_min_points: i64 },
    MaxLevel,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelProgress {
    pub level: u32,
    pub title: String,
    /// Fraction of the way to the next tier, within `[0, 1]`.
    pub progress: f64,
    pub progress_text: String,
    pub status: LevelStatus,
}

impl LevelProgress {
    fn not_ready() -> Self {
        Self {
            level: 1,
            title: "Loading...".to_string(),
            progress: 0.0,
            progress_text: "...".to_string(),
            status: LevelStatus::NotReady,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status != LevelStatus::NotReady
    }

    pub fn label(&self) -> String {
        format!("Lv. {}: {}", self.level, self.title)
    }

    pub fn percent(&self) -> f64 {
        self.progress * 100.0
    }
}

/// Highest tier whose minimum is at most `points`; the lowest tier when none qualifies.
/// Equal minima resolve to the higher tier number.
pub fn current_tier(points: i64, tiers: &[LevelTier]) -> Option<&LevelTier> {
    tiers
        .iter()
        .filter(|tier| tier.min_points <= points)
        .max_by_key(|tier| (tier.min_points, tier.level_number))
        .or_else(|| {
            tiers
                .iter()
                .min_by_key(|tier| (tier.min_points, tier.level_number))
        })
}

/// The tier with the smallest minimum strictly above `current`'s.
pub fn next_tier<'a>(current: &LevelTier, tiers: &'a [LevelTier]) -> Option<&'a LevelTier> {
    tiers
        .iter()
        .filter(|tier| tier.min_points > current.min_points)
        .min_by_key(|tier| (tier.min_points, tier.level_number))
}

pub fn compute_level(points: i64, tiers: &[LevelTier]) -> LevelProgress {
    let current = match current_tier(points, tiers) {
        Some(tier) => tier,
        None => return LevelProgress::not_ready(),
    };

    match next_tier(current, tiers) {
        Some(next) => {
            let span = (next.min_points - current.min_points) as f64;
            let progress = ((points - current.min_points) as f64 / span).clamp(0.0, 1.0);

            LevelProgress {
                level: current.level_number,
                title: current.title.clone(),
                progress,
                progress_text: format!("{} / {} Pts", points, next.min_points),
                status: LevelStatus::InProgress {
                    next_min_points: next.min_points,
                },
            }
        }
        None => LevelProgress {
            level: current.level_number,
            title: current.title.clone(),
            progress: 1.0,
            progress_text: format!("{} Pts (Max Level)", points),
            status: LevelStatus::MaxLevel,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepState {
    Reached,
    Current,
    Locked,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LadderStep {
    pub level: u32,
    pub title: String,
    pub min_points: i64,
    /// Upper bound of the bracket, `None` for the top tier.
    pub max_points: Option<i64>,
    pub state: StepState,
}

/// Every tier in ascending order of minimum, marked against `points`.
pub fn ladder(points: i64, tiers: &[LevelTier]) -> Vec<LadderStep> {
    let mut sorted: Vec<&LevelTier> = tiers.iter().collect();
    sorted.sort_by_key(|tier| (tier.min_points, tier.level_number));

    let current_min = current_tier(points, tiers).map(|tier| (tier.min_points, tier.level_number));

    sorted
        .iter()
        .enumerate()
        .map(|(i, tier)| {
            let key = (tier.min_points, tier.level_number);
            let state = match current_min {
                Some(current) if key == current => StepState::Current,
                Some(current) if key < current => StepState::Reached,
                _ => StepState::Locked,
            };

            LadderStep {
                level: tier.level_number,
                title: tier.title.clone(),
                min_points: tier.min_points,
                max_points: sorted.get(i + 1).map(|next| next.min_points - 1),
                state,
            }
        })
        .collect()
}

/// Overall position on the ladder, within `[0, 1]`.
pub fn ladder_fraction(points: i64, tiers: &[LevelTier]) -> f64 {
    let steps = ladder(points, tiers);
    if steps.len() < 2 {
        return if steps.is_empty() { 0.0 } else { 1.0 };
    }

    let rank = match steps.iter().position(|step| step.state == StepState::Current) {
        Some(rank) => rank,
        None => return 0.0,
    };
    let progress = compute_level(points, tiers).progress;

    ((rank as f64 + progress) / (steps.len() - 1) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<LevelTier> {
        vec![
            LevelTier::new(1, 0, "Seedling"),
            LevelTier::new(2, 1000, "Sprout"),
            LevelTier::new(3, 2000, "Sapling"),
        ]
    }

    #[test]
    fn midway_between_tiers() {
        let level = compute_level(1500, &tiers());
        assert_eq!(level.level, 2);
        assert_eq!(level.title, "Sprout");
        assert_eq!(level.progress, 0.5);
        assert_eq!(level.progress_text, "1500 / 2000 Pts");
        assert_eq!(level.label(), "Lv. 2: Sprout");
    }

    #[test]
    fn exact_minimum_enters_the_tier() {
        let level = compute_level(1000, &tiers());
        assert_eq!(level.level, 2);
        assert_eq!(level.progress, 0.0);
    }

    #[test]
    fn top_tier_is_max_level() {
        let level = compute_level(9000, &tiers());
        assert_eq!(level.level, 3);
        assert_eq!(level.progress, 1.0);
        assert_eq!(level.status, LevelStatus::MaxLevel);
        assert_eq!(level.progress_text, "9000 Pts (Max Level)");
    }

    #[test]
    fn empty_table_is_not_ready() {
        let level = compute_level(500, &[]);
        assert!(!level.is_ready());
        assert_eq!(level.level, 1);
        assert_eq!(level.title, "Loading...");
        assert_eq!(level.progress, 0.0);
    }

    #[test]
    fn negative_points_fall_back_to_lowest_tier_with_zero_progress() {
        let level = compute_level(-50, &tiers());
        assert_eq!(level.level, 1);
        assert_eq!(level.progress, 0.0);
    }

    #[test]
    fn shuffled_sparse_table_uses_min_points() {
        let tiers = vec![
            LevelTier::new(7, 4000, "Forest"),
            LevelTier::new(1, 0, "Seedling"),
            LevelTier::new(4, 2000, "Sapling"),
        ];

        let level = compute_level(3000, &tiers);
        assert_eq!(level.level, 4);
        assert_eq!(level.progress, 0.5);
        assert_eq!(
            level.status,
            LevelStatus::InProgress {
                next_min_points: 4000
            }
        );
    }

    #[test]
    fn lowest_tier_above_zero_still_clamps() {
        let tiers = vec![LevelTier::new(1, 100, "Seedling"), LevelTier::new(2, 300, "Sprout")];
        let level = compute_level(20, &tiers);
        assert_eq!(level.level, 1);
        assert_eq!(level.progress, 0.0);
    }

    #[test]
    fn equal_minima_prefer_higher_tier() {
        let tiers = vec![LevelTier::new(1, 0, "A"), LevelTier::new(2, 0, "B")];
        assert_eq!(compute_level(0, &tiers).level, 2);
    }

    #[test]
    fn progress_stays_in_unit_interval() {
        let tiers = tiers();
        for points in (-5000..12000).step_by(137) {
            let level = compute_level(points, &tiers);
            assert!((0.0..=1.0).contains(&level.progress), "points={}", points);
            let tier = current_tier(points, &tiers).unwrap();
            if points >= 0 {
                assert!(tier.min_points <= points);
                assert!(tiers
                    .iter()
                    .filter(|t| t.min_points <= points)
                    .all(|t| t.min_points <= tier.min_points));
            }
        }
    }

    #[test]
    fn ladder_marks_steps_relative_to_current() {
        let steps = ladder(1500, &tiers());
        let states: Vec<StepState> = steps.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![StepState::Reached, StepState::Current, StepState::Locked]
        );
        assert_eq!(steps[0].max_points, Some(999));
        assert_eq!(steps[2].max_points, None);
    }

    #[test]
    fn ladder_fraction_combines_rank_and_progress() {
        assert_eq!(ladder_fraction(1500, &tiers()), 0.75);
        assert_eq!(ladder_fraction(0, &tiers()), 0.0);
        assert_eq!(ladder_fraction(5000, &tiers()), 1.0);
        assert_eq!(ladder_fraction(10, &[LevelTier::new(1, 0, "Only")]), 1.0);
    }
}
