use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::models::{Criterion, CriterionSubtotal, Grade};

/// Aggregates grades per criterion, in criterion order.
///
/// Grades pointing at a criterion that is not in `criteria` are ignored.
/// A criterion without grades gets `average: None` and no contribution.
pub fn criterion_subtotals(grades: &[Grade], criteria: &[Criterion]) -> Vec<CriterionSubtotal> {
    criteria
        .iter()
        .map(|criterion| {
            let (count, total) = grades
                .iter()
                .filter(|grade| grade.criteria_id == criterion.id)
                .fold((0usize, 0.0f64), |(count, total), grade| {
                    (count + 1, total + grade.score)
                });

            let average = if count == 0 {
                None
            } else {
                Some(total / count as f64)
            };

            CriterionSubtotal {
                criterion_id: criterion.id,
                name: criterion.name.clone(),
                weight: criterion.weight,
                max_score: criterion.max_score,
                grade_count: count,
                average,
                contribution: average.map_or(0.0, |avg| avg * criterion.weight),
            }
        })
        .collect()
}

/// Weighted mean over graded criteria only; ungraded ones drop out of both sums.
pub fn weighted_mean(subtotals: &[CriterionSubtotal]) -> f64 {
    let (total_score, total_weight) = subtotals
        .iter()
        .filter(|subtotal| subtotal.average.is_some())
        .fold((0.0f64, 0.0f64), |(score, weight), subtotal| {
            (score + subtotal.contribution, weight + subtotal.weight)
        });

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.0
    }
}

pub type ScoreFn = fn(&[Grade], &[Criterion]) -> f64;

/// Policy reducing a grade set to the final score of a work.
#[derive(Debug, Clone, Copy, Default)]
pub enum GradingStrategy {
    #[default]
    WeightedAverage,
    SimpleMean,
    MinimumPass { threshold: f64 },
    Custom { name: &'static str, calculate: ScoreFn },
}

impl GradingStrategy {
    pub const DEFAULT_MINIMUM_PASS: f64 = 3.0;

    pub fn calculate(&self, grades: &[Grade], criteria: &[Criterion]) -> f64 {
        match self {
            GradingStrategy::WeightedAverage => {
                weighted_mean(&criterion_subtotals(grades, criteria))
            }
            GradingStrategy::SimpleMean => {
                if grades.is_empty() {
                    0.0
                } else {
                    grades.iter().map(|grade| grade.score).sum::<f64>() / grades.len() as f64
                }
            }
            GradingStrategy::MinimumPass { threshold } => {
                let score = weighted_mean(&criterion_subtotals(grades, criteria));
                if score < *threshold {
                    0.0
                } else {
                    score
                }
            }
            GradingStrategy::Custom { calculate, .. } => calculate(grades, criteria),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GradingStrategy::WeightedAverage => "Promedio ponderado",
            GradingStrategy::SimpleMean => "Promedio simple",
            GradingStrategy::MinimumPass { .. } => "Promedio ponderado con nota mínima",
            GradingStrategy::Custom { name, .. } => name,
        }
    }
}

/// Strategy selector for the command line and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    Weighted,
    Simple,
    MinimumPass,
}

impl StrategyKind {
    pub fn into_strategy(self, minimum_pass_threshold: f64) -> GradingStrategy {
        match self {
            StrategyKind::Weighted => GradingStrategy::WeightedAverage,
            StrategyKind::Simple => GradingStrategy::SimpleMean,
            StrategyKind::MinimumPass => GradingStrategy::MinimumPass {
                threshold: minimum_pass_threshold,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grading strategy '{0}' (expected weighted, simple or minimum-pass)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weighted" | "weighted-average" => Ok(StrategyKind::Weighted),
            "simple" | "simple-mean" => Ok(StrategyKind::Simple),
            "minimum-pass" | "minimum_pass" => Ok(StrategyKind::MinimumPass),
            _ => Err(UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Failed,
}

impl Verdict {
    pub fn classify(score: f64, passing_grade: f64) -> Self {
        if score >= passing_grade {
            Verdict::Approved
        } else {
            Verdict::Failed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Approved => "APROBADO",
            Verdict::Failed => "REPROBADO",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn criterion(id: u64, weight: f64) -> Criterion {
        Criterion {
            id,
            name: format!("criterion {id}"),
            weight,
            max_score: Some(7.0),
        }
    }

    fn grade(id: u64, criteria_id: u64, score: f64) -> Grade {
        Grade {
            id,
            work_id: 1,
            evaluator_id: 1,
            criteria_id,
            score,
            comments: None,
        }
    }

    fn sample_criteria() -> Vec<Criterion> {
        vec![
            criterion(0, 0.4),
            criterion(1, 0.3),
            criterion(2, 0.2),
            criterion(3, 0.1),
        ]
    }

    fn sample_grades() -> Vec<Grade> {
        vec![
            grade(1, 0, 4.5),
            grade(2, 0, 4.7),
            grade(3, 1, 4.2),
            grade(4, 2, 4.0),
            grade(5, 3, 4.8),
        ]
    }

    #[test]
    fn weighted_average_matches_worked_example() {
        let score = GradingStrategy::WeightedAverage.calculate(&sample_grades(), &sample_criteria());
        assert!((score - 4.38).abs() < 1e-9);
    }

    #[test]
    fn ungraded_criterion_is_excluded_from_normalization() {
        let grades: Vec<Grade> = sample_grades()
            .into_iter()
            .filter(|grade| grade.criteria_id != 3)
            .collect();
        let score = GradingStrategy::WeightedAverage.calculate(&grades, &sample_criteria());
        let expected = (1.84 + 1.26 + 0.8) / 0.9;
        assert!((score - expected).abs() < 1e-9);
        assert!((score - 4.333).abs() < 0.001);
    }

    #[test]
    fn subtotals_average_each_criterion() {
        let subtotals = criterion_subtotals(&sample_grades(), &sample_criteria());
        assert_eq!(subtotals.len(), 4);
        assert_eq!(subtotals[0].grade_count, 2);
        assert!((subtotals[0].average.unwrap() - 4.6).abs() < 1e-9);
        assert!((subtotals[0].contribution - 1.84).abs() < 1e-9);
        assert!((subtotals[3].contribution - 0.48).abs() < 1e-9);
    }

    #[test]
    fn subtotals_ignore_grades_for_unknown_criteria() {
        let mut grades = sample_grades();
        grades.push(grade(6, 42, 1.0));
        let subtotals = criterion_subtotals(&grades, &sample_criteria());
        let counted: usize = subtotals.iter().map(|s| s.grade_count).sum();
        assert_eq!(counted, 5);
        let score = GradingStrategy::WeightedAverage.calculate(&grades, &sample_criteria());
        assert!((score - 4.38).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_score_zero() {
        let criteria = sample_criteria();
        assert_eq!(GradingStrategy::WeightedAverage.calculate(&[], &criteria), 0.0);
        assert_eq!(GradingStrategy::WeightedAverage.calculate(&sample_grades(), &[]), 0.0);
        assert_eq!(GradingStrategy::SimpleMean.calculate(&[], &criteria), 0.0);
        assert_eq!(
            GradingStrategy::MinimumPass { threshold: 3.0 }.calculate(&[], &criteria),
            0.0
        );
    }

    #[test]
    fn zero_weights_do_not_divide_by_zero() {
        let criteria = vec![criterion(0, 0.0)];
        let grades = vec![grade(1, 0, 6.0)];
        assert_eq!(GradingStrategy::WeightedAverage.calculate(&grades, &criteria), 0.0);
    }

    #[test]
    fn simple_mean_ignores_criteria() {
        let score = GradingStrategy::SimpleMean.calculate(&sample_grades(), &[]);
        let expected = (4.5 + 4.7 + 4.2 + 4.0 + 4.8) / 5.0;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn minimum_pass_zeroes_scores_below_threshold() {
        let criteria = vec![criterion(0, 1.0)];
        let low = vec![grade(1, 0, 2.5), grade(2, 0, 3.0)];
        let high = vec![grade(1, 0, 3.0), grade(2, 0, 3.4)];
        let strategy = GradingStrategy::MinimumPass { threshold: 3.0 };
        assert_eq!(strategy.calculate(&low, &criteria), 0.0);
        assert!((strategy.calculate(&high, &criteria) - 3.2).abs() < 1e-9);
    }

    #[test]
    fn minimum_pass_keeps_score_exactly_at_threshold() {
        let criteria = vec![criterion(0, 0.6), criterion(1, 0.4)];
        let grades = vec![grade(1, 0, 3.0), grade(2, 0, 3.0), grade(3, 1, 3.0)];
        let strategy = GradingStrategy::MinimumPass { threshold: 3.0 };
        assert_eq!(strategy.calculate(&grades, &criteria), 3.0);
    }

    #[test]
    fn custom_strategy_delegates_to_function() {
        fn best(grades: &[Grade], _: &[Criterion]) -> f64 {
            grades.iter().map(|g| g.score).fold(0.0, f64::max)
        }
        let strategy = GradingStrategy::Custom {
            name: "Mejor nota",
            calculate: best,
        };
        assert_eq!(strategy.calculate(&sample_grades(), &sample_criteria()), 4.8);
        assert_eq!(strategy.name(), "Mejor nota");
    }

    #[test]
    fn strategy_kind_parses_case_insensitively() {
        assert_eq!("Weighted".parse::<StrategyKind>(), Ok(StrategyKind::Weighted));
        assert_eq!(" simple ".parse::<StrategyKind>(), Ok(StrategyKind::Simple));
        assert_eq!(
            "MINIMUM-PASS".parse::<StrategyKind>(),
            Ok(StrategyKind::MinimumPass)
        );
        assert!("median".parse::<StrategyKind>().is_err());
        assert!(matches!(
            StrategyKind::MinimumPass.into_strategy(3.5),
            GradingStrategy::MinimumPass { threshold } if threshold == 3.5
        ));
    }

    #[test]
    fn verdict_uses_inclusive_threshold() {
        assert_eq!(Verdict::classify(4.0, 4.0), Verdict::Approved);
        assert_eq!(Verdict::classify(3.99, 4.0), Verdict::Failed);
        assert_eq!(Verdict::Approved.to_string(), "APROBADO");
    }

    fn arb_criteria() -> impl Strategy<Value = Vec<Criterion>> {
        prop::collection::vec(0.01f64..1.0, 1..6).prop_map(|weights| {
            weights
                .into_iter()
                .enumerate()
                .map(|(idx, weight)| criterion(idx as u64, weight))
                .collect()
        })
    }

    fn arb_grades(max_criterion: u64) -> impl Strategy<Value = Vec<Grade>> {
        prop::collection::vec((0..max_criterion, 1.0f64..7.0), 0..20).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(idx, (criteria_id, score))| grade(idx as u64, criteria_id, score))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_empty_grades_or_criteria_score_zero(
            criteria in arb_criteria(),
            grades in arb_grades(6),
        ) {
            prop_assert_eq!(GradingStrategy::WeightedAverage.calculate(&[], &criteria), 0.0);
            prop_assert_eq!(GradingStrategy::WeightedAverage.calculate(&grades, &[]), 0.0);
        }

        #[test]
        fn prop_single_criterion_normalizes_weight_out(
            weight in 0.01f64..5.0,
            scores in prop::collection::vec(1.0f64..7.0, 1..10),
        ) {
            let criteria = vec![criterion(0, weight)];
            let grades: Vec<Grade> = scores
                .iter()
                .enumerate()
                .map(|(idx, score)| grade(idx as u64, 0, *score))
                .collect();
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            let score = GradingStrategy::WeightedAverage.calculate(&grades, &criteria);
            prop_assert!((score - mean).abs() < 1e-9, "expected {}, got {}", mean, score);
        }

        #[test]
        fn prop_unmatched_criterion_never_changes_score(
            criteria in arb_criteria(),
            grades in arb_grades(6),
            weight in 0.01f64..1.0,
        ) {
            let before = GradingStrategy::WeightedAverage.calculate(&grades, &criteria);
            let mut extended = criteria.clone();
            extended.push(criterion(1_000, weight));
            let after = GradingStrategy::WeightedAverage.calculate(&grades, &extended);
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_breakdown_agrees_with_weighted_score(
            criteria in arb_criteria(),
            grades in arb_grades(6),
        ) {
            let subtotals = criterion_subtotals(&grades, &criteria);
            let score = GradingStrategy::WeightedAverage.calculate(&grades, &criteria);
            prop_assert_eq!(weighted_mean(&subtotals), score);
        }
    }
}
